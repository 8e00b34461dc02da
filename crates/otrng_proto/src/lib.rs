//! otrng_proto — wire types and serialisation for the OTR-NG prekey client
//!
//! Binary, big-endian, length-prefixed — the prekey-server protocol encoding
//! throughout. Transport armor is `base64(payload) + '.'`.
//!
//! # Modules
//! - `wire`     — encoder/decoder primitives with consumed-byte accounting
//! - `codec`    — base64-dot armor and the version-4 framing header
//! - `profile`  — client and prekey profiles (signed values + validation)
//! - `messages` — DAKE and server-reply message types
//! - `error`    — unified error type

pub mod codec;
pub mod error;
pub mod messages;
pub mod profile;
pub mod wire;

pub use codec::PROTOCOL_VERSION;
pub use error::ProtoError;
pub use profile::{ClientProfile, PrekeyProfile, MIN_INSTANCE_TAG};
