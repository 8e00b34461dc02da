//! otrng_crypto — cryptographic primitives for the OTR-NG prekey client
//!
//! # Design principles
//! - NO custom field or curve arithmetic; points and scalars come from
//!   `ed448-goldilocks`, big integers from `num-bigint`.
//! - Zeroize secret material on drop.
//! - All randomness flows through an injectable `RandomSource`.
//!
//! # Module layout
//! - `shake`       — domain/usage-separated SHAKE-256 KDF and usage registry
//! - `ed448`       — Edwards448 keypairs, ECDH, point/scalar encodings
//! - `eddsa`       — 114-byte signatures over profile bodies
//! - `dh`          — 3072-bit MODP group (RFC 3526 group 15)
//! - `rsig`        — 3-of-3 ring signature (DAKE authentication)
//! - `proofs`      — batch knowledge proofs for published prekey material
//! - `fingerprint` — long-term key fingerprints
//! - `random`      — injectable randomness
//! - `error`       — unified error type

pub mod dh;
pub mod ed448;
pub mod eddsa;
pub mod error;
pub mod fingerprint;
pub mod proofs;
pub mod random;
pub mod rsig;
pub mod shake;

pub use error::CryptoError;

// Re-export the curve types that cross crate boundaries.
pub use ed448_goldilocks::{EdwardsPoint, EdwardsScalar};
