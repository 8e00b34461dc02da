//! otrng_prekey — deniable-authenticated client for OTR-NG prekey servers
//!
//! Implements the client half of the prekey-server protocol: a three-message
//! ring-signature DAKE with an untrusted storage server, followed by
//! MAC-authenticated requests (storage-status queries, prekey/profile
//! publication) and the standalone ensemble retrieval query.
//!
//! # Modules
//! - `session` — the [`session::PrekeyClient`] façade and DAKE state machine
//! - `dake`    — transcript construction and inner-message MACs
//! - `storage` — stored prekeys (private halves of published messages)
//! - `events`  — outcome callbacks ([`events::PrekeyEvents`])
//! - `error`   — unified error type

pub mod dake;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;

pub use error::PrekeyError;
pub use events::{FailureKind, PrekeyEvents};
pub use session::{PrekeyClient, State};
pub use storage::{PrekeyStorage, StoredPrekey};
