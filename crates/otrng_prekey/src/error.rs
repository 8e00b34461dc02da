use thiserror::Error;

use otrng_crypto::CryptoError;
use otrng_proto::ProtoError;

#[derive(Debug, Error)]
pub enum PrekeyError {
    /// The delivery identity does not match the session's server.
    #[error("Message delivered from the wrong server identity")]
    WrongServer,

    /// A mandatory constructor argument was empty or zero.
    #[error("Missing mandatory input: {0}")]
    MissingMandatoryInput(&'static str),

    /// A publication asked for more prekey messages than fit in one batch.
    #[error("Too many prekey messages requested: {0} (maximum 255)")]
    TooManyMessages(usize),

    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
