use thiserror::Error;

use otrng_crypto::CryptoError;

#[derive(Debug, Error)]
pub enum ProtoError {
    /// A length prefix or field structure does not fit the buffer.
    #[error("Malformed input: {0}")]
    MalformedInput(&'static str),

    /// The buffer ended before a fixed-size field.
    #[error("Unexpected end of input: needed {needed} bytes, {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// Point decompression or scalar range check failed.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(&'static str),

    /// Wrong protocol version in the framing header.
    #[error("Unsupported protocol version {0}")]
    UnsupportedVersion(u16),

    /// A profile failed a validity check.
    #[error("Profile validation failed: {0}")]
    ProfileValidation(&'static str),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
