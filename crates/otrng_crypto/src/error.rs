use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid point encoding")]
    InvalidPoint,

    #[error("Invalid scalar encoding")]
    InvalidScalar,

    #[error("Signature verification failed")]
    SignatureVerification,

    #[error("Secret key is not a member of the ring")]
    SecretNotInRing,

    #[error("Proof requires at least one private value")]
    EmptyProof,

    #[error("DH public key out of range")]
    DhPublicKeyRange,

    #[error("Input too short")]
    TruncatedInput,
}
