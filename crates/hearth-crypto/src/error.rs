/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("credential hashing failed: {0}")]
    Hashing(String),

    #[error("stored credential is malformed: {0}")]
    MalformedHash(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}
