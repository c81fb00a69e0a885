use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] hearth_store::StoreError),

    #[error("credential error: {0}")]
    Credential(#[from] hearth_crypto::CryptoError),
}

pub type BackendResult<T> = Result<T, BackendError>;
