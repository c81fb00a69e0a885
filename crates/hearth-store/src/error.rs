use hearth_crypto::CryptoError;
use hearth_types::TypeError;

/// Stable classification of a [`StoreError`].
///
/// Callers map this to their own external response; the variants never
/// change meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    InvalidCredentials,
    InvalidState,
    Unauthenticated,
    InvalidInput,
    Internal,
}

/// Errors from store and session registry operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The identifier does not resolve to a record the actor may see.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    /// The record exists but the actor has no rights over it.
    #[error("not permitted to modify {entity} {id}")]
    Forbidden { entity: &'static str, id: u64 },

    /// Registration with a display name that is already taken.
    #[error("display name already taken: {0}")]
    Conflict(String),

    /// Login did not match any account.
    #[error("invalid display name or secret")]
    InvalidCredentials,

    /// Hard delete attempted on a record that was not soft-deleted first.
    #[error("{entity} {id} must be marked deleted before it can be removed")]
    InvalidState { entity: &'static str, id: u64 },

    /// No valid session could be resolved.
    #[error("not logged in")]
    Unauthenticated,

    /// Input rejected by a record constructor or allocator.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Credential hashing failed.
    #[error(transparent)]
    Credential(#[from] CryptoError),
}

impl StoreError {
    /// The stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Type(TypeError::EmptyField { .. }) => ErrorKind::InvalidInput,
            Self::Type(TypeError::IdSpaceExhausted) | Self::Credential(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    pub(crate) fn forbidden(entity: &'static str, id: u64) -> Self {
        Self::Forbidden { entity, id }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from writing or reading snapshot files.
///
/// These never fail a mutation: mutation paths log and absorb them. They
/// are returned from explicit flush and load calls.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// I/O error from the snapshot directory or file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be encoded or parsed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The document is not a Hearth snapshot.
    #[error("unrecognized snapshot format: {0:?}")]
    UnknownFormat(String),

    /// The snapshot was written by an incompatible version.
    #[error("unsupported snapshot version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The snapshot belongs to a different store.
    #[error("snapshot kind mismatch: expected {expected}, found {found}")]
    KindMismatch { expected: &'static str, found: String },

    /// The state does not hash to the recorded digest.
    #[error("snapshot digest mismatch for {kind}")]
    DigestMismatch { kind: &'static str },

    /// Digest computation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<serde_json::Error> for PersistError {
    fn from(e: serde_json::Error) -> Self {
        PersistError::Serialization(e.to_string())
    }
}

/// Result alias for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;
