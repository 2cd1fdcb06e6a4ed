use thiserror::Error;

/// Errors returned by signature store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store: identity already enrolled: {0}")]
    DuplicateIdentity(String),

    #[error("store: identity not found: {0}")]
    NotFound(String),

    #[error("store: signature {index} not found for identity {identity}")]
    SignatureNotFound { identity: String, index: usize },

    #[error("store: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("store: invalid identity: {0:?}")]
    InvalidIdentity(String),

    #[error("store: storage error: {0}")]
    Storage(String),

    #[error("store: corrupted record {identity}: {reason}")]
    Corrupted { identity: String, reason: String },
}
