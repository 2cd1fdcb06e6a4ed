use thiserror::Error;

/// Errors returned by signature extraction.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("non-finite value at index {index}")]
    NonFinite { index: usize },

    #[error("encoder error: {0}")]
    Encoder(String),
}
