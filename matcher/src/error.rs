use thiserror::Error;

/// Errors returned by matching.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("matcher: dimension mismatch: query has {query}, candidate {identity} has {got}")]
    DimensionMismatch {
        identity: String,
        query: usize,
        got: usize,
    },

    #[error("matcher: invalid threshold: {0}")]
    InvalidThreshold(f32),

    #[error("matcher: invalid tie epsilon: {0}")]
    InvalidTieEpsilon(f32),

    #[error("matcher: {metric} distance to {identity} is NaN")]
    NanDistance {
        identity: String,
        metric: &'static str,
    },
}
