use facematch_codec::CodecError;
use facematch_matcher::MatchError;
use facematch_store::StoreError;
use thiserror::Error;

/// Faults returned by the match service.
///
/// Expected outcomes such as "no face" or "ambiguous match" are
/// [`facematch_matcher::MatchDecision`] values, not errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service: codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("service: store error: {0}")]
    Store(#[from] StoreError),

    #[error("service: match error: {0}")]
    Match(#[from] MatchError),

    #[error("service: enrollment rejected: {0}")]
    Enrollment(String),

    #[error("service: task failed: {0}")]
    Task(String),

    #[error("service: invalid config: {0}")]
    Config(String),
}
