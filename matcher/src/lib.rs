//! 1:N face signature matching.
//!
//! [`Matcher`] scans every enrolled signature, keeps the best distance per
//! identity and turns the result into a [`MatchDecision`]. Ties between
//! identities are reported as [`MatchDecision::AmbiguousMatch`] rather than
//! resolved by picking one.
//!
//! # Usage
//!
//! ```
//! use facematch_codec::Signature;
//! use facematch_matcher::{MatchDecision, Matcher};
//!
//! let alice = Signature::new(vec![1.0, 0.0], 2)?;
//! let bob = Signature::new(vec![0.0, 1.0], 2)?;
//! let query = Signature::new(vec![0.9, 0.1], 2)?;
//!
//! let matcher = Matcher::euclidean();
//! let decision = matcher.match_candidates(&query, [("alice", &alice), ("bob", &bob)], 0.6)?;
//! assert_eq!(decision.identity(), Some("alice"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The distance is pluggable through [`Metric`]; [`Euclidean`] is the
//! reference choice.

mod decision;
mod error;
mod matcher;
mod metric;

pub use decision::{MatchDecision, MatchQuery};
pub use error::MatchError;
pub use matcher::{Candidate, Matcher, DEFAULT_TIE_EPSILON};
pub use metric::{Cosine, Euclidean, Metric, MetricKind, SquaredEuclidean};
