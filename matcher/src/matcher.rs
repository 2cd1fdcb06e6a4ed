use std::collections::HashMap;
use std::sync::Arc;

use facematch_codec::Signature;
use facematch_store::EnrolledRecord;
use tracing::debug;

use crate::decision::{MatchDecision, MatchQuery};
use crate::metric::{Euclidean, Metric};
use crate::MatchError;

/// Default tolerance under which two best distances count as a tie.
pub const DEFAULT_TIE_EPSILON: f32 = 1e-6;

/// Best distance found for one identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub identity: String,
    pub distance: f32,
}

/// Compares a query signature against every enrolled signature.
///
/// # Algorithm
///
/// Full scan: the metric is evaluated against every candidate signature,
/// keeping the smallest distance per identity (not the average, so one
/// good enrollment photo offsets a poor one). Then:
///
/// - smallest distance above threshold -> [`MatchDecision::NoMatch`]
/// - two or more identities within threshold and within `tie_epsilon` of
///   the smallest distance -> [`MatchDecision::AmbiguousMatch`]
/// - otherwise -> [`MatchDecision::Matched`]
///
/// There is no index; cost is linear in the number of enrolled signatures.
#[derive(Clone)]
pub struct Matcher {
    metric: Arc<dyn Metric>,
    tie_epsilon: f32,
}

impl Matcher {
    /// Creates a matcher with the given metric and the default tie epsilon.
    pub fn new(metric: Arc<dyn Metric>) -> Self {
        Self {
            metric,
            tie_epsilon: DEFAULT_TIE_EPSILON,
        }
    }

    /// Creates a matcher using Euclidean distance.
    pub fn euclidean() -> Self {
        Self::new(Arc::new(Euclidean))
    }

    /// Sets the tie tolerance. `eps` must be finite and non-negative.
    pub fn with_tie_epsilon(mut self, eps: f32) -> Result<Self, MatchError> {
        if !eps.is_finite() || eps < 0.0 {
            return Err(MatchError::InvalidTieEpsilon(eps));
        }
        self.tie_epsilon = eps;
        Ok(self)
    }

    pub fn metric(&self) -> &dyn Metric {
        self.metric.as_ref()
    }

    pub fn tie_epsilon(&self) -> f32 {
        self.tie_epsilon
    }

    /// Matches `query` against `candidates` under `threshold`.
    ///
    /// `candidates` may contain several signatures per identity.
    pub fn match_candidates<'a, I>(
        &self,
        query: &Signature,
        candidates: I,
        threshold: f32,
    ) -> Result<MatchDecision, MatchError>
    where
        I: IntoIterator<Item = (&'a str, &'a Signature)>,
    {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(MatchError::InvalidThreshold(threshold));
        }

        let ranked = self.rank(query, candidates)?;
        let Some(best) = ranked.first() else {
            return Ok(MatchDecision::NoMatch);
        };

        // NaN compares false here and lands in NoMatch.
        if !(best.distance <= threshold) {
            debug!(
                "no match: best {} at {:.4} > threshold {:.4}",
                best.identity, best.distance, threshold
            );
            return Ok(MatchDecision::NoMatch);
        }

        let tied: Vec<String> = ranked
            .iter()
            .take_while(|c| c.distance <= threshold && c.distance - best.distance <= self.tie_epsilon)
            .map(|c| c.identity.clone())
            .collect();

        if tied.len() > 1 {
            debug!("ambiguous match: {} identities at {:.4}", tied.len(), best.distance);
            let mut candidates = tied;
            candidates.sort();
            return Ok(MatchDecision::AmbiguousMatch {
                candidates,
                distance: best.distance,
            });
        }

        Ok(MatchDecision::Matched {
            identity: best.identity.clone(),
            distance: best.distance,
        })
    }

    /// Matches `query` against every signature of every record, e.g. a
    /// store [`facematch_store::Snapshot`].
    pub fn match_records<'a, I>(
        &self,
        query: &Signature,
        records: I,
        threshold: f32,
    ) -> Result<MatchDecision, MatchError>
    where
        I: IntoIterator<Item = &'a Arc<EnrolledRecord>>,
    {
        let candidates = records.into_iter().flat_map(|r| {
            r.signatures()
                .iter()
                .map(move |sig| (r.identity(), sig))
        });
        self.match_candidates(query, candidates, threshold)
    }

    /// Matches a [`MatchQuery`], using its threshold if set and
    /// `default_threshold` otherwise.
    pub fn match_query<'a, I>(
        &self,
        query: &MatchQuery,
        candidates: I,
        default_threshold: f32,
    ) -> Result<MatchDecision, MatchError>
    where
        I: IntoIterator<Item = (&'a str, &'a Signature)>,
    {
        let threshold = query.threshold.unwrap_or(default_threshold);
        self.match_candidates(&query.signature, candidates, threshold)
    }

    /// Returns the best distance per identity, closest first. Identities
    /// with equal distance are ordered by name so the result is stable.
    pub fn rank<'a, I>(&self, query: &Signature, candidates: I) -> Result<Vec<Candidate>, MatchError>
    where
        I: IntoIterator<Item = (&'a str, &'a Signature)>,
    {
        let mut best: HashMap<&'a str, f32> = HashMap::new();
        for (identity, sig) in candidates {
            if sig.dimension() != query.dimension() {
                return Err(MatchError::DimensionMismatch {
                    identity: identity.to_string(),
                    query: query.dimension(),
                    got: sig.dimension(),
                });
            }
            let d = self.metric.distance(query.as_slice(), sig.as_slice());
            if d.is_nan() {
                return Err(MatchError::NanDistance {
                    identity: identity.to_string(),
                    metric: self.metric.name(),
                });
            }
            best.entry(identity)
                .and_modify(|cur| {
                    if d < *cur {
                        *cur = d;
                    }
                })
                .or_insert(d);
        }

        let mut ranked: Vec<Candidate> = best
            .into_iter()
            .map(|(identity, distance)| Candidate {
                identity: identity.to_string(),
                distance,
            })
            .collect();
        ranked.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.identity.cmp(&b.identity))
        });
        Ok(ranked)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::euclidean()
    }
}
