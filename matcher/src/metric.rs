use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A distance between two equal-length vectors.
///
/// Lower values mean more similar; identical vectors must have distance 0.
/// Callers guarantee `a.len() == b.len()`.
pub trait Metric: Send + Sync {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;

    /// Short name used in logs and config (e.g. "euclidean").
    fn name(&self) -> &'static str;
}

impl fmt::Debug for dyn Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Metric({})", self.name())
    }
}

/// L2 distance. The reference metric for face signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl Metric for Euclidean {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        squared_l2(a, b).sqrt() as f32
    }

    fn name(&self) -> &'static str {
        "euclidean"
    }
}

/// Squared L2 distance. Orders candidates like [`Euclidean`] without the
/// square root, but thresholds must be squared too.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean;

impl Metric for SquaredEuclidean {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        squared_l2(a, b) as f32
    }

    fn name(&self) -> &'static str {
        "squared_euclidean"
    }
}

/// Cosine distance in `[0, 2]`: 0 is the same direction, 2 the opposite.
/// Zero vectors are at distance 2 from everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl Metric for Cosine {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        let mut dot: f64 = 0.0;
        let mut norm_a: f64 = 0.0;
        let mut norm_b: f64 = 0.0;

        for (&x, &y) in a.iter().zip(b) {
            let (x, y) = (x as f64, y as f64);
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return 2.0;
        }

        // Clamp to [-1, 1] to absorb rounding.
        let similarity = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
        (1.0 - similarity) as f32
    }

    fn name(&self) -> &'static str {
        "cosine"
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum()
}

/// Config-level selector for the built-in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    #[default]
    Euclidean,
    SquaredEuclidean,
    Cosine,
}

impl MetricKind {
    pub fn build(self) -> Arc<dyn Metric> {
        match self {
            Self::Euclidean => Arc::new(Euclidean),
            Self::SquaredEuclidean => Arc::new(SquaredEuclidean),
            Self::Cosine => Arc::new(Cosine),
        }
    }
}
