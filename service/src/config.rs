//! Service configuration.
//!
//! Loaded from YAML; every field is optional and falls back to its default.
//!
//! ```yaml
//! dimension: 128
//! threshold: 0.6
//! metric: euclidean        # euclidean | squared_euclidean | cosine
//! multi_face: reject       # reject | largest_face
//! enroll_policy: append    # append | reject_existing
//! ```

use std::path::Path;

use facematch_matcher::{MetricKind, DEFAULT_TIE_EPSILON};
use facematch_store::{EnrollPolicy, StoreConfig};
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// What to do when an image contains more than one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiFacePolicy {
    /// Report `MultipleFacesDetected` and do not match.
    #[default]
    Reject,
    /// Match the face with the largest bounding region. If several faces
    /// share the largest area the image is still rejected.
    LargestFace,
}

/// Match service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Signature dimension (e.g. 128).
    pub dimension: usize,

    /// Maximum distance for a match. Default: 0.6.
    pub threshold: f32,

    /// Best distances closer than this are a tie. Default: 1e-6.
    pub tie_epsilon: f32,

    /// Distance metric. Default: euclidean.
    pub metric: MetricKind,

    /// Multi-face handling. Default: reject.
    pub multi_face: MultiFacePolicy,

    /// L2-normalize signatures as they are extracted. Default: false.
    pub l2_normalize: bool,

    /// Behavior when enrolling an existing identity. Default: append.
    pub enroll_policy: EnrollPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dimension: 128,
            threshold: 0.6,
            tie_epsilon: DEFAULT_TIE_EPSILON,
            metric: MetricKind::default(),
            multi_face: MultiFacePolicy::default(),
            l2_normalize: false,
            enroll_policy: EnrollPolicy::default(),
        }
    }
}

impl ServiceConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml(data: &str) -> Result<Self, ServiceError> {
        let cfg: Self = serde_yaml::from_str(data).map_err(|e| ServiceError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads and validates a YAML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_yaml(&data)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.dimension == 0 {
            return Err(ServiceError::Config("dimension must be positive".into()));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ServiceError::Config(format!(
                "threshold must be finite and non-negative, got {}",
                self.threshold
            )));
        }
        if !self.tie_epsilon.is_finite() || self.tie_epsilon < 0.0 {
            return Err(ServiceError::Config(format!(
                "tie_epsilon must be finite and non-negative, got {}",
                self.tie_epsilon
            )));
        }
        Ok(())
    }

    /// Store settings matching this config.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            dimension: self.dimension,
            policy: self.enroll_policy,
        }
    }
}
