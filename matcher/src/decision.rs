use std::fmt;

use facematch_codec::Signature;
use serde::{Deserialize, Serialize};

/// Outcome of matching one image or signature against the enrolled set.
///
/// Every variant is an expected result of biometric matching; faults are
/// reported separately as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum MatchDecision {
    /// Exactly one identity is closest and within threshold.
    Matched { identity: String, distance: f32 },
    /// No enrolled signature is within threshold.
    NoMatch,
    /// The image contains no face.
    NoFaceDetected,
    /// The image contains more than one face and policy refused to pick.
    MultipleFacesDetected { count: usize },
    /// Several identities tie for the closest distance.
    /// `candidates` is sorted.
    AmbiguousMatch {
        candidates: Vec<String>,
        distance: f32,
    },
}

impl MatchDecision {
    /// Returns the matched identity, if any.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Matched { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

impl fmt::Display for MatchDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched { identity, distance } => {
                write!(f, "matched {identity} (distance {distance:.4})")
            }
            Self::NoMatch => write!(f, "no match"),
            Self::NoFaceDetected => write!(f, "no face detected"),
            Self::MultipleFacesDetected { count } => {
                write!(f, "multiple faces detected ({count})")
            }
            Self::AmbiguousMatch {
                candidates,
                distance,
            } => write!(
                f,
                "ambiguous match between {} (distance {distance:.4})",
                candidates.join(", ")
            ),
        }
    }
}

/// A signature to match, with an optional threshold that overrides the
/// configured one for this query only.
#[derive(Debug, Clone)]
pub struct MatchQuery {
    pub signature: Signature,
    pub threshold: Option<f32>,
}

impl MatchQuery {
    pub fn new(signature: Signature) -> Self {
        Self {
            signature,
            threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_display() {
        assert_eq!(
            MatchDecision::Matched {
                identity: "alice".into(),
                distance: 0.25
            }
            .to_string(),
            "matched alice (distance 0.2500)"
        );
        assert_eq!(MatchDecision::NoMatch.to_string(), "no match");
        assert_eq!(
            MatchDecision::MultipleFacesDetected { count: 3 }.to_string(),
            "multiple faces detected (3)"
        );
        assert_eq!(
            MatchDecision::AmbiguousMatch {
                candidates: vec!["a".into(), "b".into()],
                distance: 0.0
            }
            .to_string(),
            "ambiguous match between a, b (distance 0.0000)"
        );
    }

    #[test]
    fn decision_json_is_tagged() {
        let json = serde_json::to_value(MatchDecision::Matched {
            identity: "alice".into(),
            distance: 0.5,
        })
        .unwrap();
        assert_eq!(json["decision"], "matched");
        assert_eq!(json["identity"], "alice");

        let json = serde_json::to_value(MatchDecision::NoFaceDetected).unwrap();
        assert_eq!(json, serde_json::json!({ "decision": "no_face_detected" }));
    }

    #[test]
    fn identity_accessor() {
        let m = MatchDecision::Matched {
            identity: "bob".into(),
            distance: 0.1,
        };
        assert_eq!(m.identity(), Some("bob"));
        assert!(m.is_match());
        assert_eq!(MatchDecision::NoMatch.identity(), None);
        assert!(!MatchDecision::NoMatch.is_match());
    }
}
