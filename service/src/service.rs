use std::sync::Arc;

use facematch_codec::{BoundingRegion, CodecConfig, Detection, FaceEncoder, SignatureCodec};
use facematch_matcher::{MatchDecision, MatchQuery, Matcher};
use facematch_store::SignatureStore;
use tracing::{debug, info, warn};

use crate::config::{MultiFacePolicy, ServiceConfig};
use crate::ServiceError;

/// Result of applying the multi-face policy to a set of detections.
enum Selection {
    NoFace,
    MultiFace { count: usize },
    Single(Detection),
}

/// Runs image bytes through codec, store and matcher.
///
/// # States
///
/// ```text
/// Received -> Decoded -> NoFace    -> NoFaceDetected
///                     -> MultiFace -> MultipleFacesDetected (policy)
///                     -> Scored    -> Matched | NoMatch | AmbiguousMatch
/// ```
///
/// Each call is independent. The store is read through a snapshot taken
/// after the codec has run, so no lock is held while the encoder works
/// or while the matcher scans. The service never retries a fault.
///
/// Thread-safe: all methods can be called concurrently.
pub struct MatchService {
    codec: SignatureCodec,
    store: Arc<dyn SignatureStore>,
    matcher: Matcher,
    threshold: f32,
    multi_face: MultiFacePolicy,
}

impl MatchService {
    /// Builds a service from config, an encoder and a store.
    ///
    /// Fails if the config is invalid, or if the encoder or the store
    /// disagree with the configured dimension.
    pub fn new(
        cfg: &ServiceConfig,
        encoder: Arc<dyn FaceEncoder>,
        store: Arc<dyn SignatureStore>,
    ) -> Result<Self, ServiceError> {
        cfg.validate()?;
        let codec = SignatureCodec::new(
            encoder,
            CodecConfig {
                dimension: cfg.dimension,
                l2_normalize: cfg.l2_normalize,
            },
        )?;
        if store.dimension() != cfg.dimension {
            return Err(ServiceError::Config(format!(
                "store dimension {} does not match configured dimension {}",
                store.dimension(),
                cfg.dimension
            )));
        }
        let matcher = Matcher::new(cfg.metric.build()).with_tie_epsilon(cfg.tie_epsilon)?;
        Ok(Self {
            codec,
            store,
            matcher,
            threshold: cfg.threshold,
            multi_face: cfg.multi_face,
        })
    }

    /// Default match threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn store(&self) -> &Arc<dyn SignatureStore> {
        &self.store
    }

    /// Decides whether the face in `image` belongs to an enrolled identity.
    pub fn evaluate(&self, image: &[u8]) -> Result<MatchDecision, ServiceError> {
        self.evaluate_with(image, None)
    }

    /// Like [`MatchService::evaluate`], with an optional per-call threshold.
    pub fn evaluate_with(
        &self,
        image: &[u8],
        threshold: Option<f32>,
    ) -> Result<MatchDecision, ServiceError> {
        debug!("received {} bytes", image.len());
        let detections = self.codec.extract(image).inspect_err(|e| warn!("extract failed: {}", e))?;
        debug!("decoded {} detection(s)", detections.len());

        let detection = match self.select(detections) {
            Selection::NoFace => {
                info!("decision: no face detected");
                return Ok(MatchDecision::NoFaceDetected);
            }
            Selection::MultiFace { count } => {
                info!("decision: {} faces detected", count);
                return Ok(MatchDecision::MultipleFacesDetected { count });
            }
            Selection::Single(d) => d,
        };

        let query = MatchQuery {
            signature: detection.signature,
            threshold,
        };
        self.match_query(&query)
    }

    /// Matches an already extracted signature against the store.
    pub fn match_query(&self, query: &MatchQuery) -> Result<MatchDecision, ServiceError> {
        let snapshot = self.store.all()?;
        debug!(
            "scoring against {} identities ({})",
            snapshot.len(),
            self.matcher.metric().name()
        );
        let threshold = query.threshold.unwrap_or(self.threshold);
        let decision = self
            .matcher
            .match_records(&query.signature, &snapshot, threshold)?;
        info!("decision: {}", decision);
        Ok(decision)
    }

    /// Extracts the single face in an enrollment photo and enrolls it.
    /// Returns the region the face was found in.
    ///
    /// A photo with no face, or with several faces the policy will not
    /// choose between, is rejected and the store is left untouched.
    pub fn enroll_image(&self, identity: &str, image: &[u8]) -> Result<BoundingRegion, ServiceError> {
        let detections = self.codec.extract(image)?;
        let detection = match self.select(detections) {
            Selection::NoFace => {
                return Err(ServiceError::Enrollment("no face detected".into()));
            }
            Selection::MultiFace { count } => {
                return Err(ServiceError::Enrollment(format!(
                    "{count} faces detected, expected one"
                )));
            }
            Selection::Single(d) => d,
        };
        self.store.enroll(identity, detection.signature)?;
        Ok(detection.region)
    }

    /// Runs [`MatchService::evaluate_with`] on tokio's blocking pool.
    ///
    /// Dropping the returned future abandons the result; matching never
    /// writes to the store, so an abandoned call leaves nothing behind.
    pub async fn evaluate_async(
        self: Arc<Self>,
        image: Vec<u8>,
        threshold: Option<f32>,
    ) -> Result<MatchDecision, ServiceError> {
        tokio::task::spawn_blocking(move || self.evaluate_with(&image, threshold))
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))?
    }

    fn select(&self, mut detections: Vec<Detection>) -> Selection {
        match detections.len() {
            0 => Selection::NoFace,
            1 => Selection::Single(detections.remove(0)),
            count => match self.multi_face {
                MultiFacePolicy::Reject => Selection::MultiFace { count },
                MultiFacePolicy::LargestFace => match largest(&detections) {
                    Some(idx) => Selection::Single(detections.swap_remove(idx)),
                    None => Selection::MultiFace { count },
                },
            },
        }
    }
}

/// Index of the detection with the strictly largest region, or `None` if
/// the largest area is shared.
fn largest(detections: &[Detection]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    let mut tied = false;
    for (i, d) in detections.iter().enumerate() {
        let area = d.region.area();
        match best {
            Some((_, a)) if area < a => {}
            Some((_, a)) if area == a => tied = true,
            _ => {
                best = Some((i, area));
                tied = false;
            }
        }
    }
    if tied { None } else { best.map(|(i, _)| i) }
}
