use std::sync::Arc;

use tracing::{debug, warn};

use crate::encoder::{Detection, FaceEncoder, FaceImage};
use crate::{CodecError, Signature};

/// Controls signature extraction.
#[derive(Debug, Clone, Copy)]
pub struct CodecConfig {
    /// Expected signature dimension (e.g. 128).
    pub dimension: usize,

    /// Scale every signature to unit L2 norm before returning it.
    /// Default: false.
    pub l2_normalize: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            dimension: 128,
            l2_normalize: false,
        }
    }
}

/// Turns encoded image bytes into validated face signatures.
///
/// Thread-safe: `extract` can be called concurrently.
#[derive(Clone)]
pub struct SignatureCodec {
    encoder: Arc<dyn FaceEncoder>,
    cfg: CodecConfig,
}

impl SignatureCodec {
    /// Creates a codec. Fails if the encoder's dimension differs from
    /// `cfg.dimension`, which means the model and the configuration
    /// disagree.
    pub fn new(encoder: Arc<dyn FaceEncoder>, cfg: CodecConfig) -> Result<Self, CodecError> {
        if cfg.dimension == 0 || encoder.dimension() != cfg.dimension {
            return Err(CodecError::DimensionMismatch {
                expected: cfg.dimension,
                got: encoder.dimension(),
            });
        }
        Ok(Self { encoder, cfg })
    }

    pub fn dimension(&self) -> usize {
        self.cfg.dimension
    }

    /// Decodes the image and returns every detected face, in encoder order.
    ///
    /// An image with no faces yields an empty vector. Undecodable bytes are
    /// a [`CodecError::Decode`], and an embedding of the wrong length is a
    /// [`CodecError::DimensionMismatch`]; neither is ever coerced.
    pub fn extract(&self, bytes: &[u8]) -> Result<Vec<Detection>, CodecError> {
        let image = FaceImage::decode(bytes)?;
        debug!(
            "decoded image {}x{} ({} bytes)",
            image.width(),
            image.height(),
            bytes.len()
        );

        let raw = self.encoder.encode(&image)?;
        let mut detections = Vec::with_capacity(raw.len());
        for det in raw {
            let signature = match Signature::new(det.embedding, self.cfg.dimension) {
                Ok(sig) => sig,
                Err(e) => {
                    warn!("encoder output rejected: {}", e);
                    return Err(e);
                }
            };
            let signature = if self.cfg.l2_normalize {
                signature
                    .normalized()
                    .inspect_err(|e| warn!("normalized signature rejected: {}", e))?
            } else {
                signature
            };
            detections.push(Detection {
                signature,
                region: det.region,
            });
        }

        debug!("extracted {} face(s)", detections.len());
        Ok(detections)
    }
}
