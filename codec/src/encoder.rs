use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::{CodecError, Signature};

/// A decoded image handed to a [`FaceEncoder`].
///
/// Carries the RGB8 pixels for local models and the original encoded
/// bytes for encoders that forward the image to a remote service.
pub struct FaceImage {
    rgb: RgbImage,
    encoded: Vec<u8>,
}

impl FaceImage {
    /// Decodes raw image bytes. The format is sniffed from the content.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Decode("empty image".into()));
        }
        let img = image::load_from_memory(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(Self {
            rgb: img.to_rgb8(),
            encoded: bytes.to_vec(),
        })
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// Row-major RGB8 pixels.
    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    /// The bytes the image was decoded from.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}

/// Pixel region a face was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingRegion {
    /// X coordinate of the top-left corner (pixels).
    pub x: f32,
    /// Y coordinate of the top-left corner (pixels).
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Detector confidence, when the encoder reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl BoundingRegion {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: None,
        }
    }

    /// Region area in square pixels. Negative extents count as zero.
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// Unvalidated encoder output for a single face.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub embedding: Vec<f32>,
    pub region: BoundingRegion,
}

/// A validated face detection.
#[derive(Debug, Clone)]
pub struct Detection {
    pub signature: Signature,
    pub region: BoundingRegion,
}

/// Detects faces in a decoded image and encodes each into an embedding.
///
/// This is the boundary to the external face model. The output order is
/// whatever the model returns; callers must not rely on it across runs.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use.
pub trait FaceEncoder: Send + Sync {
    /// Returns zero or more detections for the image.
    fn encode(&self, image: &FaceImage) -> Result<Vec<RawDetection>, CodecError>;

    /// Returns the dimensionality of the embedding vectors (e.g., 128).
    fn dimension(&self) -> usize;
}
