//! Face signature extraction.
//!
//! # Pipeline
//!
//! 1. [`FaceImage::decode`]: encoded bytes (PNG, JPEG, WebP, BMP) -> RGB8 pixels
//! 2. [`FaceEncoder::encode`]: pixels -> zero or more raw embeddings + regions
//! 3. [`SignatureCodec::extract`]: validates every embedding into a
//!    fixed-dimension [`Signature`]
//!
//! The face model itself lives behind [`FaceEncoder`]; any detector that can
//! produce fixed-length embeddings plugs in there.

mod codec;
mod encoder;
mod error;
mod signature;

pub use codec::{CodecConfig, SignatureCodec};
pub use encoder::{BoundingRegion, Detection, FaceEncoder, FaceImage, RawDetection};
pub use error::CodecError;
pub use signature::{l2_normalize, Signature};
