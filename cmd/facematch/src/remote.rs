//! HTTP face encoder.
//!
//! POSTs the encoded image bytes to an external detector/encoder and
//! expects:
//!
//! ```json
//! {"faces": [{"box": [x, y, w, h], "score": 0.98, "embedding": [0.1, ...]}]}
//! ```

use std::time::Duration;

use facematch_codec::{BoundingRegion, CodecError, FaceEncoder, FaceImage, RawDetection};
use reqwest::blocking::Client;
use serde::Deserialize;

#[derive(Deserialize)]
struct EncodeResponse {
    #[serde(default)]
    faces: Vec<FaceData>,
}

#[derive(Deserialize)]
struct FaceData {
    #[serde(rename = "box")]
    bbox: [f32; 4],
    #[serde(default)]
    score: Option<f32>,
    embedding: Vec<f32>,
}

pub struct RemoteEncoder {
    client: Client,
    url: String,
    dim: usize,
}

impl RemoteEncoder {
    pub fn new(url: &str, dim: usize, timeout: Option<Duration>) -> Result<Self, CodecError> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| CodecError::Encoder(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            dim,
        })
    }
}

impl FaceEncoder for RemoteEncoder {
    fn encode(&self, image: &FaceImage) -> Result<Vec<RawDetection>, CodecError> {
        let resp = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/octet-stream")
            .body(image.encoded().to_vec())
            .send()
            .map_err(|e| CodecError::Encoder(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(CodecError::Encoder(format!("HTTP {status}: {body}")));
        }

        let body = resp
            .text()
            .map_err(|e| CodecError::Encoder(e.to_string()))?;
        parse_response(&body)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

fn parse_response(body: &str) -> Result<Vec<RawDetection>, CodecError> {
    let data: EncodeResponse =
        serde_json::from_str(body).map_err(|e| CodecError::Encoder(format!("bad response: {e}")))?;
    Ok(data
        .faces
        .into_iter()
        .map(|f| {
            let [x, y, w, h] = f.bbox;
            let mut region = BoundingRegion::new(x, y, w, h);
            region.confidence = f.score;
            RawDetection {
                embedding: f.embedding,
                region,
            }
        })
        .collect())
}
