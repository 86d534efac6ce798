//! Response decoding for the SDXL model schema.

use crate::error::{Result, SdxlError};
use crate::sdxl::types::{GeneratedImage, GenerationMetadata};
use base64::Engine;
use serde::Deserialize;

const CONTENT_FILTERED: &str = "CONTENT_FILTERED";

#[derive(Debug, Deserialize)]
pub(crate) struct SdxlResponse {
    #[serde(default)]
    pub(crate) result: Option<String>,
    #[serde(default)]
    pub(crate) artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Artifact {
    pub(crate) base64: String,
    #[serde(default)]
    pub(crate) seed: Option<u64>,
    #[serde(default, rename = "finishReason")]
    pub(crate) finish_reason: Option<String>,
}

/// Decodes the first artifact of a model response into an image.
///
/// Fails if the artifact list is missing or empty, if the payload is not
/// valid base64, or if the decoded bytes are not an image.
pub fn decode_response(body: &[u8], model_id: &str) -> Result<GeneratedImage> {
    let response: SdxlResponse = serde_json::from_slice(body)?;

    if let Some(ref result) = response.result {
        tracing::debug!(result = %result, artifacts = response.artifacts.len(), "decoded response");
    }

    let artifact = response
        .artifacts
        .into_iter()
        .next()
        .ok_or(SdxlError::NoArtifacts)?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(artifact.base64.trim())
        .map_err(|e| SdxlError::Decode(e.to_string()))?;

    let safety_filtered = artifact.finish_reason.as_deref() == Some(CONTENT_FILTERED);
    if safety_filtered {
        tracing::warn!("artifact was replaced by the content filter");
    }

    GeneratedImage::from_bytes(
        data,
        GenerationMetadata {
            model: Some(model_id.to_string()),
            seed: artifact.seed,
            duration_ms: None,
            safety_filtered,
        },
    )
}
