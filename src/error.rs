//! Error types for image generation.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur while preparing, invoking, or decoding a generation.
#[derive(Debug, thiserror::Error)]
pub enum SdxlError {
    /// Credentials missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Service returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Request throttled by the service.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Service rejected the request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Image path does not exist.
    #[error("image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    /// Input is neither a local image path nor a decoded image.
    #[error("unsupported image input: {0}")]
    UnsupportedInput(String),

    /// Init image could not be decoded or re-encoded.
    #[error("invalid init image: {0}")]
    InvalidImage(#[source] image::ImageError),

    /// Generated image bytes could not be decoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Response carried no artifacts.
    #[error("response contained no artifacts")]
    NoArtifacts,

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Broad classification of an [`SdxlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Problem with local input or configuration.
    Input,
    /// Failure reported by, or while talking to, the remote service.
    Remote,
    /// Malformed or absent response payload.
    Decode,
}

impl SdxlError {
    /// Returns which stage of the flow this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ImageNotFound(_)
            | Self::UnsupportedInput(_)
            | Self::InvalidImage(_)
            | Self::Io(_) => ErrorKind::Input,
            Self::Auth(_)
            | Self::Api { .. }
            | Self::RateLimited { .. }
            | Self::InvalidRequest(_)
            | Self::Network(_) => ErrorKind::Remote,
            Self::NoArtifacts | Self::Decode(_) | Self::Json(_) | Self::Image(_) => {
                ErrorKind::Decode
            }
        }
    }
}

/// Extracts a readable message from a service error body.
///
/// Bedrock returns `{"message": "..."}`; anything else is passed through,
/// trimmed and truncated so a stray HTML page doesn't flood the terminal.
pub(crate) fn service_message(text: &str) -> String {
    const MAX_LEN: usize = 500;

    let message = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("Message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| text.trim().to_string());

    if message.chars().count() > MAX_LEN {
        let truncated: String = message.chars().take(MAX_LEN).collect();
        format!("{truncated}...")
    } else {
        message
    }
}

/// Parses a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, SdxlError>;
