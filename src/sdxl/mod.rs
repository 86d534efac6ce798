//! Stable Diffusion XL request/response handling.

mod provider;
mod request;
mod response;
mod types;

pub use provider::{SdxlProvider, SdxlProviderBuilder};
pub use request::{build_request_body, SdxlModel};
pub use response::decode_response;
pub use types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, Sampler, StylePreset,
    TextPrompt, NEGATIVE_WEIGHT, POSITIVE_WEIGHT,
};
