#![warn(missing_docs)]
//! sdxl-bedrock - Stable Diffusion XL image generation on Amazon Bedrock.
//!
//! Builds SDXL request bodies (weighted positive and negative prompts plus
//! inference parameters), invokes the model, and decodes the returned image.
//!
//! # Quick Start
//!
//! ```no_run
//! use sdxl_bedrock::{GenerationRequest, SdxlProvider};
//!
//! #[tokio::main]
//! async fn main() -> sdxl_bedrock::Result<()> {
//!     let provider = SdxlProvider::builder().region("us-east-1").build()?;
//!     let request = GenerationRequest::new("A lighthouse at dusk")
//!         .with_negative_prompts(["low quality", "blurry"]);
//!     let image = provider.generate(&request).await?;
//!     image.save("lighthouse.png")?;
//!     Ok(())
//! }
//! ```
//!
//! # Image-to-image
//!
//! ```no_run
//! use sdxl_bedrock::{prepare_init_image, GenerationRequest, ImageSource, SdxlProvider};
//!
//! #[tokio::main]
//! async fn main() -> sdxl_bedrock::Result<()> {
//!     let client = reqwest::Client::new();
//!     let source = ImageSource::parse("dress.png")?;
//!     let init_image = prepare_init_image(&client, source, 512).await?;
//!
//!     let provider = SdxlProvider::builder().build()?;
//!     let request = GenerationRequest::new("add floral prints to dress")
//!         .with_init_image(init_image);
//!     provider.generate(&request).await?.save("dress-floral.png")?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! - `AWS_BEARER_TOKEN_BEDROCK`: Bedrock API key
//! - `AWS_REGION` / `AWS_DEFAULT_REGION`: region (default `us-east-1`)
//! - `BEDROCK_ENDPOINT`: endpoint override
//!
//! # Features
//!
//! - `cli`: Command-line interface (default)

mod error;
pub mod runtime;
pub mod sdxl;
pub mod source;

// Re-export error types at crate root
pub use error::{ErrorKind, Result, SdxlError};

pub use runtime::{BedrockRuntime, BedrockRuntimeBuilder, ModelInvoker};
pub use sdxl::{
    build_request_body, decode_response, GeneratedImage, GenerationMetadata, GenerationRequest,
    ImageFormat, Sampler, SdxlModel, SdxlProvider, SdxlProviderBuilder, StylePreset, TextPrompt,
};
pub use source::{
    encode_png_base64, fetch_image, normalize, prepare_init_image, ImageSource,
    DEFAULT_INIT_IMAGE_SIZE,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, SdxlError};
    pub use crate::sdxl::{GeneratedImage, GenerationRequest, SdxlProvider, StylePreset};
    pub use crate::source::{prepare_init_image, ImageSource};
}
