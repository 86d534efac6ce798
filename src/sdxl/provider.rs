//! SDXL provider: request assembly, invocation, and decoding in one call.

use crate::error::Result;
use crate::runtime::{BedrockRuntimeBuilder, ModelInvoker};
use crate::sdxl::request::{build_request_body, SdxlModel};
use crate::sdxl::response::decode_response;
use crate::sdxl::types::{GeneratedImage, GenerationRequest};
use std::sync::Arc;
use std::time::Instant;

/// Builder for SdxlProvider.
#[derive(Default)]
pub struct SdxlProviderBuilder {
    model_id: Option<String>,
    model: SdxlModel,
    runtime: BedrockRuntimeBuilder,
    invoker: Option<Arc<dyn ModelInvoker>>,
}

impl SdxlProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the SDXL model variant.
    pub fn model(mut self, model: SdxlModel) -> Self {
        self.model = model;
        self
    }

    /// Uses an explicit model identifier (inference profile, ARN, or a
    /// model not covered by [`SdxlModel`]). Takes precedence over `model`.
    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Sets the Bedrock API key. Falls back to `AWS_BEARER_TOKEN_BEDROCK`.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.runtime = self.runtime.token(token);
        self
    }

    /// Sets the region. Falls back to `AWS_REGION`, then `AWS_DEFAULT_REGION`.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.runtime = self.runtime.region(region);
        self
    }

    /// Overrides the runtime endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.runtime = self.runtime.endpoint(endpoint);
        self
    }

    /// Sends requests through `invoker` instead of a
    /// [`BedrockRuntime`](crate::runtime::BedrockRuntime).
    /// Credentials, region, and endpoint are ignored when set.
    pub fn invoker(mut self, invoker: impl ModelInvoker + 'static) -> Self {
        self.invoker = Some(Arc::new(invoker));
        self
    }

    /// Builds the provider, resolving credentials unless an invoker was given.
    pub fn build(self) -> Result<SdxlProvider> {
        let invoker = match self.invoker {
            Some(invoker) => invoker,
            None => Arc::new(self.runtime.build()?) as Arc<dyn ModelInvoker>,
        };

        Ok(SdxlProvider {
            invoker,
            model_id: self
                .model_id
                .unwrap_or_else(|| self.model.as_str().to_string()),
        })
    }
}

/// Stable Diffusion XL image generation provider.
pub struct SdxlProvider {
    invoker: Arc<dyn ModelInvoker>,
    model_id: String,
}

impl SdxlProvider {
    /// Creates a new `SdxlProviderBuilder`.
    pub fn builder() -> SdxlProviderBuilder {
        SdxlProviderBuilder::new()
    }

    /// Returns the model identifier requests are sent to.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Generates an image from the given request.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let body = build_request_body(request)?;
        tracing::debug!(
            model = %self.model_id,
            prompts = request.negative_prompts.len() + 1,
            image_to_image = request.is_image_to_image(),
            "submitting generation request"
        );

        let response = self.invoker.invoke_model(&self.model_id, body).await?;

        let mut image = decode_response(&response, &self.model_id)?;
        let duration_ms = start.elapsed().as_millis() as u64;
        image.metadata.duration_ms = Some(duration_ms);

        tracing::info!(
            model = %self.model_id,
            width = image.width,
            height = image.height,
            duration_ms,
            "generation complete"
        );

        Ok(image)
    }
}
