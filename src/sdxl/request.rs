//! Request assembly for the SDXL model schema.

use crate::error::Result;
use crate::sdxl::types::{GenerationRequest, Sampler, StylePreset, TextPrompt};
use serde::Serialize;

/// Stable Diffusion XL model variants hosted on Bedrock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SdxlModel {
    /// SDXL 1.0.
    #[default]
    V1,
    /// SDXL 0.8 (preview).
    V0,
}

impl SdxlModel {
    /// Returns the Bedrock model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "stability.stable-diffusion-xl-v1",
            Self::V0 => "stability.stable-diffusion-xl-v0",
        }
    }
}

/// Request body as the model expects it.
#[derive(Debug, Serialize)]
pub(crate) struct SdxlRequestBody<'a> {
    text_prompts: Vec<TextPrompt>,
    cfg_scale: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    init_image: Option<&'a str>,
    seed: u32,
    start_schedule: f32,
    steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    style_preset: Option<StylePreset>,
    image_strength: f32,
    denoising_strength: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sampler: Option<Sampler>,
}

impl<'a> SdxlRequestBody<'a> {
    pub(crate) fn from_generation_request(req: &'a GenerationRequest) -> Self {
        Self {
            text_prompts: req.text_prompts(),
            cfg_scale: req.cfg_scale,
            init_image: req.init_image.as_deref(),
            seed: req.seed,
            start_schedule: req.start_schedule,
            steps: req.steps,
            style_preset: req.style_preset,
            image_strength: req.image_strength,
            denoising_strength: req.denoising_strength,
            width: req.width,
            height: req.height,
            sampler: req.sampler,
        }
    }
}

/// Serializes a generation request into the JSON body sent to the model.
pub fn build_request_body(request: &GenerationRequest) -> Result<Vec<u8>> {
    let body = SdxlRequestBody::from_generation_request(request);
    Ok(serde_json::to_vec(&body)?)
}
