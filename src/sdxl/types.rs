//! Core types for SDXL image generation.

use crate::error::{Result, SdxlError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Weight given to the positive prompt.
pub const POSITIVE_WEIGHT: f32 = 1.0;
/// Weight given to each negative prompt.
pub const NEGATIVE_WEIGHT: f32 = -1.0;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Style presets recognized by Stable Diffusion XL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StylePreset {
    /// `3d-model`
    #[serde(rename = "3d-model")]
    ThreeDModel,
    /// `analog-film`
    AnalogFilm,
    /// `anime`
    Anime,
    /// `cinematic`
    Cinematic,
    /// `comic-book`
    ComicBook,
    /// `digital-art`
    DigitalArt,
    /// `enhance`
    Enhance,
    /// `fantasy-art`
    FantasyArt,
    /// `isometric`
    Isometric,
    /// `line-art`
    LineArt,
    /// `low-poly`
    LowPoly,
    /// `modeling-compound`
    ModelingCompound,
    /// `neon-punk`
    NeonPunk,
    /// `origami`
    Origami,
    /// `photographic`
    Photographic,
    /// `pixel-art`
    PixelArt,
    /// `tile-texture`
    TileTexture,
}

impl StylePreset {
    /// Every preset, in the order the service documents them.
    pub const ALL: [StylePreset; 17] = [
        Self::ThreeDModel,
        Self::AnalogFilm,
        Self::Anime,
        Self::Cinematic,
        Self::ComicBook,
        Self::DigitalArt,
        Self::Enhance,
        Self::FantasyArt,
        Self::Isometric,
        Self::LineArt,
        Self::LowPoly,
        Self::ModelingCompound,
        Self::NeonPunk,
        Self::Origami,
        Self::Photographic,
        Self::PixelArt,
        Self::TileTexture,
    ];

    /// Returns the wire name of the preset (e.g., "photographic").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThreeDModel => "3d-model",
            Self::AnalogFilm => "analog-film",
            Self::Anime => "anime",
            Self::Cinematic => "cinematic",
            Self::ComicBook => "comic-book",
            Self::DigitalArt => "digital-art",
            Self::Enhance => "enhance",
            Self::FantasyArt => "fantasy-art",
            Self::Isometric => "isometric",
            Self::LineArt => "line-art",
            Self::LowPoly => "low-poly",
            Self::ModelingCompound => "modeling-compound",
            Self::NeonPunk => "neon-punk",
            Self::Origami => "origami",
            Self::Photographic => "photographic",
            Self::PixelArt => "pixel-art",
            Self::TileTexture => "tile-texture",
        }
    }
}

impl std::fmt::Display for StylePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StylePreset {
    type Err = SdxlError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| SdxlError::InvalidRequest(format!("unknown style preset: {s}")))
    }
}

/// Diffusion samplers accepted by SDXL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Sampler {
    Ddim,
    Ddpm,
    #[serde(rename = "K_DPMPP_2M")]
    KDpmpp2m,
    #[serde(rename = "K_DPMPP_2S_ANCESTRAL")]
    KDpmpp2sAncestral,
    #[serde(rename = "K_DPM_2")]
    KDpm2,
    #[serde(rename = "K_DPM_2_ANCESTRAL")]
    KDpm2Ancestral,
    KEuler,
    KEulerAncestral,
    KHeun,
    KLms,
}

impl Sampler {
    /// Every sampler.
    pub const ALL: [Sampler; 10] = [
        Self::Ddim,
        Self::Ddpm,
        Self::KDpmpp2m,
        Self::KDpmpp2sAncestral,
        Self::KDpm2,
        Self::KDpm2Ancestral,
        Self::KEuler,
        Self::KEulerAncestral,
        Self::KHeun,
        Self::KLms,
    ];

    /// Returns the wire name (e.g., "K_DPMPP_2M").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ddim => "DDIM",
            Self::Ddpm => "DDPM",
            Self::KDpmpp2m => "K_DPMPP_2M",
            Self::KDpmpp2sAncestral => "K_DPMPP_2S_ANCESTRAL",
            Self::KDpm2 => "K_DPM_2",
            Self::KDpm2Ancestral => "K_DPM_2_ANCESTRAL",
            Self::KEuler => "K_EULER",
            Self::KEulerAncestral => "K_EULER_ANCESTRAL",
            Self::KHeun => "K_HEUN",
            Self::KLms => "K_LMS",
        }
    }
}

impl FromStr for Sampler {
    type Err = SdxlError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| SdxlError::InvalidRequest(format!("unknown sampler: {s}")))
    }
}

/// A weighted prompt term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPrompt {
    /// Prompt text.
    pub text: String,
    /// Positive values steer toward the text, negative values away from it.
    pub weight: f32,
}

impl TextPrompt {
    /// Creates a prompt term.
    pub fn new(text: impl Into<String>, weight: f32) -> Self {
        Self {
            text: text.into(),
            weight,
        }
    }
}

/// A request to generate an image.
///
/// Defaults are demonstration values for SDXL 1.0, not service defaults.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The text prompt describing the desired image.
    pub prompt: String,
    /// Things the image should avoid, in priority order.
    pub negative_prompts: Vec<String>,
    /// Base64-encoded PNG to start from (image-to-image).
    pub init_image: Option<String>,
    /// How strictly the diffusion follows the prompt.
    pub cfg_scale: u32,
    /// Seed for deterministic generation.
    pub seed: u32,
    /// Where in the noise schedule generation starts.
    pub start_schedule: f32,
    /// Number of diffusion steps.
    pub steps: u32,
    /// Style preset.
    pub style_preset: Option<StylePreset>,
    /// How much the init image influences the result.
    pub image_strength: f32,
    /// How much noise is applied to the init image.
    pub denoising_strength: f32,
    /// Output width in pixels (text-to-image only).
    pub width: Option<u32>,
    /// Output height in pixels (text-to-image only).
    pub height: Option<u32>,
    /// Diffusion sampler.
    pub sampler: Option<Sampler>,
}

impl GenerationRequest {
    /// Creates a new request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompts: Vec::new(),
            init_image: None,
            cfg_scale: 10,
            seed: 0,
            start_schedule: 0.5,
            steps: 30,
            style_preset: Some(StylePreset::Photographic),
            image_strength: 0.5,
            denoising_strength: 0.5,
            width: None,
            height: None,
            sampler: None,
        }
    }

    /// Adds negative prompts, keeping their order.
    pub fn with_negative_prompts<I, S>(mut self, prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.negative_prompts
            .extend(prompts.into_iter().map(Into::into));
        self
    }

    /// Sets the base64-encoded init image.
    pub fn with_init_image(mut self, base64_png: impl Into<String>) -> Self {
        self.init_image = Some(base64_png.into());
        self
    }

    /// Sets the config scale.
    pub fn with_cfg_scale(mut self, cfg_scale: u32) -> Self {
        self.cfg_scale = cfg_scale;
        self
    }

    /// Sets the seed for deterministic generation.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the start schedule.
    pub fn with_start_schedule(mut self, start_schedule: f32) -> Self {
        self.start_schedule = start_schedule;
        self
    }

    /// Sets the number of diffusion steps.
    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    /// Sets or clears the style preset.
    pub fn with_style_preset(mut self, preset: Option<StylePreset>) -> Self {
        self.style_preset = preset;
        self
    }

    /// Sets the init image strength.
    pub fn with_image_strength(mut self, strength: f32) -> Self {
        self.image_strength = strength;
        self
    }

    /// Sets the denoising strength.
    pub fn with_denoising_strength(mut self, strength: f32) -> Self {
        self.denoising_strength = strength;
        self
    }

    /// Sets the output dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets the sampler.
    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Returns true if this is an image-to-image request.
    pub fn is_image_to_image(&self) -> bool {
        self.init_image.is_some()
    }

    /// Returns the weighted prompt terms: the prompt first, then each
    /// negative prompt in input order.
    pub fn text_prompts(&self) -> Vec<TextPrompt> {
        std::iter::once(TextPrompt::new(&self.prompt, POSITIVE_WEIGHT))
            .chain(
                self.negative_prompts
                    .iter()
                    .map(|p| TextPrompt::new(p, NEGATIVE_WEIGHT)),
            )
            .collect()
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Seed reported by the service.
    pub seed: Option<u64>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Whether the service replaced the output because of content filters.
    pub safety_filtered: bool,
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a generated image from encoded bytes, decoding them once to
    /// confirm they are an image and to read the dimensions.
    pub fn from_bytes(data: Vec<u8>, metadata: GenerationMetadata) -> Result<Self> {
        let decoded = image::load_from_memory(&data)?;
        let format = ImageFormat::from_magic_bytes(&data).unwrap_or_default();
        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            data,
            format,
            metadata,
        })
    }

    /// Returns `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Decodes the image data.
    pub fn to_image(&self) -> Result<image::DynamicImage> {
        Ok(image::load_from_memory(&self.data)?)
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}
