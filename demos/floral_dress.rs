//! Image-to-image example - adds floral prints to a dress photo.
//!
//! Run with: `cargo run --example floral_dress -- <image path or URL>`
//!
//! Requires `AWS_BEARER_TOKEN_BEDROCK`; `AWS_REGION` selects the region.

use sdxl_bedrock::{
    prepare_init_image, GenerationRequest, ImageSource, SdxlProvider, StylePreset,
    DEFAULT_INIT_IMAGE_SIZE,
};

#[tokio::main]
async fn main() -> sdxl_bedrock::Result<()> {
    let input = std::env::args()
        .nth(1)
        .expect("Usage: floral_dress <image path or URL>");

    let client = reqwest::Client::new();
    let init_image =
        prepare_init_image(&client, ImageSource::parse(&input)?, DEFAULT_INIT_IMAGE_SIZE).await?;

    let request = GenerationRequest::new("add floral prints to dress")
        .with_negative_prompts([
            "poorly rendered",
            "low quality",
            "disfigured",
            "disproportional",
        ])
        .with_init_image(init_image)
        .with_cfg_scale(10)
        .with_seed(0)
        .with_steps(30)
        .with_style_preset(Some(StylePreset::Photographic))
        .with_image_strength(0.5)
        .with_denoising_strength(0.5);

    let provider = SdxlProvider::builder().build()?;
    let image = provider.generate(&request).await?;

    image.save("floral_dress.png")?;
    println!(
        "Generated image: {}x{}, {} bytes, saved to floral_dress.png",
        image.width,
        image.height,
        image.size()
    );

    Ok(())
}
