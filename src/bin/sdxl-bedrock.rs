//! CLI for sdxl-bedrock - Stable Diffusion XL on Amazon Bedrock.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sdxl_bedrock::{
    prepare_init_image, ErrorKind, GenerationRequest, ImageSource, Sampler, SdxlError, SdxlModel,
    SdxlProvider, StylePreset, DEFAULT_INIT_IMAGE_SIZE,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sdxl-bedrock")]
#[command(about = "Generate images with Stable Diffusion XL on Amazon Bedrock")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a text prompt, optionally starting from an image
    Generate(GenerateArgs),

    /// List available style presets
    Styles,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Negative prompt (repeatable, order is preserved)
    #[arg(short, long = "negative", value_name = "TEXT")]
    negative: Vec<String>,

    /// Init image for image-to-image (path or http(s) URL)
    #[arg(short, long, value_name = "PATH|URL")]
    init_image: Option<String>,

    /// Side length the init image is resized to
    #[arg(long, default_value_t = DEFAULT_INIT_IMAGE_SIZE)]
    init_size: u32,

    /// How strictly the image follows the prompt
    #[arg(long, default_value_t = 10)]
    cfg_scale: u32,

    /// Seed for deterministic generation
    #[arg(long, default_value_t = 0)]
    seed: u32,

    /// Number of diffusion steps
    #[arg(long, default_value_t = 30)]
    steps: u32,

    /// Where in the noise schedule generation starts
    #[arg(long, default_value_t = 0.5)]
    start_schedule: f32,

    /// Style preset (see `styles`)
    #[arg(long, default_value = "photographic")]
    style_preset: StylePreset,

    /// Send no style preset
    #[arg(long, conflicts_with = "style_preset")]
    no_style: bool,

    /// Influence of the init image
    #[arg(long, default_value_t = 0.5)]
    image_strength: f32,

    /// Noise applied to the init image
    #[arg(long, default_value_t = 0.5)]
    denoising_strength: f32,

    /// Output width in pixels (text-to-image only)
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Output height in pixels (text-to-image only)
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Diffusion sampler (e.g., K_DPMPP_2M)
    #[arg(long)]
    sampler: Option<Sampler>,

    /// Model variant
    #[arg(short, long, value_enum, default_value = "v1")]
    model: ModelArg,

    /// Explicit model identifier (overrides --model)
    #[arg(long, env = "SDXL_MODEL_ID")]
    model_id: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Runtime endpoint override
    #[arg(long, env = "BEDROCK_ENDPOINT")]
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    V1,
    V0,
}

impl From<ModelArg> for SdxlModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::V1 => SdxlModel::V1,
            ModelArg::V0 => SdxlModel::V0,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sdxl_bedrock={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = match cli.command {
        Commands::Generate(args) => generate(args, cli.json).await,
        Commands::Styles => list_styles(cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(exit_status(&err))
        }
    }
}

/// Maps the failing stage to an exit status: 2 input, 3 remote, 4 decode.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SdxlError>().map(SdxlError::kind) {
        Some(ErrorKind::Input) => 2,
        Some(ErrorKind::Remote) => 3,
        Some(ErrorKind::Decode) => 4,
        None => 1,
    }
}

fn build_request(args: &GenerateArgs) -> GenerationRequest {
    let style_preset = (!args.no_style).then_some(args.style_preset);

    let mut request = GenerationRequest::new(&args.prompt)
        .with_negative_prompts(args.negative.iter().cloned())
        .with_cfg_scale(args.cfg_scale)
        .with_seed(args.seed)
        .with_steps(args.steps)
        .with_start_schedule(args.start_schedule)
        .with_style_preset(style_preset)
        .with_image_strength(args.image_strength)
        .with_denoising_strength(args.denoising_strength);

    if let (Some(w), Some(h)) = (args.width, args.height) {
        request = request.with_size(w, h);
    }
    if let Some(sampler) = args.sampler {
        request = request.with_sampler(sampler);
    }
    request
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let mut request = build_request(&args);

    if let Some(ref init) = args.init_image {
        let source = ImageSource::parse(init)?;
        let client = reqwest::Client::new();
        let init_image = prepare_init_image(&client, source, args.init_size)
            .await
            .with_context(|| format!("failed to prepare init image {init}"))?;
        request = request.with_init_image(init_image);
    }

    let mut builder = SdxlProvider::builder().model(args.model.into());
    if let Some(id) = args.model_id {
        builder = builder.model_id(id);
    }
    if let Some(region) = args.region {
        builder = builder.region(region);
    }
    if let Some(endpoint) = args.endpoint {
        builder = builder.endpoint(endpoint);
    }
    let provider = builder.build()?;

    let image = provider.generate(&request).await?;
    image
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": args.output.display().to_string(),
            "size_bytes": image.size(),
            "format": image.format.extension(),
            "mime_type": image.format.mime_type(),
            "width": image.width,
            "height": image.height,
            "model": image.metadata.model,
            "seed": image.metadata.seed,
            "duration_ms": image.metadata.duration_ms,
            "safety_filtered": image.metadata.safety_filtered,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated image: {} ({}x{}, {} bytes) via {}",
            args.output.display(),
            image.width,
            image.height,
            image.size(),
            provider.model_id()
        );
        if let Some(duration) = image.metadata.duration_ms {
            println!("Duration: {}ms", duration);
        }
        if image.metadata.safety_filtered {
            println!("Warning: the output was replaced by the content filter");
        }
    }

    Ok(())
}

fn list_styles(json_output: bool) -> anyhow::Result<()> {
    let names: Vec<&str> = StylePreset::ALL.iter().map(StylePreset::as_str).collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        println!("Style presets:\n");
        for name in names {
            println!("  {}", name);
        }
    }

    Ok(())
}
