use base64::{Engine, engine::general_purpose::STANDARD};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use edit_cli::EditJob;
use image_edit::{ClientConfig, EditRequest, ImageEditClient};
use mask_canvas::{EditorMessage, EditorState, normalize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crop an image to its centered square and save it as PNG
    Normalize {
        /// Path to the input image
        #[arg(short, long)]
        input: PathBuf,
        /// Path of the PNG to write
        #[arg(short, long)]
        output: PathBuf,
        /// Also print the result as a data URL
        #[arg(long)]
        data_url: bool,
    },
    /// Replay the strokes of a job file and write the mask and a preview
    Mask {
        /// Path to the TOML or JSON job file
        #[arg(short, long)]
        job: PathBuf,
    },
    /// Mask the image and request an edit from the hosted API
    Edit {
        /// Path to the TOML or JSON job file
        #[arg(short, long)]
        job: PathBuf,
        /// API key (or set OPENAI_API_KEY environment variable)
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Print the JSON schema of the editor messages
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Normalize { input, output, data_url } => {
            normalize_file(input, output, *data_url)?;
        }
        Commands::Mask { job } => {
            mask_job(job)?;
        }
        Commands::Edit { job, api_key } => {
            edit_job(job, api_key.as_deref()).await?;
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&EditorMessage::schema())?);
        }
    }

    Ok(())
}

fn normalize_file(input: &Path, output: &Path, print_data_url: bool) -> Result<()> {
    let bytes = std::fs::read(input)?;
    let normalized = normalize(&bytes)?;
    std::fs::write(output, normalized.encode_png()?)?;
    info!(
        "✅ Wrote {}x{} square to {:?}",
        normalized.side(),
        normalized.side(),
        output
    );

    if print_data_url {
        println!("{}", normalized.to_data_url()?);
    }
    Ok(())
}

fn job_base_dir(job_path: &Path) -> PathBuf {
    job_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Run the editor for a job and write normalized.png, mask.png, masked.png and preview.png
fn run_job(job_path: &Path) -> Result<(EditJob, EditorState, PathBuf)> {
    let job = EditJob::from_file(job_path)?;
    info!("Job: {:?}", job);

    let base_dir = job_base_dir(job_path);
    let output_dir = base_dir.join(&job.output_dir);
    std::fs::create_dir_all(&output_dir)?;

    let editor = job.run_editor(&base_dir)?;
    let image = editor.image().ok_or_else(|| eyre!("Job produced no image"))?;
    let canvas = editor.canvas().ok_or_else(|| eyre!("Job produced no mask canvas"))?;
    let overlay = canvas.overlay();

    std::fs::write(output_dir.join("normalized.png"), image.encode_png()?)?;
    std::fs::write(output_dir.join("mask.png"), overlay.encode_png()?)?;
    let masked = mask_canvas::encode_png(&overlay.apply_to(image.pixels()))?;
    std::fs::write(output_dir.join("masked.png"), masked)?;
    let preview = mask_canvas::encode_png(&overlay.preview(image.pixels()))?;
    std::fs::write(output_dir.join("preview.png"), preview)?;

    info!(
        "🎨 {} strokes erased {} of {} pixels",
        job.strokes.len(),
        overlay.erased_pixel_count(),
        image.side() * image.side()
    );
    Ok((job, editor, output_dir))
}

fn mask_job(job_path: &Path) -> Result<()> {
    let (_, _, output_dir) = run_job(job_path)?;
    info!("📁 Mask written to {:?}", output_dir);
    Ok(())
}

async fn edit_job(job_path: &Path, api_key: Option<&str>) -> Result<()> {
    // API key from parameter or environment variable, the rest from the environment
    let config = ClientConfig::from_env_with_key(api_key)
        .map_err(|e| eyre!("{}. Use --api-key or set OPENAI_API_KEY environment variable", e))?;

    let (job, editor, output_dir) = run_job(job_path)?;
    let payload = editor.edit_payload(job.prompt()?)?;
    if payload.mask.is_none() {
        warn!("No strokes erased anything, the whole image may be regenerated");
    }

    let request = EditRequest::from_payload(&payload, job.edit_options())?;
    let client = ImageEditClient::new(config)?;
    let response = client.edit(&request).await?;

    for (i, edited) in response.data.iter().enumerate() {
        if let Some(b64) = &edited.b64_json {
            let path = output_dir.join(format!("edit_{}.png", i + 1));
            std::fs::write(&path, STANDARD.decode(b64)?)?;
            info!("🖼️  Saved edit {} to {:?}", i + 1, path);
        }
        if let Some(url) = &edited.url {
            info!("🔗 Edit {}: {}", i + 1, url);
        }
    }

    info!("✅ Received {} edit(s)", response.data.len());
    Ok(())
}
