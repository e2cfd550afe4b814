//! Feedia CLI: run the media metadata pipeline on local files.
//!
//! Reads the same environment as the service (FFPROBE_PATH, FFMPEG_PATH,
//! MEDIA_TEMP_DIR, ...) and prints what would be handed to storage.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use feedia_cli::{guess_content_type, init_tracing, ProbeReport, UrlParts};
use feedia_core::{MediaBlob, PipelineConfig};
use feedia_processing::{MediaMetadata, MediaPipeline};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "feedia", about = "Feedia media metadata CLI")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract dimensions, rotation and thumbnail from one file
    Probe {
        /// Path to the media file
        file: PathBuf,
        /// Declared content type (guessed from the extension when omitted)
        #[arg(long)]
        content_type: Option<String>,
        /// Write the generated thumbnail to this path
        #[arg(long, value_name = "PATH")]
        thumbnail_out: Option<PathBuf>,
    },
    /// Process several files concurrently
    Batch {
        /// Paths to the media files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Split a stored file URL into its storage base URL and object key
    SplitUrl {
        /// Public URL of a stored file
        url: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize report")?;
    println!("{}", out);
    Ok(())
}

async fn load_blob(path: &Path, content_type: Option<String>) -> anyhow::Result<MediaBlob> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = content_type.unwrap_or_else(|| guess_content_type(path).to_string());
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(MediaBlob::new(data, content_type, filename))
}

fn report(metadata: MediaMetadata, config: &PipelineConfig, filename: &str) -> ProbeReport {
    let category = metadata.category;
    let rotation = metadata.rotation.map(|r| r.degrees());
    ProbeReport::new(
        category,
        rotation,
        metadata.into_handoff(),
        &config.upload_folder,
        filename,
        Utc::now(),
    )
}

fn build_pipeline() -> anyhow::Result<(PipelineConfig, MediaPipeline)> {
    let config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
    let pipeline = MediaPipeline::from_config(&config).context("Failed to build pipeline")?;
    Ok((config, pipeline))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Probe {
            file,
            content_type,
            thumbnail_out,
        } => {
            let (config, pipeline) = build_pipeline()?;
            let blob = load_blob(&file, content_type).await?;
            let metadata = pipeline.process(&blob).await?;

            if let Some(out) = thumbnail_out {
                match &metadata.thumbnail {
                    Some(thumb) => {
                        tokio::fs::write(&out, &thumb.data)
                            .await
                            .with_context(|| format!("Failed to write {}", out.display()))?;
                        tracing::info!(path = %out.display(), "Thumbnail written");
                    }
                    None => tracing::warn!("No thumbnail generated, nothing written"),
                }
            }

            print_json(&report(metadata, &config, blob.original_filename()))?;
        }
        Commands::Batch { files } => {
            let (config, pipeline) = build_pipeline()?;
            let mut blobs = Vec::with_capacity(files.len());
            for file in &files {
                blobs.push(load_blob(file, None).await?);
            }
            let filenames: Vec<String> = blobs
                .iter()
                .map(|blob| blob.original_filename().to_string())
                .collect();

            let results = pipeline.process_batch(blobs).await?;
            let reports: Vec<ProbeReport> = results
                .into_iter()
                .zip(filenames.iter())
                .map(|(metadata, filename)| report(metadata, &config, filename))
                .collect();

            print_json(&reports)?;
        }
        Commands::SplitUrl { url } => {
            print_json(&UrlParts::parse(&url))?;
        }
    }

    Ok(())
}
