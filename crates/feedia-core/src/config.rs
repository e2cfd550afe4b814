//! Configuration module
//!
//! Settings for the media metadata pipeline, read from the environment
//! (optionally seeded from a `.env` file).

use std::env;
use std::path::PathBuf;

use crate::error::AppError;
use crate::storage_types::DEFAULT_UPLOAD_FOLDER;

const FFPROBE_PATH: &str = "ffprobe";
const FFMPEG_PATH: &str = "ffmpeg";
const THUMBNAIL_JPEG_QUALITY: u8 = 85;
const PROBE_TIMEOUT_SECS: u64 = 30;
const MAX_CONCURRENT_MEDIA_ITEMS: usize = 4;

/// Media pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    /// Directory for materialized media and intermediate thumbnails.
    pub temp_dir: PathBuf,
    pub thumbnail_jpeg_quality: u8,
    /// Upper bound for one ffprobe/ffmpeg invocation. `None` disables the limit.
    pub probe_timeout_secs: Option<u64>,
    pub max_concurrent_items: usize,
    pub upload_folder: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: FFPROBE_PATH.to_string(),
            ffmpeg_path: FFMPEG_PATH.to_string(),
            temp_dir: env::temp_dir(),
            thumbnail_jpeg_quality: THUMBNAIL_JPEG_QUALITY,
            probe_timeout_secs: Some(PROBE_TIMEOUT_SECS),
            max_concurrent_items: MAX_CONCURRENT_MEDIA_ITEMS,
            upload_folder: DEFAULT_UPLOAD_FOLDER.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let ffprobe_path = env::var("FFPROBE_PATH").unwrap_or_else(|_| FFPROBE_PATH.to_string());
        validate_binary_path(&ffprobe_path)?;

        let ffmpeg_path = env::var("FFMPEG_PATH").unwrap_or_else(|_| FFMPEG_PATH.to_string());
        validate_binary_path(&ffmpeg_path)?;

        let temp_dir = env::var("MEDIA_TEMP_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let thumbnail_jpeg_quality = env::var("THUMBNAIL_JPEG_QUALITY")
            .ok()
            .and_then(|s| s.parse::<u8>().ok())
            .filter(|q| (1..=100).contains(q))
            .unwrap_or(THUMBNAIL_JPEG_QUALITY);

        // 0 disables the timeout
        let probe_timeout_secs = env::var("PROBE_TIMEOUT_SECS")
            .unwrap_or_else(|_| PROBE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map(|secs| (secs > 0).then_some(secs))
            .unwrap_or(Some(PROBE_TIMEOUT_SECS));

        let max_concurrent_items = env::var("MAX_CONCURRENT_MEDIA_ITEMS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(MAX_CONCURRENT_MEDIA_ITEMS);

        let upload_folder =
            env::var("UPLOAD_FOLDER").unwrap_or_else(|_| DEFAULT_UPLOAD_FOLDER.to_string());

        let config = Self {
            ffprobe_path,
            ffmpeg_path,
            temp_dir,
            thumbnail_jpeg_quality,
            probe_timeout_secs,
            max_concurrent_items,
            upload_folder,
        };

        tracing::debug!(
            ffprobe_path = %config.ffprobe_path,
            ffmpeg_path = %config.ffmpeg_path,
            temp_dir = %config.temp_dir.display(),
            thumbnail_jpeg_quality = config.thumbnail_jpeg_quality,
            probe_timeout_secs = ?config.probe_timeout_secs,
            max_concurrent_items = config.max_concurrent_items,
            "Loaded pipeline configuration"
        );

        Ok(config)
    }
}

/// Reject executable paths that contain shell metacharacters or traversal.
pub fn validate_binary_path(path: &str) -> Result<(), AppError> {
    const DANGEROUS_CHARS: [char; 11] = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];

    if path.trim().is_empty() {
        return Err(AppError::Config("executable path is empty".to_string()));
    }

    if path.chars().any(|c| DANGEROUS_CHARS.contains(&c)) {
        return Err(AppError::Config(format!(
            "executable path contains dangerous characters: {}",
            path
        )));
    }

    if path.contains("..") {
        return Err(AppError::Config(format!(
            "executable path contains directory traversal: {}",
            path
        )));
    }

    if !path
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '\\' | ':'))
    {
        return Err(AppError::Config(format!(
            "executable path contains unsafe characters: {}",
            path
        )));
    }

    Ok(())
}
