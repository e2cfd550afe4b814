//! Errors that escape the pipeline's public entry points.
//!
//! Only programming errors and environment-fatal conditions live here. Corrupt
//! or unsupported media is never an error: it yields absent metadata.

use feedia_core::{validate_binary_path, AppError};
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("Temporary directory {path} is not writable")]
    TempDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Reject an ffprobe/ffmpeg path before anything is spawned with it.
    #[cfg_attr(not(feature = "video"), allow(dead_code))]
    pub(crate) fn check_executable(path: &str) -> Result<(), PipelineError> {
        validate_binary_path(path).map_err(|err| match err {
            AppError::Config(msg) => PipelineError::InvalidConfig(msg),
            AppError::TempStorage(source) => PipelineError::TempDir {
                path: PathBuf::from(path),
                source,
            },
        })
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidConfig(msg) => AppError::Config(msg),
            PipelineError::TempDir { source, .. } => AppError::TempStorage(source),
        }
    }
}
