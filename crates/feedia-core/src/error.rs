//! Error types module
//!
//! Errors that escape the media pipeline are programming errors or
//! environment-fatal conditions. Problems with the media content itself never
//! surface here: they degrade to absent metadata fields instead.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// by the upload endpoint that calls into the pipeline.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "TEMP_STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Temporary storage unavailable: {0}")]
    TempStorage(#[source] io::Error),
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::Config(_) | AppError::TempStorage(_) => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIGURATION_ERROR",
            AppError::TempStorage(_) => "TEMP_STORAGE_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, AppError::TempStorage(_))
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Config(_) => "Service is misconfigured".to_string(),
            AppError::TempStorage(_) => "Temporary storage is unavailable".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::Config(_) => LogLevel::Error,
            AppError::TempStorage(_) => LogLevel::Warn,
        }
    }
}
