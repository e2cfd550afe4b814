//! Feedia Core Library
//!
//! Domain types, configuration, error types and storage hand-off shapes shared
//! by the media pipeline and its callers.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{validate_binary_path, PipelineConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{MediaBlob, MediaCategory};
pub use storage_types::{
    object_key, split_file_url, thumbnail_filename, StorageHandoff, ThumbnailUpload,
    DEFAULT_UPLOAD_FOLDER, THUMBNAIL_CONTENT_TYPE,
};
