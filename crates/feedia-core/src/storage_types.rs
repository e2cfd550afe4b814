//! Shapes handed to the object-storage / database collaborator.
//!
//! The pipeline never uploads anything itself; it produces a [`StorageHandoff`]
//! and the caller persists the thumbnail next to the original and records the
//! dimensions on the file row.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Default object-storage folder for uploads.
pub const DEFAULT_UPLOAD_FOLDER: &str = "uploads";

/// Content type of every generated thumbnail.
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

/// Thumbnail ready for upload alongside the original file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailUpload {
    pub filename: String,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    #[serde(skip)]
    pub data: Bytes,
}

/// `{width, height, thumbnail}` as consumed by the storage layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageHandoff {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub thumbnail: Option<ThumbnailUpload>,
}

/// `<stem>_thumbnail.jpg`
pub fn thumbnail_filename(stem: &str) -> String {
    format!("{}_thumbnail.jpg", stem)
}

/// Build an object key of the form `{folder}/{YYYYmmdd_HHMMSS}_{filename}`.
pub fn object_key(folder: &str, filename: &str, at: DateTime<Utc>) -> String {
    let folder = folder.trim_matches('/');
    let folder = if folder.is_empty() {
        DEFAULT_UPLOAD_FOLDER
    } else {
        folder
    };
    format!("{}/{}_{}", folder, at.format("%Y%m%d_%H%M%S"), filename)
}

fn file_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(https?://[^/]+)/(.+)$").expect("file url pattern is a valid regex")
    })
}

/// Split a public file URL into `(base_url, key)`.
///
/// Input that does not look like `http(s)://host/key` comes back as `(url, "")`.
pub fn split_file_url(file_url: &str) -> (String, String) {
    match file_url_pattern().captures(file_url) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (file_url.to_string(), String::new()),
    }
}
