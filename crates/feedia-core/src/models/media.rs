use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Broad media category, dispatched on the declared MIME type only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Video,
    Other,
}

impl MediaCategory {
    /// Classify a declared content type such as `image/jpeg` or
    /// `video/mp4; codecs=avc1`.
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.split_once('/') {
            Some(("image", subtype)) if !subtype.is_empty() => MediaCategory::Image,
            Some(("video", subtype)) if !subtype.is_empty() => MediaCategory::Video,
            _ => MediaCategory::Other,
        }
    }
}

/// Raw uploaded media as handed over by the multipart layer.
///
/// Immutable once received; the pipeline only ever borrows it.
#[derive(Debug, Clone)]
pub struct MediaBlob {
    data: Bytes,
    content_type: String,
    original_filename: String,
}

impl MediaBlob {
    pub fn new(
        data: impl Into<Bytes>,
        content_type: impl Into<String>,
        original_filename: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
            original_filename: original_filename.into(),
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn category(&self) -> MediaCategory {
        MediaCategory::from_content_type(&self.content_type)
    }

    /// Lowercased extension with its leading dot (".mp4"), if the filename has one.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.original_filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
    }

    /// Filename without directory or extension, "file" when nothing usable is left.
    pub fn stem(&self) -> String {
        Path::new(&self.original_filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::trim)
            .filter(|stem| !stem.is_empty())
            .unwrap_or("file")
            .to_string()
    }
}
