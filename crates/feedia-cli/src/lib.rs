use chrono::{DateTime, Utc};
use feedia_core::{object_key, split_file_url, MediaCategory, StorageHandoff};
use serde::Serialize;
use std::path::Path;

/// Initialize tracing for CLI binaries.
///
/// Logs go to stderr so stdout stays clean for the JSON report.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Best-effort content type from a file extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("heic") => "image/heic",
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("3gp") => "video/3gpp",
        _ => "application/octet-stream",
    }
}

/// What `feedia probe` prints: the hand-off plus where things would be stored.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub category: MediaCategory,
    pub rotation: Option<u16>,
    pub object_key: String,
    pub thumbnail_key: Option<String>,
    #[serde(flatten)]
    pub handoff: StorageHandoff,
}

impl ProbeReport {
    pub fn new(
        category: MediaCategory,
        rotation: Option<u16>,
        handoff: StorageHandoff,
        upload_folder: &str,
        original_filename: &str,
        at: DateTime<Utc>,
    ) -> Self {
        let thumbnail_key = handoff
            .thumbnail
            .as_ref()
            .map(|thumb| object_key(upload_folder, &thumb.filename, at));

        Self {
            category,
            rotation,
            object_key: object_key(upload_folder, original_filename, at),
            thumbnail_key,
            handoff,
        }
    }
}

/// A stored file URL split back into storage base URL and object key.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UrlParts {
    pub base_url: String,
    pub key: String,
}

impl UrlParts {
    pub fn parse(file_url: &str) -> Self {
        let (base_url, key) = split_file_url(file_url);
        Self { base_url, key }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use feedia_core::ThumbnailUpload;

    #[test]
    fn guess_content_type_by_extension() {
        assert_eq!(guess_content_type(Path::new("a/b/photo.JPG")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("clip.mov")), "video/quicktime");
        assert_eq!(guess_content_type(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(
            guess_content_type(Path::new("README")),
            "application/octet-stream"
        );
    }

    #[test]
    fn probe_report_keys() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let handoff = StorageHandoff {
            width: Some(1080),
            height: Some(1920),
            thumbnail: Some(ThumbnailUpload {
                filename: "clip_thumbnail.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                width: 1080,
                height: 1920,
                size_bytes: 3,
                data: Default::default(),
            }),
        };

        let report = ProbeReport::new(
            MediaCategory::Video,
            Some(90),
            handoff,
            "uploads",
            "clip.mp4",
            at,
        );
        assert_eq!(report.object_key, "uploads/20240309_140507_clip.mp4");
        assert_eq!(
            report.thumbnail_key.as_deref(),
            Some("uploads/20240309_140507_clip_thumbnail.jpg")
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["category"], "video");
        assert_eq!(json["width"], 1080);
        assert_eq!(json["thumbnail"]["filename"], "clip_thumbnail.jpg");
        assert!(json["thumbnail"].get("data").is_none());
    }

    #[test]
    fn probe_report_without_thumbnail() {
        let report = ProbeReport::new(
            MediaCategory::Image,
            None,
            StorageHandoff::default(),
            "",
            "photo.png",
            Utc::now(),
        );
        assert!(report.thumbnail_key.is_none());
        assert!(report.object_key.starts_with("uploads/"));
    }

    #[test]
    fn url_parts_round_trip_object_key() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let key = object_key("uploads", "clip_thumbnail.jpg", at);
        let url = format!("https://cdn.example.com/{}", key);

        let parts = UrlParts::parse(&url);
        assert_eq!(parts.base_url, "https://cdn.example.com");
        assert_eq!(parts.key, "uploads/20240309_140507_clip_thumbnail.jpg");

        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(json["key"], "uploads/20240309_140507_clip_thumbnail.jpg");
    }

    #[test]
    fn url_parts_keeps_unrecognized_input() {
        assert_eq!(
            UrlParts::parse("not-a-url"),
            UrlParts {
                base_url: "not-a-url".to_string(),
                key: String::new(),
            }
        );
    }
}
