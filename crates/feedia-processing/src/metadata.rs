//! Metadata types produced by the media pipeline

use bytes::Bytes;
use feedia_core::{MediaCategory, StorageHandoff, ThumbnailUpload, THUMBNAIL_CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel size of a media item. Both sides are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// `None` when either side is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    pub fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Display size after applying `rotation` to a frame of this raw size.
    pub fn rotated(self, rotation: RotationDegrees) -> Self {
        if rotation.is_quarter_turn() {
            self.swapped()
        } else {
            self
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Container-level rotation of a video, clockwise quadrants only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RotationDegrees {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl RotationDegrees {
    /// Normalize a raw (possibly negative or exotic) angle into a quadrant.
    ///
    /// `((raw % 360) + 360) % 360`, then snapped to the nearest multiple of 90
    /// with ties rounding up.
    pub fn from_raw(raw: i64) -> Self {
        let normalized = ((raw % 360) + 360) % 360;
        match ((normalized + 45) / 90) % 4 {
            1 => RotationDegrees::Deg90,
            2 => RotationDegrees::Deg180,
            3 => RotationDegrees::Deg270,
            _ => RotationDegrees::Deg0,
        }
    }

    /// Same as [`from_raw`](Self::from_raw) for fractional values such as a
    /// display matrix rotation of `-90.00`.
    pub fn from_raw_f64(raw: f64) -> Self {
        if raw.is_finite() {
            Self::from_raw(raw.round() as i64)
        } else {
            RotationDegrees::Deg0
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            RotationDegrees::Deg0 => 0,
            RotationDegrees::Deg90 => 90,
            RotationDegrees::Deg180 => 180,
            RotationDegrees::Deg270 => 270,
        }
    }

    /// 90 or 270: width and height trade places on display.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, RotationDegrees::Deg90 | RotationDegrees::Deg270)
    }
}

impl Serialize for RotationDegrees {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.degrees())
    }
}

impl<'de> Deserialize<'de> for RotationDegrees {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(Self::from_raw(raw))
    }
}

/// JPEG-encoded still frame as returned by a thumbnail extractor.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub data: Bytes,
    pub dimensions: Dimensions,
}

/// Thumbnail for a video upload. Ownership passes to the caller for upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailImage {
    pub filename: String,
    pub content_type: String,
    pub dimensions: Dimensions,
    #[serde(skip)]
    pub data: Bytes,
}

impl ThumbnailImage {
    pub fn new(frame: EncodedFrame, filename: String) -> Self {
        Self {
            filename,
            content_type: THUMBNAIL_CONTENT_TYPE.to_string(),
            dimensions: frame.dimensions,
            data: frame.data,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Result of running one media item through the pipeline.
///
/// Every field except `category` may be absent: unreadable media degrades to
/// missing values, never to an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub category: MediaCategory,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<RotationDegrees>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<ThumbnailImage>,
}

impl MediaMetadata {
    pub fn unknown(category: MediaCategory) -> Self {
        Self {
            category,
            width: None,
            height: None,
            rotation: None,
            thumbnail: None,
        }
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        Dimensions::new(self.width?, self.height?)
    }

    pub fn set_dimensions(&mut self, dimensions: Option<Dimensions>) {
        self.width = dimensions.map(|d| d.width);
        self.height = dimensions.map(|d| d.height);
    }

    /// Convert into the shape the storage collaborator persists.
    pub fn into_handoff(self) -> StorageHandoff {
        StorageHandoff {
            width: self.width,
            height: self.height,
            thumbnail: self.thumbnail.map(|thumb| ThumbnailUpload {
                size_bytes: thumb.size_bytes(),
                filename: thumb.filename,
                content_type: thumb.content_type,
                width: thumb.dimensions.width,
                height: thumb.dimensions.height,
                data: thumb.data,
            }),
        }
    }
}

/// States of the per-item coordinator, in the order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Init,
    ProbeImage,
    ProbeRawDimensions,
    ResolveRotation,
    ComputeEffectiveDimensions,
    ExtractThumbnail,
    Done,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Init => "init",
            PipelineStage::ProbeImage => "probe_image",
            PipelineStage::ProbeRawDimensions => "probe_raw_dimensions",
            PipelineStage::ResolveRotation => "resolve_rotation",
            PipelineStage::ComputeEffectiveDimensions => "compute_effective_dimensions",
            PipelineStage::ExtractThumbnail => "extract_thumbnail",
            PipelineStage::Done => "done",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_normalization() {
        assert_eq!(RotationDegrees::from_raw(0), RotationDegrees::Deg0);
        assert_eq!(RotationDegrees::from_raw(90), RotationDegrees::Deg90);
        assert_eq!(RotationDegrees::from_raw(-90), RotationDegrees::Deg270);
        assert_eq!(RotationDegrees::from_raw(-270), RotationDegrees::Deg90);
        assert_eq!(RotationDegrees::from_raw(180), RotationDegrees::Deg180);
        assert_eq!(RotationDegrees::from_raw(-180), RotationDegrees::Deg180);
        assert_eq!(RotationDegrees::from_raw(360), RotationDegrees::Deg0);
        assert_eq!(RotationDegrees::from_raw(450), RotationDegrees::Deg90);
        assert_eq!(RotationDegrees::from_raw(-720), RotationDegrees::Deg0);
    }

    #[test]
    fn test_rotation_snaps_exotic_values() {
        assert_eq!(RotationDegrees::from_raw(44), RotationDegrees::Deg0);
        assert_eq!(RotationDegrees::from_raw(45), RotationDegrees::Deg90);
        assert_eq!(RotationDegrees::from_raw(100), RotationDegrees::Deg90);
        assert_eq!(RotationDegrees::from_raw(200), RotationDegrees::Deg180);
        assert_eq!(RotationDegrees::from_raw(-100), RotationDegrees::Deg270);
        assert_eq!(RotationDegrees::from_raw(330), RotationDegrees::Deg0);
        assert_eq!(RotationDegrees::from_raw_f64(-89.9), RotationDegrees::Deg270);
        assert_eq!(RotationDegrees::from_raw_f64(f64::NAN), RotationDegrees::Deg0);
    }

    #[test]
    fn test_dimensions_rotation() {
        let raw = Dimensions::new(1920, 1080).unwrap();
        assert_eq!(raw.rotated(RotationDegrees::Deg90), Dimensions::new(1080, 1920).unwrap());
        assert_eq!(raw.rotated(RotationDegrees::Deg270), Dimensions::new(1080, 1920).unwrap());
        assert_eq!(raw.rotated(RotationDegrees::Deg180), raw);
        assert_eq!(raw.rotated(RotationDegrees::Deg0), raw);
        assert_eq!(raw.to_string(), "1920x1080");
    }

    #[test]
    fn test_dimensions_reject_zero() {
        assert!(Dimensions::new(0, 10).is_none());
        assert!(Dimensions::new(10, 0).is_none());
    }

    #[test]
    fn test_rotation_serializes_as_degrees() {
        let json = serde_json::to_string(&RotationDegrees::Deg270).unwrap();
        assert_eq!(json, "270");
        let back: RotationDegrees = serde_json::from_str("-90").unwrap();
        assert_eq!(back, RotationDegrees::Deg270);
    }

    #[test]
    fn test_metadata_into_handoff() {
        let mut meta = MediaMetadata::unknown(MediaCategory::Video);
        meta.set_dimensions(Dimensions::new(1080, 1920));
        meta.thumbnail = Some(ThumbnailImage::new(
            EncodedFrame {
                data: Bytes::from_static(&[0xFF, 0xD8, 0xFF]),
                dimensions: Dimensions::new(1080, 1920).unwrap(),
            },
            "clip_thumbnail.jpg".to_string(),
        ));

        let handoff = meta.into_handoff();
        assert_eq!(handoff.width, Some(1080));
        assert_eq!(handoff.height, Some(1920));
        let thumb = handoff.thumbnail.unwrap();
        assert_eq!(thumb.content_type, "image/jpeg");
        assert_eq!(thumb.size_bytes, 3);
        assert_eq!(thumb.filename, "clip_thumbnail.jpg");
    }

    #[test]
    fn test_unknown_metadata_serialization() {
        let meta = MediaMetadata::unknown(MediaCategory::Other);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["category"], "other");
        assert!(json["width"].is_null());
        assert!(json.get("thumbnail").is_none());
    }
}
