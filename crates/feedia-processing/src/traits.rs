//! Capability seams of the media pipeline
//!
//! The coordinator only talks to these traits, so production code can shell
//! out to ffprobe/ffmpeg while tests plug in fixed answers. Every method is a
//! soft-failure boundary: implementations log and return a default for
//! anything wrong with the media or the external process. `Err` is reserved
//! for environment-fatal conditions such as an unwritable temp directory.

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::metadata::{Dimensions, EncodedFrame, RotationDegrees};

/// Pixel size of an encoded still image, orientation corrected.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn probe_image(&self, data: &[u8]) -> Option<Dimensions>;
}

/// Raw encoded width/height of a video's first video stream.
#[async_trait]
pub trait VideoDimensionProbe: Send + Sync {
    /// `extension` (".mp4") is used to name the materialized temp file.
    async fn probe_video_raw(
        &self,
        data: &[u8],
        extension: Option<&str>,
    ) -> Result<Option<Dimensions>, PipelineError>;
}

/// Container rotation of a video. Any failure resolves to no rotation.
#[async_trait]
pub trait RotationProbe: Send + Sync {
    async fn resolve_rotation(
        &self,
        data: &[u8],
        extension: Option<&str>,
    ) -> Result<RotationDegrees, PipelineError>;
}

/// Representative still frame of a video.
#[async_trait]
pub trait ThumbnailExtractor: Send + Sync {
    /// With `target` set the frame is resized to exactly that size, otherwise
    /// it keeps its decoded size. `None` on any failure.
    async fn extract_thumbnail(
        &self,
        data: &[u8],
        extension: Option<&str>,
        target: Option<Dimensions>,
    ) -> Result<Option<EncodedFrame>, PipelineError>;
}
