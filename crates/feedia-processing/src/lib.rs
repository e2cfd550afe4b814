//! Feedia Media Processing Library
//!
//! Extracts display dimensions and video thumbnails from uploaded media before
//! the storage layer persists them.

pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod traits;

#[cfg(feature = "image")]
pub mod compression;
#[cfg(feature = "image")]
pub mod image;

#[cfg(feature = "video")]
pub mod video;

// Re-export commonly used types
pub use error::PipelineError;
pub use metadata::{
    Dimensions, EncodedFrame, MediaMetadata, PipelineStage, RotationDegrees, ThumbnailImage,
};
pub use pipeline::MediaPipeline;
pub use traits::{ImageProbe, RotationProbe, ThumbnailExtractor, VideoDimensionProbe};

#[cfg(feature = "image")]
pub use compression::ThumbnailEncoder;
#[cfg(feature = "image")]
pub use crate::image::ImageProcessor;

#[cfg(feature = "video")]
pub use video::{
    FfmpegThumbnailExtractor, Ffprobe, FfprobeVideoProbe, ProbeCache, ProbeOutput, TempMedia,
};
