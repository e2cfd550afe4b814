//! Video processing module

pub mod ffprobe;
pub mod processor;
pub mod temp;
pub mod thumbnail;

pub use ffprobe::{Ffprobe, ProbeCache, ProbeOutput};
pub use processor::FfprobeVideoProbe;
pub use temp::TempMedia;
pub use thumbnail::FfmpegThumbnailExtractor;
