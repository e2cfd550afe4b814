//! Image processing module
//!
//! Orientation-aware dimension probing for still images.

pub mod processor;

pub use processor::ImageProcessor;
