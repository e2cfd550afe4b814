//! Data models shared between the upload layer and the media pipeline.

mod media;

pub use media::{MediaBlob, MediaCategory};
