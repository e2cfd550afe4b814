//! Video processor - raw dimensions and container rotation via ffprobe

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::metadata::{Dimensions, RotationDegrees};
use crate::traits::{RotationProbe, VideoDimensionProbe};
use crate::video::ffprobe::{Ffprobe, ProbeOutput};

/// Production [`VideoDimensionProbe`] and [`RotationProbe`].
///
/// Containers cannot be introspected from memory, so a probe materializes the
/// bytes into a temp file that is removed before the call returns. Both
/// answers for one upload come from a single ffprobe run through the
/// [`Ffprobe`] cache.
pub struct FfprobeVideoProbe {
    ffprobe: Ffprobe,
    temp_dir: PathBuf,
}

impl FfprobeVideoProbe {
    pub fn new(ffprobe: Ffprobe, temp_dir: PathBuf) -> Self {
        Self { ffprobe, temp_dir }
    }

    /// Outer `Err` is environment-fatal, inner `Err` is a soft probe failure.
    async fn probe_bytes(
        &self,
        data: &[u8],
        extension: Option<&str>,
    ) -> Result<Result<Arc<ProbeOutput>>, PipelineError> {
        self.ffprobe.probe_data(&self.temp_dir, data, extension).await
    }
}

#[async_trait]
impl VideoDimensionProbe for FfprobeVideoProbe {
    async fn probe_video_raw(
        &self,
        data: &[u8],
        extension: Option<&str>,
    ) -> Result<Option<Dimensions>, PipelineError> {
        if data.is_empty() {
            return Ok(None);
        }

        let dimensions = match self.probe_bytes(data, extension).await? {
            Ok(probe) => probe
                .raw_dimensions()
                .and_then(|(width, height)| Dimensions::new(width, height)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to probe video dimensions");
                None
            }
        };

        if dimensions.is_none() {
            tracing::warn!(size_bytes = data.len(), "Video dimensions unknown");
        }

        Ok(dimensions)
    }
}

#[async_trait]
impl RotationProbe for FfprobeVideoProbe {
    async fn resolve_rotation(
        &self,
        data: &[u8],
        extension: Option<&str>,
    ) -> Result<RotationDegrees, PipelineError> {
        if data.is_empty() {
            return Ok(RotationDegrees::Deg0);
        }

        let rotation = match self.probe_bytes(data, extension).await? {
            Ok(probe) => probe
                .rotation()
                .map(RotationDegrees::from_raw_f64)
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resolve video rotation, assuming none");
                RotationDegrees::Deg0
            }
        };

        tracing::debug!(rotation = rotation.degrees(), "Video rotation resolved");
        Ok(rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::ffprobe::ProbeCache;

    fn missing_binary_probe(dir: &std::path::Path) -> FfprobeVideoProbe {
        let ffprobe = Ffprobe::new("/nonexistent/bin/ffprobe".to_string(), None).unwrap();
        FfprobeVideoProbe::new(ffprobe, dir.to_path_buf())
    }

    #[tokio::test]
    async fn test_missing_ffprobe_is_soft_failure() {
        let dir = tempfile::tempdir().unwrap();
        let probe = missing_binary_probe(dir.path());

        let rotation = probe
            .resolve_rotation(b"\x00\x00\x00\x18ftypmp42", Some(".mp4"))
            .await
            .unwrap();
        assert_eq!(rotation, RotationDegrees::Deg0);

        let dims = probe
            .probe_video_raw(b"\x00\x00\x00\x18ftypmp42", Some(".mp4"))
            .await
            .unwrap();
        assert_eq!(dims, None);

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_input_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let probe = missing_binary_probe(&dir.path().join("missing"));

        // No temp file is attempted, so even a missing temp dir is fine here.
        assert_eq!(
            probe.resolve_rotation(&[], None).await.unwrap(),
            RotationDegrees::Deg0
        );
        assert_eq!(probe.probe_video_raw(&[], None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dimensions_and_rotation_share_one_probe() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let ffprobe = Ffprobe::new("/nonexistent/bin/ffprobe".to_string(), None).unwrap();
        let data = b"\x00\x00\x00\x18ftypqt  portrait clip";
        let json = r#"{
            "streams": [{
                "codec_type": "video", "width": 1920, "height": 1080,
                "side_data_list": [{ "side_data_type": "Display Matrix", "rotation": -90 }]
            }],
            "format": { "duration": "4.0" }
        }"#;
        ffprobe.cache().insert(
            ProbeCache::key(data),
            Arc::new(ProbeOutput::parse(json.as_bytes()).unwrap()),
        );

        // With the result cached neither call touches the (missing) temp dir.
        let probe = FfprobeVideoProbe::new(ffprobe, missing);
        assert_eq!(
            probe.probe_video_raw(data, Some(".mov")).await.unwrap(),
            Dimensions::new(1920, 1080)
        );
        assert_eq!(
            probe.resolve_rotation(data, Some(".mov")).await.unwrap(),
            RotationDegrees::Deg270
        );
    }

    #[tokio::test]
    async fn test_unwritable_temp_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let probe = missing_binary_probe(&dir.path().join("missing"));
        let err = probe.resolve_rotation(b"data", Some(".mp4")).await;
        assert!(matches!(err, Err(PipelineError::TempDir { .. })));
    }
}
