//! Video thumbnail extraction with ffmpeg

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::compression::ThumbnailEncoder;
use crate::error::PipelineError;
use crate::metadata::{Dimensions, EncodedFrame};
use crate::traits::ThumbnailExtractor;
use crate::video::ffprobe::{Ffprobe, ProbeCache, ProbeKey};
use crate::video::temp::TempMedia;

/// Production [`ThumbnailExtractor`]: grabs the frame at half the duration.
///
/// ffmpeg applies container rotation while decoding, so the grabbed frame is
/// already upright; the caller passes rotation-corrected target dimensions.
pub struct FfmpegThumbnailExtractor {
    ffmpeg_path: String,
    ffprobe: Ffprobe,
    temp_dir: PathBuf,
    jpeg_quality: u8,
    timeout: Option<Duration>,
}

impl FfmpegThumbnailExtractor {
    pub fn new(
        ffmpeg_path: String,
        ffprobe: Ffprobe,
        temp_dir: PathBuf,
        jpeg_quality: u8,
        timeout: Option<Duration>,
    ) -> Result<Self, PipelineError> {
        PipelineError::check_executable(&ffmpeg_path)?;
        Ok(Self {
            ffmpeg_path,
            ffprobe,
            temp_dir,
            jpeg_quality,
            timeout,
        })
    }

    /// Midpoint of the container duration, or the first frame when unknown.
    ///
    /// Reuses the probe made for dimensions and rotation when there was one.
    async fn sample_timestamp(&self, key: ProbeKey, source: &Path) -> f64 {
        match self.ffprobe.probe_keyed(key, source).await {
            Ok(probe) => probe.duration_secs().map(|d| d / 2.0).unwrap_or(0.0),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read video duration, using first frame");
                0.0
            }
        }
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "thumbnail"
    ))]
    async fn grab_frame(&self, source: &Path, output: &Path, timestamp: f64) -> Result<()> {
        let start = std::time::Instant::now();
        let seek = format!("{:.3}", timestamp);

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(["-v", "error", "-ss", seek.as_str(), "-i"])
            .arg(source)
            .args(["-frames:v", "1", "-q:v", "2", "-y"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let run = command.output();
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| anyhow!("ffmpeg timed out after {:?}", limit))?,
            None => run.await,
        }
        .context("Failed to execute ffmpeg")?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(anyhow!("FFmpeg thumbnail extraction failed: {}", stderr));
        }

        tracing::debug!(
            duration_ms = start.elapsed().as_millis(),
            timestamp = timestamp,
            "Frame extracted"
        );

        Ok(())
    }

    /// Decode the grabbed frame, resize it to `target` when given and encode
    /// it as JPEG.
    pub fn finish_frame(
        frame: &[u8],
        target: Option<Dimensions>,
        jpeg_quality: u8,
    ) -> Result<EncodedFrame> {
        if frame.is_empty() {
            return Err(anyhow!("ffmpeg produced an empty frame"));
        }

        let img = image::load_from_memory(frame).context("Failed to decode extracted frame")?;
        let img = match target {
            Some(target) => ThumbnailEncoder::resize_exact(&img, target),
            None => img,
        };

        let dimensions = Dimensions::new(img.width(), img.height())
            .ok_or_else(|| anyhow!("Extracted frame has no pixels"))?;
        let data = ThumbnailEncoder::encode_jpeg(&img, jpeg_quality)?;

        Ok(EncodedFrame { data, dimensions })
    }
}

#[async_trait]
impl ThumbnailExtractor for FfmpegThumbnailExtractor {
    async fn extract_thumbnail(
        &self,
        data: &[u8],
        extension: Option<&str>,
        target: Option<Dimensions>,
    ) -> Result<Option<EncodedFrame>, PipelineError> {
        if data.is_empty() {
            return Ok(None);
        }

        // Both guards live until the end of this call, whatever path it takes.
        let source = TempMedia::write(&self.temp_dir, data, extension).await?;
        let output = TempMedia::create(&self.temp_dir, Some(".jpg"))?;

        let timestamp = self
            .sample_timestamp(ProbeCache::key(data), source.path())
            .await;

        if let Err(e) = self
            .grab_frame(source.path(), output.path(), timestamp)
            .await
        {
            tracing::warn!(error = %e, "Thumbnail extraction failed");
            return Ok(None);
        }

        let frame = match tokio::fs::read(output.path()).await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read extracted frame");
                return Ok(None);
            }
        };

        let quality = self.jpeg_quality;
        let encoded =
            tokio::task::spawn_blocking(move || Self::finish_frame(&frame, target, quality)).await;

        match encoded {
            Ok(Ok(frame)) => {
                tracing::debug!(
                    width = frame.dimensions.width,
                    height = frame.dimensions.height,
                    size_bytes = frame.data.len(),
                    "Thumbnail encoded"
                );
                Ok(Some(frame))
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Thumbnail encoding failed");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Thumbnail encoding task failed");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn frame_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([40, 90, 160]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .unwrap();
        buffer
    }

    fn extractor(dir: &Path) -> FfmpegThumbnailExtractor {
        let ffprobe = Ffprobe::new("/nonexistent/bin/ffprobe".to_string(), None).unwrap();
        FfmpegThumbnailExtractor::new(
            "/nonexistent/bin/ffmpeg".to_string(),
            ffprobe,
            dir.to_path_buf(),
            85,
            Some(Duration::from_secs(5)),
        )
        .unwrap()
    }

    #[test]
    fn test_finish_frame_resizes_exactly() {
        let frame = frame_jpeg(192, 108);
        let target = Dimensions::new(360, 640);
        let encoded = FfmpegThumbnailExtractor::finish_frame(&frame, target, 85).unwrap();
        assert_eq!(encoded.dimensions, Dimensions::new(360, 640).unwrap());

        let decoded = image::load_from_memory(&encoded.data).unwrap();
        assert_eq!(decoded.dimensions(), (360, 640));
    }

    #[test]
    fn test_finish_frame_keeps_native_size() {
        let frame = frame_jpeg(64, 48);
        let encoded = FfmpegThumbnailExtractor::finish_frame(&frame, None, 85).unwrap();
        assert_eq!(encoded.dimensions, Dimensions::new(64, 48).unwrap());
    }

    #[test]
    fn test_finish_frame_rejects_garbage() {
        assert!(FfmpegThumbnailExtractor::finish_frame(&[], None, 85).is_err());
        assert!(FfmpegThumbnailExtractor::finish_frame(b"garbage", None, 85).is_err());
    }

    #[test]
    fn test_new_rejects_dangerous_ffmpeg_path() {
        let ffprobe = Ffprobe::new("ffprobe".to_string(), None).unwrap();
        let result = FfmpegThumbnailExtractor::new(
            "ffmpeg && curl evil".to_string(),
            ffprobe,
            std::env::temp_dir(),
            85,
            None,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_yields_none_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor(dir.path());

        let thumb = extractor
            .extract_thumbnail(b"\x00\x00\x00\x18ftypmp42", Some(".mp4"), Dimensions::new(360, 640))
            .await
            .unwrap();
        assert!(thumb.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_input_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor(dir.path());
        assert!(extractor
            .extract_thumbnail(&[], Some(".mp4"), None)
            .await
            .unwrap()
            .is_none());
    }
}
