//! Pipeline coordinator: probe → rotate → thumbnail, per uploaded item
//!
//! Images only get their orientation-corrected dimensions. Videos go through
//! raw probe, rotation, effective dimensions and thumbnail extraction, in that
//! order, because the thumbnail is sized from the rotated dimensions. Anything
//! else finishes immediately with unknown metadata.

use feedia_core::{thumbnail_filename, MediaBlob, MediaCategory};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::task::AbortOnDropHandle;

use crate::error::PipelineError;
use crate::metadata::{MediaMetadata, PipelineStage, ThumbnailImage};
use crate::traits::{ImageProbe, RotationProbe, ThumbnailExtractor, VideoDimensionProbe};

const DEFAULT_MAX_CONCURRENT_ITEMS: usize = 4;

/// Media metadata pipeline.
///
/// Cheap to clone; clones share the underlying probes.
#[derive(Clone)]
pub struct MediaPipeline {
    image_probe: Arc<dyn ImageProbe>,
    video_probe: Arc<dyn VideoDimensionProbe>,
    rotation_probe: Arc<dyn RotationProbe>,
    thumbnail_extractor: Arc<dyn ThumbnailExtractor>,
    max_concurrent_items: usize,
}

impl MediaPipeline {
    pub fn new(
        image_probe: Arc<dyn ImageProbe>,
        video_probe: Arc<dyn VideoDimensionProbe>,
        rotation_probe: Arc<dyn RotationProbe>,
        thumbnail_extractor: Arc<dyn ThumbnailExtractor>,
    ) -> Self {
        Self {
            image_probe,
            video_probe,
            rotation_probe,
            thumbnail_extractor,
            max_concurrent_items: DEFAULT_MAX_CONCURRENT_ITEMS,
        }
    }

    pub fn with_max_concurrent_items(mut self, max: usize) -> Self {
        self.max_concurrent_items = max.max(1);
        self
    }

    /// Wire the ffprobe/ffmpeg backed implementations from configuration.
    #[cfg(feature = "video")]
    pub fn from_config(config: &feedia_core::PipelineConfig) -> Result<Self, PipelineError> {
        use crate::image::ImageProcessor;
        use crate::video::{Ffprobe, FfmpegThumbnailExtractor, FfprobeVideoProbe};
        use std::time::Duration;

        let timeout = config.probe_timeout_secs.map(Duration::from_secs);
        let ffprobe = Ffprobe::new(config.ffprobe_path.clone(), timeout)?;

        let video_probe = Arc::new(FfprobeVideoProbe::new(
            ffprobe.clone(),
            config.temp_dir.clone(),
        ));
        let thumbnail_extractor = Arc::new(FfmpegThumbnailExtractor::new(
            config.ffmpeg_path.clone(),
            ffprobe,
            config.temp_dir.clone(),
            config.thumbnail_jpeg_quality,
            timeout,
        )?);

        Ok(Self::new(
            Arc::new(ImageProcessor),
            video_probe.clone(),
            video_probe,
            thumbnail_extractor,
        )
        .with_max_concurrent_items(config.max_concurrent_items))
    }

    /// Run one media item through the pipeline.
    ///
    /// Corrupt or unsupported media never fails: it yields metadata with
    /// missing fields. `Err` means the environment is broken (e.g. no
    /// writable temp directory).
    #[tracing::instrument(skip(self, blob), fields(
        filename = %blob.original_filename(),
        content_type = %blob.content_type(),
        size_bytes = blob.data().len()
    ))]
    pub async fn process(&self, blob: &MediaBlob) -> Result<MediaMetadata, PipelineError> {
        let category = blob.category();
        let mut metadata = MediaMetadata::unknown(category);
        enter(PipelineStage::Init);

        match category {
            MediaCategory::Image => {
                enter(PipelineStage::ProbeImage);
                let dimensions = self.image_probe.probe_image(blob.data()).await;
                metadata.set_dimensions(dimensions);
            }
            MediaCategory::Video => self.process_video(blob, &mut metadata).await?,
            MediaCategory::Other => {
                tracing::debug!("Unrecognized media category, skipping probes");
            }
        }

        enter(PipelineStage::Done);
        tracing::info!(
            category = ?metadata.category,
            width = ?metadata.width,
            height = ?metadata.height,
            rotation = ?metadata.rotation.map(|r| r.degrees()),
            thumbnail = metadata.thumbnail.is_some(),
            "Media metadata extracted"
        );

        Ok(metadata)
    }

    async fn process_video(
        &self,
        blob: &MediaBlob,
        metadata: &mut MediaMetadata,
    ) -> Result<(), PipelineError> {
        let data = blob.data();
        let extension = blob.extension();
        let extension = extension.as_deref();

        enter(PipelineStage::ProbeRawDimensions);
        let raw = self.video_probe.probe_video_raw(data, extension).await?;

        enter(PipelineStage::ResolveRotation);
        let rotation = self.rotation_probe.resolve_rotation(data, extension).await?;

        enter(PipelineStage::ComputeEffectiveDimensions);
        let effective = raw.map(|d| d.rotated(rotation));
        metadata.rotation = Some(rotation);
        metadata.set_dimensions(effective);

        enter(PipelineStage::ExtractThumbnail);
        let frame = self
            .thumbnail_extractor
            .extract_thumbnail(data, extension, effective)
            .await?;
        metadata.thumbnail =
            frame.map(|frame| ThumbnailImage::new(frame, thumbnail_filename(&blob.stem())));

        Ok(())
    }

    /// Process several uploads concurrently, at most `max_concurrent_items`
    /// at a time. Results come back in input order.
    ///
    /// A task that panics yields unknown metadata for its own item only. The
    /// first environment-fatal error is returned once every item has finished.
    /// Dropping the returned future aborts every item still running, which
    /// removes its temp files and kills its ffprobe/ffmpeg child.
    pub async fn process_batch(
        &self,
        blobs: Vec<MediaBlob>,
    ) -> Result<Vec<MediaMetadata>, PipelineError> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_items));
        let mut tasks = Vec::with_capacity(blobs.len());

        for blob in blobs {
            let pipeline = self.clone();
            let semaphore = semaphore.clone();
            let category = blob.category();

            let task = AbortOnDropHandle::new(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                pipeline.process(&blob).await
            }));

            tasks.push((category, task));
        }

        let mut results = Vec::with_capacity(tasks.len());
        let mut first_error = None;

        // Handles left in `tasks` abort their items if this future is dropped.
        for (category, task) in tasks {
            match task.await {
                Ok(Ok(metadata)) => results.push(metadata),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Media item failed");
                    first_error.get_or_insert(e);
                    results.push(MediaMetadata::unknown(category));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Media task failed");
                    results.push(MediaMetadata::unknown(category));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}

fn enter(stage: PipelineStage) {
    tracing::debug!(stage = stage.as_str(), "Pipeline stage");
}
