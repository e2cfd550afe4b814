//! ffprobe invocation and its JSON output

use anyhow::{anyhow, Context, Result};
use lru::LruCache;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;

use crate::error::PipelineError;
use crate::video::temp::TempMedia;

/// `ffprobe -print_format json -show_format -show_streams` output, limited to
/// the fields the pipeline reads.
#[derive(Debug, Default, Deserialize)]
pub struct ProbeOutput {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    #[serde(default)]
    pub format: Option<ProbeFormat>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProbeStream {
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub tags: Option<StreamTags>,
    #[serde(default)]
    pub side_data_list: Vec<SideData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamTags {
    pub rotate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SideData {
    pub side_data_type: Option<String>,
    pub rotation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProbeFormat {
    pub duration: Option<String>,
}

impl ProbeOutput {
    pub fn parse(stdout: &[u8]) -> Result<Self> {
        serde_json::from_slice(stdout).context("Failed to parse ffprobe output")
    }

    /// First video stream. `-select_streams v:0` normally leaves only that one.
    pub fn video_stream(&self) -> Option<&ProbeStream> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .or_else(|| self.streams.first())
    }

    /// Encoded width/height of the video stream, before any rotation.
    pub fn raw_dimensions(&self) -> Option<(u32, u32)> {
        let stream = self.video_stream()?;
        Some((stream.width?, stream.height?))
    }

    /// Rotation in degrees: display-matrix side data first, then the legacy
    /// `rotate` tag. Zero values are skipped so the first non-zero one wins.
    pub fn rotation(&self) -> Option<f64> {
        let stream = self.video_stream()?;

        let from_side_data = stream
            .side_data_list
            .iter()
            .filter_map(|sd| sd.rotation)
            .find(|r| r.is_finite() && *r != 0.0);
        if from_side_data.is_some() {
            return from_side_data;
        }

        stream
            .tags
            .as_ref()
            .and_then(|tags| tags.rotate.as_deref())
            .and_then(|r| r.trim().parse::<f64>().ok())
            .filter(|r| r.is_finite() && *r != 0.0)
    }

    /// Container duration in seconds, if known and positive.
    pub fn duration_secs(&self) -> Option<f64> {
        self.format
            .as_ref()?
            .duration
            .as_deref()?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d > 0.0)
    }
}

/// SHA-256 of the probed bytes.
pub type ProbeKey = [u8; 32];

const DEFAULT_PROBE_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(32) {
    Some(size) => size,
    None => unreachable!(),
};

/// Successful probes keyed by content, shared by every clone of an [`Ffprobe`].
///
/// Dimensions, rotation and duration of one upload all come from the same
/// ffprobe run, so the bytes are materialized and probed once per item.
#[derive(Clone)]
pub struct ProbeCache {
    entries: Arc<Mutex<LruCache<ProbeKey, Arc<ProbeOutput>>>>,
}

impl ProbeCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn key(data: &[u8]) -> ProbeKey {
        Sha256::digest(data).into()
    }

    pub fn get(&self, key: &ProbeKey) -> Option<Arc<ProbeOutput>> {
        let mut entries = self.entries.lock().ok()?;
        entries.get(key).cloned()
    }

    pub fn insert(&self, key: ProbeKey, probe: Arc<ProbeOutput>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(key, probe);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProbeCache {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_CACHE_SIZE)
    }
}

impl fmt::Debug for ProbeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeCache")
            .field("len", &self.len())
            .finish()
    }
}

/// Handle on the ffprobe executable.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    ffprobe_path: String,
    timeout: Option<Duration>,
    cache: ProbeCache,
}

impl Ffprobe {
    pub fn new(ffprobe_path: String, timeout: Option<Duration>) -> Result<Self, PipelineError> {
        PipelineError::check_executable(&ffprobe_path)?;
        Ok(Self {
            ffprobe_path,
            timeout,
            cache: ProbeCache::default(),
        })
    }

    pub fn cache(&self) -> &ProbeCache {
        &self.cache
    }

    /// Probe in-memory media, reusing an earlier result for identical bytes.
    ///
    /// Outer `Err` is environment-fatal (no temp file), inner `Err` is a soft
    /// probe failure. Failures are not cached.
    pub async fn probe_data(
        &self,
        temp_dir: &Path,
        data: &[u8],
        extension: Option<&str>,
    ) -> Result<Result<Arc<ProbeOutput>>, PipelineError> {
        let key = ProbeCache::key(data);
        if let Some(probe) = self.cache.get(&key) {
            tracing::trace!("ffprobe result reused");
            return Ok(Ok(probe));
        }

        let source = TempMedia::write(temp_dir, data, extension).await?;
        Ok(self.probe_keyed(key, source.path()).await)
    }

    /// Probe a file already on disk whose content hashes to `key`.
    pub async fn probe_keyed(&self, key: ProbeKey, media_path: &Path) -> Result<Arc<ProbeOutput>> {
        if let Some(probe) = self.cache.get(&key) {
            return Ok(probe);
        }
        let probe = Arc::new(self.probe(media_path).await?);
        self.cache.insert(key, probe.clone());
        Ok(probe)
    }

    /// Probe the first video stream and the container format of `media_path`.
    ///
    /// The child is killed if this future is dropped or the timeout expires.
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    pub async fn probe(&self, media_path: &Path) -> Result<ProbeOutput> {
        let start = std::time::Instant::now();

        let mut command = Command::new(&self.ffprobe_path);
        command
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-select_streams",
                "v:0",
            ])
            .arg(media_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let run = command.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| anyhow!("ffprobe timed out after {:?}", limit))?,
            None => run.await,
        }
        .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let probe = ProbeOutput::parse(&output.stdout)?;

        tracing::debug!(
            duration_ms = start.elapsed().as_millis(),
            streams = probe.streams.len(),
            "ffprobe completed"
        );

        Ok(probe)
    }
}
