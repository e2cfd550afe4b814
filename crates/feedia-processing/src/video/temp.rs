//! Scoped temporary files for handing media to external processes.
//!
//! ffprobe and ffmpeg need a real file to seek in, so every invocation works on
//! a [`TempMedia`]. The file is removed when the guard is dropped, which also
//! covers early returns and cancelled futures.

use std::io;
use std::path::Path;
use tempfile::TempPath;

use crate::error::PipelineError;

const TEMP_PREFIX: &str = "feedia-";

pub struct TempMedia {
    path: Option<TempPath>,
}

impl TempMedia {
    /// Materialize `data` into a new file in `dir`.
    ///
    /// Failing to create or fill the file is environment-fatal and reported as
    /// [`PipelineError::TempDir`].
    pub async fn write(
        dir: &Path,
        data: &[u8],
        suffix: Option<&str>,
    ) -> Result<Self, PipelineError> {
        let temp = Self::create(dir, suffix)?;
        tokio::fs::write(temp.path(), data)
            .await
            .map_err(|source| PipelineError::TempDir {
                path: dir.to_path_buf(),
                source,
            })?;
        Ok(temp)
    }

    /// Reserve an empty file in `dir`, e.g. as an output target for ffmpeg.
    pub fn create(dir: &Path, suffix: Option<&str>) -> Result<Self, PipelineError> {
        let file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(suffix.unwrap_or(""))
            .tempfile_in(dir)
            .map_err(|source| PipelineError::TempDir {
                path: dir.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: Some(file.into_temp_path()),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let removed_path = path.to_path_buf();
        match path.close() {
            Ok(()) => tracing::trace!(path = %removed_path.display(), "Removed temp file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %removed_path.display(),
                error = %e,
                "Failed to remove temp file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_write_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let temp = TempMedia::write(dir.path(), b"payload", Some(".mp4"))
                .await
                .unwrap();
            assert_eq!(std::fs::read(temp.path()).unwrap(), b"payload");
            let name = temp.path().file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("feedia-"));
            assert!(name.ends_with(".mp4"));
            temp.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_drop_tolerates_already_removed_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempMedia::create(dir.path(), Some(".jpg")).unwrap();
        std::fs::remove_file(temp.path()).unwrap();
        drop(temp);
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_dir_is_environment_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = TempMedia::write(&missing, b"x", None).await.err().unwrap();
        assert!(matches!(err, PipelineError::TempDir { .. }));
    }
}
