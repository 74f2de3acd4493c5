//! Conversion requests and results.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{ConvertError, Result};

/// One file to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input: PathBuf,
    /// Directory the PDF is produced in. If None, a scratch directory is
    /// created and removed together with the [`ConversionResult`].
    pub workdir: Option<PathBuf>,
    /// Overrides [`ConverterConfig::image_dpi`](crate::ConverterConfig::image_dpi).
    pub image_dpi: Option<u32>,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            workdir: None,
            image_dpi: None,
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    pub fn with_image_dpi(mut self, dpi: u32) -> Self {
        self.image_dpi = Some(dpi);
        self
    }
}

/// A produced PDF.
///
/// When the request had no working directory the PDF lives in a scratch
/// directory owned by this value; move it out with [`persist`](Self::persist)
/// before dropping the result.
#[derive(Debug)]
pub struct ConversionResult {
    path: PathBuf,
    scratch: Option<TempDir>,
}

impl ConversionResult {
    /// Checks that `path` exists and is non-empty.
    pub(crate) async fn verified(path: PathBuf, scratch: Option<TempDir>) -> Result<Self> {
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(Self { path, scratch }),
            Ok(_) => Err(ConvertError::OutputNotFound(format!(
                "{} is empty",
                path.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                ConvertError::OutputNotFound(format!("{} does not exist", path.display())),
            ),
            Err(e) => Err(ConvertError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the PDF lives in a scratch directory that is removed on drop.
    pub fn is_scratch(&self) -> bool {
        self.scratch.is_some()
    }

    /// Moves the PDF to `dest`, creating parent directories, and returns
    /// `dest`. The scratch directory, if any, is removed afterwards.
    pub async fn persist(self, dest: &Path) -> Result<PathBuf> {
        if dest == self.path {
            return Ok(self.path);
        }
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        if let Err(e) = tokio::fs::rename(&self.path, dest).await {
            // Rename fails across filesystems; copy instead.
            debug!(from = %self.path.display(), to = %dest.display(), error = %e, "rename failed, copying");
            tokio::fs::copy(&self.path, dest).await?;
            tokio::fs::remove_file(&self.path).await?;
        }
        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_verified_rejects_missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");
        assert!(matches!(
            ConversionResult::verified(missing, None).await,
            Err(ConvertError::OutputNotFound(_))
        ));

        let empty = dir.path().join("empty.pdf");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            ConversionResult::verified(empty, None).await,
            Err(ConvertError::OutputNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_persist_moves_out_of_scratch() {
        let scratch = tempfile::tempdir().unwrap();
        let scratch_path = scratch.path().to_path_buf();
        let produced = scratch_path.join("report.pdf");
        std::fs::write(&produced, b"%PDF-1.7\n").unwrap();

        let result = ConversionResult::verified(produced, Some(scratch)).await.unwrap();
        assert!(result.is_scratch());

        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("nested").join("report (1).pdf");
        let persisted = result.persist(&dest).await.unwrap();

        assert_eq!(persisted, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.7\n");
        assert!(!scratch_path.exists());
    }

    #[tokio::test]
    async fn test_dropping_result_removes_scratch() {
        let scratch = tempfile::tempdir().unwrap();
        let scratch_path = scratch.path().to_path_buf();
        let produced = scratch_path.join("a.pdf");
        std::fs::write(&produced, b"%PDF").unwrap();

        let result = ConversionResult::verified(produced, Some(scratch)).await.unwrap();
        drop(result);
        assert!(!scratch_path.exists());
    }

    #[test]
    fn test_request_builder() {
        let request = ConversionRequest::new("in/photo.png")
            .with_workdir("/tmp/work")
            .with_image_dpi(300);
        assert_eq!(request.input, PathBuf::from("in/photo.png"));
        assert_eq!(request.workdir, Some(PathBuf::from("/tmp/work")));
        assert_eq!(request.image_dpi, Some(300));
    }
}
