//! Local staging of the document payload.
//!
//! The upload API takes a file path, so the payload is written to a uniquely
//! named `.pdf` temp file first. [`StagedFile`] owns that file: call
//! [`StagedFile::release`] on the normal path; if the future is dropped
//! before that (cancellation, panic) the inner [`NamedTempFile`] still
//! deletes the file on drop.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const STAGE_PREFIX: &str = "resume-";
const STAGE_SUFFIX: &str = ".pdf";

/// A temp file holding one document's bytes for one extraction call.
#[derive(Debug)]
pub struct StagedFile {
    inner: NamedTempFile,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Delete the file now. Failures are logged and swallowed so that
    /// cleanup never replaces the extraction result.
    pub fn release(self) {
        let path = self.inner.path().to_path_buf();
        match self.inner.close() {
            Ok(()) => debug!("Temporary file cleaned up: {}", path.display()),
            Err(e) => warn!("Failed to clean temporary file {}: {}", path.display(), e),
        }
    }
}

/// Write `bytes` to a fresh temp file off the async executor.
pub async fn stage(bytes: Vec<u8>) -> std::io::Result<StagedFile> {
    tokio::task::spawn_blocking(move || stage_blocking(&bytes))
        .await
        .map_err(std::io::Error::other)?
}

fn stage_blocking(bytes: &[u8]) -> std::io::Result<StagedFile> {
    let mut inner = tempfile::Builder::new()
        .prefix(STAGE_PREFIX)
        .suffix(STAGE_SUFFIX)
        .tempfile()?;
    inner.write_all(bytes)?;
    inner.as_file().sync_all()?;
    debug!("Staged {} bytes at {}", bytes.len(), inner.path().display());
    Ok(StagedFile { inner })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stage_writes_bytes_with_pdf_suffix() {
        let staged = stage(b"%PDF-1.7 hello".to_vec()).await.unwrap();
        let path = staged.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 hello");

        staged.release();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn drop_also_removes_file() {
        let staged = stage(vec![1, 2, 3]).await.unwrap();
        let path = staged.path().to_path_buf();
        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn staged_names_are_unique() {
        let a = stage(vec![1]).await.unwrap();
        let b = stage(vec![1]).await.unwrap();
        assert_ne!(a.path(), b.path());
    }
}
