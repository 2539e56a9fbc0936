//! Incoming documents: the bytes handed to the workflow.
//!
//! A document is read exactly once. The workflow consumes it when staging,
//! so the payload is never held twice in memory.

use crate::error::ExtractError;
use std::path::Path;
use tracing::debug;

/// A document payload plus the metadata needed to upload it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingDocument {
    bytes: Vec<u8>,
    filename: String,
    media_type: Option<String>,
}

impl IncomingDocument {
    /// Wrap an in-memory payload. `filename` is used for diagnostics and as
    /// the remote display name.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            media_type: None,
        }
    }

    /// Read a local file, mapping the common failures to input errors.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ExtractError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ExtractError::Extraction {
                filename: path.display().to_string(),
                message: format!("could not read input: {e}"),
            },
        })?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!("Read {} bytes from {}", bytes.len(), path.display());

        Ok(Self::from_bytes(bytes, filename))
    }

    /// Declare the MIME type sent on upload (defaults to the configured one).
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check the payload invariant (size > 0).
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.is_empty() {
            return Err(ExtractError::Validation {
                filename: self.filename.clone(),
            });
        }
        Ok(())
    }

    /// Split into `(bytes, filename, media_type)`.
    pub fn into_parts(self) -> (Vec<u8>, String, Option<String>) {
        (self.bytes, self.filename, self.media_type)
    }
}
