//! Progress-callback trait for extraction stage events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the workflow stages, uploads, polls and generates. The CLI uses
//! it to drive a spinner; a server could forward the same events to a
//! WebSocket.
//!
//! # Example
//!
//! ```rust
//! use resume_extract::{ExtractionConfig, ExtractionProgressCallback, FileState};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct PollCounter(AtomicU32);
//!
//! impl ExtractionProgressCallback for PollCounter {
//!     fn on_poll(&self, _attempt: u32, _state: FileState) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .api_key("key")
//!     .progress_callback(Arc::new(PollCounter(AtomicU32::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::service::FileState;
use std::sync::Arc;

/// Called by the workflow as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// The payload was written to a local temp file.
    fn on_staged(&self, filename: &str, bytes: usize) {
        let _ = (filename, bytes);
    }

    /// The remote service accepted the upload.
    fn on_uploaded(&self, remote_name: &str) {
        let _ = remote_name;
    }

    /// A status lookup returned `state` (1-indexed `attempt`).
    fn on_poll(&self, attempt: u32, state: FileState) {
        let _ = (attempt, state);
    }

    /// The generation request is about to be sent.
    fn on_generating(&self, model: &str) {
        let _ = model;
    }

    /// Extraction finished with `text_len` bytes of text.
    fn on_complete(&self, text_len: usize) {
        let _ = text_len;
    }

    /// Extraction failed; `error` is the display form of the returned error.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
