//! The extraction workflow and its entry points.
//!
//! [`ResumeExtractor::extract`] is a linear pipeline with one wait loop and a
//! two-part teardown:
//!
//! ```text
//! validate ─▶ stage ─▶ upload ─▶ poll* ─▶ generate
//!                        │                   │
//!                        └──── always ───────┴─▶ delete remote, release local
//! ```
//!
//! Validation errors come back untouched and make no remote calls. Every
//! other failure is logged with the document name and returned as one
//! [`ExtractError`]. Cleanup failures are logged and never replace the
//! primary result.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::input::IncomingDocument;
use crate::pipeline::stage::{self, StagedFile};
use crate::pipeline::{cancellable, error_chain, generate, poll, StepError};
use crate::service::{ContentService, GeminiClient, RemoteFile, UploadRequest};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs extractions against one content service.
///
/// Cheap to clone; the service is shared behind an `Arc`, so one extractor
/// can serve any number of sequential or concurrent calls.
#[derive(Clone)]
pub struct ResumeExtractor {
    service: Arc<dyn ContentService>,
    config: ExtractionConfig,
}

/// Resources acquired so far, released in [`ResumeExtractor::cleanup`].
#[derive(Default)]
struct Acquired {
    staged: Option<StagedFile>,
    remote: Option<RemoteFile>,
}

impl ResumeExtractor {
    /// Build an extractor, using `config.service` if set and a
    /// [`GeminiClient`] otherwise.
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractError> {
        let service: Arc<dyn ContentService> = match config.service {
            Some(ref service) => Arc::clone(service),
            None => Arc::new(GeminiClient::from_config(&config).map_err(|e| {
                ExtractError::Internal(format!("Failed to build HTTP client: {e}"))
            })?),
        };
        info!("Text extractor initialised (model {})", config.model);
        Ok(Self { service, config })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract text from an in-memory document.
    pub async fn extract(
        &self,
        document: IncomingDocument,
    ) -> Result<ExtractionOutput, ExtractError> {
        self.extract_with_cancel(document, &CancellationToken::new())
            .await
    }

    /// Extract text, giving up with [`ExtractError::Cancelled`] once `cancel`
    /// fires. Resources acquired before cancellation are still cleaned up.
    pub async fn extract_with_cancel(
        &self,
        document: IncomingDocument,
        cancel: &CancellationToken,
    ) -> Result<ExtractionOutput, ExtractError> {
        let filename = document.filename().to_string();

        if let Err(e) = document.validate() {
            error!("Validation error for file '{}': {}", filename, e);
            self.notify_error(&e);
            return Err(e);
        }
        info!(
            "Processing uploaded file: {} ({:.2}KB)",
            filename,
            document.len() as f64 / 1024.0
        );

        let mut acquired = Acquired::default();
        let result = self.run(document, cancel, &mut acquired).await;
        let result = result.map_err(|e| normalise(&filename, e));

        self.cleanup(acquired).await;

        match &result {
            Ok(output) => {
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_complete(output.text.len());
                }
            }
            Err(e) => self.notify_error(e),
        }
        result
    }

    /// Read a local file and extract it.
    pub async fn extract_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ExtractionOutput, ExtractError> {
        let document = IncomingDocument::from_path(path).await?;
        self.extract(document).await
    }

    /// Extract a local file and write the text to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn extract_to_file(
        &self,
        input_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<ExtractionStats, ExtractError> {
        let output = self.extract_file(input_path).await?;
        write_text_atomic(output_path.as_ref(), &output.text).await?;
        Ok(output.stats)
    }

    async fn run(
        &self,
        document: IncomingDocument,
        cancel: &CancellationToken,
        acquired: &mut Acquired,
    ) -> Result<ExtractionOutput, StepError> {
        let total_start = Instant::now();
        let cb = self.config.progress_callback.as_ref();
        let (bytes, filename, media_type) = document.into_parts();
        let media_type = media_type.unwrap_or_else(|| self.config.default_media_type.clone());
        let document_bytes = bytes.len();

        // ── Step 1: Stage ────────────────────────────────────────────────
        let staged = acquired
            .staged
            .insert(stage::stage(bytes).await.map_err(StepError::Staging)?);
        if let Some(cb) = cb {
            cb.on_staged(&filename, document_bytes);
        }

        // ── Step 2: Upload ───────────────────────────────────────────────
        let upload_start = Instant::now();
        let request = UploadRequest {
            display_name: filename.clone(),
            mime_type: media_type.clone(),
        };
        let uploaded = cancellable(
            cancel,
            &filename,
            self.service.upload_file(staged.path(), &request),
        )
        .await?;
        let upload_duration_ms = upload_start.elapsed().as_millis() as u64;
        info!("File uploaded: {}", uploaded.name);
        acquired.remote = Some(uploaded.clone());
        if let Some(cb) = cb {
            cb.on_uploaded(&uploaded.name);
        }

        // ── Step 3: Await readiness ──────────────────────────────────────
        let ready = poll::await_ready(
            self.service.as_ref(),
            uploaded,
            &self.config.poll,
            cancel,
            cb,
        )
        .await?;
        debug!(
            "File {} ready after {} polls ({}ms)",
            ready.file.name,
            ready.attempts,
            ready.waited.as_millis()
        );

        // ── Step 4: Generate ─────────────────────────────────────────────
        let request = generate::build_request(&self.config, &ready.file, &media_type)?;
        if let Some(cb) = cb {
            cb.on_generating(&self.config.model);
        }
        let generation_start = Instant::now();
        let response = cancellable(
            cancel,
            &ready.file.name,
            self.service.generate_content(&self.config.model, &request),
        )
        .await?;
        let generation_duration_ms = generation_start.elapsed().as_millis() as u64;

        let extracted = generate::interpret(&response);
        info!(
            "Extraction completed. Length: {} chars",
            extracted.text.chars().count()
        );

        Ok(ExtractionOutput {
            text: extracted.text,
            source: extracted.source,
            remote_file: ready.file.name,
            stats: ExtractionStats {
                document_bytes,
                poll_attempts: ready.attempts,
                upload_duration_ms,
                processing_duration_ms: ready.waited.as_millis() as u64,
                generation_duration_ms,
                total_duration_ms: total_start.elapsed().as_millis() as u64,
                input_tokens: extracted.usage.input_tokens,
                output_tokens: extracted.usage.output_tokens,
                finish_reason: extracted.finish_reason,
            },
        })
    }

    /// Delete the remote file (if one was uploaded), then the staged file.
    async fn cleanup(&self, acquired: Acquired) {
        if let Some(remote) = acquired.remote {
            match self.service.delete_file(&remote.name).await {
                Ok(()) => info!("Remote file {} deleted", remote.name),
                Err(e) => warn!("Failed to delete remote file {}: {}", remote.name, e),
            }
        }
        if let Some(staged) = acquired.staged {
            staged.release();
        }
    }

    fn notify_error(&self, err: &ExtractError) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_error(&err.to_string());
        }
    }
}

/// Log a stage failure and turn it into the caller-visible error.
fn normalise(filename: &str, err: StepError) -> ExtractError {
    match err {
        StepError::Fatal(e) => {
            error!(
                "Extraction failed for file '{}': {}: {}",
                filename,
                e.kind(),
                e
            );
            e
        }
        StepError::Service(e) => {
            error!(
                "Extraction failed for file '{}': {}: {}",
                filename,
                e.kind(),
                error_chain(&e)
            );
            ExtractError::Extraction {
                filename: filename.to_string(),
                message: e.to_string(),
            }
        }
        StepError::Staging(e) => {
            error!(
                "Extraction failed for file '{}': staging: {}",
                filename,
                error_chain(&e)
            );
            ExtractError::Extraction {
                filename: filename.to_string(),
                message: format!("could not stage document: {e}"),
            }
        }
    }
}

/// Write `text` to `path` via a sibling `.tmp` file and a rename, creating
/// parent directories as needed.
pub async fn write_text_atomic(path: &Path, text: &str) -> Result<(), ExtractError> {
    let write_err = |source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, text).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)?;
    Ok(())
}

// ── Free-function entry points ───────────────────────────────────────────

/// Extract text from a local file with a one-off extractor.
pub async fn extract_file(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    ResumeExtractor::new(config.clone())?.extract_file(path).await
}

/// Extract a local file and write the text to `output_path`.
pub async fn extract_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, ExtractError> {
    ResumeExtractor::new(config.clone())?
        .extract_to_file(input_path, output_path)
        .await
}

/// Synchronous wrapper around [`extract_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_file(path, config))
}
