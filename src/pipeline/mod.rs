//! Workflow stages for résumé extraction.
//!
//! Each submodule implements exactly one step:
//!
//! ```text
//! input ──▶ stage ──▶ (upload) ──▶ poll ──▶ generate
//! (bytes)   (tempfile)  (service)   (state)  (text)
//! ```
//!
//! 1. [`input`]    — the caller's document and its validation
//! 2. [`stage`]    — scoped `.pdf` temp file handed to the upload call
//! 3. [`poll`]     — bounded wait for the remote file to leave PROCESSING
//! 4. [`generate`] — build the prompt + file request, read back the text
//!
//! Upload and cleanup are single service calls and live in
//! [`crate::extract`], which sequences the stages.

pub mod generate;
pub mod input;
pub mod poll;
pub mod stage;

use crate::error::{ExtractError, ServiceError};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Failure inside a stage, before it is normalised into an [`ExtractError`].
#[derive(Debug)]
pub enum StepError {
    /// The remote service call failed.
    Service(ServiceError),
    /// Writing the staged file failed.
    Staging(std::io::Error),
    /// Already a terminal, caller-visible error (FAILED, timeout, cancel).
    Fatal(ExtractError),
}

impl From<ServiceError> for StepError {
    fn from(e: ServiceError) -> Self {
        StepError::Service(e)
    }
}

impl From<ExtractError> for StepError {
    fn from(e: ExtractError) -> Self {
        StepError::Fatal(e)
    }
}

/// Race a service call against `cancel`.
///
/// `waiting_on` names the resource reported in [`ExtractError::Cancelled`].
pub async fn cancellable<T, F>(
    cancel: &CancellationToken,
    waiting_on: &str,
    fut: F,
) -> Result<T, StepError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StepError::Fatal(ExtractError::Cancelled {
            name: waiting_on.to_string(),
        })),
        res = fut => res.map_err(StepError::Service),
    }
}

/// Render an error and its `source()` chain on one line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
