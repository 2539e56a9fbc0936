//! Readiness polling for an uploaded file.
//!
//! The service ingests uploads asynchronously and reports `PROCESSING` until
//! the file can be referenced. This stage keeps re-fetching the file on the
//! [`PollPolicy`] schedule until it leaves `PROCESSING`, the budget runs out,
//! or the caller cancels. Sleeps are `tokio::time::sleep`, so a waiting
//! extraction never blocks its worker thread.

use super::StepError;
use crate::config::PollPolicy;
use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use crate::service::{ContentService, FileState, RemoteFile};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// A file that left `PROCESSING` in a usable state.
#[derive(Debug, Clone)]
pub struct Ready {
    pub file: RemoteFile,
    /// Number of status lookups issued (0 if the upload was already ready).
    pub attempts: u32,
    pub waited: Duration,
}

/// Wait until `uploaded` is no longer `PROCESSING`.
///
/// `ACTIVE` and `STATE_UNSPECIFIED` both count as ready; `FAILED` yields
/// [`ExtractError::RemoteProcessing`] and the caller must not generate.
pub async fn await_ready(
    service: &dyn ContentService,
    uploaded: RemoteFile,
    policy: &PollPolicy,
    cancel: &CancellationToken,
    progress: Option<&ProgressCallback>,
) -> Result<Ready, StepError> {
    let start = Instant::now();
    let name = uploaded.name.clone();
    let mut file = uploaded;
    let mut attempts = 0u32;

    while file.state.is_pending() {
        let elapsed = start.elapsed();
        if attempts >= policy.max_attempts || elapsed >= policy.timeout {
            return Err(ExtractError::Timeout {
                name,
                attempts,
                waited_ms: elapsed.as_millis() as u64,
            }
            .into());
        }

        attempts += 1;
        let delay = policy
            .delay_for(attempts)
            .min(policy.timeout.saturating_sub(elapsed));
        info!("File {} processing, next check in {}ms", name, delay.as_millis());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ExtractError::Cancelled { name }.into());
            }
            _ = sleep(delay) => {}
        }

        file = super::cancellable(cancel, &name, service.get_file(&name)).await?;
        debug!("File {} poll {}: {:?}", name, attempts, file.state);
        if let Some(cb) = progress {
            cb.on_poll(attempts, file.state);
        }
    }

    if file.state == FileState::Failed {
        let detail = file.failure_detail();
        error!("File processing failed for {}: {}", name, detail);
        return Err(ExtractError::RemoteProcessing { name, detail }.into());
    }

    Ok(Ready {
        file,
        attempts,
        waited: start.elapsed(),
    })
}
