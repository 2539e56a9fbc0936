//! Error types for the resume-extract library.
//!
//! Two distinct error types reflect two distinct layers:
//!
//! * [`ExtractError`] — **Fatal**: returned from every `extract*` entry point.
//!   Callers mostly need to tell "bad input" ([`ExtractError::Validation`])
//!   apart from "extraction failed" (everything else), but the remote
//!   terminal states (`RemoteProcessing`, `Timeout`, `Cancelled`) keep their
//!   own variants so a caller can decide whether a retry makes sense.
//!
//! * [`ServiceError`] — raised by a [`crate::service::ContentService`]
//!   implementation (HTTP transport, API status, decoding). The workflow never
//!   returns it directly: it is logged and folded into
//!   [`ExtractError::Extraction`] with the original message preserved.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the resume-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The document payload is empty. Never wrapped, never retried.
    #[error("Resume file '{filename}' is empty (0 bytes)")]
    Validation { filename: String },

    /// Input file was not found at the given path.
    #[error("Resume file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Remote terminal states ────────────────────────────────────────────
    /// The service reported the uploaded file as FAILED.
    #[error("File processing failed for '{name}': {detail}")]
    RemoteProcessing { name: String, detail: String },

    /// The readiness poll budget ran out before the file became ACTIVE.
    #[error("File '{name}' still processing after {attempts} polls ({waited_ms}ms)\nRaise PollPolicy::timeout or PollPolicy::max_attempts.")]
    Timeout {
        name: String,
        attempts: u32,
        waited_ms: u64,
    },

    /// The caller cancelled the extraction.
    #[error("Extraction cancelled while waiting on '{name}'")]
    Cancelled { name: String },

    // ── Catch-all for the remote pipeline ────────────────────────────────
    /// Staging, upload, status lookup or generation failed.
    #[error("Failed to extract text from resume '{filename}': {message}")]
    Extraction { filename: String, message: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// No API key was supplied.
    #[error("Gemini API key is not configured.\n{hint}")]
    MissingApiKey { hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// True for errors the caller can fix by changing the input document.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ExtractError::Validation { .. }
                | ExtractError::FileNotFound { .. }
                | ExtractError::PermissionDenied { .. }
        )
    }

    /// Short, stable name of the variant, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::Validation { .. } => "validation",
            ExtractError::FileNotFound { .. } => "file_not_found",
            ExtractError::PermissionDenied { .. } => "permission_denied",
            ExtractError::RemoteProcessing { .. } => "remote_processing",
            ExtractError::Timeout { .. } => "timeout",
            ExtractError::Cancelled { .. } => "cancelled",
            ExtractError::Extraction { .. } => "extraction",
            ExtractError::MissingApiKey { .. } => "missing_api_key",
            ExtractError::InvalidConfig(_) => "invalid_config",
            ExtractError::OutputWriteFailed { .. } => "output_write_failed",
            ExtractError::Internal(_) => "internal",
        }
    }
}

/// Errors raised by a content-service backend.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// 401 or 403 from the API.
    #[error("Authentication rejected (status {status}): {message}")]
    Auth { status: u16, message: String },

    /// 429 from the API.
    #[error("Rate limited by the API")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The response body did not have the expected shape.
    #[error("Could not decode API response: {0}")]
    Decode(String),

    /// The resumable-upload start call did not return an upload URL.
    #[error("Upload session did not return an upload URL")]
    MissingUploadUrl,

    /// Local I/O while preparing a request.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Short, stable name of the variant, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Http(_) => "http",
            ServiceError::Api { .. } => "api",
            ServiceError::Auth { .. } => "auth",
            ServiceError::RateLimited { .. } => "rate_limited",
            ServiceError::Decode(_) => "decode",
            ServiceError::MissingUploadUrl => "missing_upload_url",
            ServiceError::Io(_) => "io",
        }
    }
}
