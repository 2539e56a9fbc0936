//! The remote content-service seam.
//!
//! The workflow only ever talks to the remote side through
//! [`ContentService`], so the Gemini REST client ([`gemini::GeminiClient`])
//! can be swapped for an in-process fake in tests or for another backend
//! that offers the same four operations:
//!
//! ```text
//! upload_file ──▶ get_file* ──▶ generate_content ──▶ delete_file
//! ```

pub mod gemini;

use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub use gemini::GeminiClient;

/// Operations the workflow needs from the remote service.
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Upload the file at `path`, declaring `request.mime_type`.
    async fn upload_file(
        &self,
        path: &Path,
        request: &UploadRequest,
    ) -> Result<RemoteFile, ServiceError>;

    /// Look up the current state of a previously uploaded file.
    async fn get_file(&self, name: &str) -> Result<RemoteFile, ServiceError>;

    /// Delete a previously uploaded file.
    async fn delete_file(&self, name: &str) -> Result<(), ServiceError>;

    /// Run a generation request against `model`.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ServiceError>;
}

/// Metadata sent along with an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub display_name: String,
    pub mime_type: String,
}

// ── Remote file handle ───────────────────────────────────────────────────

/// Processing state reported for an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileState {
    /// Still being ingested server-side.
    #[serde(rename = "PROCESSING")]
    Processing,
    /// Ready to be referenced from a generation request.
    #[serde(rename = "ACTIVE")]
    Active,
    /// Ingestion failed; the file is unusable.
    #[serde(rename = "FAILED")]
    Failed,
    /// The service did not report a state (or reported one we don't know).
    #[default]
    #[serde(rename = "STATE_UNSPECIFIED")]
    #[serde(other)]
    Unspecified,
}

impl FileState {
    /// Whether the workflow should keep polling.
    pub fn is_pending(self) -> bool {
        matches!(self, FileState::Processing)
    }
}

/// Error status attached to a FAILED file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// A reference into remote state returned by upload and status lookups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc123`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Serialised as a decimal string on the wire.
    #[serde(default)]
    pub size_bytes: Option<String>,
    /// URI used to reference the file from generation requests.
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub state: FileState,
    #[serde(default)]
    pub error: Option<RemoteStatus>,
}

impl RemoteFile {
    /// Human-readable reason for a FAILED state.
    pub fn failure_detail(&self) -> String {
        match &self.error {
            Some(status) if !status.message.is_empty() => {
                format!("{} (code {})", status.message, status.code)
            }
            _ => "the service reported state FAILED".to_string(),
        }
    }
}

// ── Generation ───────────────────────────────────────────────────────────

/// One prompt part, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    FileData { mime_type: String, file_uri: String },
}

/// Sampling settings for a generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// An ordered list of parts plus sampling settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub parts: Vec<Part>,
    pub config: GenerationConfig,
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A generation response, kept as raw JSON.
///
/// Only the handful of fields the workflow reads are exposed as accessors;
/// everything else stays available through [`GenerateResponse::raw`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResponse {
    raw: Value,
}

impl GenerateResponse {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Concatenated text parts of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let parts = self
            .raw
            .get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .as_array()?;

        let mut found = false;
        let mut text = String::new();
        for part in parts {
            if let Some(t) = part.get("text").and_then(Value::as_str) {
                found = true;
                text.push_str(t);
            }
        }
        found.then_some(text)
    }

    /// `finishReason` of the first candidate.
    pub fn finish_reason(&self) -> Option<&str> {
        self.raw
            .get("candidates")?
            .get(0)?
            .get("finishReason")?
            .as_str()
    }

    pub fn usage(&self) -> TokenUsage {
        let meta = self.raw.get("usageMetadata");
        let count = |field: &str| {
            meta.and_then(|m| m.get(field))
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32
        };
        TokenUsage {
            input_tokens: count("promptTokenCount"),
            output_tokens: count("candidatesTokenCount"),
        }
    }

    /// String rendering of the whole response, used when no text is present.
    pub fn render_raw(&self) -> String {
        self.raw.to_string()
    }
}
