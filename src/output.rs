//! Result types returned by the extraction entry points.

use serde::{Deserialize, Serialize};

/// Where the returned text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Text parts of the first response candidate.
    Candidates,
    /// The response had no text; this is its raw JSON rendering.
    RawResponse,
}

/// The extracted text plus what it took to get it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Extracted plain text, exactly as returned by the model.
    pub text: String,
    pub source: TextSource,
    /// Remote resource name the text was generated from (already deleted).
    pub remote_file: String,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// True when the text is a raw-response fallback rather than model output.
    pub fn is_degraded(&self) -> bool {
        self.source == TextSource::RawResponse
    }
}

/// Timing and token accounting for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub document_bytes: usize,
    pub poll_attempts: u32,
    pub upload_duration_ms: u64,
    pub processing_duration_ms: u64,
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: Option<String>,
}
