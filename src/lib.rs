//! # resume-extract
//!
//! Extract faithful, order-preserving plain text from PDF résumés using the
//! Gemini file + generation API.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Validate  reject empty payloads before touching the network
//!  ├─ 2. Stage     write a scoped `.pdf` temp file
//!  ├─ 3. Upload    resumable upload to the Files API
//!  ├─ 4. Poll      bounded backoff until the file leaves PROCESSING
//!  ├─ 5. Generate  [extraction prompt, file] at temperature 0
//!  └─ 6. Cleanup   delete the remote file, release the temp file (always)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume_extract::{ExtractionConfig, ResumeExtractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_KEY (or GEMINI_API_KEY)
//!     let config = ExtractionConfig::from_env()?;
//!     let extractor = ResumeExtractor::new(config)?;
//!     let output = extractor.extract_file("Resume.pdf").await?;
//!     std::fs::write("resumeText.txt", &output.text)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resume2text` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resume-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, PollPolicy};
pub use error::{ExtractError, ServiceError};
pub use extract::{extract_file, extract_sync, extract_to_file, write_text_atomic, ResumeExtractor};
pub use output::{ExtractionOutput, ExtractionStats, TextSource};
pub use pipeline::input::IncomingDocument;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use service::{
    ContentService, FileState, GeminiClient, GenerateRequest, GenerateResponse, GenerationConfig,
    Part, RemoteFile, TokenUsage, UploadRequest,
};
pub use tokio_util::sync::CancellationToken;
