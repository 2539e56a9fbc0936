//! Build the extraction request and read the text back.
//!
//! The request carries exactly two parts, in order: the extraction prompt,
//! then a reference to the uploaded file. On the way back, a response
//! without any text part is not treated as a failure; its raw JSON rendering
//! becomes the result and [`TextSource::RawResponse`] marks it as degraded.

use crate::config::ExtractionConfig;
use crate::error::ServiceError;
use crate::output::TextSource;
use crate::service::{GenerateRequest, GenerateResponse, GenerationConfig, Part, RemoteFile, TokenUsage};
use tracing::warn;

/// The text pulled out of a generation response.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub text: String,
    pub source: TextSource,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Assemble the `[prompt, file]` request for a ready remote file.
pub fn build_request(
    config: &ExtractionConfig,
    file: &RemoteFile,
    media_type: &str,
) -> Result<GenerateRequest, ServiceError> {
    let file_uri = file
        .uri
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ServiceError::Decode(format!("uploaded file {} has no uri", file.name)))?;

    let mime_type = file
        .mime_type
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| media_type.to_string());

    Ok(GenerateRequest {
        parts: vec![
            Part::Text(config.effective_prompt().to_string()),
            Part::FileData {
                mime_type,
                file_uri,
            },
        ],
        config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        },
    })
}

/// Pull the text out of `response`, falling back to its raw rendering.
pub fn interpret(response: &GenerateResponse) -> Extracted {
    let finish_reason = response.finish_reason().map(str::to_string);
    let usage = response.usage();

    match response.text() {
        Some(text) => Extracted {
            text,
            source: TextSource::Candidates,
            usage,
            finish_reason,
        },
        None => {
            warn!(
                "Generation response carried no text (finish reason: {}); returning raw response",
                finish_reason.as_deref().unwrap_or("none")
            );
            Extracted {
                text: response.render_raw(),
                source: TextSource::RawResponse,
                usage,
                finish_reason,
            }
        }
    }
}
