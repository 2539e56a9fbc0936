//! Gemini REST client implementing [`ContentService`].
//!
//! Endpoints used (all relative to the configured base URL):
//!
//! | Operation | Request |
//! |-----------|---------|
//! | upload    | `POST /upload/v1beta/files` (resumable start) then `POST <x-goog-upload-url>` |
//! | status    | `GET /v1beta/{name}` |
//! | delete    | `DELETE /v1beta/{name}` |
//! | generate  | `POST /v1beta/models/{model}:generateContent` |
//!
//! Authentication uses the `x-goog-api-key` header so the key never lands in
//! a URL (and therefore never in a log line that prints one).

use super::{
    ContentService, GenerateRequest, GenerateResponse, Part, RemoteFile, UploadRequest,
};
use crate::config::ExtractionConfig;
use crate::error::ServiceError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Longest slice of an unparseable body quoted in a decode error.
const BODY_SNIPPET_LEN: usize = 200;

/// `reqwest`-backed Gemini client. Cheap to clone; share one per process.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct UploadMetadata<'a> {
    file: UploadFileMetadata<'a>,
}

#[derive(Serialize)]
struct UploadFileMetadata<'a> {
    display_name: &'a str,
}

#[derive(Deserialize)]
struct UploadEnvelope {
    file: RemoteFile,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerateRequest<'a> {
    contents: [WireContent<'a>; 1],
    generation_config: WireGenerationConfig,
}

#[derive(Serialize)]
struct WireContent<'a> {
    role: &'static str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: WireFileData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl<'a> WireGenerateRequest<'a> {
    fn from_request(request: &'a GenerateRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart::Text { text },
                Part::FileData {
                    mime_type,
                    file_uri,
                } => WirePart::FileData {
                    file_data: WireFileData {
                        mime_type,
                        file_uri,
                    },
                },
            })
            .collect();

        Self {
            contents: [WireContent {
                role: "user",
                parts,
            }],
            generation_config: WireGenerationConfig {
                temperature: request.config.temperature,
                max_output_tokens: request.config.max_output_tokens,
            },
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────────

impl GeminiClient {
    /// Build a client for `base_url` with a per-request timeout.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from the key, endpoint and timeout in `config`.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ServiceError> {
        Self::new(
            config.api_key.clone(),
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn resource_url(&self, name: &str) -> String {
        format!("{}/v1beta/{}", self.base_url, name.trim_start_matches('/'))
    }

    fn generate_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl ContentService for GeminiClient {
    async fn upload_file(
        &self,
        path: &Path,
        request: &UploadRequest,
    ) -> Result<RemoteFile, ServiceError> {
        let bytes = tokio::fs::read(path).await?;
        let len = bytes.len().to_string();

        // 1) Open a resumable session.
        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", &len)
            .header("X-Goog-Upload-Header-Content-Type", &request.mime_type)
            .json(&UploadMetadata {
                file: UploadFileMetadata {
                    display_name: &request.display_name,
                },
            })
            .send()
            .await?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(ServiceError::MissingUploadUrl)?
            .to_string();
        debug!("Upload session opened for {}", request.display_name);

        // 2) Send the bytes and finalise in one request.
        let resp = self
            .http
            .post(upload_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_LENGTH, &len)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let envelope: UploadEnvelope = decode_json(check_status(resp).await?).await?;
        Ok(envelope.file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, ServiceError> {
        let resp = self
            .http
            .get(self.resource_url(name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        decode_json(check_status(resp).await?).await
    }

    async fn delete_file(&self, name: &str) -> Result<(), ServiceError> {
        let resp = self
            .http
            .delete(self.resource_url(name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ServiceError> {
        let resp = self
            .http
            .post(self.generate_url(model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&WireGenerateRequest::from_request(request))
            .send()
            .await?;
        let raw: serde_json::Value = decode_json(check_status(resp).await?).await?;
        Ok(GenerateResponse::new(raw))
    }
}

/// Pass a success response through; turn anything else into a [`ServiceError`].
async fn check_status(resp: Response) -> Result<Response, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after_secs = resp
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(env) => match env.error.status {
            Some(s) if !s.is_empty() => format!("{s}: {}", env.error.message),
            _ => env.error.message,
        },
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
        Err(_) => snippet(&body),
    };

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Auth {
            status: status.as_u16(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimited { retry_after_secs },
        _ => ServiceError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, ServiceError> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| ServiceError::Decode(format!("{e}: {}", snippet(&body))))
}

fn snippet(body: &str) -> String {
    if body.len() <= BODY_SNIPPET_LEN {
        return body.to_string();
    }
    let mut end = BODY_SNIPPET_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\u{2026}", &body[..end])
}
