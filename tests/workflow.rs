//! Workflow tests against an in-process fake content service.
//!
//! The fake records every call so the tests can assert the exact sequence
//! the workflow issues (upload → get* → generate → delete) and inspect the
//! staged file path it was handed.

use async_trait::async_trait;
use resume_extract::{
    CancellationToken, ContentService, ExtractError, ExtractionConfig, FileState,
    GenerateRequest, GenerateResponse, IncomingDocument, Part, PollPolicy, RemoteFile,
    ResumeExtractor, ServiceError, TextSource, UploadRequest,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fake service ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Upload { display_name: String, mime_type: String },
    Get(String),
    Generate { model: String, parts: Vec<Part> },
    Delete(String),
}

struct FakeService {
    calls: Mutex<Vec<Call>>,
    staged_path: Mutex<Option<PathBuf>>,
    staged_bytes: Mutex<Option<Vec<u8>>>,
    upload_state: FileState,
    fail_upload: bool,
    /// States returned by successive `get_file` calls; the last one repeats.
    poll_states: Mutex<VecDeque<FileState>>,
    generate_body: Value,
    fail_generate: bool,
    fail_delete: bool,
}

impl Default for FakeService {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            staged_path: Mutex::new(None),
            staged_bytes: Mutex::new(None),
            upload_state: FileState::Active,
            fail_upload: false,
            poll_states: Mutex::new(VecDeque::from([FileState::Active])),
            generate_body: text_response("Experience\n• Built X"),
            fail_generate: false,
            fail_delete: false,
        }
    }
}

impl FakeService {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn staged_path(&self) -> Option<PathBuf> {
        self.staged_path.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

const REMOTE_NAME: &str = "files/resume-123";

fn remote(state: FileState) -> RemoteFile {
    RemoteFile {
        name: REMOTE_NAME.to_string(),
        display_name: Some("cv.pdf".into()),
        mime_type: Some("application/pdf".into()),
        uri: Some(format!("https://example.test/v1beta/{REMOTE_NAME}")),
        state,
        ..Default::default()
    }
}

fn text_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 1500, "candidatesTokenCount": 320 }
    })
}

#[async_trait]
impl ContentService for FakeService {
    async fn upload_file(
        &self,
        path: &Path,
        request: &UploadRequest,
    ) -> Result<RemoteFile, ServiceError> {
        self.record(Call::Upload {
            display_name: request.display_name.clone(),
            mime_type: request.mime_type.clone(),
        });
        *self.staged_path.lock().unwrap() = Some(path.to_path_buf());
        *self.staged_bytes.lock().unwrap() = std::fs::read(path).ok();
        if self.fail_upload {
            return Err(ServiceError::Api {
                status: 503,
                message: "upload backend unavailable".into(),
            });
        }
        Ok(remote(self.upload_state))
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, ServiceError> {
        self.record(Call::Get(name.to_string()));
        let mut states = self.poll_states.lock().unwrap();
        let state = if states.len() > 1 {
            states.pop_front().unwrap_or(FileState::Active)
        } else {
            states.front().copied().unwrap_or(FileState::Active)
        };
        let mut file = remote(state);
        if state == FileState::Failed {
            file.error = Some(resume_extract::service::RemoteStatus {
                code: 3,
                message: "document could not be parsed".into(),
            });
        }
        Ok(file)
    }

    async fn delete_file(&self, name: &str) -> Result<(), ServiceError> {
        self.record(Call::Delete(name.to_string()));
        if self.fail_delete {
            return Err(ServiceError::Api {
                status: 500,
                message: "delete failed".into(),
            });
        }
        Ok(())
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ServiceError> {
        self.record(Call::Generate {
            model: model.to_string(),
            parts: request.parts.clone(),
        });
        if self.fail_generate {
            return Err(ServiceError::Auth {
                status: 403,
                message: "API key not valid".into(),
            });
        }
        Ok(GenerateResponse::new(self.generate_body.clone()))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// 1 ms checks with a deadline far enough out that only the attempt cap bites.
fn fast_poll(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        timeout: Duration::from_secs(30),
        ..PollPolicy::fixed(Duration::from_millis(1), max_attempts)
    }
}

fn extractor(service: Arc<FakeService>) -> ResumeExtractor {
    extractor_with(service, fast_poll(20))
}

fn extractor_with(service: Arc<FakeService>, poll: PollPolicy) -> ResumeExtractor {
    let config = ExtractionConfig::builder()
        .api_key("test-key")
        .poll_policy(poll)
        .service(service)
        .build()
        .expect("valid config");
    ResumeExtractor::new(config).expect("extractor")
}

fn pdf(name: &str) -> IncomingDocument {
    IncomingDocument::from_bytes(b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n".to_vec(), name)
}

fn is_delete(c: &Call) -> bool {
    matches!(c, Call::Delete(n) if n == REMOTE_NAME)
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_document_fails_validation_without_remote_calls() {
    let svc = Arc::new(FakeService::default());
    let err = extractor(svc.clone())
        .extract(IncomingDocument::from_bytes(Vec::new(), "blank.pdf"))
        .await
        .unwrap_err();

    match err {
        ExtractError::Validation { ref filename } => assert_eq!(filename, "blank.pdf"),
        other => panic!("expected Validation, got {other:?}"),
    }
    assert!(err.to_string().contains("blank.pdf"));
    assert!(svc.calls().is_empty(), "no remote calls expected: {:?}", svc.calls());
    assert!(svc.staged_path().is_none());
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn successful_extraction_passes_text_through() {
    let svc = Arc::new(FakeService::default());
    let out = extractor(svc.clone()).extract(pdf("cv.pdf")).await.unwrap();

    assert_eq!(out.text, "Experience\n• Built X");
    assert_eq!(out.source, TextSource::Candidates);
    assert!(!out.is_degraded());
    assert_eq!(out.remote_file, REMOTE_NAME);
    assert_eq!(out.stats.input_tokens, 1500);
    assert_eq!(out.stats.output_tokens, 320);
    assert_eq!(out.stats.poll_attempts, 0);
    assert_eq!(out.stats.finish_reason.as_deref(), Some("STOP"));
}

#[tokio::test]
async fn calls_are_issued_in_order() {
    let svc = Arc::new(FakeService {
        upload_state: FileState::Processing,
        poll_states: Mutex::new(VecDeque::from([
            FileState::Processing,
            FileState::Processing,
            FileState::Active,
        ])),
        ..Default::default()
    });
    let out = extractor(svc.clone()).extract(pdf("cv.pdf")).await.unwrap();
    assert_eq!(out.stats.poll_attempts, 3);

    let calls = svc.calls();
    assert_eq!(
        calls[0],
        Call::Upload {
            display_name: "cv.pdf".into(),
            mime_type: "application/pdf".into()
        }
    );
    assert_eq!(calls[1], Call::Get(REMOTE_NAME.into()));
    assert_eq!(calls[2], Call::Get(REMOTE_NAME.into()));
    assert_eq!(calls[3], Call::Get(REMOTE_NAME.into()));
    assert!(matches!(&calls[4], Call::Generate { model, .. } if model == "gemini-2.5-flash-lite"));
    assert_eq!(calls[5], Call::Delete(REMOTE_NAME.into()));
    assert_eq!(calls.len(), 6);
}

#[tokio::test]
async fn generation_gets_prompt_then_file_reference() {
    let svc = Arc::new(FakeService::default());
    extractor(svc.clone()).extract(pdf("cv.pdf")).await.unwrap();

    let parts = svc
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::Generate { parts, .. } => Some(parts),
            _ => None,
        })
        .expect("generate call");
    assert_eq!(parts.len(), 2);
    assert_eq!(
        parts[0],
        Part::Text(resume_extract::prompts::RESUME_EXTRACTION_PROMPT.to_string())
    );
    assert_eq!(
        parts[1],
        Part::FileData {
            mime_type: "application/pdf".into(),
            file_uri: format!("https://example.test/v1beta/{REMOTE_NAME}"),
        }
    );
}

#[tokio::test]
async fn staged_file_holds_payload_and_is_removed() {
    let svc = Arc::new(FakeService::default());
    let doc = pdf("cv.pdf");
    extractor(svc.clone()).extract(doc).await.unwrap();

    let staged = svc.staged_path().expect("upload saw a path");
    assert_eq!(staged.extension().and_then(|e| e.to_str()), Some("pdf"));
    assert_eq!(
        svc.staged_bytes.lock().unwrap().as_deref(),
        Some(&b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n"[..])
    );
    assert!(!staged.exists(), "staged file should be deleted");
}

#[tokio::test]
async fn declared_media_type_is_used_for_upload() {
    let svc = Arc::new(FakeService::default());
    extractor(svc.clone())
        .extract(pdf("cv.pdf").with_media_type("application/x-pdf"))
        .await
        .unwrap();
    assert!(matches!(
        &svc.calls()[0],
        Call::Upload { mime_type, .. } if mime_type == "application/x-pdf"
    ));
}

// ── Degraded responses ───────────────────────────────────────────────────────

#[tokio::test]
async fn response_without_text_returns_raw_rendering() {
    let body = json!({
        "candidates": [{ "finishReason": "SAFETY" }],
        "promptFeedback": { "blockReason": "OTHER" }
    });
    let svc = Arc::new(FakeService {
        generate_body: body.clone(),
        ..Default::default()
    });
    let out = extractor(svc.clone()).extract(pdf("cv.pdf")).await.unwrap();

    assert_eq!(out.text, body.to_string());
    assert_eq!(out.source, TextSource::RawResponse);
    assert!(out.is_degraded());
    assert_eq!(svc.count(is_delete), 1);
}

// ── Remote failures ──────────────────────────────────────────────────────────

// ── Readiness ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unspecified_state_counts_as_ready() {
    let svc = Arc::new(FakeService {
        upload_state: FileState::Processing,
        poll_states: Mutex::new(VecDeque::from([
            FileState::Processing,
            FileState::Unspecified,
        ])),
        ..Default::default()
    });
    let out = extractor(svc.clone()).extract(pdf("cv.pdf")).await.unwrap();

    assert_eq!(out.text, "Experience\n• Built X");
    assert_eq!(out.stats.poll_attempts, 2);
    assert_eq!(svc.count(|c| matches!(c, Call::Get(_))), 2);
    assert_eq!(svc.count(|c| matches!(c, Call::Generate { .. })), 1);
    assert_eq!(svc.count(is_delete), 1);
}

#[tokio::test]
async fn unspecified_state_on_upload_skips_polling() {
    let svc = Arc::new(FakeService {
        upload_state: FileState::Unspecified,
        ..Default::default()
    });
    extractor(svc.clone()).extract(pdf("cv.pdf")).await.unwrap();

    assert_eq!(svc.count(|c| matches!(c, Call::Get(_))), 0);
    assert_eq!(svc.count(|c| matches!(c, Call::Generate { .. })), 1);
    assert_eq!(svc.count(is_delete), 1);
}

#[tokio::test]
async fn extreme_backoff_multiplier_completes_and_cleans_up() {
    let svc = Arc::new(FakeService {
        upload_state: FileState::Processing,
        poll_states: Mutex::new(VecDeque::from([
            FileState::Processing,
            FileState::Processing,
            FileState::Active,
        ])),
        ..Default::default()
    });
    let policy = PollPolicy {
        initial_interval: Duration::from_millis(1),
        multiplier: 1e300,
        max_interval: Duration::from_millis(5),
        max_attempts: 10,
        timeout: Duration::from_secs(30),
    };
    let out = extractor_with(svc.clone(), policy)
        .extract(pdf("cv.pdf"))
        .await
        .unwrap();

    assert_eq!(out.stats.poll_attempts, 3);
    assert_eq!(svc.count(|c| matches!(c, Call::Generate { .. })), 1);
    assert_eq!(svc.count(is_delete), 1);
    assert!(!svc.staged_path().unwrap().exists());
}

#[tokio::test]
async fn failed_processing_never_generates() {
    let svc = Arc::new(FakeService {
        upload_state: FileState::Processing,
        poll_states: Mutex::new(VecDeque::from([FileState::Processing, FileState::Failed])),
        ..Default::default()
    });
    let err = extractor(svc.clone()).extract(pdf("cv.pdf")).await.unwrap_err();

    match err {
        ExtractError::RemoteProcessing { ref name, ref detail } => {
            assert_eq!(name, REMOTE_NAME);
            assert!(detail.contains("could not be parsed"), "got: {detail}");
        }
        other => panic!("expected RemoteProcessing, got {other:?}"),
    }
    assert_eq!(svc.count(|c| matches!(c, Call::Generate { .. })), 0);
    assert_eq!(svc.count(is_delete), 1);
    assert!(!svc.staged_path().unwrap().exists());
}

#[tokio::test]
async fn failed_state_on_upload_is_terminal() {
    let svc = Arc::new(FakeService {
        upload_state: FileState::Failed,
        ..Default::default()
    });
    let err = extractor(svc.clone()).extract(pdf("cv.pdf")).await.unwrap_err();
    assert!(matches!(err, ExtractError::RemoteProcessing { .. }));
    assert_eq!(svc.count(|c| matches!(c, Call::Get(_))), 0);
    assert_eq!(svc.count(|c| matches!(c, Call::Generate { .. })), 0);
}

#[tokio::test]
async fn upload_error_is_wrapped_and_skips_remote_delete() {
    let svc = Arc::new(FakeService {
        fail_upload: true,
        ..Default::default()
    });
    let err = extractor(svc.clone()).extract(pdf("cv.pdf")).await.unwrap_err();

    match err {
        ExtractError::Extraction { ref filename, ref message } => {
            assert_eq!(filename, "cv.pdf");
            assert!(message.contains("upload backend unavailable"), "got: {message}");
        }
        other => panic!("expected Extraction, got {other:?}"),
    }
    assert_eq!(svc.count(|c| matches!(c, Call::Delete(_))), 0);
    assert!(!svc.staged_path().unwrap().exists());
}

#[tokio::test]
async fn generation_error_is_wrapped_and_cleans_up() {
    let svc = Arc::new(FakeService {
        fail_generate: true,
        ..Default::default()
    });
    let err = extractor(svc.clone()).extract(pdf("cv.pdf")).await.unwrap_err();

    assert!(matches!(err, ExtractError::Extraction { .. }));
    assert!(err.to_string().contains("API key not valid"));
    assert_eq!(svc.count(is_delete), 1);
    assert!(!svc.staged_path().unwrap().exists());
}

#[tokio::test]
async fn poll_budget_exhaustion_times_out() {
    let svc = Arc::new(FakeService {
        upload_state: FileState::Processing,
        poll_states: Mutex::new(VecDeque::from([FileState::Processing])),
        ..Default::default()
    });
    let err = extractor_with(svc.clone(), fast_poll(3))
        .extract(pdf("cv.pdf"))
        .await
        .unwrap_err();

    match err {
        ExtractError::Timeout { attempts, ref name, .. } => {
            assert_eq!(attempts, 3);
            assert_eq!(name, REMOTE_NAME);
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert_eq!(svc.count(|c| matches!(c, Call::Get(_))), 3);
    assert_eq!(svc.count(|c| matches!(c, Call::Generate { .. })), 0);
    assert_eq!(svc.count(is_delete), 1);
}

#[tokio::test]
async fn cancellation_still_cleans_up() {
    let svc = Arc::new(FakeService {
        upload_state: FileState::Processing,
        poll_states: Mutex::new(VecDeque::from([FileState::Processing])),
        ..Default::default()
    });
    let policy = PollPolicy {
        initial_interval: Duration::from_millis(20),
        multiplier: 1.0,
        max_interval: Duration::from_millis(20),
        max_attempts: 10_000,
        timeout: Duration::from_secs(60),
    };
    let ex = extractor_with(svc.clone(), policy);

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = ex.extract_with_cancel(pdf("cv.pdf"), &token).await.unwrap_err();
    assert!(matches!(err, ExtractError::Cancelled { .. }), "got {err:?}");
    assert_eq!(svc.count(|c| matches!(c, Call::Generate { .. })), 0);
    assert_eq!(svc.count(is_delete), 1);
    assert!(!svc.staged_path().unwrap().exists());
}

// ── Cleanup policy ───────────────────────────────────────────────────────────

#[tokio::test]
async fn remote_delete_failure_does_not_change_result() {
    let svc = Arc::new(FakeService {
        fail_delete: true,
        ..Default::default()
    });
    let out = extractor(svc.clone()).extract(pdf("cv.pdf")).await.unwrap();
    assert_eq!(out.text, "Experience\n• Built X");
    assert_eq!(svc.count(is_delete), 1);
    assert!(!svc.staged_path().unwrap().exists());
}

// ── File entry points ────────────────────────────────────────────────────────

#[tokio::test]
async fn extract_to_file_writes_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Resume.pdf");
    std::fs::write(&input, b"%PDF-1.4 resume").unwrap();
    let output = dir.path().join("resumeText.txt");

    let svc = Arc::new(FakeService::default());
    let stats = extractor(svc.clone())
        .extract_to_file(&input, &output)
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&output).unwrap(), "Experience\n• Built X");
    assert_eq!(stats.document_bytes, 15);
    assert!(matches!(
        &svc.calls()[0],
        Call::Upload { display_name, .. } if display_name == "Resume.pdf"
    ));
}

#[tokio::test]
async fn missing_input_file_is_an_input_error() {
    let svc = Arc::new(FakeService::default());
    let err = extractor(svc.clone())
        .extract_file("/no/such/Resume.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::FileNotFound { .. }));
    assert!(err.is_validation());
    assert!(svc.calls().is_empty());
}

#[tokio::test]
async fn extractor_is_reusable_across_calls() {
    let svc = Arc::new(FakeService::default());
    let ex = extractor(svc.clone());

    let (a, b) = tokio::join!(ex.extract(pdf("a.pdf")), ex.extract(pdf("b.pdf")));
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(svc.count(|c| matches!(c, Call::Upload { .. })), 2);
    assert_eq!(svc.count(|c| matches!(c, Call::Generate { .. })), 2);
    assert_eq!(svc.count(|c| matches!(c, Call::Delete(_))), 2);
}

#[test]
fn config_without_key_is_rejected() {
    let result = ExtractionConfig::builder()
        .service(Arc::new(FakeService::default()))
        .build();
    tokio_test::assert_err!(result);
}
