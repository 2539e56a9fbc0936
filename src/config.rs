//! Configuration types for résumé extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The API key is a required builder
//! parameter: [`ExtractionConfigBuilder::build`] fails fast with
//! [`ExtractError::MissingApiKey`] instead of letting the first remote call
//! discover that it is missing.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use crate::service::ContentService;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default Gemini model used for extraction.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variables consulted by [`ExtractionConfig::from_env`], in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_KEY", "GEMINI_API_KEY"];

/// Optional model override read by [`ExtractionConfig::from_env`].
pub const MODEL_ENV_VAR: &str = "RESUME_EXTRACT_MODEL";

/// Configuration for a résumé extraction.
///
/// # Example
/// ```rust
/// use resume_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .api_key("test-key")
///     .model("gemini-2.5-flash")
///     .max_output_tokens(4096)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-2.5-flash");
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Gemini API key. Required.
    pub api_key: String,

    /// Model identifier passed to `generateContent`. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// REST endpoint root. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Sampling temperature. Default: 0.0.
    ///
    /// Extraction must be a faithful transcription, so the default is fully
    /// deterministic.
    pub temperature: f32,

    /// Upper bound on generated tokens. Default: 8192.
    pub max_output_tokens: u32,

    /// Custom extraction prompt. If None, uses
    /// [`crate::prompts::RESUME_EXTRACTION_PROMPT`].
    pub prompt: Option<String>,

    /// MIME type declared on upload when the document does not carry one.
    /// Default: `application/pdf`.
    pub default_media_type: String,

    /// Readiness polling schedule.
    pub poll: PollPolicy,

    /// Per-HTTP-request timeout in seconds. Default: 120.
    pub request_timeout_secs: u64,

    /// Pre-constructed content service. Takes precedence over building a
    /// [`crate::service::GeminiClient`] from `api_key` / `base_url`.
    pub service: Option<Arc<dyn ContentService>>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            max_output_tokens: 8192,
            prompt: None,
            default_media_type: "application/pdf".to_string(),
            poll: PollPolicy::default(),
            request_timeout_secs: 120,
            service: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("default_media_type", &self.default_media_type)
            .field("poll", &self.poll)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("service", &self.service.as_ref().map(|_| "<dyn ContentService>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from the process environment.
    ///
    /// Reads the API key from `GEMINI_KEY`, then `GEMINI_API_KEY`, and an
    /// optional model from `RESUME_EXTRACT_MODEL`. Everything else keeps its
    /// default.
    pub fn from_env() -> Result<Self, ExtractError> {
        let mut builder = Self::builder();
        if let Some(key) = API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty())
        {
            builder = builder.api_key(key);
        }
        if let Ok(model) = std::env::var(MODEL_ENV_VAR) {
            if !model.trim().is_empty() {
                builder = builder.model(model);
            }
        }
        builder.build()
    }

    /// The prompt actually sent with each generation request.
    pub fn effective_prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .unwrap_or(crate::prompts::RESUME_EXTRACTION_PROMPT)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn default_media_type(mut self, mime: impl Into<String>) -> Self {
        self.config.default_media_type = mime.into();
        self
    }

    pub fn poll_policy(mut self, policy: PollPolicy) -> Self {
        self.config.poll = policy;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll.initial_interval = interval;
        self.config.poll.max_interval = self.config.poll.max_interval.max(interval);
        self
    }

    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.config.poll.timeout = timeout;
        self
    }

    pub fn max_poll_attempts(mut self, n: u32) -> Self {
        self.config.poll.max_attempts = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn service(mut self, service: Arc<dyn ContentService>) -> Self {
        self.config.service = Some(service);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.api_key.trim().is_empty() {
            return Err(ExtractError::MissingApiKey {
                hint: format!(
                    "Set {} (or pass --api-key).",
                    API_KEY_ENV_VARS.join(" or ")
                ),
            });
        }
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_output_tokens == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ExtractError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got '{}'",
                c.base_url
            )));
        }
        c.poll.validate()?;
        Ok(self.config)
    }
}

// ── Polling ──────────────────────────────────────────────────────────────

/// Bounded exponential-backoff schedule for readiness polling.
///
/// The wait before poll `n` (1-indexed) is
/// `min(initial_interval * multiplier^(n-1), max_interval)`. Polling stops
/// with [`ExtractError::Timeout`] after `max_attempts` status lookups or once
/// `timeout` has elapsed since the upload completed, whichever comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Wait before the first status lookup. Default: 2 s.
    pub initial_interval: Duration,
    /// Growth factor applied after each lookup. Default: 1.5.
    pub multiplier: f64,
    /// Ceiling on a single wait. Default: 10 s.
    pub max_interval: Duration,
    /// Maximum number of status lookups. Default: 60.
    pub max_attempts: u32,
    /// Overall deadline for the readiness wait. Default: 5 min.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            multiplier: 1.5,
            max_interval: Duration::from_secs(10),
            max_attempts: 60,
            timeout: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    /// A constant-interval policy (multiplier 1.0).
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            initial_interval: interval,
            multiplier: 1.0,
            max_interval: interval,
            max_attempts,
            timeout: interval.saturating_mul(max_attempts.max(1)),
        }
    }

    /// Delay before the given 1-indexed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_interval;
        if self.multiplier > 1.0 {
            for _ in 1..attempt {
                // Out-of-range products saturate at the ceiling.
                match Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier) {
                    Ok(next) => delay = next,
                    Err(_) => return self.max_interval,
                }
                if delay >= self.max_interval {
                    break;
                }
            }
        }
        delay.min(self.max_interval)
    }

    fn validate(&self) -> Result<(), ExtractError> {
        if self.max_attempts == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_poll_attempts must be ≥ 1".into(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ExtractError::InvalidConfig(format!(
                "poll multiplier must be ≥ 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_interval < self.initial_interval {
            return Err(ExtractError::InvalidConfig(
                "poll max_interval must be ≥ initial_interval".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ExtractError::InvalidConfig("poll timeout must be > 0".into()));
        }
        Ok(())
    }
}
