//! CLI binary for resume-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resume_extract::extract::write_text_atomic;
use resume_extract::{
    CancellationToken, ExtractError, ExtractionConfig, ExtractionProgressCallback, FileState,
    IncomingDocument, PollPolicy, ProgressCallback, ResumeExtractor,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a single spinner whose prefix tracks the
/// current stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading résumé…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_staged(&self, filename: &str, bytes: usize) {
        self.bar.set_prefix("Uploading");
        self.bar
            .set_message(format!("{filename} ({:.1} KB)", bytes as f64 / 1024.0));
    }

    fn on_uploaded(&self, remote_name: &str) {
        self.bar.println(format!("  {} uploaded as {}", green("✓"), dim(remote_name)));
        self.bar.set_prefix("Processing");
        self.bar.set_message("waiting for the service…");
    }

    fn on_poll(&self, attempt: u32, state: FileState) {
        self.bar.set_message(format!("check {attempt}: {state:?}"));
    }

    fn on_generating(&self, model: &str) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message(model.to_string());
    }

    fn on_complete(&self, text_len: usize) {
        self.bar.finish_and_clear();
        eprintln!("{} extracted {} chars", green("✔"), bold(&text_len.to_string()));
    }

    fn on_error(&self, error: &str) {
        self.bar.finish_and_clear();
        let first_line = error.lines().next().unwrap_or(error);
        eprintln!("{} {}", red("✘"), red(first_line));
    }
}

const TIMEOUT_HINT: &str =
    "Processing took too long; raise --poll-timeout or --max-poll-attempts.";

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract to stdout
  resume2text Resume.pdf

  # Extract to a file
  resume2text Resume.pdf -o resumeText.txt

  # Use a different model and a custom prompt
  resume2text --model gemini-2.5-flash --prompt my_prompt.txt Resume.pdf

  # JSON output with stats
  resume2text --json Resume.pdf > out.json

ENVIRONMENT VARIABLES:
  GEMINI_KEY              Gemini API key (GEMINI_API_KEY also accepted)
  RESUME_EXTRACT_MODEL    Override model ID
  RUST_LOG                Override log filter

  A .env file in the working directory is loaded before flags are parsed.
"#;

/// Extract plain text from PDF résumés with Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "resume2text",
    version,
    about = "Extract plain text from PDF résumés with Gemini",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write text to this file instead of stdout.
    #[arg(short, long, env = "RESUME2TEXT_OUTPUT")]
    output: Option<PathBuf>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model ID.
    #[arg(long, env = "RESUME_EXTRACT_MODEL", default_value = resume_extract::config::DEFAULT_MODEL)]
    model: String,

    /// API base URL.
    #[arg(long, env = "RESUME2TEXT_BASE_URL", default_value = resume_extract::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "RESUME2TEXT_PROMPT")]
    prompt: Option<PathBuf>,

    /// MIME type declared on upload.
    #[arg(long, default_value = "application/pdf")]
    mime_type: String,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RESUME2TEXT_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max output tokens.
    #[arg(long, env = "RESUME2TEXT_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: u32,

    /// Wait before the first processing-status check, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Give up waiting for processing after this many seconds.
    #[arg(long, default_value_t = 300)]
    poll_timeout: u64,

    /// Give up waiting for processing after this many status checks.
    #[arg(long, default_value_t = 60)]
    max_poll_attempts: u32,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "RESUME2TEXT_REQUEST_TIMEOUT", default_value_t = 120)]
    request_timeout: u64,

    /// Output structured JSON (ExtractionOutput) instead of plain text.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "RESUME2TEXT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Populate GEMINI_KEY etc. from .env before clap reads the environment.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let extractor = ResumeExtractor::new(config).context("Failed to initialise extractor")?;

    // Ctrl-C cancels the wait; cleanup still runs before we exit.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let document = IncomingDocument::from_path(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?
        .with_media_type(cli.mime_type.clone());

    let output = match extractor.extract_with_cancel(document, &cancel).await {
        Ok(output) => output,
        Err(e) => {
            let timed_out = matches!(e, ExtractError::Timeout { .. });
            let err = anyhow::Error::new(e).context("Extraction failed");
            return Err(if timed_out {
                err.context(TIMEOUT_HINT)
            } else {
                err
            });
        }
    };

    if output.is_degraded() && !cli.quiet {
        eprintln!(
            "{} model returned no text; writing the raw response instead",
            yellow("⚠")
        );
    }

    let rendered = if cli.json {
        serde_json::to_string_pretty(&output).context("Failed to serialise output")?
    } else {
        output.text.clone()
    };

    if let Some(ref path) = cli.output {
        write_text_atomic(path, &rendered)
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} chars  {}ms  →  {}",
                green("✔"),
                output.text.chars().count(),
                output.stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {} status checks",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output.stats.poll_attempts,
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let interval = Duration::from_millis(cli.poll_interval_ms.max(1));
    let poll = PollPolicy {
        initial_interval: interval,
        max_interval: PollPolicy::default().max_interval.max(interval),
        max_attempts: cli.max_poll_attempts,
        timeout: Duration::from_secs(cli.poll_timeout.max(1)),
        ..PollPolicy::default()
    };

    let mut builder = ExtractionConfig::builder()
        .model(cli.model.clone())
        .base_url(cli.base_url.clone())
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_tokens)
        .default_media_type(cli.mime_type.clone())
        .poll_policy(poll)
        .request_timeout_secs(cli.request_timeout);

    // GEMINI_API_KEY as a fallback for the clap-bound GEMINI_KEY.
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("GEMINI_API_KEY").ok());
    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }

    if let Some(ref path) = cli.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
