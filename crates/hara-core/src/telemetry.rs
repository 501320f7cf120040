//! Tracing subscriber setup.
//!
//! Console output (plain or JSON) plus an optional JSONL run log on disk,
//! one file per day. `RUST_LOG` overrides the configured filter.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Whether to output JSON-structured logs to console.
    pub json_logs: bool,
    /// Log level filter (e.g., "hara=debug,warn").
    pub log_filter: String,
    /// Directory for JSONL run logs. `None` disables the file layer.
    pub log_dir: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_filter: "hara=info".into(),
            log_dir: None,
        }
    }
}

/// Path of today's run log inside `dir`.
pub fn run_log_path(dir: &Path) -> PathBuf {
    let today = chrono::Utc::now().format("%Y-%m-%d");
    dir.join(format!("run-{today}.jsonl"))
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the duration of the program.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    // Console goes to stderr so stdout stays clean for command output.
    let console_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE)
            .boxed()
    };

    let mut log_file = None;
    let file_layer = if let Some(ref dir) = config.log_dir {
        std::fs::create_dir_all(dir)
            .context(format!("failed to create log dir: {}", dir.display()))?;

        let path = run_log_path(dir);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context(format!("failed to open run log: {}", path.display()))?;
        log_file = Some(path);

        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(TelemetryGuard { log_file })
}

/// Handle returned by [`init_telemetry`].
#[derive(Debug)]
pub struct TelemetryGuard {
    log_file: Option<PathBuf>,
}

impl TelemetryGuard {
    /// The JSONL file events are appended to, if any.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}
