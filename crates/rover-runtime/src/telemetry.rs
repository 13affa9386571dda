//! `tracing` subscriber setup for the rover binary.
//!
//! Call [`init_tracing`] once at startup and keep the returned guard alive
//! until exit.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `ROVER_LOG_FORMAT=json` | Newline-delimited JSON instead of compact text. |
//! | `ROVER_LOG_DIR` | Also append plain-text logs to `<dir>/rover-<unix seconds>.log`, one file per run. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP/HTTP collector URL, e.g. `http://localhost:4318`. Enables span export; every supervisor cycle becomes a span. |
//!
//! # Example
//!
//! ```rust,no_run
//! let _guard = rover_runtime::telemetry::init_tracing("rover");
//! ```

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log line encoding selected by `ROVER_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    /// Anything other than `json` (case-insensitive) means compact text.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::var("ROVER_LOG_FORMAT").ok().as_deref())
    }
}

/// Install the global subscriber: env filter, compact or JSON lines on
/// stderr, an optional per-run log file, and OTLP span export when an
/// endpoint is configured.
///
/// Dropping the returned [`TracerProviderGuard`] flushes pending spans.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = LogFormat::from_env();
    let provider = build_provider(service_name);

    let otel = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("rover")));
    let (json, compact) = match format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
            None,
        ),
        LogFormat::Compact => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    let file = log_file_from_env().map(|f| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(f)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(otel)
        .with(json)
        .with(compact)
        .with(file)
        .init();

    TracerProviderGuard(provider)
}

/// Shuts the OTel provider down on drop, flushing spans.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    /// `true` when spans are being exported.
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("[rover] OpenTelemetry provider shutdown error: {e}");
            }
        }
    }
}

/// Per-run log file name inside `dir`.
pub fn log_file_path(dir: &Path, started_unix_s: u64) -> PathBuf {
    dir.join(format!("rover-{started_unix_s}.log"))
}

/// Create `dir` if needed and open this run's log file for appending.
fn open_log_file(dir: &Path, started_unix_s: u64) -> io::Result<Arc<File>> {
    fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(dir, started_unix_s))?;
    Ok(Arc::new(file))
}

fn log_file_from_env() -> Option<Arc<File>> {
    let dir = PathBuf::from(std::env::var_os("ROVER_LOG_DIR")?);
    let started = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    open_log_file(&dir, started)
        .map_err(|e| eprintln!("[rover] log file in {} unavailable: {e}", dir.display()))
        .ok()
}

fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[rover] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // Simple exporter: the rover is single-threaded and runs no async runtime
    // for a batch processor to spawn onto.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("pretty")), LogFormat::Compact);
        assert_eq!(LogFormat::parse(None), LogFormat::Compact);
    }

    #[test]
    fn no_endpoint_means_no_provider() {
        // SAFETY: no other test in this crate reads this variable.
        unsafe { std::env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT") };
        assert!(build_provider("rover-test").is_none());
    }

    #[test]
    fn log_file_is_named_per_run() {
        assert_eq!(
            log_file_path(Path::new("/var/log/rover"), 1_700_000_000),
            PathBuf::from("/var/log/rover/rover-1700000000.log")
        );
    }

    #[test]
    fn log_file_is_created_and_appended() {
        use std::io::Write;

        let dir = tempfile::tempdir().expect("tmp dir");
        let logs = dir.path().join("logs");
        {
            let file = open_log_file(&logs, 42).expect("open");
            (&*file).write_all(b"first\n").expect("write");
        }
        {
            let file = open_log_file(&logs, 42).expect("reopen");
            (&*file).write_all(b"second\n").expect("write");
        }
        let text = fs::read_to_string(logs.join("rover-42.log")).expect("read");
        assert_eq!(text, "first\nsecond\n");
    }

    #[test]
    fn empty_guard_drops_quietly() {
        let guard = TracerProviderGuard(None);
        assert!(!guard.is_exporting());
        drop(guard);
    }
}
