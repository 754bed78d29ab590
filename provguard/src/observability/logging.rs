//! Console and per-run file logging.
//!
//! The console shows events at the configured level (`RUST_LOG` wins when
//! set). When a layout is given, every event at DEBUG or above is also
//! written as JSON lines to `reports/logs/<script>_<run_id>.log`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::errors::{GuardError, Result, WriteError};
use crate::layout::Layout;
use crate::utils::generate_run_id;

/// What to log and where.
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Script whose run is being logged.
    pub script: String,
    /// Console level directive, usually the configured `log_level`.
    pub level: String,
    /// Layout providing the log directory. No file is written without one.
    pub layout: Option<Layout>,
    /// Identifier of this run.
    pub run_id: String,
    /// Whether the console output uses colors.
    pub ansi: bool,
}

impl LoggingOptions {
    /// Console-only logging at `info` for `script` with a fresh run id.
    #[must_use]
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            level: "info".to_string(),
            layout: None,
            run_id: generate_run_id(),
            ansi: true,
        }
    }

    /// Sets the console level.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Also writes a per-run log file under the layout's logs directory.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Uses a given run id.
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Enables or disables console colors.
    #[must_use]
    pub const fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

/// Keeps the file writer alive. Dropping it flushes pending lines.
#[derive(Debug)]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
    run_id: String,
}

impl LoggingGuard {
    /// Returns the per-run log file, if one is written.
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

/// Returns the log file name of a run: `<script stem>_<run_id>.log`.
#[must_use]
pub fn log_file_name(script: &str, run_id: &str) -> String {
    let stem = Path::new(script)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("run");
    format!("{stem}_{run_id}.log")
}

fn console_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_level(level: &str) -> LevelFilter {
    if level.trim().eq_ignore_ascii_case("trace") {
        LevelFilter::TRACE
    } else {
        LevelFilter::DEBUG
    }
}

/// Installs the global subscriber.
///
/// Fails with [`GuardError::Logging`] if a subscriber is already installed,
/// or with a write error if the log directory cannot be created.
pub fn init_logging(options: &LoggingOptions) -> Result<LoggingGuard> {
    let console = fmt::layer()
        .compact()
        .with_target(false)
        .with_ansi(options.ansi)
        .with_filter(console_filter(&options.level));

    let (file_layer, worker, log_file) = match &options.layout {
        Some(layout) => {
            let dir = layout.logs_dir();
            fs::create_dir_all(&dir).map_err(|e| WriteError::new(&dir, e))?;
            let name = log_file_name(&options.script, &options.run_id);
            let appender = tracing_appender::rolling::never(&dir, &name);
            let (writer, worker) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_level(&options.level));
            (Some(layer), Some(worker), Some(dir.join(name)))
        }
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| GuardError::Logging(e.to_string()))?;

    info!(
        script = %options.script,
        run_id = %options.run_id,
        log_file = ?log_file,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _worker: worker,
        log_file,
        run_id: options.run_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name_uses_script_stem() {
        assert_eq!(log_file_name("preprocess.py", "abc"), "preprocess_abc.log");
        assert_eq!(log_file_name("scripts/fit", "r1"), "fit_r1.log");
        assert_eq!(log_file_name("", "r1"), "run_r1.log");
    }

    #[test]
    fn test_file_level() {
        assert_eq!(file_level("info"), LevelFilter::DEBUG);
        assert_eq!(file_level("warn"), LevelFilter::DEBUG);
        assert_eq!(file_level("TRACE"), LevelFilter::TRACE);
    }

    #[test]
    fn test_options_builder() {
        let options = LoggingOptions::new("fit")
            .with_level("debug")
            .with_run_id("r1")
            .with_ansi(false);
        assert_eq!(options.level, "debug");
        assert_eq!(options.run_id, "r1");
        assert!(options.layout.is_none());
        assert!(!options.ansi);
    }

    // The only test in this crate that installs the global subscriber.
    #[test]
    fn test_init_logging_writes_run_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let options = LoggingOptions::new("fit.py")
            .with_run_id("r1")
            .with_ansi(false)
            .with_layout(layout.clone());

        let guard = init_logging(&options).unwrap();
        assert_eq!(guard.run_id(), "r1");
        assert_eq!(guard.log_file(), Some(layout.logs_dir().join("fit_r1.log").as_path()));
        tracing::debug!("file only");
        drop(guard);

        let written = fs::read_to_string(layout.logs_dir().join("fit_r1.log")).unwrap();
        assert!(written.contains("Logging initialized"));

        let again = init_logging(&options).unwrap_err();
        assert!(matches!(again, GuardError::Logging(_)));
    }
}
