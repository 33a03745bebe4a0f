//! Tracing subscriber setup
//!
//! Logs go to stderr by default, or to a non-blocking file writer under the data
//! directory when requested. The filter is read from `DEP_FRESHNESS_LOG`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the tracing filter directive
pub const LOG_ENV: &str = "DEP_FRESHNESS_LOG";

const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(String),
}

/// Where log lines are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub target: LogTarget,
    pub json: bool,
}

/// Install the global subscriber. Subsequent calls are no-ops.
pub fn init(options: &LogOptions) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let filter = build_env_filter();

    let (writer, guard) = match &options.target {
        LogTarget::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogTarget::File(path) => {
            let (dir, file_name) = split_log_path(path);
            std::fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name))
        }
    };

    let ansi = options.target == LogTarget::Stderr;
    let result = if options.json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(writer)
            .try_init()
    } else {
        fmt()
            .with_ansi(ansi)
            .with_env_filter(filter)
            .with_writer(writer)
            .try_init()
    };
    result.map_err(|e| LoggingError::SetGlobal(e.to_string()))?;

    let _ = LOG_GUARD.set(guard);
    tracing::debug!("Logging initialized: {:?}", options.target);
    Ok(())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("dep-freshness.log"));
    (dir, file_name)
}
