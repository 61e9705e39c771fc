//! Logging initialization for the yardstick binaries.
//!
//! Three modes are supported:
//! - `Cli`: human readable logs on STDERR, so STDOUT stays reserved for reports.
//! - `Json`: one JSON object per event on STDERR, for editors and CI wrappers.
//! - `File`: JSON logs appended to a rolling file next to the project.
//!
//! Rolling files are rotated at 5 MB and compressed; at most 10 rotated
//! files are kept.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use file_rotate::{ContentLimit, FileRotate, compression::Compression, suffix::AppendCount};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt::writer::MakeWriterExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMode {
    Cli,
    Json,
    File(PathBuf),
}

/// Guard that keeps background logging workers alive.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// Builds the level filter. `--verbose` wins over `RUST_LOG`.
pub fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

pub fn init(mode: LogMode, verbose: bool) -> Result<Option<LoggingGuards>> {
    let filter = env_filter(verbose);

    match mode {
        LogMode::Cli => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            Ok(None)
        }
        LogMode::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .json()
                .init();
            Ok(None)
        }
        LogMode::File(path) => {
            let writer = rolling_writer(&path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(writer);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking.with_max_level(tracing::Level::DEBUG))
                .with_ansi(false)
                .json()
                .init();

            Ok(Some(LoggingGuards {
                _guards: vec![guard],
            }))
        }
    }
}

fn rolling_writer(path: &Path) -> Result<FileRotate<AppendCount>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }

    Ok(FileRotate::new(
        path,
        AppendCount::new(10),
        ContentLimit::Bytes(5 * 1024 * 1024),
        Compression::OnRotate(1),
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_forces_debug_filter() {
        assert_eq!(env_filter(true).to_string(), "debug");
    }

    #[test]
    fn rolling_writer_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("yardstick.log");
        rolling_writer(&path).unwrap();
        assert!(dir.path().join("logs").is_dir());
    }
}
