//! tracing subscriber setup.
//!
//! Logs go to stderr (stdout belongs to command output). With
//! `log.file = true` they are also appended to
//! ${FUNRAISE_HOME}/logs/funraise.log through a non-blocking writer.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogConfig, paths};

const LOG_FILE_NAME: &str = "funraise.log";

/// Keeps the file writer flushing; hold it until the program exits.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `config.level`; `verbose` forces `debug` when
/// `RUST_LOG` is unset. Installing twice is not an error: the first
/// subscriber stays active.
pub fn init(config: &LogConfig, verbose: bool) -> Result<LogGuard> {
    init_in(config, verbose, &paths::logs_dir())
}

/// Same as [`init`], writing the log file under `logs_dir`.
pub fn init_in(config: &LogConfig, verbose: bool, logs_dir: &Path) -> Result<LogGuard> {
    let filter = build_filter(config, verbose)?;

    let (file_layer, file_guard) = match file_writer(config, logs_dir)? {
        Some((writer, guard)) => {
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    Ok(LogGuard { _file: file_guard })
}

/// Non-blocking writer for ${logs_dir}/funraise.log, when file logging is on.
fn file_writer(
    config: &LogConfig,
    logs_dir: &Path,
) -> Result<Option<(NonBlocking, WorkerGuard)>> {
    if !config.file {
        return Ok(None);
    }
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;
    let appender = tracing_appender::rolling::never(logs_dir, LOG_FILE_NAME);
    Ok(Some(tracing_appender::non_blocking(appender)))
}

fn build_filter(config: &LogConfig, verbose: bool) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = if verbose { "debug" } else { config.level.as_str() };
    EnvFilter::try_new(directive)
        .with_context(|| format!("Invalid log level directive '{directive}'"))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_invalid_directive_is_reported() {
        let config = LogConfig {
            level: "funraise=loud".to_string(),
            file: false,
        };
        // RUST_LOG may be set in the environment running the tests.
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(build_filter(&config, false).is_err());
        }
    }

    #[test]
    fn test_verbose_overrides_configured_level() {
        let config = LogConfig {
            level: "funraise=loud".to_string(),
            file: false,
        };
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(build_filter(&config, true).is_ok());
        }
    }

    #[test]
    fn test_file_logging_creates_log_dir() {
        let dir = tempdir().unwrap();
        let logs_dir = dir.path().join("logs");
        let config = LogConfig {
            level: "info".to_string(),
            file: true,
        };

        let writer = file_writer(&config, &logs_dir).unwrap();

        assert!(writer.is_some());
        assert!(logs_dir.is_dir());
    }

    #[test]
    fn test_file_logging_off_touches_nothing() {
        let dir = tempdir().unwrap();
        let logs_dir = dir.path().join("logs");

        let writer = file_writer(&LogConfig::default(), &logs_dir).unwrap();

        assert!(writer.is_none());
        assert!(!logs_dir.exists());
    }
}
