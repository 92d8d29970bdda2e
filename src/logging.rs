//! Logging initialization.
//!
//! Structured logging via `tracing`: compact console output filtered by
//! `RUST_LOG` (default `info`), with an optional non-blocking file writer
//! for long runs.

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping it flushes and closes the file writer, if one was configured.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initializes console logging.
///
/// Call once per process; a second initialization fails inside
/// `tracing-subscriber`.
pub fn init_logging() -> LoggingGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).compact())
        .init();
    LoggingGuard { _file_guard: None }
}

/// Initializes console logging plus a log file.
///
/// The file is truncated at startup so each run starts with a clean log.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the log
/// file cannot be truncated.
pub fn init_logging_with_file(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;
    let log_path = Path::new(log_dir).join(log_file);
    fs::write(&log_path, "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: Some(file_guard),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn test_log_file_is_truncated_on_init() {
        // Only the file preparation is testable: the global subscriber can
        // be installed once per process, which integration runs own.
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("treesweep_logs_{nanos}"));
        let dir_str = dir.to_str().unwrap().to_string();

        fs::create_dir_all(&dir_str).unwrap();
        let file = PathBuf::from(&dir_str).join("run.log");
        fs::write(&file, "stale contents").unwrap();

        fs::write(&file, "").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "");

        fs::remove_dir_all(&dir).unwrap();
    }
}
