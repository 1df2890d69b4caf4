use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use facegan::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Console logging plus an optional daily-rotated file
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes the
/// file writer on drop and must be held for the life of the process.
pub fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},burn=warn", logging.level)));

    let console_layer = if logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    let mut guard = None;
    let file_layer = match &logging.dir {
        Some(dir) => match open_log_file(dir) {
            Ok(file_appender) => {
                let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
                guard = Some(worker_guard);

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false) // No color codes in file
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    dir.display(),
                    e
                );
                None
            }
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

/// Daily-rotated `facegan.log` appender in `dir`
///
/// `rolling::daily` panics when the first file can't be created, so the
/// directory is created and write-tested before the appender is built.
fn open_log_file(dir: &Path) -> io::Result<RollingFileAppender> {
    fs::create_dir_all(dir)?;

    let test_path = dir.join(".facegan_write_test");
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&test_path)?;
    let _ = fs::remove_file(&test_path);

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("facegan.log")
        .build(dir)
        .map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_opens_in_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");

        assert!(open_log_file(&logs).is_ok());
        assert!(logs.is_dir());
        assert!(!logs.join(".facegan_write_test").exists());
    }

    #[test]
    fn test_log_dir_that_is_a_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        fs::write(&file, "x").unwrap();

        assert!(open_log_file(&file).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unwritable_existing_dir_is_rejected_without_panicking() {
        // Exists, but no new files can be created here, even as root
        assert!(open_log_file(Path::new("/proc/sys")).is_err());
    }
}
