use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::error::LoggingError;

/// Console filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn,chromiumoxide=warn";
const FILE_FILTER: &str = "debug,hyper=warn,h2=warn,reqwest=warn,chromiumoxide=warn";

pub const LOG_FILE_PREFIX: &str = "webintel";
pub const ERROR_FILE_PREFIX: &str = "webintel-errors";
const KEEP_LOG_FILES: usize = 7;

/// Holds the background writers. Dropping it flushes whatever is queued, so
/// keep it alive for the life of the process.
pub struct LogGuards {
    _writers: Vec<WorkerGuard>,
}

fn daily(dir: &Path, prefix: &str) -> Result<RollingFileAppender, LoggingError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(KEEP_LOG_FILES)
        .build(dir)
        .map_err(|source| LoggingError::Appender {
            dir: dir.display().to_string(),
            source,
        })
}

/// Installs the global subscriber: console output filtered by `RUST_LOG`,
/// and with a `log_dir`, a detailed daily file plus an errors-only daily file.
pub fn init(log_dir: Option<&Path>) -> Result<LogGuards, LoggingError> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console = fmt::layer().with_target(true).with_filter(console_filter);

    let mut writers = Vec::new();
    let files = match log_dir {
        Some(dir) => {
            let (detailed, guard) = tracing_appender::non_blocking(daily(dir, LOG_FILE_PREFIX)?);
            writers.push(guard);
            let (errors, guard) = tracing_appender::non_blocking(daily(dir, ERROR_FILE_PREFIX)?);
            writers.push(guard);

            let detailed = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_writer(detailed)
                .with_filter(EnvFilter::new(FILE_FILTER));
            let errors = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(errors)
                .with_filter(LevelFilter::ERROR);
            Some(detailed.and_then(errors))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(files)
        .try_init()?;

    if let Some(dir) = log_dir {
        tracing::info!(dir = %dir.display(), "writing logs to files");
    }
    Ok(LogGuards { _writers: writers })
}
