//! Process-wide `tracing` setup: stderr plus a non-blocking log file.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE: &str = "islands.log";

/// Keeps the file writer flushing; drop it only at process exit.
pub struct LoggingGuard {
    _file: WorkerGuard,
    pub log_file: PathBuf,
}

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG` with `info` as the floor. Fails if a
/// global subscriber is already installed.
pub fn init_logging(log_dir: &Path) -> Result<LoggingGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Global tracing subscriber already installed")?;

    let log_file = log_dir.join(LOG_FILE);
    tracing::info!("Logging initialized: {}", log_file.display());

    Ok(LoggingGuard {
        _file: guard,
        log_file,
    })
}
