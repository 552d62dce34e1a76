//! Logging setup for the indexer.
//!
//! Logs go to a daily rolling file when a log directory is configured.
//! Otherwise systemd's journal is used on Linux, with stderr as the
//! fallback everywhere else.
//!
//! Log level is read from `ECOPIX_LOG`, then `RUST_LOG`, and defaults to
//! `info`:
//! - `ECOPIX_LOG=debug` logs every file as it is processed
//! - `ECOPIX_LOG=warn` only reports skipped files and failures

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("ECOPIX_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global subscriber. Call once at startup.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    if let Some(log_dir) = log_dir {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

        let file_appender = tracing_appender::rolling::daily(&log_dir, "ecopix.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // The writer thread flushes on drop of the guard
        let _ = GUARD.set(guard);

        tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .try_init()
            .context("Failed to set tracing subscriber")?;

        tracing::info!("Logging initialized with file backend at {:?}", log_dir);
        return Ok(());
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(journald_layer)
                .try_init()
                .context("Failed to set tracing subscriber")?;

            tracing::debug!("Logging initialized with journald backend");
            return Ok(());
        }
    }

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(())
}
