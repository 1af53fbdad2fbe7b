//! Diagnostic logging
//!
//! `tracing` output goes to a daily rolling file and, if asked for, to
//! stderr. Nothing is ever logged to stdout: the binary uses it for the
//! capture channel.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingSettings;

const LOG_FILE_BASENAME: &str = "capture-coordinator.log";
/// Overrides `[logging] dir` when set
const LOG_DIR_ENV: &str = "CAPTURE_COORDINATOR_LOG_PATH";

#[cfg(target_os = "macos")]
const OSLOG_SUBSYSTEM: &str = "dev.capture-coordinator";

/// Installed logging. Dropping it flushes and stops the file writer.
pub struct LogHandle {
    pub dir: PathBuf,
    /// Rotated files removed at startup
    pub pruned: usize,
    _guard: WorkerGuard,
}

/// Install the global subscriber described by `settings`
pub fn init_logging(settings: &LoggingSettings) -> Result<LogHandle> {
    let dir = resolve_log_dir(settings)?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {:?}", dir))?;

    let pruned = match retention(settings) {
        Some(max_age) => prune_old_logs(&dir, max_age),
        None => 0,
    };

    let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE_BASENAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let stderr_layer = settings
        .stderr
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let registry = tracing_subscriber::registry()
        .with(filter(&settings.level))
        .with(file_layer)
        .with(stderr_layer);

    #[cfg(target_os = "macos")]
    let registry = registry.with(tracing_oslog::OsLogger::new(OSLOG_SUBSYSTEM, "default"));

    registry
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(LogHandle {
        dir,
        pruned,
        _guard: guard,
    })
}

/// `RUST_LOG` wins over the configured level; a bad level falls back to info
fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn retention(settings: &LoggingSettings) -> Option<Duration> {
    (settings.retention_days > 0)
        .then(|| Duration::from_secs(60 * 60 * 24 * settings.retention_days))
}

/// Env override, then `[logging] dir`, then the platform default
pub fn resolve_log_dir(settings: &LoggingSettings) -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var(LOG_DIR_ENV) {
        return Ok(PathBuf::from(override_path));
    }
    if let Some(dir) = &settings.dir {
        return Ok(dir.clone());
    }

    let proj_dirs = ProjectDirs::from("dev", "capture-coordinator", "coordinator")
        .context("Failed to determine project directories for log path")?;

    let base = proj_dirs
        .state_dir()
        .unwrap_or_else(|| proj_dirs.data_local_dir());
    Ok(base.join("logs"))
}

/// Remove our rotated log files older than `max_age`. Returns how many went.
fn prune_old_logs(log_dir: &Path, max_age: Duration) -> usize {
    let Ok(entries) = std::fs::read_dir(log_dir) else {
        return 0;
    };
    let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
        return 0;
    };

    entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(LOG_FILE_BASENAME))
        })
        .filter(|entry| {
            entry
                .metadata()
                .and_then(|meta| meta.modified())
                .is_ok_and(|modified| modified < cutoff)
        })
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| std::fs::remove_file(entry.path()).is_ok())
        .count()
}
