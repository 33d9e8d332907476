use std::{io, path::Path};

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{config::AppConfig, infrastructure::directories::ResolvedPaths};

/// Rolled daily; files on disk are named `relay.log.YYYY-MM-DD`.
const LOG_FILE_PREFIX: &str = "relay.log";
const FALLBACK_LEVEL: &str = "info";

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Console plus a daily-rolling file under the logs directory.
///
/// A second call is a no-op. The file writer's guard lives for the rest of
/// the process so buffered lines are flushed at exit.
pub fn init_tracing(config: &AppConfig, paths: &ResolvedPaths) -> Result<()> {
    if FILE_GUARD.get().is_some() {
        return Ok(());
    }

    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = relay_filter(rust_log.as_deref(), &config.logging.level);
    let (file_writer, guard) = file_writer(&paths.logs_dir);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stdout).with_target(true))
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_target(true)
                .with_ansi(false),
        )
        .try_init()?;
    let _ = FILE_GUARD.set(guard);

    tracing::info!(
        target: "lifecycle",
        level = %config.logging.level,
        logs = %paths.logs_dir.join(LOG_FILE_PREFIX).display(),
        "tracing initialized"
    );
    Ok(())
}

fn file_writer(logs_dir: &Path) -> (tracing_appender::non_blocking::NonBlocking, WorkerGuard) {
    tracing_appender::non_blocking(rolling::daily(logs_dir, LOG_FILE_PREFIX))
}

/// `RUST_LOG` wins when set and parsable, then the configured level, then
/// [`FALLBACK_LEVEL`].
fn relay_filter(rust_log: Option<&str>, level: &str) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new(FALLBACK_LEVEL))
}
