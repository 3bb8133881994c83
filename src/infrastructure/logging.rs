//! Logging system configuration and initialization
//!
//! Console output filtered through `RUST_LOG` (falling back to the
//! configured level), with an optional rolling daily log file.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

// Re-export LoggingConfig from config module
pub use crate::infrastructure::config::LoggingConfig;

/// Keeps the non-blocking file writer alive for the process lifetime.
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialize the logging system. Safe to call once per process.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));
    let console_layer = fmt::layer().with_target(false);

    if config.file_output {
        let appender = tracing_appender::rolling::daily(&config.log_dir, "vr-player-stats.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);

        let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
        Registry::default()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;
    } else {
        Registry::default()
            .with(filter)
            .with(console_layer)
            .try_init()?;
    }

    Ok(())
}
