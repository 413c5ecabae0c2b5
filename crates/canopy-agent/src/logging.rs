//! Tracing setup for the agent.
//!
//! The agent is a one-shot synchronous process, so there is no async
//! writer plumbing here: log lines are written directly. Development
//! runs log to stdout only; production runs additionally append JSON
//! lines to a daily-rolled file so runs can be correlated after the
//! fact.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for this run.
///
/// The level defaults to `info` and can be overridden with
/// `CANOPY_LOG_LEVEL` or the standard `RUST_LOG`.
///
/// # Errors
///
/// Returns an error if the level filter cannot be parsed.
pub fn init(is_production: bool) -> anyhow::Result<()> {
    let level = std::env::var("CANOPY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&level))?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true)
        .with_ansi(!is_production);

    if is_production {
        let log_dir = log_directory();
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow::anyhow!("cannot create log directory {}: {e}", log_dir.display()))?;

        // Blocking writer: a snapshot emits a handful of lines and the
        // process exits, so the rolling appender is used directly.
        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(RollingFileAppender::new(Rotation::DAILY, &log_dir, "canopy"));

        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .init();
    }

    Ok(())
}

/// Where production log files go.
fn log_directory() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/log/canopy")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "canopy")
            .map(|dirs| dirs.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("./logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_is_nonempty() {
        assert!(!log_directory().as_os_str().is_empty());
    }
}
