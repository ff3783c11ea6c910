//! Tracing subscriber setup

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber: console output plus, when a directory
/// is configured, a daily rolling log file.
///
/// `RUST_LOG` directives take precedence over `config.level`. Keep the
/// returned guard alive for the lifetime of the process so buffered file
/// output is flushed on exit.
pub fn setup_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let level = config
        .level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "sikv.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.ansi)
                .with_target(false),
        )
        .with(file_layer)
        .with(filter)
        .try_init()?;

    Ok(guard)
}
