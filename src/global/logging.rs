use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::global::config::{AppSettings, LogRotation};
use crate::global::error::ConfigError;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. The returned guard must stay
/// alive for the file writer to flush.
pub fn init(settings: &AppSettings) -> Result<Option<WorkerGuard>, ConfigError> {
    let logging = &settings.logging;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("media_catalog={},info", settings.log_level).into());

    let console = logging.log_to_console.then(|| {
        if logging.json {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        }
    });

    let mut guard = None;
    let file = if logging.log_to_file {
        let rotation = match logging.log_rotation {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        };
        let appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(&logging.log_file_prefix)
            .filename_suffix("log")
            .build(&logging.log_directory)
            .map_err(|e| ConfigError::Invalid(format!("log directory: {}", e)))?;
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);

        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| ConfigError::Invalid(format!("logging already initialised: {}", e)))?;

    Ok(guard)
}
