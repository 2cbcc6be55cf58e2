//! Tracing subscriber setup for binaries embedding the cache.
//!
//! The library itself only emits `tracing` events. Binaries call
//! [`init_logging`] once at startup and keep the returned guard alive so the
//! non-blocking file writer can flush on exit.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Result, SitemapError};

/// Name of the log file written when a log directory is configured.
pub const LOG_FILE_NAME: &str = "sitemap-cache.log";

/// Keeps the background log writer alive.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if a global
/// subscriber is already installed or the log directory cannot be created.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| SitemapError::Config(format!("invalid log level '{}': {}", config.level, e)))?;

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory).map_err(|e| {
                SitemapError::Config(format!(
                    "cannot create log directory {}: {}",
                    directory.display(),
                    e
                ))
            })?;
            let appender = tracing_appender::rolling::never(directory, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init()
                .map_err(|e| SitemapError::Config(format!("logging already initialized: {}", e)))?;

            Ok(LoggingGuard {
                _file_guard: Some(guard),
            })
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()
                .map_err(|e| SitemapError::Config(format!("logging already initialized: {}", e)))?;

            Ok(LoggingGuard { _file_guard: None })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_config_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            level: "sitemap_cache=loud".to_string(),
            directory: None,
        };
        assert!(matches!(
            init_logging(&config),
            Err(SitemapError::Config(_))
        ));
    }

    #[test]
    fn test_unusable_log_directory_is_config_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = LoggingConfig {
            level: "info".to_string(),
            directory: Some(file.path().join("logs")),
        };
        assert!(matches!(
            init_logging(&config),
            Err(SitemapError::Config(_))
        ));
    }
}
