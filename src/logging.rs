//! Structured logging with tracing
//!
//! Sets up:
//! - Console logging to stderr
//! - Optional file logging with daily rotation, JSON formatted
//!
//! Environment:
//! - RUST_LOG: Tracing filter (default: info)
//! - LOG_FORMAT: Console format (json or text)
//! - PDFEMBED_LOG_DIR: Directory for rotated log files (default: unset, no file logging)

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_FILE_PREFIX: &str = "pdfembed.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_level: String,
    pub console_format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            console_format: LogFormat::Text,
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            if let Ok(format) = format.parse() {
                config.console_format = format;
            }
        }
        if let Ok(dir) = std::env::var("PDFEMBED_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir));
        }

        config
    }
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// stops the file writer. `None` when file logging is off.
pub fn init_tracing(config: &LoggingConfig) -> std::io::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = match config.console_format {
        LogFormat::Json => fmt::layer().with_writer(std::io::stderr).json().boxed(),
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
    };

    let registry = tracing_subscriber::registry().with(env_filter).with(console_layer);

    match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(daily(dir, LOG_FILE_PREFIX));
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false).json();
            let _ = registry.with(file_layer).try_init();
            Ok(Some(guard))
        }
        None => {
            let _ = registry.try_init();
            Ok(None)
        }
    }
}
