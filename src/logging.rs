use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::GatewayConfig;

const LOG_FILE_NAME: &str = "toolgate";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Logging settings, lifted out of the gateway config.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level applied to this crate's targets when RUST_LOG is unset
    pub level: String,
    /// Emit logs as JSON
    pub json_format: bool,
    /// Write daily-rotated log files here in addition to stdout
    pub log_dir: Option<String>,
    /// Colorize stdout output
    pub colorize: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            log_dir: None,
            colorize: true,
        }
    }
}

impl From<&GatewayConfig> for LoggingConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            level: config.log_level.clone(),
            json_format: config.json_logs,
            log_dir: config.log_dir.clone(),
            colorize: true,
        }
    }
}

/// Keeps the file appender worker thread alive; hold it for the lifetime
/// of the program or buffered log lines are lost.
#[allow(dead_code)]
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the global subscriber. Safe to call more than once; later
/// calls leave the first subscriber in place.
pub fn init_logging(config: LoggingConfig) -> LogGuard {
    // Route log-crate records (actix access logs) through tracing.
    let _ = LogTracer::init();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("toolgate={}", config.level)));

    let mut layers = Vec::new();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_ansi(config.colorize)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::new(TIME_FORMAT.to_string()));
    let stdout_layer = if config.json_format {
        stdout_layer.json().flatten_event(true).boxed()
    } else {
        stdout_layer.boxed()
    };
    layers.push(stdout_layer);

    let mut file_guard = None;
    if let Some(log_dir) = &config.log_dir {
        let log_dir = PathBuf::from(log_dir);
        if !log_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&log_dir) {
                eprintln!("Failed to create log directory: {}", e);
                return LogGuard { _file_guard: None };
            }
        }

        let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        file_guard = Some(guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::new(TIME_FORMAT.to_string()))
            .with_writer(non_blocking);
        let file_layer = if config.json_format {
            file_layer.json().flatten_event(true).boxed()
        } else {
            file_layer.boxed()
        };
        layers.push(file_layer);
    }

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init();

    LogGuard {
        _file_guard: file_guard,
    }
}
