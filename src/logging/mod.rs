//! Structured logging configuration for Placekeeper

use std::str::FromStr;
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration, sourced from environment variables
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: LogLevel,
    /// Log format (json, pretty, compact)
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_source: bool,
}

/// Supported log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// Compact format for daemon operation
    Compact,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            include_source: false,
        }
    }
}

impl LogConfig {
    /// Load configuration from `PLACEKEEPER_LOG_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("PLACEKEEPER_LOG_LEVEL") {
            if let Ok(parsed) = LogLevel::from_str(&level) {
                config.level = parsed;
            }
        }
        if let Ok(format) = std::env::var("PLACEKEEPER_LOG_FORMAT") {
            if let Ok(parsed) = LogFormat::from_str(&format) {
                config.format = parsed;
            }
        }
        if let Ok(source) = std::env::var("PLACEKEEPER_LOG_SOURCE") {
            config.include_source = source.to_lowercase() == "true";
        }

        config
    }
}

/// Initialize the global tracing subscriber with the given configuration
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("placekeeper={}", config.level.as_filter()))
    });

    let layer: Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => Box::new(
            fmt::layer()
                .pretty()
                .with_timer(UtcTime::rfc_3339())
                .with_file(config.include_source)
                .with_line_number(config.include_source),
        ),
        LogFormat::Compact => Box::new(
            fmt::layer()
                .compact()
                .with_timer(UtcTime::rfc_3339())
                .with_file(config.include_source)
                .with_line_number(config.include_source),
        ),
        LogFormat::Json => Box::new(
            fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .with_file(config.include_source)
                .with_line_number(config.include_source),
        ),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .init();

    Ok(())
}
