//! Logging configuration.
//!
//! Structured logging via `tracing`; this module only configures the
//! subscriber. The resilience primitives emit their own events (retry
//! attempts, circuit state transitions, rejected calls) through the
//! `tracing` macros.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Minimum level captured by the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Trace-level logging (most verbose)
    Trace,
    /// Debug-level logging
    Debug,
    /// Info-level logging
    #[default]
    Info,
    /// Warning-level logging
    Warn,
    /// Error-level logging (least verbose)
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output for development
    #[default]
    Pretty,
    /// JSON lines for structured collection
    Json,
    /// Compact single-line output
    Compact,
}

/// Subscriber configuration.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Minimum captured level
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Whether log lines carry the emitting module path
    pub include_target: bool,
}

impl LoggingConfig {
    /// Creates the default configuration (info, pretty).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Installs a global `tracing` subscriber for this configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set. Returns
/// an error message when a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), String> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(config.level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_maps_to_filter() {
        assert_eq!(LevelFilter::from(LogLevel::Debug), LevelFilter::DEBUG);
        assert_eq!(LevelFilter::from(LogLevel::Error), LevelFilter::ERROR);
    }

    #[test]
    fn config_builders_chain() {
        let config = LoggingConfig::new()
            .with_level(LogLevel::Warn)
            .with_format(LogFormat::Json);
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Json);
    }
}
