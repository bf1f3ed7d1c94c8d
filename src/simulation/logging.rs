//! Logging and tracing configuration
//!
//! Diagnostics go through `tracing` to stderr (and optionally a daily rolling
//! file). The per-person console report is written separately to stdout by
//! [`ConsoleReporter`](crate::simulation::ConsoleReporter).

use std::io;
use tracing::{debug, Level};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Error returned when the global subscriber cannot be installed
pub type LoggingInitError = Box<dyn std::error::Error + Send + Sync>;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for the application
    pub level: Level,
    /// Whether to enable JSON formatting on the console
    pub json_format: bool,
    /// Log file directory; file logging is off when `None`
    pub log_directory: Option<String>,
    /// Log file prefix
    pub log_file_prefix: String,
    /// Whether to enable span events
    pub enable_span_events: bool,
    /// Whether to enable ansi colors in console output
    pub enable_ansi: bool,
    /// Custom environment filter
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            json_format: false,
            log_directory: None,
            log_file_prefix: "population-generator".to_string(),
            enable_span_events: false,
            enable_ansi: true,
            env_filter: None,
        }
    }
}

/// Keeps the background file writer alive; drop it to flush file logs
#[derive(Debug)]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

impl LoggingConfig {
    /// Create a new logging configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration matching the `--verbose` / `--debug` command line flags
    pub fn for_cli(verbose: bool, debug: bool) -> Self {
        match (debug, verbose) {
            (true, _) => Self::new().with_level(Level::DEBUG).with_span_events(),
            (false, true) => Self::new().with_level(Level::INFO),
            (false, false) => Self::new(),
        }
    }

    /// Set the log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Enable JSON formatting
    pub fn with_json_format(mut self) -> Self {
        self.json_format = true;
        self
    }

    /// Enable file logging
    pub fn with_file_logging(mut self, directory: impl Into<String>) -> Self {
        self.log_directory = Some(directory.into());
        self
    }

    /// Set log file prefix
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_file_prefix = prefix.into();
        self
    }

    /// Enable span events
    pub fn with_span_events(mut self) -> Self {
        self.enable_span_events = true;
        self
    }

    /// Disable ANSI colors
    pub fn without_ansi(mut self) -> Self {
        self.enable_ansi = false;
        self
    }

    /// Set custom environment filter
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn build_filter(&self) -> Result<EnvFilter, LoggingInitError> {
        match &self.env_filter {
            Some(filter) => Ok(EnvFilter::try_new(filter)?),
            None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!(
                    "{}={}",
                    env!("CARGO_PKG_NAME").replace('-', "_"),
                    self.level
                ))
            })),
        }
    }

    /// Install the global tracing subscriber
    pub fn init(self) -> Result<LoggingGuard, LoggingInitError> {
        let env_filter = self.build_filter()?;
        let span_events =
            if self.enable_span_events { FmtSpan::NEW | FmtSpan::CLOSE } else { FmtSpan::NONE };

        let (file_layer, file_guard) = match &self.log_directory {
            Some(directory) => {
                let (writer, guard) = non_blocking(rolling::daily(directory, &self.log_file_prefix));
                let layer =
                    fmt::layer().json().with_writer(writer).with_span_events(span_events.clone());
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        let json_console = self.json_format.then(|| {
            fmt::layer().json().with_writer(io::stderr).with_span_events(span_events.clone())
        });
        let pretty_console = (!self.json_format).then(|| {
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(self.enable_ansi)
                .with_target(false)
                .with_span_events(span_events.clone())
        });

        Registry::default()
            .with(env_filter)
            .with(file_layer)
            .with(json_console)
            .with(pretty_console)
            .try_init()?;

        debug!("Logging initialized: {:?}", self);
        Ok(LoggingGuard { _file: file_guard })
    }

    /// Initialize logging for testing (warnings only, no colors)
    pub fn init_test() -> Result<LoggingGuard, LoggingInitError> {
        Self::new().with_level(Level::WARN).without_ansi().init()
    }

    /// Initialize verbose logging (INFO level)
    pub fn init_verbose() -> Result<LoggingGuard, LoggingInitError> {
        Self::for_cli(true, false).init()
    }

    /// Initialize debug logging (DEBUG level with span events)
    pub fn init_debug() -> Result<LoggingGuard, LoggingInitError> {
        Self::for_cli(false, true).init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_creation() {
        let config = LoggingConfig::new();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.json_format);
        assert!(config.log_directory.is_none());
        assert_eq!(config.log_file_prefix, "population-generator");
        assert!(!config.enable_span_events);
        assert!(config.enable_ansi);
        assert!(config.env_filter.is_none());
    }

    #[test]
    fn test_logging_config_builder_pattern() {
        let config = LoggingConfig::new()
            .with_level(Level::DEBUG)
            .with_json_format()
            .with_file_logging("test_logs")
            .with_file_prefix("test_prefix")
            .with_span_events()
            .without_ansi()
            .with_env_filter("debug");

        assert_eq!(config.level, Level::DEBUG);
        assert!(config.json_format);
        assert_eq!(config.log_directory, Some("test_logs".to_string()));
        assert_eq!(config.log_file_prefix, "test_prefix");
        assert!(config.enable_span_events);
        assert!(!config.enable_ansi);
        assert_eq!(config.env_filter, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_presets() {
        assert_eq!(LoggingConfig::for_cli(false, false).level, Level::WARN);
        assert_eq!(LoggingConfig::for_cli(true, false).level, Level::INFO);
        let debug = LoggingConfig::for_cli(true, true);
        assert_eq!(debug.level, Level::DEBUG);
        assert!(debug.enable_span_events);
    }
}
