//! Logging utilities and configuration for term-scrub.
//!
//! The pipeline emits `tracing` events: one `info` line per source file and,
//! when enabled, one line per batch with its timing. Large runs produce
//! thousands of batches, so per-batch output is opt-in through [`LogConfig`].

/// Controls how much the pipeline logs while running.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to log one line per processed batch
    pub log_batch_details: bool,
    /// Whether to log one line per source file
    pub log_file_progress: bool,
    /// Maximum length for logged field values such as paths
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_batch_details: false,
            log_file_progress: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            log_batch_details: true,
            log_file_progress: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration with the lowest overhead.
    pub fn quiet() -> Self {
        Self {
            log_batch_details: false,
            log_file_progress: false,
            max_field_length: 128,
        }
    }
}

/// Macro for conditional per-batch logging.
#[macro_export]
macro_rules! log_batch {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_batch_details {
            tracing::info!($($arg)*);
        }
    };
}

/// Macro for conditional per-file logging.
#[macro_export]
macro_rules! log_file {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_file_progress {
            tracing::info!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Utilities for setting up the global subscriber.
pub mod setup {
    use tracing::Level;

    /// Configuration for the process-wide subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for dependencies
        pub level: Level,
        /// Log level for term-scrub itself
        pub scrub_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::WARN,
                scrub_level: Level::INFO,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::INFO,
                scrub_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Sets the log level for term-scrub.
        pub fn with_scrub_level(mut self, level: Level) -> Self {
            self.scrub_level = level;
            self
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},term_scrub={}",
                    self.level.as_str().to_lowercase(),
                    self.scrub_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs the global subscriber. `RUST_LOG` takes precedence over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use term_scrub::logging::setup::{LoggingConfig, init_logging};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        // Logs go to stderr so stdout carries only the report
        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert!(!config.log_batch_details);
        assert!(config.log_file_progress);
        assert_eq!(config.max_field_length, 256);
    }

    #[test]
    fn test_log_config_verbose() {
        let config = LogConfig::verbose();
        assert_eq!(config.max_field_length, 1024);
        assert!(config.log_batch_details);
    }

    #[test]
    fn test_log_config_quiet() {
        let config = LogConfig::quiet();
        assert!(!config.log_batch_details);
        assert!(!config.log_file_progress);
    }

    #[test]
    fn test_env_filter_string() {
        assert_eq!(LoggingConfig::default().env_filter(), "warn,term_scrub=info");
        assert_eq!(
            LoggingConfig::development().env_filter(),
            "info,term_scrub=debug"
        );
        assert_eq!(
            LoggingConfig::default()
                .with_env_filter("term_scrub=trace")
                .env_filter(),
            "term_scrub=trace"
        );
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text that should be truncated", 10),
            "this is a ...(truncated)"
        );
    }

    #[test]
    fn test_truncate_field_respects_char_boundaries() {
        assert_eq!(truncate_field("北京市朝阳区", 4), "北...(truncated)");
    }
}
