//! Logging helpers and subscriber setup.
//!
//! dq-guard only emits `tracing` events; installing a subscriber is left to
//! the application. [`setup::init_logging`] is a convenience for binaries and
//! examples that do not bring their own.

/// Longest sample value copied into result details or log fields.
pub const MAX_SAMPLE_LENGTH: usize = 100;

/// Truncates `value` to at most `max_length` characters.
///
/// Cuts on a character boundary, so multi-byte text such as accented names
/// is never split.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    match value.char_indices().nth(max_length) {
        None => value.to_string(),
        Some((cut, _)) => format!("{}...(truncated)", &value[..cut]),
    }
}

/// Subscriber installation.
pub mod setup {
    use tracing::Level;

    /// Configuration for [`init_logging`].
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for everything outside dq-guard
        pub level: Level,
        /// Log level for dq-guard components
        pub dq_level: Level,
        /// Emit JSON lines instead of human-readable output
        pub json_format: bool,
        /// Explicit filter directive, overriding `level` and `dq_level`
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                dq_level: Level::INFO,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Verbose, human-readable output.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                dq_level: Level::DEBUG,
                ..Self::default()
            }
        }

        /// JSON output, warnings only outside dq-guard.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                dq_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// JSON output with per-rule debug events.
        pub fn structured() -> Self {
            Self {
                level: Level::INFO,
                dq_level: Level::DEBUG,
                json_format: true,
                env_filter: None,
            }
        }

        /// Sets the application log level.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the dq-guard log level.
        pub fn with_dq_level(mut self, level: Level) -> Self {
            self.dq_level = level;
            self
        }

        /// Switches JSON output on or off.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Uses a custom filter directive.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// The filter directive this configuration installs when `RUST_LOG`
        /// is unset.
        pub fn env_filter(&self) -> String {
            match &self.env_filter {
                Some(filter) => filter.clone(),
                None => format!(
                    "{},dq_guard={}",
                    self.level.as_str().to_lowercase(),
                    self.dq_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs a global `tracing` subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter. Fails if a
    /// global subscriber is already set.
    ///
    /// ```rust,no_run
    /// use dq_guard::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
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
    use tracing::Level;

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(truncate_field("hello", 5), "hello");
        assert_eq!(
            truncate_field("this is a very long text", 10),
            "this is a ...(truncated)"
        );
    }

    #[test]
    fn test_truncate_field_multibyte() {
        assert_eq!(truncate_field("João Ção", 3), "Joã...(truncated)");
    }

    #[test]
    fn test_env_filter_directive() {
        assert_eq!(LoggingConfig::default().env_filter(), "info,dq_guard=info");
        assert_eq!(
            LoggingConfig::production().env_filter(),
            "warn,dq_guard=info"
        );
        let custom = LoggingConfig::default()
            .with_level(Level::ERROR)
            .with_dq_level(Level::TRACE);
        assert_eq!(custom.env_filter(), "error,dq_guard=trace");
        assert_eq!(
            LoggingConfig::default()
                .with_env_filter("dq_guard=debug")
                .env_filter(),
            "dq_guard=debug"
        );
    }

    #[test]
    fn test_presets() {
        assert!(LoggingConfig::structured().json_format);
        assert!(!LoggingConfig::development().json_format);
        assert_eq!(LoggingConfig::development().dq_level, Level::DEBUG);
    }
}
