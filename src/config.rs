//! Configuration for the built-in tracing profiler.

use std::time::Duration;

/// Options controlling what [`TracingProfiler`](crate::TracingProfiler)
/// records for each command execution.
///
/// # Example
///
/// ```rust
/// use profiled_db::ProfilerConfig;
/// use std::time::Duration;
///
/// let config = ProfilerConfig::default()
///     .with_statement_logging(true)
///     .with_slow_query_threshold(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// Whether to include the command text in spans.
    /// Default: `false` (command text may embed literals or credentials)
    pub log_statements: bool,

    /// Whether to include parameter names and values in spans.
    /// Default: `false` (parameters usually carry user input)
    pub log_parameters: bool,

    /// Whether to record the command's tags on the span.
    /// Default: `true`
    pub log_tags: bool,

    /// Executions slower than this are logged at WARN level.
    /// Default: 500ms
    pub slow_query_threshold: Duration,

    /// Database name recorded on every span, for multi-database setups.
    /// Default: `None`
    pub database_name: Option<String>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            log_statements: false,
            log_parameters: false,
            log_tags: true,
            slow_query_threshold: Duration::from_millis(500),
            database_name: None,
        }
    }
}

impl ProfilerConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable command text logging.
    ///
    /// **Security Warning**: command text may contain sensitive literals.
    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Enable or disable parameter logging.
    ///
    /// **Security Warning**: only enable in development or controlled environments.
    pub fn with_parameter_logging(mut self, enabled: bool) -> Self {
        self.log_parameters = enabled;
        self
    }

    /// Enable or disable recording command tags on spans.
    pub fn with_tag_logging(mut self, enabled: bool) -> Self {
        self.log_tags = enabled;
        self
    }

    /// Set the threshold above which an execution is reported as slow.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    /// Set the database name recorded on spans.
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    /// Log everything. Not for production use.
    pub fn development() -> Self {
        Self {
            log_statements: true,
            log_parameters: true,
            log_tags: true,
            slow_query_threshold: Duration::from_millis(100),
            database_name: None,
        }
    }

    /// Minimal, production-safe recording.
    pub fn production() -> Self {
        Self {
            log_statements: false,
            log_parameters: false,
            log_tags: true,
            slow_query_threshold: Duration::from_secs(1),
            database_name: None,
        }
    }
}
