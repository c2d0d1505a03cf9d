//! The profiler capability consumed by the proxies, and a `tracing`-backed
//! implementation of it.

use std::fmt;
use std::time::Instant;

use tracing::{field, Span};

use crate::config::ProfilerConfig;
use crate::driver::{CommandParameters, DataReader, DbCommand, DriverResult};
use crate::parser::StatementSummary;
use crate::tags::TagCollection;

/// Which execution path a timing belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionKind {
    Reader,
    NonQuery,
    Scalar,
}

impl ExecutionKind {
    /// Get the name recorded as `db.execution_kind`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionKind::Reader => "reader",
            ExecutionKind::NonQuery => "non_query",
            ExecutionKind::Scalar => "scalar",
        }
    }
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The real execution, handed to the profiler. It receives the native command
/// and stores whatever the execution produced in its own captures.
pub type Execute<'a> = Box<dyn FnOnce(&mut dyn DbCommand) -> DriverResult<()> + 'a>;

/// Times command executions and records them.
pub trait DbProfiler: Send + Sync {
    /// Run `execute` against `command` exactly once, measuring it.
    ///
    /// Implementations record one timing per call, annotated with `kind` and
    /// `tags`. When `execute` fails the timing is recorded as failed and its
    /// error is returned unchanged.
    fn execute_db_command(
        &self,
        kind: ExecutionKind,
        command: &mut dyn DbCommand,
        execute: Execute<'_>,
        tags: Option<&TagCollection>,
    ) -> DriverResult<()>;

    /// Called once when a profiled reader is closed.
    fn reader_finished(&self, _reader: &dyn DataReader) {}
}

/// A [`DbProfiler`] that reports every execution as a `db.command` span.
///
/// Spans become children of whatever span is current, so command timings
/// nest under request spans of the surrounding application.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use profiled_db::{DbProfiler, ProfilerConfig, TracingProfiler};
///
/// let profiler: Arc<dyn DbProfiler> =
///     Arc::new(TracingProfiler::new(ProfilerConfig::development()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TracingProfiler {
    config: ProfilerConfig,
}

impl TracingProfiler {
    /// Create a profiler with the given configuration.
    pub fn new(config: ProfilerConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    fn create_span(
        &self,
        kind: ExecutionKind,
        command: &dyn DbCommand,
        tags: Option<&TagCollection>,
    ) -> Span {
        let text = command.command_text();
        let summary = StatementSummary::for_command(&text, command.command_type());

        let span = tracing::info_span!(
            "db.command",
            otel.name = %summary.span_name(),
            db.operation = %summary.operation,
            db.execution_kind = %kind,
            db.sql.table = field::Empty,
            db.statement = field::Empty,
            db.parameters = field::Empty,
            db.tags = field::Empty,
            db.name = field::Empty,
            db.duration_ms = field::Empty,
            otel.status_code = field::Empty,
            error.message = field::Empty,
            slow_query = field::Empty,
        );

        if let Some(table) = &summary.table {
            span.record("db.sql.table", table.as_str());
        }

        if let Some(db_name) = &self.config.database_name {
            span.record("db.name", db_name.as_str());
        }

        if self.config.log_statements {
            span.record("db.statement", text.as_str());
        }

        if self.config.log_parameters {
            if let Some(parameters) = command.parameters() {
                span.record("db.parameters", describe_parameters(&parameters).as_str());
            }
        }

        if self.config.log_tags {
            if let Some(tags) = tags.filter(|t| !t.is_empty()) {
                span.record("db.tags", tags.to_string().as_str());
            }
        }

        span
    }

    fn record_result(&self, span: &Span, result: &DriverResult<()>, start: Instant) {
        let elapsed = start.elapsed();
        let duration_ms = elapsed.as_millis() as i64;
        span.record("db.duration_ms", duration_ms);

        if elapsed > self.config.slow_query_threshold {
            span.record("slow_query", true);
            let threshold_ms = self.config.slow_query_threshold.as_millis() as i64;
            tracing::warn!(
                parent: span,
                duration_ms = duration_ms,
                threshold_ms = threshold_ms,
                "Slow command detected"
            );
        }

        match result {
            Ok(()) => {
                span.record("otel.status_code", "OK");
            }
            Err(e) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.message", e.to_string().as_str());
                tracing::error!(
                    parent: span,
                    error = %e,
                    "Database command failed"
                );
            }
        }
    }
}

impl DbProfiler for TracingProfiler {
    fn execute_db_command(
        &self,
        kind: ExecutionKind,
        command: &mut dyn DbCommand,
        execute: Execute<'_>,
        tags: Option<&TagCollection>,
    ) -> DriverResult<()> {
        let span = self.create_span(kind, &*command, tags);
        let start = Instant::now();

        let result = span.in_scope(|| execute(command));

        self.record_result(&span, &result, start);
        result
    }

    fn reader_finished(&self, reader: &dyn DataReader) {
        tracing::trace!(
            records_affected = reader.records_affected(),
            "Data reader finished"
        );
    }
}

fn describe_parameters(parameters: &CommandParameters) -> String {
    let mut pairs = Vec::new();
    match parameters {
        CommandParameters::Db(collection) => {
            for p in (0..collection.len()).filter_map(|i| collection.get(i)) {
                pairs.push(format!("{}={}", p.name(), p.value()));
            }
        }
        CommandParameters::Data(collection) => {
            for p in (0..collection.len()).filter_map(|i| collection.get(i)) {
                pairs.push(format!("{}={}", p.name(), p.value()));
            }
        }
    }
    pairs.join(", ")
}
