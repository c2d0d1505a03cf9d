//! # profiled-db
//!
//! Transparent profiling proxies for database driver handles.
//!
//! This crate wraps the four primitives of a database driver (command,
//! connection, transaction and reader) in proxies that implement the same
//! traits as the handles they wrap. Every command execution is routed through
//! a [`DbProfiler`], which times it and records it with caller-supplied
//! [`TagCollection`] labels, while results and errors reach the caller exactly
//! as the native driver produced them.
//!
//! ## Features
//!
//! - **Drop-in proxies**: `ProfiledCommand`, `ProfiledConnection`,
//!   `ProfiledTransaction` and `ProfiledReader` implement the driver traits
//! - **One timing per execution**: reader, non-query and scalar executions
//!   each produce exactly one profiler call, failed or not
//! - **Idempotent wrapping**: wrapping a handle that is already a proxy
//!   returns that same proxy
//! - **Tagged timings**: case-insensitive, normalized tags with a
//!   comma-joined text form
//! - **Tracing out of the box**: `TracingProfiler` reports executions as
//!   `tracing` spans with OpenTelemetry-style attributes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use profiled_db::prelude::*;
//!
//! let profiler: Arc<dyn DbProfiler> = Arc::new(TracingProfiler::default());
//!
//! // Wrap a native connection; commands it creates are profiled
//! let connection = native_connection.with_profiler(profiler);
//! let mut command = connection.create_command();
//! command.set_command_text("SELECT 1");
//! let one = command.execute_scalar()?;
//! ```
//!
//! ## Span Attributes
//!
//! `TracingProfiler` records the following on each `db.command` span:
//!
//! | Attribute | Description |
//! |-----------|-------------|
//! | `db.operation` | Statement verb (SELECT, INSERT, EXEC, ...) |
//! | `db.execution_kind` | `reader`, `non_query` or `scalar` |
//! | `db.sql.table` | Target table or procedure (when detectable) |
//! | `db.statement` | Command text (when enabled) |
//! | `db.parameters` | Parameter names and values (when enabled) |
//! | `db.tags` | The command's tags |
//! | `db.duration_ms` | Execution time |
//! | `otel.status_code` | "OK" or "ERROR" |
//! | `error.message` | Error details (on failure) |

mod adapters;
mod command;
mod config;
mod connection;
mod driver;
mod error;
mod parser;
mod profiler;
mod reader;
mod tags;
mod transaction;
mod value;

pub use adapters::{ParameterCollectionWrapper, ParameterWrapper};
pub use command::{ProfiledCommand, ProfiledCommandBuilder};
pub use config::ProfilerConfig;
pub use connection::{ProfiledConnection, ProfilingExt};
pub use driver::{
    CommandBehavior, CommandParameter, CommandParameters, CommandType, ConnectionState,
    DataParameter, DataParameterCollection, DataReader, DbCommand, DbConnection, DbParameter,
    DbParameterCollection, DbTransaction, DbType, DriverError, DriverResult, IsolationLevel,
    ParameterDirection, SchemaTable, UpdateRowSource,
};
pub use error::{ProfilingError, Result};
pub use parser::{StatementOperation, StatementSummary};
pub use profiler::{DbProfiler, Execute, ExecutionKind, TracingProfiler};
pub use reader::ProfiledReader;
pub use tags::{Tag, TagCollection};
pub use transaction::ProfiledTransaction;
pub use value::Value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        DataReader, DbCommand, DbConnection, DbProfiler, DbTransaction, ExecutionKind,
        ProfiledCommand, ProfiledConnection, ProfilerConfig, ProfilingExt, TagCollection,
        TracingProfiler,
    };
}
