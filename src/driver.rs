//! The native driver surface: command, connection, transaction and reader.
//!
//! Every profiling proxy in this crate implements the same trait as the
//! handle it wraps, so a proxy can stand in anywhere the native handle is
//! expected.
//!
//! Connections, transactions and parameters are shared handles
//! (`Arc<dyn Trait>` with `&self` methods); a driver owns whatever interior
//! mutability it needs. Commands and readers are exclusively owned
//! (`Box<dyn Trait>`) and mutated through `&mut self`.

use std::sync::Arc;

use bitflags::bitflags;

use crate::command::ProfiledCommand;
use crate::connection::ProfiledConnection;
use crate::reader::ProfiledReader;
use crate::transaction::ProfiledTransaction;
use crate::value::Value;

/// Error raised by a native driver. Proxies pass it through untouched, so
/// callers can still downcast to the driver's own error type.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type DriverResult<T> = Result<T, DriverError>;

/// How the command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandType {
    #[default]
    Text,
    StoredProcedure,
    TableDirect,
}

/// How command results are applied back to a source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateRowSource {
    None,
    OutputParameters,
    FirstReturnedRecord,
    #[default]
    Both,
}

bitflags! {
    /// Hints passed to `execute_reader`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandBehavior: u32 {
        const SINGLE_RESULT = 1;
        const SCHEMA_ONLY = 1 << 1;
        const KEY_INFO = 1 << 2;
        const SINGLE_ROW = 1 << 3;
        const SEQUENTIAL_ACCESS = 1 << 4;
        const CLOSE_CONNECTION = 1 << 5;
    }
}

impl Default for CommandBehavior {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Closed,
    Open,
    Connecting,
    Executing,
    Fetching,
    Broken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    Unspecified,
    Chaos,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbType {
    AnsiString,
    Binary,
    Boolean,
    Decimal,
    Double,
    Int32,
    Int64,
    #[default]
    String,
    DateTime,
    Guid,
    Object,
}

/// Tabular metadata returned by schema lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// The minimal parameter shape every driver can provide.
pub trait DataParameter: Send + Sync {
    fn name(&self) -> String;
    fn set_name(&self, name: &str);
    fn direction(&self) -> ParameterDirection;
    fn set_direction(&self, direction: ParameterDirection);
    fn db_type(&self) -> DbType;
    fn set_db_type(&self, db_type: DbType);
    fn value(&self) -> Value;
    fn set_value(&self, value: Value);
}

/// The full parameter shape exposed by profiled commands.
pub trait DbParameter: Send + Sync {
    fn name(&self) -> String;
    fn set_name(&self, name: &str);
    fn direction(&self) -> ParameterDirection;
    fn set_direction(&self, direction: ParameterDirection);
    fn db_type(&self) -> DbType;
    fn set_db_type(&self, db_type: DbType);
    fn value(&self) -> Value;
    fn set_value(&self, value: Value);
    fn is_nullable(&self) -> bool;
    fn set_is_nullable(&self, nullable: bool);
    fn size(&self) -> usize;
    fn set_size(&self, size: usize);
    fn source_column(&self) -> String;
    fn set_source_column(&self, column: &str);

    /// The minimal-shape parameter this one adapts, if it is an adapter.
    fn as_data_parameter(&self) -> Option<Arc<dyn DataParameter>> {
        None
    }
}

pub trait DataParameterCollection: Send + Sync {
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> Option<Arc<dyn DataParameter>>;
    fn find(&self, name: &str) -> Option<Arc<dyn DataParameter>>;
    /// Append a parameter, returning its index.
    fn add(&self, parameter: Arc<dyn DataParameter>) -> usize;
    fn remove_at(&self, index: usize) -> Option<Arc<dyn DataParameter>>;
    fn clear(&self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

pub trait DbParameterCollection: Send + Sync {
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> Option<Arc<dyn DbParameter>>;
    fn find(&self, name: &str) -> Option<Arc<dyn DbParameter>>;
    /// Append a parameter, returning its index.
    fn add(&self, parameter: Arc<dyn DbParameter>) -> usize;
    fn remove_at(&self, index: usize) -> Option<Arc<dyn DbParameter>>;
    fn clear(&self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

/// A command's parameter collection, tagged by shape.
#[derive(Clone)]
pub enum CommandParameters {
    /// Already the full shape; used as-is.
    Db(Arc<dyn DbParameterCollection>),
    /// Minimal shape; needs an adapter before it is exposed.
    Data(Arc<dyn DataParameterCollection>),
}

/// A freshly created parameter, tagged by shape.
#[derive(Clone)]
pub enum CommandParameter {
    Db(Arc<dyn DbParameter>),
    Data(Arc<dyn DataParameter>),
}

pub trait DbCommand: Send {
    fn command_text(&self) -> String;
    fn set_command_text(&mut self, text: &str);

    /// Seconds before the driver abandons execution.
    fn command_timeout(&self) -> u32;
    fn set_command_timeout(&mut self, seconds: u32);

    fn command_type(&self) -> CommandType;
    fn set_command_type(&mut self, command_type: CommandType);

    fn updated_row_source(&self) -> UpdateRowSource;
    fn set_updated_row_source(&mut self, source: UpdateRowSource);

    /// Drivers without the capability report `false`.
    fn design_time_visible(&self) -> bool {
        false
    }

    fn set_design_time_visible(&mut self, _visible: bool) {}

    fn connection(&self) -> Option<Arc<dyn DbConnection>>;
    fn set_connection(&mut self, connection: Option<Arc<dyn DbConnection>>);

    fn transaction(&self) -> Option<Arc<dyn DbTransaction>>;
    fn set_transaction(&mut self, transaction: Option<Arc<dyn DbTransaction>>);

    /// `None` when the command does not support parameters.
    fn parameters(&self) -> Option<CommandParameters>;
    fn create_parameter(&self) -> CommandParameter;

    fn prepare(&mut self) -> DriverResult<()>;
    fn cancel(&mut self);

    fn execute_reader(&mut self, behavior: CommandBehavior) -> DriverResult<Box<dyn DataReader>>;
    /// Number of rows affected, or `-1` when the statement does not report one.
    fn execute_non_query(&mut self) -> DriverResult<i64>;
    /// First column of the first row; `None` when the result set is empty.
    fn execute_scalar(&mut self) -> DriverResult<Option<Value>>;

    fn dispose(&mut self);

    /// `Some` only when this command is already a profiling proxy.
    fn as_profiled(&self) -> Option<&ProfiledCommand> {
        None
    }

    fn as_profiled_mut(&mut self) -> Option<&mut ProfiledCommand> {
        None
    }
}

pub trait DbConnection: Send + Sync {
    fn connection_string(&self) -> String;
    fn set_connection_string(&self, connection_string: &str);
    fn connection_timeout(&self) -> u32;
    fn database(&self) -> String;
    fn data_source(&self) -> String;
    fn server_version(&self) -> String;
    fn state(&self) -> ConnectionState;

    fn open(&self) -> DriverResult<()>;
    fn close(&self) -> DriverResult<()>;
    fn change_database(&self, database: &str) -> DriverResult<()>;

    fn begin_transaction(&self, isolation_level: IsolationLevel) -> DriverResult<Arc<dyn DbTransaction>>;
    fn create_command(&self) -> Box<dyn DbCommand>;
    fn get_schema(&self, collection: &str, restrictions: &[Option<String>]) -> DriverResult<SchemaTable>;

    fn dispose(&self);

    /// `Some` only when this handle is already a profiling proxy.
    fn as_profiled(&self) -> Option<&ProfiledConnection> {
        None
    }
}

pub trait DbTransaction: Send + Sync {
    /// `None` once the transaction has completed.
    fn connection(&self) -> Option<Arc<dyn DbConnection>>;
    fn isolation_level(&self) -> IsolationLevel;
    fn commit(&self) -> DriverResult<()>;
    fn rollback(&self) -> DriverResult<()>;
    fn dispose(&self);

    /// `Some` only when this handle is already a profiling proxy.
    fn as_profiled(&self) -> Option<&ProfiledTransaction> {
        None
    }
}

/// A forward-only result cursor.
pub trait DataReader: Send {
    fn read(&mut self) -> DriverResult<bool>;
    fn next_result(&mut self) -> DriverResult<bool>;

    fn field_count(&self) -> usize;
    fn has_rows(&self) -> bool;
    fn depth(&self) -> usize;
    fn records_affected(&self) -> i64;
    fn is_closed(&self) -> bool;

    fn name(&self, ordinal: usize) -> DriverResult<String>;
    fn ordinal(&self, name: &str) -> DriverResult<usize>;
    fn data_type_name(&self, ordinal: usize) -> DriverResult<String>;
    fn value(&self, ordinal: usize) -> DriverResult<Value>;
    fn is_null(&self, ordinal: usize) -> DriverResult<bool>;
    fn schema_table(&self) -> DriverResult<Option<SchemaTable>>;

    fn close(&mut self) -> DriverResult<()>;

    /// `Some` only when this cursor is already a profiling proxy.
    fn as_profiled(&self) -> Option<&ProfiledReader> {
        None
    }
}

/// Whether two shared handles point at the same object.
pub(crate) fn same_handle<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
