//! In-memory scripted driver and a recording profiler shared by the
//! integration tests.

#![allow(dead_code)]

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use profiled_db::{
    CommandBehavior, CommandParameter, CommandParameters, CommandType, ConnectionState,
    DataParameter, DataParameterCollection, DataReader, DbCommand, DbConnection, DbParameter,
    DbParameterCollection, DbProfiler, DbTransaction, DbType, DriverResult, Execute,
    ExecutionKind, IsolationLevel, ParameterDirection, SchemaTable, TagCollection,
    UpdateRowSource, Value,
};

/// Ordered log of calls that reached the native driver.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }
}

/// The driver's own error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockError(pub String);

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mock driver error: {}", self.0)
    }
}

impl std::error::Error for MockError {}

/// Which parameter shape a mock command exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Db,
    Data,
    Unsupported,
}

/// Results handed out by mock commands.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub scalar: Option<Value>,
    pub rows_affected: i64,
    pub fail_with: Option<String>,
}

impl Script {
    fn check(&self) -> DriverResult<()> {
        match &self.fail_with {
            Some(message) => Err(Box::new(MockError(message.clone()))),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ParameterState {
    name: String,
    direction: ParameterDirection,
    db_type: DbType,
    value: Value,
    nullable: bool,
    size: usize,
    source_column: String,
}

#[derive(Default)]
pub struct MockDbParameter(Mutex<ParameterState>);

impl DbParameter for MockDbParameter {
    fn name(&self) -> String {
        self.0.lock().name.clone()
    }
    fn set_name(&self, name: &str) {
        self.0.lock().name = name.to_string();
    }
    fn direction(&self) -> ParameterDirection {
        self.0.lock().direction
    }
    fn set_direction(&self, direction: ParameterDirection) {
        self.0.lock().direction = direction;
    }
    fn db_type(&self) -> DbType {
        self.0.lock().db_type
    }
    fn set_db_type(&self, db_type: DbType) {
        self.0.lock().db_type = db_type;
    }
    fn value(&self) -> Value {
        self.0.lock().value.clone()
    }
    fn set_value(&self, value: Value) {
        self.0.lock().value = value;
    }
    fn is_nullable(&self) -> bool {
        self.0.lock().nullable
    }
    fn set_is_nullable(&self, nullable: bool) {
        self.0.lock().nullable = nullable;
    }
    fn size(&self) -> usize {
        self.0.lock().size
    }
    fn set_size(&self, size: usize) {
        self.0.lock().size = size;
    }
    fn source_column(&self) -> String {
        self.0.lock().source_column.clone()
    }
    fn set_source_column(&self, column: &str) {
        self.0.lock().source_column = column.to_string();
    }
}

#[derive(Default)]
pub struct MockDataParameter(Mutex<ParameterState>);

impl DataParameter for MockDataParameter {
    fn name(&self) -> String {
        self.0.lock().name.clone()
    }
    fn set_name(&self, name: &str) {
        self.0.lock().name = name.to_string();
    }
    fn direction(&self) -> ParameterDirection {
        self.0.lock().direction
    }
    fn set_direction(&self, direction: ParameterDirection) {
        self.0.lock().direction = direction;
    }
    fn db_type(&self) -> DbType {
        self.0.lock().db_type
    }
    fn set_db_type(&self, db_type: DbType) {
        self.0.lock().db_type = db_type;
    }
    fn value(&self) -> Value {
        self.0.lock().value.clone()
    }
    fn set_value(&self, value: Value) {
        self.0.lock().value = value;
    }
}

#[derive(Default)]
pub struct MockDbParameters(Mutex<Vec<Arc<dyn DbParameter>>>);

impl DbParameterCollection for MockDbParameters {
    fn len(&self) -> usize {
        self.0.lock().len()
    }
    fn get(&self, index: usize) -> Option<Arc<dyn DbParameter>> {
        self.0.lock().get(index).cloned()
    }
    fn find(&self, name: &str) -> Option<Arc<dyn DbParameter>> {
        self.0.lock().iter().find(|p| p.name() == name).cloned()
    }
    fn add(&self, parameter: Arc<dyn DbParameter>) -> usize {
        let mut items = self.0.lock();
        items.push(parameter);
        items.len() - 1
    }
    fn remove_at(&self, index: usize) -> Option<Arc<dyn DbParameter>> {
        let mut items = self.0.lock();
        (index < items.len()).then(|| items.remove(index))
    }
    fn clear(&self) {
        self.0.lock().clear();
    }
}

#[derive(Default)]
pub struct MockDataParameters(Mutex<Vec<Arc<dyn DataParameter>>>);

impl DataParameterCollection for MockDataParameters {
    fn len(&self) -> usize {
        self.0.lock().len()
    }
    fn get(&self, index: usize) -> Option<Arc<dyn DataParameter>> {
        self.0.lock().get(index).cloned()
    }
    fn find(&self, name: &str) -> Option<Arc<dyn DataParameter>> {
        self.0.lock().iter().find(|p| p.name() == name).cloned()
    }
    fn add(&self, parameter: Arc<dyn DataParameter>) -> usize {
        let mut items = self.0.lock();
        items.push(parameter);
        items.len() - 1
    }
    fn remove_at(&self, index: usize) -> Option<Arc<dyn DataParameter>> {
        let mut items = self.0.lock();
        (index < items.len()).then(|| items.remove(index))
    }
    fn clear(&self) {
        self.0.lock().clear();
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

pub struct MockReader {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: Option<usize>,
    closed: bool,
    journal: Journal,
}

impl MockReader {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>, journal: Journal) -> Self {
        Self {
            columns,
            rows,
            position: None,
            closed: false,
            journal,
        }
    }

    fn current(&self) -> DriverResult<&Vec<Value>> {
        self.position
            .and_then(|i| self.rows.get(i))
            .ok_or_else(|| Box::new(MockError("no current row".into())) as _)
    }
}

impl DataReader for MockReader {
    fn read(&mut self) -> DriverResult<bool> {
        let next = self.position.map_or(0, |i| i + 1);
        self.position = Some(next);
        Ok(next < self.rows.len())
    }

    fn next_result(&mut self) -> DriverResult<bool> {
        Ok(false)
    }

    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    fn depth(&self) -> usize {
        0
    }

    fn records_affected(&self) -> i64 {
        -1
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn name(&self, ordinal: usize) -> DriverResult<String> {
        self.columns
            .get(ordinal)
            .cloned()
            .ok_or_else(|| Box::new(MockError(format!("no column {ordinal}"))) as _)
    }

    fn ordinal(&self, name: &str) -> DriverResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Box::new(MockError(format!("no column {name}"))) as _)
    }

    fn data_type_name(&self, ordinal: usize) -> DriverResult<String> {
        let value = self.value(ordinal)?;
        Ok(match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
        .to_string())
    }

    fn value(&self, ordinal: usize) -> DriverResult<Value> {
        self.current()?
            .get(ordinal)
            .cloned()
            .ok_or_else(|| Box::new(MockError(format!("no column {ordinal}"))) as _)
    }

    fn is_null(&self, ordinal: usize) -> DriverResult<bool> {
        Ok(self.value(ordinal)?.is_null())
    }

    fn schema_table(&self) -> DriverResult<Option<SchemaTable>> {
        Ok(Some(SchemaTable {
            columns: vec!["ColumnName".to_string()],
            rows: self.columns.iter().map(|c| vec![Value::from(c.as_str())]).collect(),
        }))
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.journal.push("reader.close");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

pub struct MockCommand {
    pub text: String,
    pub timeout: u32,
    pub command_type: CommandType,
    pub row_source: UpdateRowSource,
    /// `None` when the driver has no design-time visibility support.
    pub design_time: Option<bool>,
    pub connection: Option<Arc<dyn DbConnection>>,
    pub transaction: Option<Arc<dyn DbTransaction>>,
    pub parameters: Option<CommandParameters>,
    pub shape: Shape,
    pub script: Script,
    pub journal: Journal,
}

impl MockCommand {
    pub fn new(shape: Shape, script: Script, journal: Journal) -> Self {
        let parameters = match shape {
            Shape::Db => Some(CommandParameters::Db(Arc::new(MockDbParameters::default()))),
            Shape::Data => Some(CommandParameters::Data(Arc::new(MockDataParameters::default()))),
            Shape::Unsupported => None,
        };

        Self {
            text: String::new(),
            timeout: 30,
            command_type: CommandType::Text,
            row_source: UpdateRowSource::Both,
            design_time: None,
            connection: None,
            transaction: None,
            parameters,
            shape,
            script,
            journal,
        }
    }
}

impl DbCommand for MockCommand {
    fn command_text(&self) -> String {
        self.text.clone()
    }

    fn set_command_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn command_timeout(&self) -> u32 {
        self.timeout
    }

    fn set_command_timeout(&mut self, seconds: u32) {
        self.timeout = seconds;
    }

    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.command_type = command_type;
    }

    fn updated_row_source(&self) -> UpdateRowSource {
        self.row_source
    }

    fn set_updated_row_source(&mut self, source: UpdateRowSource) {
        self.row_source = source;
    }

    fn design_time_visible(&self) -> bool {
        self.design_time.unwrap_or(false)
    }

    fn set_design_time_visible(&mut self, visible: bool) {
        if self.design_time.is_some() {
            self.design_time = Some(visible);
        }
    }

    fn connection(&self) -> Option<Arc<dyn DbConnection>> {
        self.connection.clone()
    }

    fn set_connection(&mut self, connection: Option<Arc<dyn DbConnection>>) {
        self.connection = connection;
    }

    fn transaction(&self) -> Option<Arc<dyn DbTransaction>> {
        self.transaction.clone()
    }

    fn set_transaction(&mut self, transaction: Option<Arc<dyn DbTransaction>>) {
        self.transaction = transaction;
    }

    fn parameters(&self) -> Option<CommandParameters> {
        self.parameters.clone()
    }

    fn create_parameter(&self) -> CommandParameter {
        match self.shape {
            Shape::Data => CommandParameter::Data(Arc::new(MockDataParameter::default())),
            _ => CommandParameter::Db(Arc::new(MockDbParameter::default())),
        }
    }

    fn prepare(&mut self) -> DriverResult<()> {
        self.journal.push("command.prepare");
        Ok(())
    }

    fn cancel(&mut self) {
        self.journal.push("command.cancel");
    }

    fn execute_reader(&mut self, _behavior: CommandBehavior) -> DriverResult<Box<dyn DataReader>> {
        self.journal.push("command.execute_reader");
        self.script.check()?;
        Ok(Box::new(MockReader::new(
            self.script.columns.clone(),
            self.script.rows.clone(),
            self.journal.clone(),
        )))
    }

    fn execute_non_query(&mut self) -> DriverResult<i64> {
        self.journal.push("command.execute_non_query");
        self.script.check()?;
        Ok(self.script.rows_affected)
    }

    fn execute_scalar(&mut self) -> DriverResult<Option<Value>> {
        self.journal.push("command.execute_scalar");
        self.script.check()?;
        Ok(self.script.scalar.clone())
    }

    fn dispose(&mut self) {
        self.journal.push("command.dispose");
    }
}

// ---------------------------------------------------------------------------
// Connection and transaction
// ---------------------------------------------------------------------------

pub struct MockConnection {
    this: Weak<MockConnection>,
    state: Mutex<ConnectionState>,
    connection_string: Mutex<String>,
    database: Mutex<String>,
    pub shape: Shape,
    pub script: Mutex<Script>,
    pub journal: Journal,
}

impl MockConnection {
    pub fn new(shape: Shape, script: Script, journal: Journal) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            state: Mutex::new(ConnectionState::Closed),
            connection_string: Mutex::new("Data Source=memory".to_string()),
            database: Mutex::new("main".to_string()),
            shape,
            script: Mutex::new(script),
            journal,
        })
    }

    fn handle(&self) -> Option<Arc<dyn DbConnection>> {
        self.this.upgrade().map(|c| c as Arc<dyn DbConnection>)
    }
}

impl DbConnection for MockConnection {
    fn connection_string(&self) -> String {
        self.connection_string.lock().clone()
    }

    fn set_connection_string(&self, connection_string: &str) {
        *self.connection_string.lock() = connection_string.to_string();
    }

    fn connection_timeout(&self) -> u32 {
        15
    }

    fn database(&self) -> String {
        self.database.lock().clone()
    }

    fn data_source(&self) -> String {
        "memory".to_string()
    }

    fn server_version(&self) -> String {
        "1.0.0".to_string()
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn open(&self) -> DriverResult<()> {
        self.journal.push("connection.open");
        *self.state.lock() = ConnectionState::Open;
        Ok(())
    }

    fn close(&self) -> DriverResult<()> {
        self.journal.push("connection.close");
        *self.state.lock() = ConnectionState::Closed;
        Ok(())
    }

    fn change_database(&self, database: &str) -> DriverResult<()> {
        if database.is_empty() {
            return Err(Box::new(MockError("database name is empty".into())));
        }
        *self.database.lock() = database.to_string();
        Ok(())
    }

    fn begin_transaction(&self, isolation_level: IsolationLevel) -> DriverResult<Arc<dyn DbTransaction>> {
        if self.state() != ConnectionState::Open {
            return Err(Box::new(MockError("connection is not open".into())));
        }
        self.journal.push("connection.begin");
        Ok(Arc::new(MockTransaction {
            connection: Mutex::new(self.handle()),
            isolation_level,
            journal: self.journal.clone(),
        }))
    }

    fn create_command(&self) -> Box<dyn DbCommand> {
        let mut command = MockCommand::new(self.shape, self.script.lock().clone(), self.journal.clone());
        command.connection = self.handle();
        Box::new(command)
    }

    fn get_schema(&self, collection: &str, _restrictions: &[Option<String>]) -> DriverResult<SchemaTable> {
        Ok(SchemaTable {
            columns: vec!["CollectionName".to_string()],
            rows: vec![vec![Value::from(collection)]],
        })
    }

    fn dispose(&self) {
        self.journal.push("connection.dispose");
    }
}

pub struct MockTransaction {
    connection: Mutex<Option<Arc<dyn DbConnection>>>,
    isolation_level: IsolationLevel,
    journal: Journal,
}

impl DbTransaction for MockTransaction {
    fn connection(&self) -> Option<Arc<dyn DbConnection>> {
        self.connection.lock().clone()
    }

    fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    fn commit(&self) -> DriverResult<()> {
        if self.connection.lock().take().is_none() {
            return Err(Box::new(MockError("transaction already completed".into())));
        }
        self.journal.push("transaction.commit");
        Ok(())
    }

    fn rollback(&self) -> DriverResult<()> {
        if self.connection.lock().take().is_none() {
            return Err(Box::new(MockError("transaction already completed".into())));
        }
        self.journal.push("transaction.rollback");
        Ok(())
    }

    fn dispose(&self) {
        self.journal.push("transaction.dispose");
    }
}

// ---------------------------------------------------------------------------
// Profiler
// ---------------------------------------------------------------------------

/// One recorded execution.
#[derive(Debug, Clone)]
pub struct Timing {
    pub kind: ExecutionKind,
    pub command_text: String,
    pub tags: Option<TagCollection>,
    pub failed: bool,
    pub error: Option<String>,
}

/// Records every execution it is handed.
#[derive(Default)]
pub struct RecordingProfiler {
    timings: Mutex<Vec<Timing>>,
    finished_readers: Mutex<usize>,
}

impl RecordingProfiler {
    pub fn timings(&self) -> Vec<Timing> {
        self.timings.lock().clone()
    }

    pub fn finished_readers(&self) -> usize {
        *self.finished_readers.lock()
    }
}

impl DbProfiler for RecordingProfiler {
    fn execute_db_command(
        &self,
        kind: ExecutionKind,
        command: &mut dyn DbCommand,
        execute: Execute<'_>,
        tags: Option<&TagCollection>,
    ) -> DriverResult<()> {
        let command_text = command.command_text();
        let tags = tags.cloned();

        let result = execute(command);

        self.timings.lock().push(Timing {
            kind,
            command_text,
            tags,
            failed: result.is_err(),
            error: result.as_ref().err().map(|e| e.to_string()),
        });
        result
    }

    fn reader_finished(&self, _reader: &dyn DataReader) {
        *self.finished_readers.lock() += 1;
    }
}

/// A broken profiler that never runs the execution.
pub struct SkippingProfiler;

impl DbProfiler for SkippingProfiler {
    fn execute_db_command(
        &self,
        _kind: ExecutionKind,
        _command: &mut dyn DbCommand,
        _execute: Execute<'_>,
        _tags: Option<&TagCollection>,
    ) -> DriverResult<()> {
        Ok(())
    }
}

pub fn recording() -> (Arc<RecordingProfiler>, Arc<dyn DbProfiler>) {
    let recorder = Arc::new(RecordingProfiler::default());
    let profiler: Arc<dyn DbProfiler> = recorder.clone();
    (recorder, profiler)
}

pub fn same<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
