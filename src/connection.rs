//! Profiled connection handle.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::command::ProfiledCommand;
use crate::driver::{
    same_handle, ConnectionState, DbCommand, DbConnection, DbTransaction, DriverResult,
    IsolationLevel, SchemaTable,
};
use crate::profiler::DbProfiler;
use crate::transaction::ProfiledTransaction;

/// A profiling wrapper around a native [`DbConnection`].
///
/// It implements `DbConnection` itself, so it is a drop-in replacement for
/// the native handle. Commands created through it are [`ProfiledCommand`]s
/// bound to this connection and its profiler, and transactions begun on it
/// are [`ProfiledTransaction`]s whose connection is this wrapper.
///
/// # Example
///
/// ```rust,ignore
/// use profiled_db::{ProfiledConnection, TracingProfiler};
///
/// let profiler: Arc<dyn DbProfiler> = Arc::new(TracingProfiler::default());
/// let connection = ProfiledConnection::new(native_connection, profiler);
///
/// // Every command created here is timed
/// let mut command = connection.create_command();
/// command.set_command_text("SELECT 1");
/// let value = command.execute_scalar()?;
/// ```
pub struct ProfiledConnection {
    inner: Arc<dyn DbConnection>,
    profiler: Arc<dyn DbProfiler>,
    this: Weak<ProfiledConnection>,
    transaction: Mutex<Weak<ProfiledTransaction>>,
}

impl ProfiledConnection {
    /// Create a new profiled connection around a native connection.
    pub fn new(inner: Arc<dyn DbConnection>, profiler: Arc<dyn DbProfiler>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            inner,
            profiler,
            this: this.clone(),
            transaction: Mutex::new(Weak::new()),
        })
    }

    /// Wrap `connection` unless it already is a profiled connection.
    pub fn wrap(
        connection: Arc<dyn DbConnection>,
        profiler: &Arc<dyn DbProfiler>,
    ) -> Arc<dyn DbConnection> {
        if connection.as_profiled().is_some() {
            return connection;
        }
        tracing::trace!("Wrapping native connection");
        Self::new(connection, profiler.clone())
    }

    /// Get a reference to the native connection.
    pub fn inner(&self) -> &Arc<dyn DbConnection> {
        &self.inner
    }

    /// Get the profiler commands created here report to.
    pub fn profiler(&self) -> &Arc<dyn DbProfiler> {
        &self.profiler
    }

    /// The wrapper for the transaction most recently begun here, while it is alive.
    pub fn active_transaction(&self) -> Option<Arc<ProfiledTransaction>> {
        self.transaction.lock().upgrade()
    }

    /// Wrap a native transaction running on this connection.
    ///
    /// Returns the active wrapper when it already wraps `transaction`, so the
    /// same native handle always maps to the same proxy.
    pub fn wrap_transaction(&self, transaction: Arc<dyn DbTransaction>) -> Arc<dyn DbTransaction> {
        if transaction.as_profiled().is_some() {
            return transaction;
        }

        let mut active = self.transaction.lock();
        if let Some(existing) = active.upgrade() {
            if same_handle(existing.inner(), &transaction) {
                return existing;
            }
        }

        let profiler = self.profiler.clone();
        let wrapped = Arc::new(match self.handle() {
            Some(connection) => ProfiledTransaction::bound(transaction, connection, profiler),
            None => ProfiledTransaction::new(transaction, profiler),
        });
        *active = Arc::downgrade(&wrapped);
        wrapped
    }

    fn handle(&self) -> Option<Arc<dyn DbConnection>> {
        self.this
            .upgrade()
            .map(|connection| connection as Arc<dyn DbConnection>)
    }
}

impl DbConnection for ProfiledConnection {
    fn connection_string(&self) -> String {
        self.inner.connection_string()
    }

    fn set_connection_string(&self, connection_string: &str) {
        self.inner.set_connection_string(connection_string);
    }

    fn connection_timeout(&self) -> u32 {
        self.inner.connection_timeout()
    }

    fn database(&self) -> String {
        self.inner.database()
    }

    fn data_source(&self) -> String {
        self.inner.data_source()
    }

    fn server_version(&self) -> String {
        self.inner.server_version()
    }

    fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    fn open(&self) -> DriverResult<()> {
        tracing::debug!(data_source = %self.inner.data_source(), "Opening connection");
        self.inner.open()
    }

    fn close(&self) -> DriverResult<()> {
        tracing::debug!(data_source = %self.inner.data_source(), "Closing connection");
        self.inner.close()
    }

    fn change_database(&self, database: &str) -> DriverResult<()> {
        self.inner.change_database(database)
    }

    fn begin_transaction(&self, isolation_level: IsolationLevel) -> DriverResult<Arc<dyn DbTransaction>> {
        tracing::debug!(isolation_level = ?isolation_level, "Beginning transaction");
        let transaction = self.inner.begin_transaction(isolation_level)?;
        Ok(self.wrap_transaction(transaction))
    }

    fn create_command(&self) -> Box<dyn DbCommand> {
        let command = self.inner.create_command();
        Box::new(ProfiledCommand::bound(
            command,
            self.handle(),
            self.profiler.clone(),
        ))
    }

    fn get_schema(&self, collection: &str, restrictions: &[Option<String>]) -> DriverResult<SchemaTable> {
        self.inner.get_schema(collection, restrictions)
    }

    fn dispose(&self) {
        self.inner.dispose();
    }

    fn as_profiled(&self) -> Option<&ProfiledConnection> {
        Some(self)
    }
}

/// Extension trait for wrapping native handles with a profiler.
pub trait ProfilingExt {
    type Profiled;

    fn with_profiler(self, profiler: Arc<dyn DbProfiler>) -> Self::Profiled;
}

impl ProfilingExt for Arc<dyn DbConnection> {
    type Profiled = Arc<dyn DbConnection>;

    fn with_profiler(self, profiler: Arc<dyn DbProfiler>) -> Self::Profiled {
        ProfiledConnection::wrap(self, &profiler)
    }
}

impl ProfilingExt for Box<dyn DbCommand> {
    type Profiled = Box<dyn DbCommand>;

    fn with_profiler(self, profiler: Arc<dyn DbProfiler>) -> Self::Profiled {
        ProfiledCommand::wrap(self, &profiler)
    }
}
