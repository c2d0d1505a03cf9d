//! Profiled command: the execution entry point of the proxy graph.

use std::sync::Arc;

use once_cell::unsync::OnceCell;

use crate::adapters::{conform_parameter, conform_parameters};
use crate::connection::ProfiledConnection;
use crate::driver::{
    same_handle, CommandBehavior, CommandParameter, CommandParameters, CommandType, DataReader,
    DbCommand, DbConnection, DbParameterCollection, DbTransaction, DriverError, DriverResult,
    UpdateRowSource,
};
use crate::error::{ProfilingError, Result};
use crate::profiler::{DbProfiler, ExecutionKind};
use crate::reader::ProfiledReader;
use crate::tags::TagCollection;
use crate::transaction::ProfiledTransaction;
use crate::value::Value;

/// A profiling wrapper around a native [`DbCommand`].
///
/// Configuration is forwarded to the native command untouched. Every
/// `execute_*` call is handed to the [`DbProfiler`], which times the real
/// execution and records it with the command's current [`tags`](Self::tags).
/// Readers produced by the native command come back as [`ProfiledReader`]s.
///
/// The connection, transaction and parameter collection the native command
/// exposes are wrapped lazily on first access and cached; handles that are
/// already profiling proxies are returned as they are.
///
/// # Example
///
/// ```rust,ignore
/// use profiled_db::{ProfiledCommand, TagCollection};
///
/// let mut command = ProfiledCommand::new(native, profiler, Some(TagCollection::new(["report"])));
/// command.set_command_text("SELECT count(*) FROM orders");
/// let count = command.execute_scalar()?;
/// ```
pub struct ProfiledCommand {
    inner: Box<dyn DbCommand>,
    profiler: Arc<dyn DbProfiler>,
    tags: Option<TagCollection>,
    connection: OnceCell<Arc<dyn DbConnection>>,
    transaction: OnceCell<Arc<dyn DbTransaction>>,
    parameters: OnceCell<Arc<dyn DbParameterCollection>>,
}

impl ProfiledCommand {
    /// Create a new profiled command around a native command.
    pub fn new(
        command: Box<dyn DbCommand>,
        profiler: Arc<dyn DbProfiler>,
        tags: Option<TagCollection>,
    ) -> Self {
        Self {
            inner: command,
            profiler,
            tags,
            connection: OnceCell::new(),
            transaction: OnceCell::new(),
            parameters: OnceCell::new(),
        }
    }

    /// Wrap `command` unless it already is a profiled command.
    pub fn wrap(command: Box<dyn DbCommand>, profiler: &Arc<dyn DbProfiler>) -> Box<dyn DbCommand> {
        if command.as_profiled().is_some() {
            return command;
        }
        Box::new(Self::new(command, profiler.clone(), None))
    }

    /// Start building a command whose collaborators are checked at `build()`.
    pub fn builder() -> ProfiledCommandBuilder {
        ProfiledCommandBuilder::default()
    }

    /// A command created by a profiled connection, which it reports as its own.
    pub(crate) fn bound(
        command: Box<dyn DbCommand>,
        connection: Option<Arc<dyn DbConnection>>,
        profiler: Arc<dyn DbProfiler>,
    ) -> Self {
        let mut profiled = Self::new(command, profiler, None);
        if let Some(connection) = connection {
            profiled.connection = OnceCell::from(connection);
        }
        profiled
    }

    /// Tags attached to every timing this command records.
    pub fn tags(&self) -> Option<&TagCollection> {
        self.tags.as_ref()
    }

    /// Mutable access to the tags; changes apply to the next execution.
    pub fn tags_mut(&mut self) -> &mut Option<TagCollection> {
        &mut self.tags
    }

    /// Replace the tags used from the next execution on.
    pub fn set_tags(&mut self, tags: Option<TagCollection>) {
        self.tags = tags;
    }

    /// Get a reference to the native command.
    pub fn inner(&self) -> &dyn DbCommand {
        &*self.inner
    }

    /// Get the profiler executions are reported to.
    pub fn profiler(&self) -> &Arc<dyn DbProfiler> {
        &self.profiler
    }

    /// Hand `run` to the profiler and return what it produced.
    ///
    /// A nested profiled command records the timing itself.
    fn profile<T, F>(&mut self, kind: ExecutionKind, run: F) -> DriverResult<T>
    where
        F: FnOnce(&mut dyn DbCommand) -> DriverResult<T>,
    {
        if self.inner.as_profiled().is_some() {
            return run(&mut *self.inner);
        }

        let mut output = None;
        self.profiler.execute_db_command(
            kind,
            &mut *self.inner,
            Box::new(|command: &mut dyn DbCommand| -> DriverResult<()> {
                output = Some(run(command)?);
                Ok(())
            }),
            self.tags.as_ref(),
        )?;

        output.ok_or_else(|| DriverError::from(ProfilingError::ExecutionSkipped(kind)))
    }
}

impl DbCommand for ProfiledCommand {
    fn command_text(&self) -> String {
        self.inner.command_text()
    }

    fn set_command_text(&mut self, text: &str) {
        self.inner.set_command_text(text);
    }

    fn command_timeout(&self) -> u32 {
        self.inner.command_timeout()
    }

    fn set_command_timeout(&mut self, seconds: u32) {
        self.inner.set_command_timeout(seconds);
    }

    fn command_type(&self) -> CommandType {
        self.inner.command_type()
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.inner.set_command_type(command_type);
    }

    fn updated_row_source(&self) -> UpdateRowSource {
        self.inner.updated_row_source()
    }

    fn set_updated_row_source(&mut self, source: UpdateRowSource) {
        self.inner.set_updated_row_source(source);
    }

    fn design_time_visible(&self) -> bool {
        self.inner.design_time_visible()
    }

    fn set_design_time_visible(&mut self, visible: bool) {
        self.inner.set_design_time_visible(visible);
    }

    fn connection(&self) -> Option<Arc<dyn DbConnection>> {
        let native = self.inner.connection()?;
        let connection = self
            .connection
            .get_or_init(|| ProfiledConnection::wrap(native, &self.profiler));
        Some(connection.clone())
    }

    /// The native command receives the native handle; a proxy is kept as
    /// this command's connection.
    fn set_connection(&mut self, connection: Option<Arc<dyn DbConnection>>) {
        let native = connection.as_ref().map(|c| match c.as_profiled() {
            Some(profiled) => profiled.inner().clone(),
            None => c.clone(),
        });
        self.inner.set_connection(native);

        self.connection = match connection {
            Some(c) if c.as_profiled().is_some() => OnceCell::from(c),
            _ => OnceCell::new(),
        };

        // A cached transaction proxy must belong to the current connection proxy.
        let bound_here = match (self.transaction.get(), self.connection.get()) {
            (Some(transaction), Some(connection)) => transaction
                .connection()
                .is_some_and(|c| same_handle(&c, connection)),
            _ => false,
        };
        if !bound_here {
            self.transaction = OnceCell::new();
        }
    }

    fn transaction(&self) -> Option<Arc<dyn DbTransaction>> {
        let native = self.inner.transaction()?;
        let transaction = self.transaction.get_or_init(|| {
            let connection = self.connection();
            match connection.as_deref().and_then(|c| c.as_profiled()) {
                Some(profiled) => profiled.wrap_transaction(native),
                None => ProfiledTransaction::wrap(native, &self.profiler),
            }
        });
        Some(transaction.clone())
    }

    fn set_transaction(&mut self, transaction: Option<Arc<dyn DbTransaction>>) {
        let native = transaction.as_ref().map(|t| match t.as_profiled() {
            Some(profiled) => profiled.inner().clone(),
            None => t.clone(),
        });
        self.inner.set_transaction(native);

        self.transaction = match transaction {
            Some(t) if t.as_profiled().is_some() => OnceCell::from(t),
            _ => OnceCell::new(),
        };
    }

    fn parameters(&self) -> Option<CommandParameters> {
        let native = self.inner.parameters()?;
        let parameters = self.parameters.get_or_init(|| conform_parameters(native));
        Some(CommandParameters::Db(parameters.clone()))
    }

    fn create_parameter(&self) -> CommandParameter {
        CommandParameter::Db(conform_parameter(self.inner.create_parameter()))
    }

    fn prepare(&mut self) -> DriverResult<()> {
        self.inner.prepare()
    }

    fn cancel(&mut self) {
        self.inner.cancel();
    }

    fn execute_reader(&mut self, behavior: CommandBehavior) -> DriverResult<Box<dyn DataReader>> {
        let reader = self.profile(ExecutionKind::Reader, |command| command.execute_reader(behavior))?;
        Ok(ProfiledReader::wrap(reader, &self.profiler))
    }

    fn execute_non_query(&mut self) -> DriverResult<i64> {
        self.profile(ExecutionKind::NonQuery, |command| command.execute_non_query())
    }

    fn execute_scalar(&mut self) -> DriverResult<Option<Value>> {
        self.profile(ExecutionKind::Scalar, |command| command.execute_scalar())
    }

    /// Disposes the native command. The profiler is shared and left alone.
    fn dispose(&mut self) {
        tracing::trace!("Disposing profiled command");
        self.inner.dispose();
    }

    fn as_profiled(&self) -> Option<&ProfiledCommand> {
        Some(self)
    }

    fn as_profiled_mut(&mut self) -> Option<&mut ProfiledCommand> {
        Some(self)
    }
}

/// Builder for [`ProfiledCommand`] that reports missing collaborators as
/// errors instead of panicking.
#[derive(Default)]
pub struct ProfiledCommandBuilder {
    command: Option<Box<dyn DbCommand>>,
    profiler: Option<Arc<dyn DbProfiler>>,
    tags: Option<TagCollection>,
}

impl ProfiledCommandBuilder {
    /// Set the native command to wrap.
    pub fn command(mut self, command: Box<dyn DbCommand>) -> Self {
        self.command = Some(command);
        self
    }

    /// Set the profiler executions are reported to.
    pub fn profiler(mut self, profiler: Arc<dyn DbProfiler>) -> Self {
        self.profiler = Some(profiler);
        self
    }

    /// Set the initial tags.
    pub fn tags(mut self, tags: TagCollection) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Build the command, failing on the first missing collaborator.
    pub fn build(self) -> Result<ProfiledCommand> {
        let command = self.command.ok_or(ProfilingError::MissingArgument("command"))?;
        let profiler = self.profiler.ok_or(ProfilingError::MissingArgument("profiler"))?;
        Ok(ProfiledCommand::new(command, profiler, self.tags))
    }
}
