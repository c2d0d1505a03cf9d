//! Profiled transaction handle.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::connection::ProfiledConnection;
use crate::driver::{DbConnection, DbTransaction, DriverResult, IsolationLevel};
use crate::profiler::DbProfiler;

/// Wraps a native [`DbTransaction`] so that its connection is exposed as a
/// [`ProfiledConnection`] bound to the same profiler.
///
/// Commit and rollback are forwarded as-is; no timing is recorded for them.
pub struct ProfiledTransaction {
    inner: Arc<dyn DbTransaction>,
    profiler: Arc<dyn DbProfiler>,
    connection: OnceCell<Arc<dyn DbConnection>>,
}

impl ProfiledTransaction {
    /// Create a new profiled transaction around a native transaction.
    pub fn new(inner: Arc<dyn DbTransaction>, profiler: Arc<dyn DbProfiler>) -> Self {
        Self {
            inner,
            profiler,
            connection: OnceCell::new(),
        }
    }

    /// A transaction begun on `connection`, which is returned as its connection.
    pub(crate) fn bound(
        inner: Arc<dyn DbTransaction>,
        connection: Arc<dyn DbConnection>,
        profiler: Arc<dyn DbProfiler>,
    ) -> Self {
        Self {
            inner,
            profiler,
            connection: OnceCell::from(connection),
        }
    }

    /// Wrap `transaction` unless it already is a profiled transaction.
    pub fn wrap(
        transaction: Arc<dyn DbTransaction>,
        profiler: &Arc<dyn DbProfiler>,
    ) -> Arc<dyn DbTransaction> {
        if transaction.as_profiled().is_some() {
            return transaction;
        }
        Arc::new(Self::new(transaction, profiler.clone()))
    }

    /// Get a reference to the native transaction.
    pub fn inner(&self) -> &Arc<dyn DbTransaction> {
        &self.inner
    }

    /// Get the profiler shared with the owning connection.
    pub fn profiler(&self) -> &Arc<dyn DbProfiler> {
        &self.profiler
    }
}

impl DbTransaction for ProfiledTransaction {
    fn connection(&self) -> Option<Arc<dyn DbConnection>> {
        let native = self.inner.connection()?;
        let connection = self
            .connection
            .get_or_init(|| ProfiledConnection::wrap(native, &self.profiler));
        Some(connection.clone())
    }

    fn isolation_level(&self) -> IsolationLevel {
        self.inner.isolation_level()
    }

    fn commit(&self) -> DriverResult<()> {
        tracing::debug!(isolation_level = ?self.inner.isolation_level(), "Committing transaction");
        self.inner.commit()
    }

    fn rollback(&self) -> DriverResult<()> {
        tracing::debug!(isolation_level = ?self.inner.isolation_level(), "Rolling back transaction");
        self.inner.rollback()
    }

    fn dispose(&self) {
        self.inner.dispose();
    }

    fn as_profiled(&self) -> Option<&ProfiledTransaction> {
        Some(self)
    }
}
