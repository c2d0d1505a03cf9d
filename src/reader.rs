//! Profiled result cursor.

use std::sync::Arc;

use crate::driver::{DataReader, DriverResult, SchemaTable};
use crate::profiler::DbProfiler;
use crate::value::Value;

/// Wraps a native [`DataReader`] so that reading behaves identically while
/// closing is reported to the profiler.
///
/// The native reader is closed at most once, however many times `close` is
/// called; dropping an open `ProfiledReader` closes it as well.
pub struct ProfiledReader {
    inner: Box<dyn DataReader>,
    profiler: Arc<dyn DbProfiler>,
    closed: bool,
}

impl ProfiledReader {
    /// Create a new profiled reader around a native reader.
    pub fn new(inner: Box<dyn DataReader>, profiler: Arc<dyn DbProfiler>) -> Self {
        Self {
            inner,
            profiler,
            closed: false,
        }
    }

    /// Wrap `reader` unless it already is a profiled reader.
    pub fn wrap(reader: Box<dyn DataReader>, profiler: &Arc<dyn DbProfiler>) -> Box<dyn DataReader> {
        if reader.as_profiled().is_some() {
            return reader;
        }
        Box::new(Self::new(reader, profiler.clone()))
    }

    /// Get a reference to the native reader.
    pub fn inner(&self) -> &dyn DataReader {
        &*self.inner
    }

    /// Get the profiler notified when this reader closes.
    pub fn profiler(&self) -> &Arc<dyn DbProfiler> {
        &self.profiler
    }
}

impl DataReader for ProfiledReader {
    fn read(&mut self) -> DriverResult<bool> {
        self.inner.read()
    }

    fn next_result(&mut self) -> DriverResult<bool> {
        self.inner.next_result()
    }

    fn field_count(&self) -> usize {
        self.inner.field_count()
    }

    fn has_rows(&self) -> bool {
        self.inner.has_rows()
    }

    fn depth(&self) -> usize {
        self.inner.depth()
    }

    fn records_affected(&self) -> i64 {
        self.inner.records_affected()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn name(&self, ordinal: usize) -> DriverResult<String> {
        self.inner.name(ordinal)
    }

    fn ordinal(&self, name: &str) -> DriverResult<usize> {
        self.inner.ordinal(name)
    }

    fn data_type_name(&self, ordinal: usize) -> DriverResult<String> {
        self.inner.data_type_name(ordinal)
    }

    fn value(&self, ordinal: usize) -> DriverResult<Value> {
        self.inner.value(ordinal)
    }

    fn is_null(&self, ordinal: usize) -> DriverResult<bool> {
        self.inner.is_null(ordinal)
    }

    fn schema_table(&self) -> DriverResult<Option<SchemaTable>> {
        self.inner.schema_table()
    }

    fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.inner.close();
        self.profiler.reader_finished(&*self.inner);
        tracing::trace!(failed = result.is_err(), "Profiled reader closed");
        result
    }

    fn as_profiled(&self) -> Option<&ProfiledReader> {
        Some(self)
    }
}

impl Drop for ProfiledReader {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::debug!(error = %e, "Closing reader on drop failed");
        }
    }
}
