//! Pass-through shims presenting minimal-shape driver parameters as the full
//! [`DbParameter`] / [`DbParameterCollection`] shape.

use std::sync::Arc;

use crate::driver::{
    CommandParameter, CommandParameters, DataParameter, DataParameterCollection, DbParameter,
    DbParameterCollection, DbType, ParameterDirection,
};
use crate::value::Value;

/// Presents a [`DataParameter`] as a [`DbParameter`].
///
/// Properties the minimal shape lacks report fixed defaults (`is_nullable`
/// is `false`, `size` is `0`, `source_column` is empty) and ignore writes.
pub struct ParameterWrapper {
    inner: Arc<dyn DataParameter>,
}

impl ParameterWrapper {
    /// Wrap a minimal-shape parameter.
    pub fn new(inner: Arc<dyn DataParameter>) -> Self {
        Self { inner }
    }

    /// Get a reference to the wrapped parameter.
    pub fn inner(&self) -> &Arc<dyn DataParameter> {
        &self.inner
    }
}

impl DbParameter for ParameterWrapper {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn set_name(&self, name: &str) {
        self.inner.set_name(name);
    }

    fn direction(&self) -> ParameterDirection {
        self.inner.direction()
    }

    fn set_direction(&self, direction: ParameterDirection) {
        self.inner.set_direction(direction);
    }

    fn db_type(&self) -> DbType {
        self.inner.db_type()
    }

    fn set_db_type(&self, db_type: DbType) {
        self.inner.set_db_type(db_type);
    }

    fn value(&self) -> Value {
        self.inner.value()
    }

    fn set_value(&self, value: Value) {
        self.inner.set_value(value);
    }

    fn is_nullable(&self) -> bool {
        false
    }

    fn set_is_nullable(&self, _nullable: bool) {}

    fn size(&self) -> usize {
        0
    }

    fn set_size(&self, _size: usize) {}

    fn source_column(&self) -> String {
        String::new()
    }

    fn set_source_column(&self, _column: &str) {}

    fn as_data_parameter(&self) -> Option<Arc<dyn DataParameter>> {
        Some(self.inner.clone())
    }
}

/// Presents a full-shape parameter to a minimal-shape collection, for
/// parameters that were not created by the collection's own driver.
struct DataParameterView(Arc<dyn DbParameter>);

impl DataParameter for DataParameterView {
    fn name(&self) -> String {
        self.0.name()
    }

    fn set_name(&self, name: &str) {
        self.0.set_name(name);
    }

    fn direction(&self) -> ParameterDirection {
        self.0.direction()
    }

    fn set_direction(&self, direction: ParameterDirection) {
        self.0.set_direction(direction);
    }

    fn db_type(&self) -> DbType {
        self.0.db_type()
    }

    fn set_db_type(&self, db_type: DbType) {
        self.0.set_db_type(db_type);
    }

    fn value(&self) -> Value {
        self.0.value()
    }

    fn set_value(&self, value: Value) {
        self.0.set_value(value);
    }
}

fn wrap_parameter(parameter: Arc<dyn DataParameter>) -> Arc<dyn DbParameter> {
    Arc::new(ParameterWrapper::new(parameter))
}

/// Presents a [`DataParameterCollection`] as a [`DbParameterCollection`].
pub struct ParameterCollectionWrapper {
    inner: Arc<dyn DataParameterCollection>,
}

impl ParameterCollectionWrapper {
    /// Wrap a minimal-shape parameter collection.
    pub fn new(inner: Arc<dyn DataParameterCollection>) -> Self {
        Self { inner }
    }

    /// Get a reference to the wrapped collection.
    pub fn inner(&self) -> &Arc<dyn DataParameterCollection> {
        &self.inner
    }
}

impl DbParameterCollection for ParameterCollectionWrapper {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get(&self, index: usize) -> Option<Arc<dyn DbParameter>> {
        self.inner.get(index).map(wrap_parameter)
    }

    fn find(&self, name: &str) -> Option<Arc<dyn DbParameter>> {
        self.inner.find(name).map(wrap_parameter)
    }

    fn add(&self, parameter: Arc<dyn DbParameter>) -> usize {
        let native = parameter
            .as_data_parameter()
            .unwrap_or_else(|| Arc::new(DataParameterView(parameter)) as Arc<dyn DataParameter>);
        self.inner.add(native)
    }

    fn remove_at(&self, index: usize) -> Option<Arc<dyn DbParameter>> {
        self.inner.remove_at(index).map(wrap_parameter)
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }
}

/// Expose a native parameter collection in the full shape, adapting only
/// when the driver does not already provide it.
pub(crate) fn conform_parameters(parameters: CommandParameters) -> Arc<dyn DbParameterCollection> {
    match parameters {
        CommandParameters::Db(collection) => collection,
        CommandParameters::Data(collection) => Arc::new(ParameterCollectionWrapper::new(collection)),
    }
}

/// Expose a freshly created native parameter in the full shape.
pub(crate) fn conform_parameter(parameter: CommandParameter) -> Arc<dyn DbParameter> {
    match parameter {
        CommandParameter::Db(parameter) => parameter,
        CommandParameter::Data(parameter) => wrap_parameter(parameter),
    }
}
