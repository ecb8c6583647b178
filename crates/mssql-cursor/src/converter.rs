//! Output converters.
//!
//! An output converter intercepts decoded values of one driver type id
//! before they reach a [`Row`](crate::Row). Registries belong to a single
//! connection and are shared with the cursors it creates.
//!
//! The registry is copy-on-write: writers swap in a new map under a short
//! write lock, while the decode path takes one snapshot per fetch and never
//! sees a partially updated mapping.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mssql_types::{SqlType, SqlValue};
use parking_lot::RwLock;

/// A transform applied to every non-NULL value of one driver type id.
pub type OutputConverter = Arc<dyn Fn(SqlValue) -> SqlValue + Send + Sync>;

type ConverterMap = HashMap<SqlType, OutputConverter>;

/// Connection-scoped output converter registry.
///
/// Cloning yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    map: Arc<RwLock<Arc<ConverterMap>>>,
}

impl ConverterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `converter` for `sql_type`, replacing any previous one.
    ///
    /// Returns the converter that was replaced.
    pub fn register<F>(&self, sql_type: SqlType, converter: F) -> Option<OutputConverter>
    where
        F: Fn(SqlValue) -> SqlValue + Send + Sync + 'static,
    {
        let mut guard = self.map.write();
        let mut next = ConverterMap::clone(&guard);
        let previous = next.insert(sql_type, Arc::new(converter));
        *guard = Arc::new(next);

        tracing::debug!(
            sql_type = %sql_type,
            replaced = previous.is_some(),
            "registered output converter"
        );
        previous
    }

    /// Remove the converter for `sql_type`.
    ///
    /// Removing an id with no converter is a no-op. Returns whether a
    /// converter was removed.
    pub fn unregister(&self, sql_type: SqlType) -> bool {
        let mut guard = self.map.write();
        if !guard.contains_key(&sql_type) {
            return false;
        }
        let mut next = ConverterMap::clone(&guard);
        next.remove(&sql_type);
        *guard = Arc::new(next);

        tracing::debug!(sql_type = %sql_type, "removed output converter");
        true
    }

    /// Remove every converter.
    pub fn clear(&self) {
        *self.map.write() = Arc::default();
    }

    /// Converter currently registered for `sql_type`.
    #[must_use]
    pub fn lookup(&self, sql_type: SqlType) -> Option<OutputConverter> {
        self.map.read().get(&sql_type).cloned()
    }

    /// Number of registered converters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Whether no converter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Consistent view of the registry at this moment.
    #[must_use]
    pub fn snapshot(&self) -> ConverterSnapshot {
        ConverterSnapshot {
            map: Arc::clone(&self.map.read()),
        }
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.map.read();
        let mut types: Vec<_> = map.keys().copied().collect();
        types.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("types", &types)
            .finish()
    }
}

/// Immutable view of a registry, taken once per fetch.
#[derive(Clone, Default)]
pub struct ConverterSnapshot {
    map: Arc<ConverterMap>,
}

impl ConverterSnapshot {
    /// Converter for `sql_type` in this snapshot.
    #[must_use]
    pub fn get(&self, sql_type: SqlType) -> Option<&OutputConverter> {
        self.map.get(&sql_type)
    }

    /// Whether the snapshot holds no converters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for ConverterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterSnapshot")
            .field("converters", &self.map.len())
            .finish()
    }
}
