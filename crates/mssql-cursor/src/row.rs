//! Decoded rows.
//!
//! A [`Row`] holds fully decoded values plus a shared handle to the result
//! set's [`Description`]. Rows are immutable and cheap to clone.
//!
//! ## Access Patterns
//!
//! - `get_value()` - borrowed [`SqlValue`], no conversion
//! - `get::<T>()` - type-converting accessor using `FromSql`
//! - `try_get::<T>()` - `None` for NULL, missing columns or failed conversion
//! - `*_by_name()` variants resolve the column case-insensitively

use std::fmt;
use std::sync::Arc;

use mssql_types::{FromSql, SqlValue, TypeError};

use crate::description::{ColumnDescriptor, Description};

/// A row from a result set.
#[derive(Clone, PartialEq)]
pub struct Row {
    values: Arc<[SqlValue]>,
    description: Description,
}

impl Row {
    /// Create a row from decoded values in column order.
    pub fn new(description: Description, values: Vec<SqlValue>) -> Self {
        Self {
            values: values.into(),
            description,
        }
    }

    // ========================================================================
    // Value Access
    // ========================================================================

    /// Get the decoded value at `index`.
    #[must_use]
    pub fn get_value(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Get the decoded value of the named column.
    #[must_use]
    pub fn get_value_by_name(&self, name: &str) -> Option<&SqlValue> {
        let index = self.description.find_by_name(name)?;
        self.get_value(index)
    }

    /// Get a value by column index with type conversion.
    pub fn get<T: FromSql>(&self, index: usize) -> Result<T, TypeError> {
        self.values
            .get(index)
            .ok_or_else(|| TypeError::TypeMismatch {
                expected: "valid column index",
                actual: format!("index {index} out of bounds"),
            })
            .and_then(T::from_sql)
    }

    /// Get a value by column name with type conversion.
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T, TypeError> {
        let index = self
            .description
            .find_by_name(name)
            .ok_or_else(|| TypeError::TypeMismatch {
                expected: "valid column name",
                actual: format!("column '{name}' not found"),
            })?;

        self.get(index)
    }

    /// Try to get a value by column index, returning None if NULL or not found.
    pub fn try_get<T: FromSql>(&self, index: usize) -> Option<T> {
        self.values
            .get(index)
            .and_then(|v| T::from_sql_nullable(v).ok().flatten())
    }

    /// Try to get a value by column name, returning None if NULL or not found.
    pub fn try_get_by_name<T: FromSql>(&self, name: &str) -> Option<T> {
        let index = self.description.find_by_name(name)?;
        self.try_get(index)
    }

    // ========================================================================
    // Metadata Access
    // ========================================================================

    /// Get the number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check if a column value is NULL.
    ///
    /// Out-of-range indexes report NULL.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.values.get(index).is_none_or(SqlValue::is_null)
    }

    /// Get the column descriptors.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        self.description.columns()
    }

    /// Get the shared result description.
    #[must_use]
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Iterate over the values in column order.
    pub fn iter(&self) -> std::slice::Iter<'_, SqlValue> {
        self.values.iter()
    }

    /// All values in column order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (column, value) in self.description.iter().zip(self.values.iter()) {
            map.entry(&column.name, value);
        }
        map.finish()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a SqlValue;
    type IntoIter = std::slice::Iter<'a, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tds_protocol::{ColMetaData, ColumnData, TypeId, TypeInfo};

    fn row(values: Vec<SqlValue>) -> Row {
        let meta = ColMetaData {
            columns: vec![
                ColumnData::new("id", TypeId::Int4, TypeInfo::default()),
                ColumnData::new("Name", TypeId::NVarChar, TypeInfo::default()),
                ColumnData::new("blob", TypeId::BigVarBinary, TypeInfo::default()),
            ],
        };
        Row::new(Description::from_metadata(&meta, 8000).unwrap(), values)
    }

    #[test]
    fn test_positional_and_named_access() {
        let row = row(vec![
            SqlValue::Int(42),
            SqlValue::String("Alice".into()),
            SqlValue::Binary(Bytes::from_static(&[1, 2])),
        ]);

        assert_eq!(row.len(), 3);
        assert_eq!(row.get::<i32>(0).unwrap(), 42);
        assert_eq!(row.get::<i64>(0).unwrap(), 42);
        assert_eq!(row.get_by_name::<String>("name").unwrap(), "Alice");
        assert_eq!(row.get_value_by_name("BLOB").unwrap().as_bytes(), Some(&[1u8, 2][..]));
        assert!(row.get::<i32>(9).is_err());
        assert!(row.get_by_name::<i32>("missing").is_err());
    }

    #[test]
    fn test_nulls() {
        let row = row(vec![SqlValue::Int(1), SqlValue::Null, SqlValue::Null]);

        assert!(!row.is_null(0));
        assert!(row.is_null(1));
        assert!(row.is_null(99));
        assert_eq!(row.try_get::<String>(1), None);
        assert_eq!(row.try_get_by_name::<i32>("id"), Some(1));
        assert!(matches!(row.get::<String>(1), Err(TypeError::UnexpectedNull)));
    }

    #[test]
    fn test_iteration_and_debug() {
        let row = row(vec![SqlValue::Int(1), SqlValue::from("x"), SqlValue::Null]);
        let collected: Vec<_> = (&row).into_iter().cloned().collect();
        assert_eq!(collected, row.values());
        assert_eq!(row.iter().filter(|v| v.is_null()).count(), 1);

        let debug = format!("{row:?}");
        assert!(debug.contains("\"Name\""));
        assert_eq!(row.columns()[1].name, "Name");
    }
}
