//! Column descriptions for a result set.
//!
//! A [`Description`] is derived once from the server's column metadata when
//! a statement produces a result set. It is immutable afterwards and shared
//! (via `Arc`) between the cursor and every row it returns.

use std::sync::Arc;

use mssql_types::{SqlType, TypeCode, TypeMappingError, describe, resolve};
use tds_protocol::{ColMetaData, ColumnData, TypeId, TypeInfo};

use crate::error::{Error, Result};

/// How a column's cells travel from the transport to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// Length-prefixed cell delivered in one buffer.
    Inline,
    /// PLP-framed value read chunk by chunk and assembled before decoding.
    Streamed,
}

/// DB-API style description tuple:
/// `(name, type_code, display_size, internal_size, precision, scale, nullable)`.
pub type DescriptionTuple<'a> = (
    &'a str,
    TypeCode,
    Option<u32>,
    Option<u32>,
    Option<u8>,
    Option<u8>,
    bool,
);

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ColumnDescriptor {
    /// Column name (or alias) exactly as the server reported it.
    pub name: String,
    /// Zero-based position in the select list.
    pub ordinal: usize,
    /// Semantic type.
    pub type_code: TypeCode,
    /// Driver-level type id; output converters are keyed by it.
    pub sql_type: SqlType,
    /// Maximum characters needed to render a value.
    pub display_size: Option<u32>,
    /// Bytes a value occupies on the wire.
    pub internal_size: Option<u32>,
    /// Precision.
    pub precision: Option<u8>,
    /// Scale.
    pub scale: Option<u8>,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Wire type of the column.
    pub type_id: TypeId,
    /// Wire type details used for decoding.
    pub type_info: TypeInfo,
    /// Inline or streamed cell delivery.
    pub fetch_mode: FetchMode,
}

impl ColumnDescriptor {
    /// Build the descriptor for one server column.
    ///
    /// Fails with [`Error::TypeMapping`] when the wire type has no catalog
    /// entry.
    pub fn from_column_data(
        ordinal: usize,
        column: &ColumnData,
        inline_threshold: usize,
    ) -> Result<Self> {
        let mapping_error = |source| Error::TypeMapping {
            column: column.name.clone(),
            source,
        };

        let entry = resolve(column.col_type, column.type_info.max_length).map_err(mapping_error)?;
        let type_id = column
            .type_id()
            .ok_or(TypeMappingError::UnknownWireType(column.col_type))
            .map_err(mapping_error)?;
        let display = describe(type_id, &column.type_info);

        Ok(Self {
            name: column.name.clone(),
            ordinal,
            type_code: entry.type_code,
            sql_type: entry.sql_type,
            display_size: display.display_size,
            internal_size: display.internal_size,
            precision: display.precision,
            scale: display.scale,
            nullable: column.is_nullable(),
            type_id,
            type_info: column.type_info.clone(),
            fetch_mode: fetch_mode(type_id, &column.type_info, inline_threshold),
        })
    }

    /// Render as a DB-API description tuple.
    #[must_use]
    pub fn as_tuple(&self) -> DescriptionTuple<'_> {
        (
            &self.name,
            self.type_code,
            self.display_size,
            self.internal_size,
            self.precision,
            self.scale,
            self.nullable,
        )
    }

    /// Whether cells of this column go through the LOB path.
    #[must_use]
    pub fn is_streamed(&self) -> bool {
        self.fetch_mode == FetchMode::Streamed
    }
}

/// Pick the fetch mode for a column.
///
/// PLP types always stream. Other string, binary and UDT columns stream
/// when their declared size exceeds `inline_threshold`.
#[must_use]
pub fn fetch_mode(type_id: TypeId, info: &TypeInfo, inline_threshold: usize) -> FetchMode {
    if type_id.is_plp_with_length(info.max_length) {
        return FetchMode::Streamed;
    }

    let variable = matches!(
        type_id,
        TypeId::BigVarBinary
            | TypeId::BigBinary
            | TypeId::BigVarChar
            | TypeId::BigChar
            | TypeId::NVarChar
            | TypeId::NChar
            | TypeId::Udt
    );
    match info.max_length {
        Some(len) if variable && len as usize > inline_threshold => FetchMode::Streamed,
        _ => FetchMode::Inline,
    }
}

/// Ordered column descriptors of a result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Description {
    columns: Arc<[ColumnDescriptor]>,
}

impl Description {
    /// Build descriptions for every column in `metadata`, in order.
    pub fn from_metadata(metadata: &ColMetaData, inline_threshold: usize) -> Result<Self> {
        let columns = metadata
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| ColumnDescriptor::from_column_data(i, col, inline_threshold))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            columns = columns.len(),
            streamed = columns.iter().filter(|c| c.is_streamed()).count(),
            "built result description"
        );

        Ok(Self {
            columns: columns.into(),
        })
    }

    /// Description of a statement that produced no result set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get a column by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    /// Find a column index by name (case-insensitive).
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// All column descriptors in select-list order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Iterate over the column descriptors.
    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDescriptor> {
        self.columns.iter()
    }

    /// Description tuples for every column.
    #[must_use]
    pub fn as_tuples(&self) -> Vec<DescriptionTuple<'_>> {
        self.columns.iter().map(ColumnDescriptor::as_tuple).collect()
    }
}

impl<'a> IntoIterator for &'a Description {
    type Item = &'a ColumnDescriptor;
    type IntoIter = std::slice::Iter<'a, ColumnDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
