//! Type conversion error types.

use thiserror::Error;

/// Errors that can occur while decoding or converting a value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TypeError {
    /// Value is null when non-null was expected.
    #[error("unexpected null value")]
    UnexpectedNull,

    /// Type mismatch during conversion.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        actual: String,
    },

    /// Value is out of range for target type.
    #[error("value out of range for {target_type}")]
    OutOfRange {
        /// Target type name.
        target_type: &'static str,
    },

    /// Invalid encoding in string data.
    #[error("invalid string encoding: {0}")]
    InvalidEncoding(String),

    /// Invalid binary data.
    #[error("invalid binary data: {0}")]
    InvalidBinary(String),

    /// Invalid date/time value.
    #[error("invalid date/time: {0}")]
    InvalidDateTime(String),

    /// Invalid decimal value.
    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),

    /// Invalid UUID value.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The wire type cannot be decoded into a value.
    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion {
        /// Source type.
        from: String,
        /// Target type.
        to: &'static str,
    },

    /// Buffer too small for value.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes needed.
        needed: usize,
        /// Bytes available.
        available: usize,
    },

    /// Bytes were left over after a complete value was decoded.
    #[error("{remaining} trailing bytes after value")]
    TrailingBytes {
        /// Bytes left unconsumed.
        remaining: usize,
    },

    /// A cell arrived in a framing its column is not delivered in.
    #[error("{actual} cell for {expected} column")]
    FramingMismatch {
        /// Framing the column expects.
        expected: &'static str,
        /// Framing that arrived.
        actual: &'static str,
    },

    /// A row carried a different number of cells than there are columns.
    #[error("row has {actual} cells, result set has {expected} columns")]
    CellCount {
        /// Columns in the result set.
        expected: usize,
        /// Cells in the row.
        actual: usize,
    },

    /// Large-object framing around the value was malformed.
    #[error(transparent)]
    Protocol(#[from] tds_protocol::ProtocolError),
}

/// A wire or driver type id with no semantic mapping in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TypeMappingError {
    /// TDS type byte from column metadata.
    #[error("no type mapping for wire type 0x{0:02X}")]
    UnknownWireType(u8),

    /// ODBC / SQL Server driver type id.
    #[error("no type mapping for driver type id {0}")]
    UnknownSqlType(i16),
}
