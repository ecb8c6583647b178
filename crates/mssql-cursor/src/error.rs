//! Cursor error types.

use mssql_types::{TypeError, TypeMappingError};
use thiserror::Error;

/// Errors that can occur while executing statements and fetching rows.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A result column's wire type has no semantic mapping.
    #[error("column '{column}': {source}")]
    TypeMapping {
        /// Column name as reported by the server.
        column: String,
        /// Underlying catalog error.
        #[source]
        source: TypeMappingError,
    },

    /// Bytes for a column did not match its declared type.
    #[error("failed to decode column '{column}' ({byte_len} bytes): {source}")]
    Decode {
        /// Column name as reported by the server.
        column: String,
        /// Raw bytes received for the cell before the failure.
        byte_len: usize,
        /// Underlying decode error.
        #[source]
        source: TypeError,
    },

    /// The server rejected a statement.
    #[error("server error {number}: {message}")]
    Database {
        /// Error number.
        number: i32,
        /// Error class/severity (0-25).
        class: u8,
        /// Error state.
        state: u8,
        /// Error message.
        message: String,
        /// Stored procedure name (if applicable).
        procedure: Option<String>,
        /// Line number in the SQL batch or procedure.
        line: u32,
    },

    /// The transport delivered something the cursor cannot use.
    #[error("transport error: {0}")]
    Transport(String),

    /// Wire framing error.
    #[error("protocol error: {0}")]
    Protocol(#[from] tds_protocol::ProtocolError),

    /// Parameter or typed value conversion error.
    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Fetch on a closed cursor.
    #[error("cursor is closed")]
    CursorClosed,

    /// Operation on a closed connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a server rejection with the given number, class and message.
    pub fn database(number: i32, class: u8, message: impl Into<String>) -> Self {
        Self::Database {
            number,
            class,
            state: 1,
            message: message.into(),
            procedure: None,
            line: 1,
        }
    }

    /// Check if the server rejected the statement.
    ///
    /// This is the error family callers are expected to handle around
    /// statements the server may refuse (invalid WKT, bad hierarchy paths,
    /// constraint violations).
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database { .. })
    }

    /// Check if this error is transient and may succeed on retry.
    ///
    /// Decode and server errors are never transient; retrying transport
    /// failures is the transport's own policy.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_))
    }

    /// Check if this is a server error with a specific number.
    #[must_use]
    pub fn is_server_error(&self, number: i32) -> bool {
        matches!(self, Self::Database { number: n, .. } if *n == number)
    }

    /// Get the error class/severity if this is a server error.
    ///
    /// SQL Server error classes range from 0-25:
    /// - 0-10: Informational
    /// - 11-16: User errors
    /// - 17-19: Resource/hardware errors
    /// - 20-25: System errors (connection terminating)
    #[must_use]
    pub fn class(&self) -> Option<u8> {
        match self {
            Self::Database { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// Name of the column a mapping or decode error belongs to.
    #[must_use]
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::TypeMapping { column, .. } | Self::Decode { column, .. } => Some(column),
            _ => None,
        }
    }
}

/// Result type for cursor operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_classification() {
        let err = Error::database(6522, 16, "A .NET Framework error occurred");
        assert!(err.is_database_error());
        assert!(err.is_server_error(6522));
        assert!(!err.is_transient());
        assert_eq!(err.class(), Some(16));
    }

    #[test]
    fn test_decode_error_context() {
        let err = Error::Decode {
            column: "geom".into(),
            byte_len: 22,
            source: TypeError::BufferTooSmall {
                needed: 30,
                available: 22,
            },
        };
        assert_eq!(err.column(), Some("geom"));
        let msg = err.to_string();
        assert!(msg.contains("geom"));
        assert!(msg.contains("22 bytes"));
    }

    #[test]
    fn test_transient() {
        assert!(Error::Transport("reset".into()).is_transient());
        assert!(!Error::CursorClosed.is_transient());
    }
}
