//! Protocol-level error types.

use thiserror::Error;

/// Errors raised while reading TDS structures from the wire.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The input ended before a complete structure was read.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A column metadata entry carried a type the parser cannot frame.
    #[error("unsupported column type 0x{0:02X} in metadata")]
    UnsupportedColumnType(u8),

    /// A string in the metadata was not valid UTF-16.
    #[error("invalid UTF-16 string in {0}")]
    InvalidString(&'static str),

    /// PLP chunks did not add up to the declared total length.
    #[error("PLP length mismatch: declared {declared} bytes, received {received}")]
    PlpLengthMismatch {
        /// Total length announced in the PLP header.
        declared: u64,
        /// Bytes actually received before the terminator.
        received: u64,
    },

    /// A large object exceeded the configured size limit.
    #[error("large object of {size} bytes exceeds limit of {limit} bytes")]
    LobTooLarge {
        /// Size declared or accumulated so far.
        size: u64,
        /// Configured maximum.
        limit: u64,
    },

    /// Reading from the underlying stream failed.
    #[error("I/O error while reading LOB stream: {0}")]
    Io(#[from] std::io::Error),
}
