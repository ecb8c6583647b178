//! # mssql-cursor
//!
//! Typed result-set materialization for SQL Server.
//!
//! This crate turns the server's column metadata and raw row bytes into
//! DB-API style cursors:
//!
//! - **Descriptions**: one [`ColumnDescriptor`] per result column, in
//!   select-list order, with a resolved [`TypeCode`](mssql_types::TypeCode)
//! - **Row decoding**: inline cells and chunked LOB streams decode to
//!   [`SqlValue`]s; spatial and hierarchy UDTs stay opaque bytes
//! - **Output converters**: connection-scoped hooks keyed by
//!   [`SqlType`] that rewrite values before they reach a [`Row`]
//! - **Cursors**: `fetchone` / `fetchmany` / `fetchall` with an idempotent
//!   exhausted state
//!
//! The transport is an external collaborator: it implements [`Backend`] to
//! execute statements and [`RowSource`] to deliver rows.
//!
//! ## Cursor States
//!
//! ```text
//! Open -> Exhausted (source has no more rows; fetches return empty)
//! Open | Exhausted -> Closed (via close(); fetches fail)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use mssql_cursor::{Config, Connection};
//! use mssql_types::{SqlType, SqlValue};
//!
//! let config = Config::from_connection_string("Server=localhost;ArraySize=100;")?;
//! let mut conn = Connection::new(backend, config)?;
//!
//! conn.execute("CREATE TABLE t (g geography)", &[])?;
//! conn.execute(
//!     "INSERT INTO t VALUES (geography::STGeomFromText(@p1, 4326))",
//!     &[&"POINT(-122.349 47.651)"],
//! )?;
//!
//! let mut cursor = conn.execute("SELECT g FROM t", &[])?;
//! let column = &cursor.description().columns()[0];
//! assert_eq!(column.sql_type, SqlType::SsUdt);
//!
//! for row in cursor.fetchmany(None)? {
//!     let wkb: Vec<u8> = row.get(0)?;
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod converter;
pub mod cursor;
pub mod decoder;
pub mod description;
pub mod error;
pub mod instrumentation;
pub mod row;
pub mod source;

pub use config::Config;
pub use connection::{Backend, Connection, ExecuteResult, Param};
pub use converter::{ConverterRegistry, ConverterSnapshot, OutputConverter};
pub use cursor::Cursor;
pub use decoder::{DecodeOptions, RowDecoder};
pub use description::{ColumnDescriptor, Description, DescriptionTuple, FetchMode};
pub use error::{Error, Result};
pub use mssql_types::{FromSql, SqlType, SqlValue, ToSql, TypeCode};
pub use row::Row;
pub use source::{LobStream, RawCell, RawRow, RowSource, VecRowSource};
