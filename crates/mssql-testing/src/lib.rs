//! # mssql-testing
//!
//! Test infrastructure for the SQL Server cursor layer.
//!
//! This crate stands in for the server and transport so that cursors,
//! row decoding and output converters can be tested end to end without a
//! database instance.
//!
//! ## Features
//!
//! - [`ScriptedBackend`]: a [`Backend`](mssql_cursor::Backend) answering
//!   statements from rules, encoding rows to real TDS cells and PLP streams
//! - Statement, commit and rollback recording
//! - Server-side fixtures for geography points and hierarchy paths
//!
//! ## Example
//!
//! ```rust,ignore
//! use mssql_cursor::{Config, Connection};
//! use mssql_testing::{MockColumn, MockResponse, ScriptedBackend};
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let backend = ScriptedBackend::new()
//!     .with_prefix("SELECT", MockResponse::scalar(MockColumn::date("d"), date));
//! let mut conn = Connection::new(backend, Config::default())?;
//! let mut cursor = conn.execute("SELECT CAST('2024-01-15' AS date)", &[])?;
//! assert_eq!(cursor.description().columns()[0].type_code, TypeCode::Date);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backend;
pub mod fixtures;

pub use backend::{
    ExecutedStatement, Handler, MockColumn, MockResponse, ScriptedBackend, TransactionEnd,
    TransactionHook,
};
pub use fixtures::{GeographyPoint, HierarchyPath, WGS84_SRID, init_tracing};
