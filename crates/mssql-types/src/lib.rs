//! # mssql-types
//!
//! SQL Server type catalog and result cell decoding.
//!
//! This crate maps the TDS type byte of each result column to a semantic
//! [`TypeCode`] and a driver-level [`SqlType`], and decodes raw cell bytes
//! into [`SqlValue`]s.
//!
//! ## Features
//!
//! - `encoding` (default): decode `VARCHAR` data through the column collation's
//!   code page instead of assuming UTF-8
//!
//! ## Type Mappings
//!
//! | SQL Server Type | Type code | Rust Type |
//! |-----------------|-----------|-----------|
//! | `BIT` | `Boolean` | `bool` |
//! | `TINYINT` | `Integer` | `u8` |
//! | `SMALLINT` | `Integer` | `i16` |
//! | `INT` | `Integer` | `i32` |
//! | `BIGINT` | `Integer` | `i64` |
//! | `REAL` | `Float` | `f32` |
//! | `FLOAT` | `Float` | `f64` |
//! | `DECIMAL`/`NUMERIC`/`MONEY` | `Decimal` | `rust_decimal::Decimal` |
//! | `CHAR`/`VARCHAR`/`NVARCHAR`/`XML` | `Text` | `String` |
//! | `BINARY`/`VARBINARY`/`IMAGE` | `Binary` | `bytes::Bytes` |
//! | `DATE` | `Date` | `chrono::NaiveDate` |
//! | `TIME` | `Time` | `chrono::NaiveTime` |
//! | `DATETIME`/`DATETIME2` | `DateTime` | `chrono::NaiveDateTime` |
//! | `DATETIMEOFFSET` | `DateTimeOffset` | `chrono::DateTime<FixedOffset>` |
//! | `UNIQUEIDENTIFIER` | `Guid` | `uuid::Uuid` |
//! | CLR UDT (`geometry`, `hierarchyid`, ...) | `Udt` | `bytes::Bytes` |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod decode;
pub mod encode;
pub mod error;
pub mod from_sql;
pub mod sql_type;
pub mod to_sql;
pub mod value;

pub use catalog::{CatalogEntry, DisplayInfo, TypeCode, describe, resolve, time_len};
pub use decode::{
    decode_cell, decode_payload, decode_utf16_string, decode_value, decode_varchar_string,
};
pub use encode::{DEFAULT_PLP_CHUNK_SIZE, encode_cell, encode_payload, encode_utf16};
pub use error::{TypeError, TypeMappingError};
pub use from_sql::FromSql;
pub use sql_type::SqlType;
pub use to_sql::ToSql;
pub use value::SqlValue;
