//! SQL value representation.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A decoded SQL value.
///
/// UDT columns (geography, geometry, hierarchyid) decode to
/// [`SqlValue::Binary`] holding the server's serialized form unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SqlValue {
    /// NULL value.
    #[default]
    Null,
    /// Boolean value (BIT).
    Bool(bool),
    /// 8-bit unsigned integer (TINYINT).
    TinyInt(u8),
    /// 16-bit signed integer (SMALLINT).
    SmallInt(i16),
    /// 32-bit signed integer (INT).
    Int(i32),
    /// 64-bit signed integer (BIGINT).
    BigInt(i64),
    /// 32-bit floating point (REAL).
    Float(f32),
    /// 64-bit floating point (FLOAT).
    Double(f64),
    /// Exact decimal (DECIMAL, NUMERIC, MONEY, SMALLMONEY).
    Decimal(Decimal),
    /// String value (CHAR, VARCHAR, NCHAR, NVARCHAR, TEXT, NTEXT).
    String(String),
    /// Binary value (BINARY, VARBINARY, IMAGE, UDT).
    Binary(Bytes),
    /// UUID value (UNIQUEIDENTIFIER).
    Uuid(Uuid),
    /// Date value (DATE).
    Date(NaiveDate),
    /// Time value (TIME).
    Time(NaiveTime),
    /// DateTime value (DATETIME, DATETIME2, SMALLDATETIME).
    DateTime(NaiveDateTime),
    /// DateTimeOffset value (DATETIMEOFFSET).
    DateTimeOffset(DateTime<FixedOffset>),
    /// XML value (XML type).
    Xml(String),
}

impl SqlValue {
    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as a bool, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an i64, widening smaller integers.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::BigInt(v) => Some(*v),
            Self::Int(v) => Some(i64::from(*v)),
            Self::SmallInt(v) => Some(i64::from(*v)),
            Self::TinyInt(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as an f64, if it is a float.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) | Self::Xml(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as bytes, if it is binary.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as a date, if it is one.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the SQL type name of the value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BIT",
            Self::TinyInt(_) => "TINYINT",
            Self::SmallInt(_) => "SMALLINT",
            Self::Int(_) => "INT",
            Self::BigInt(_) => "BIGINT",
            Self::Float(_) => "REAL",
            Self::Double(_) => "FLOAT",
            Self::Decimal(_) => "DECIMAL",
            Self::String(_) => "NVARCHAR",
            Self::Binary(_) => "VARBINARY",
            Self::Uuid(_) => "UNIQUEIDENTIFIER",
            Self::Date(_) => "DATE",
            Self::Time(_) => "TIME",
            Self::DateTime(_) => "DATETIME2",
            Self::DateTimeOffset(_) => "DATETIMEOFFSET",
            Self::Xml(_) => "XML",
        }
    }

    /// Length of the value's payload in bytes where it has one.
    #[must_use]
    pub fn payload_len(&self) -> Option<usize> {
        match self {
            Self::Binary(v) => Some(v.len()),
            Self::String(v) | Self::Xml(v) => Some(v.len()),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    u8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    Bytes => Binary,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(v))
    }
}

impl From<&[u8]> for SqlValue {
    fn from(v: &[u8]) -> Self {
        Self::Binary(Bytes::copy_from_slice(v))
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
