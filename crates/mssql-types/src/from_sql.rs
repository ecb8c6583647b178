//! Trait for converting from SQL values to Rust types.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::TypeError;
use crate::value::SqlValue;

/// Trait for types that can be converted from SQL values.
///
/// Integer targets accept narrower integer columns; NULL converts only into
/// `Option<T>`.
pub trait FromSql: Sized {
    /// Convert from a SQL value to this type.
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError>;

    /// Convert from an optional SQL value.
    ///
    /// Returns `None` if the value is NULL.
    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_sql(value).map(Some)
        }
    }
}

fn mismatch(expected: &'static str, value: &SqlValue) -> TypeError {
    if value.is_null() {
        TypeError::UnexpectedNull
    } else {
        TypeError::TypeMismatch {
            expected,
            actual: value.type_name().to_string(),
        }
    }
}

/// Implement `FromSql` by matching value variants to expressions.
macro_rules! from_sql {
    ($ty:ty, $name:literal, { $($pat:pat => $conv:expr),+ $(,)? }) => {
        impl FromSql for $ty {
            fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
                match value {
                    $($pat => $conv,)+
                    _ => Err(mismatch($name, value)),
                }
            }
        }
    };
}

from_sql!(bool, "bool", {
    SqlValue::Bool(v) => Ok(*v),
    SqlValue::TinyInt(v) => Ok(*v != 0),
    SqlValue::SmallInt(v) => Ok(*v != 0),
    SqlValue::Int(v) => Ok(*v != 0),
});

from_sql!(u8, "u8", {
    SqlValue::TinyInt(v) => Ok(*v),
});

from_sql!(i16, "i16", {
    SqlValue::SmallInt(v) => Ok(*v),
    SqlValue::TinyInt(v) => Ok(i16::from(*v)),
});

from_sql!(i32, "i32", {
    SqlValue::Int(v) => Ok(*v),
    SqlValue::SmallInt(v) => Ok(i32::from(*v)),
    SqlValue::TinyInt(v) => Ok(i32::from(*v)),
});

from_sql!(i64, "i64", {
    v @ (SqlValue::BigInt(_) | SqlValue::Int(_) | SqlValue::SmallInt(_) | SqlValue::TinyInt(_)) => {
        v.as_i64().ok_or(TypeError::OutOfRange { target_type: "i64" })
    },
});

from_sql!(f32, "f32", {
    SqlValue::Float(v) => Ok(*v),
});

from_sql!(f64, "f64", {
    SqlValue::Double(v) => Ok(*v),
    SqlValue::Float(v) => Ok(f64::from(*v)),
});

from_sql!(String, "String", {
    SqlValue::String(v) | SqlValue::Xml(v) => Ok(v.clone()),
});

from_sql!(Vec<u8>, "Vec<u8>", {
    SqlValue::Binary(v) => Ok(v.to_vec()),
});

from_sql!(Bytes, "Bytes", {
    SqlValue::Binary(v) => Ok(v.clone()),
});

from_sql!(Uuid, "Uuid", {
    SqlValue::Uuid(v) => Ok(*v),
    SqlValue::String(s) => s.parse().map_err(|e| TypeError::InvalidUuid(format!("{e}"))),
});

from_sql!(Decimal, "Decimal", {
    SqlValue::Decimal(v) => Ok(*v),
    v @ (SqlValue::BigInt(_) | SqlValue::Int(_) | SqlValue::SmallInt(_) | SqlValue::TinyInt(_)) => {
        v.as_i64().map(Decimal::from).ok_or(TypeError::OutOfRange { target_type: "Decimal" })
    },
});

from_sql!(NaiveDate, "NaiveDate", {
    SqlValue::Date(v) => Ok(*v),
});

from_sql!(NaiveTime, "NaiveTime", {
    SqlValue::Time(v) => Ok(*v),
});

from_sql!(NaiveDateTime, "NaiveDateTime", {
    SqlValue::DateTime(v) => Ok(*v),
});

from_sql!(DateTime<FixedOffset>, "DateTime<FixedOffset>", {
    SqlValue::DateTimeOffset(v) => Ok(*v),
});

from_sql!(DateTime<Utc>, "DateTime<Utc>", {
    SqlValue::DateTimeOffset(v) => Ok(v.to_utc()),
    SqlValue::DateTime(v) => Ok(DateTime::from_naive_utc_and_offset(*v, Utc)),
});

impl FromSql for SqlValue {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        Ok(value.clone())
    }

    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        Ok((!value.is_null()).then(|| value.clone()))
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        T::from_sql_nullable(value)
    }
}
