//! Trait for converting Rust types to SQL values.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::TypeError;
use crate::sql_type::SqlType;
use crate::value::SqlValue;

/// Trait for types that can be bound as statement parameters.
///
/// The trait is object safe, so heterogeneous parameter lists are written as
/// `&[&dyn ToSql]`.
pub trait ToSql {
    /// Convert this value to a SQL value.
    fn to_sql(&self) -> Result<SqlValue, TypeError>;

    /// Driver type id the value is bound as.
    fn sql_type(&self) -> SqlType;

    /// Driver type id for a NULL of this type.
    fn null_sql_type() -> SqlType
    where
        Self: Sized,
    {
        SqlType::WVarChar
    }
}

macro_rules! to_sql {
    ($($ty:ty => $sql_type:ident),* $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> Result<SqlValue, TypeError> {
                    Ok(SqlValue::from(self.clone()))
                }

                fn sql_type(&self) -> SqlType {
                    SqlType::$sql_type
                }

                fn null_sql_type() -> SqlType {
                    SqlType::$sql_type
                }
            }
        )*
    };
}

to_sql! {
    bool => Bit,
    u8 => TinyInt,
    i16 => SmallInt,
    i32 => Integer,
    i64 => BigInt,
    f32 => Real,
    f64 => Float,
    String => WVarChar,
    Bytes => VarBinary,
    Vec<u8> => VarBinary,
    Decimal => Decimal,
    Uuid => Guid,
    NaiveDate => TypeDate,
    NaiveTime => SsTime2,
    NaiveDateTime => TypeTimestamp,
    DateTime<FixedOffset> => SsTimestampOffset,
}

impl ToSql for str {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::String(self.to_owned()))
    }

    fn sql_type(&self) -> SqlType {
        SqlType::WVarChar
    }
}

impl ToSql for [u8] {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Binary(Bytes::copy_from_slice(self)))
    }

    fn sql_type(&self) -> SqlType {
        SqlType::VarBinary
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(self.clone())
    }

    fn sql_type(&self) -> SqlType {
        match self {
            Self::Null | Self::String(_) => SqlType::WVarChar,
            Self::Bool(_) => SqlType::Bit,
            Self::TinyInt(_) => SqlType::TinyInt,
            Self::SmallInt(_) => SqlType::SmallInt,
            Self::Int(_) => SqlType::Integer,
            Self::BigInt(_) => SqlType::BigInt,
            Self::Float(_) => SqlType::Real,
            Self::Double(_) => SqlType::Float,
            Self::Decimal(_) => SqlType::Decimal,
            Self::Binary(_) => SqlType::VarBinary,
            Self::Uuid(_) => SqlType::Guid,
            Self::Date(_) => SqlType::TypeDate,
            Self::Time(_) => SqlType::SsTime2,
            Self::DateTime(_) => SqlType::TypeTimestamp,
            Self::DateTimeOffset(_) => SqlType::SsTimestampOffset,
            Self::Xml(_) => SqlType::SsXml,
        }
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        match self {
            Some(v) => v.to_sql(),
            None => Ok(SqlValue::Null),
        }
    }

    fn sql_type(&self) -> SqlType {
        match self {
            Some(v) => v.sql_type(),
            None => T::null_sql_type(),
        }
    }

    fn null_sql_type() -> SqlType {
        T::null_sql_type()
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        (**self).to_sql()
    }

    fn sql_type(&self) -> SqlType {
        (**self).sql_type()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(42i32.to_sql().unwrap(), SqlValue::Int(42));
        assert_eq!(42i32.sql_type(), SqlType::Integer);
        assert_eq!("hello".to_sql().unwrap(), SqlValue::String("hello".into()));
    }

    #[test]
    fn test_option_and_refs() {
        assert_eq!(None::<i64>.to_sql().unwrap(), SqlValue::Null);
        assert_eq!(None::<NaiveDate>.sql_type(), SqlType::TypeDate);
        let params: [&dyn ToSql; 2] = [&1i64, &"x"];
        assert_eq!(params[1].sql_type(), SqlType::WVarChar);
        let blob: &[u8] = &[1, 2, 3];
        assert_eq!(blob.to_sql().unwrap().as_bytes(), Some(&[1u8, 2, 3][..]));
    }
}
