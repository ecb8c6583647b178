//! Driver-level (ODBC) type identifiers.
//!
//! These are the integer ids a SQL Server ODBC driver reports for a column
//! (`SQL_TYPE_DATE`, `SQL_SS_UDT`, ...). Output converters are keyed by them,
//! so a caller can register a hook for `SQL_SS_UDT` without knowing which TDS
//! type byte carried the column.

use std::fmt;

use crate::catalog::TypeCode;
use crate::error::TypeMappingError;

/// ODBC / SQL Server driver type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i16)]
#[non_exhaustive]
pub enum SqlType {
    /// `SQL_CHAR`
    Char = 1,
    /// `SQL_NUMERIC`
    Numeric = 2,
    /// `SQL_DECIMAL`
    Decimal = 3,
    /// `SQL_INTEGER`
    Integer = 4,
    /// `SQL_SMALLINT`
    SmallInt = 5,
    /// `SQL_FLOAT`
    Float = 6,
    /// `SQL_REAL`
    Real = 7,
    /// `SQL_DOUBLE`
    Double = 8,
    /// `SQL_VARCHAR`
    VarChar = 12,
    /// `SQL_TYPE_DATE`
    TypeDate = 91,
    /// `SQL_TYPE_TIME`
    TypeTime = 92,
    /// `SQL_TYPE_TIMESTAMP`
    TypeTimestamp = 93,
    /// `SQL_LONGVARCHAR`
    LongVarChar = -1,
    /// `SQL_BINARY`
    Binary = -2,
    /// `SQL_VARBINARY`
    VarBinary = -3,
    /// `SQL_LONGVARBINARY`
    LongVarBinary = -4,
    /// `SQL_BIGINT`
    BigInt = -5,
    /// `SQL_TINYINT`
    TinyInt = -6,
    /// `SQL_BIT`
    Bit = -7,
    /// `SQL_WCHAR`
    WChar = -8,
    /// `SQL_WVARCHAR`
    WVarChar = -9,
    /// `SQL_WLONGVARCHAR`
    WLongVarChar = -10,
    /// `SQL_GUID`
    Guid = -11,
    /// `SQL_SS_UDT` (geography, geometry, hierarchyid and other CLR types)
    SsUdt = -151,
    /// `SQL_SS_XML`
    SsXml = -152,
    /// `SQL_SS_TIME2`
    SsTime2 = -154,
    /// `SQL_SS_TIMESTAMPOFFSET`
    SsTimestampOffset = -155,
}

impl SqlType {
    /// Every driver type id with a catalog mapping.
    pub const ALL: [SqlType; 27] = [
        Self::Char,
        Self::Numeric,
        Self::Decimal,
        Self::Integer,
        Self::SmallInt,
        Self::Float,
        Self::Real,
        Self::Double,
        Self::VarChar,
        Self::TypeDate,
        Self::TypeTime,
        Self::TypeTimestamp,
        Self::LongVarChar,
        Self::Binary,
        Self::VarBinary,
        Self::LongVarBinary,
        Self::BigInt,
        Self::TinyInt,
        Self::Bit,
        Self::WChar,
        Self::WVarChar,
        Self::WLongVarChar,
        Self::Guid,
        Self::SsUdt,
        Self::SsXml,
        Self::SsTime2,
        Self::SsTimestampOffset,
    ];

    /// The numeric driver id.
    #[must_use]
    pub const fn code(self) -> i16 {
        self as i16
    }

    /// The driver constant name, e.g. `SQL_SS_UDT`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Char => "SQL_CHAR",
            Self::Numeric => "SQL_NUMERIC",
            Self::Decimal => "SQL_DECIMAL",
            Self::Integer => "SQL_INTEGER",
            Self::SmallInt => "SQL_SMALLINT",
            Self::Float => "SQL_FLOAT",
            Self::Real => "SQL_REAL",
            Self::Double => "SQL_DOUBLE",
            Self::VarChar => "SQL_VARCHAR",
            Self::TypeDate => "SQL_TYPE_DATE",
            Self::TypeTime => "SQL_TYPE_TIME",
            Self::TypeTimestamp => "SQL_TYPE_TIMESTAMP",
            Self::LongVarChar => "SQL_LONGVARCHAR",
            Self::Binary => "SQL_BINARY",
            Self::VarBinary => "SQL_VARBINARY",
            Self::LongVarBinary => "SQL_LONGVARBINARY",
            Self::BigInt => "SQL_BIGINT",
            Self::TinyInt => "SQL_TINYINT",
            Self::Bit => "SQL_BIT",
            Self::WChar => "SQL_WCHAR",
            Self::WVarChar => "SQL_WVARCHAR",
            Self::WLongVarChar => "SQL_WLONGVARCHAR",
            Self::Guid => "SQL_GUID",
            Self::SsUdt => "SQL_SS_UDT",
            Self::SsXml => "SQL_SS_XML",
            Self::SsTime2 => "SQL_SS_TIME2",
            Self::SsTimestampOffset => "SQL_SS_TIMESTAMPOFFSET",
        }
    }

    /// The semantic type code values of this driver type decode to.
    #[must_use]
    pub const fn type_code(self) -> TypeCode {
        match self {
            Self::Char
            | Self::VarChar
            | Self::LongVarChar
            | Self::WChar
            | Self::WVarChar
            | Self::WLongVarChar
            | Self::SsXml => TypeCode::Text,
            Self::Numeric | Self::Decimal => TypeCode::Decimal,
            Self::Integer | Self::SmallInt | Self::TinyInt | Self::BigInt => TypeCode::Integer,
            Self::Float | Self::Real | Self::Double => TypeCode::Float,
            Self::Bit => TypeCode::Boolean,
            Self::Binary | Self::VarBinary | Self::LongVarBinary => TypeCode::Binary,
            Self::TypeDate => TypeCode::Date,
            Self::TypeTime | Self::SsTime2 => TypeCode::Time,
            Self::TypeTimestamp => TypeCode::DateTime,
            Self::SsTimestampOffset => TypeCode::DateTimeOffset,
            Self::Guid => TypeCode::Guid,
            Self::SsUdt => TypeCode::Udt,
        }
    }
}

impl TryFrom<i16> for SqlType {
    type Error = TypeMappingError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.code() == code)
            .ok_or(TypeMappingError::UnknownSqlType(code))
    }
}

impl From<SqlType> for i16 {
    fn from(ty: SqlType) -> Self {
        ty.code()
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_codes() {
        assert_eq!(SqlType::SsUdt.code(), -151);
        assert_eq!(SqlType::TypeDate.code(), 91);
        assert_eq!(SqlType::SsTime2.code(), -154);
        assert_eq!(SqlType::SsTimestampOffset.code(), -155);
        assert_eq!(SqlType::VarBinary.code(), -3);
    }

    #[test]
    fn test_try_from_roundtrip() {
        for ty in SqlType::ALL {
            assert_eq!(SqlType::try_from(ty.code()).unwrap(), ty);
        }
    }

    #[test]
    fn test_variant_is_unmapped() {
        assert_eq!(
            SqlType::try_from(-150),
            Err(TypeMappingError::UnknownSqlType(-150))
        );
        assert!(SqlType::try_from(0).is_err());
    }

    #[test]
    fn test_date_time_codes() {
        assert_eq!(SqlType::TypeDate.type_code(), TypeCode::Date);
        assert_eq!(SqlType::SsTime2.type_code(), TypeCode::Time);
        assert_eq!(SqlType::TypeTimestamp.type_code(), TypeCode::DateTime);
        assert_eq!(
            SqlType::SsTimestampOffset.type_code(),
            TypeCode::DateTimeOffset
        );
        assert_eq!(SqlType::SsUdt.type_code(), TypeCode::Udt);
        assert_eq!(SqlType::SsUdt.to_string(), "SQL_SS_UDT");
    }
}
