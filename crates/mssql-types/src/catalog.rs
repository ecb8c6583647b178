//! Type catalog: wire type ids to semantic type codes.
//!
//! [`resolve`] is the single place a TDS type byte is mapped to the
//! [`TypeCode`] callers see in a cursor description and to the driver-level
//! [`SqlType`] output converters are keyed by. [`describe`] supplies the
//! display metadata reported alongside it.

use std::fmt;

use tds_protocol::{MAX_LENGTH_PLP, TypeId, TypeInfo};

use crate::error::TypeMappingError;
use crate::sql_type::SqlType;
use crate::value::SqlValue;

/// Semantic type of a result column.
///
/// Every variant names one concrete Rust representation, so a column's
/// type code is always a usable type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// Integers of any width (`i64` after widening).
    Integer,
    /// Binary floating point.
    Float,
    /// Exact decimal, including MONEY.
    Decimal,
    /// BIT.
    Boolean,
    /// Character data and XML.
    Text,
    /// Binary data.
    Binary,
    /// Calendar date with no time of day.
    Date,
    /// Time of day.
    Time,
    /// Date and time without offset.
    DateTime,
    /// Date and time with UTC offset.
    DateTimeOffset,
    /// UNIQUEIDENTIFIER.
    Guid,
    /// Opaque user-defined type bytes (geography, geometry, hierarchyid).
    Udt,
}

impl TypeCode {
    /// All type codes.
    pub const ALL: [TypeCode; 12] = [
        Self::Integer,
        Self::Float,
        Self::Decimal,
        Self::Boolean,
        Self::Text,
        Self::Binary,
        Self::Date,
        Self::Time,
        Self::DateTime,
        Self::DateTimeOffset,
        Self::Guid,
        Self::Udt,
    ];

    /// Whether this is a recognized type tag. Always true.
    #[must_use]
    pub const fn is_type_tag(&self) -> bool {
        true
    }

    /// Short lowercase name (`date`, `datetime`, ...).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Integer => "int",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "bool",
            Self::Text => "str",
            Self::Binary => "bytes",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::DateTimeOffset => "datetimeoffset",
            Self::Guid => "uuid",
            Self::Udt => "udt",
        }
    }

    /// The Rust type non-null values of this code decode to.
    #[must_use]
    pub const fn rust_type_name(&self) -> &'static str {
        match self {
            Self::Integer => "i64",
            Self::Float => "f64",
            Self::Decimal => "rust_decimal::Decimal",
            Self::Boolean => "bool",
            Self::Text => "String",
            Self::Binary | Self::Udt => "bytes::Bytes",
            Self::Date => "chrono::NaiveDate",
            Self::Time => "chrono::NaiveTime",
            Self::DateTime => "chrono::NaiveDateTime",
            Self::DateTimeOffset => "chrono::DateTime<chrono::FixedOffset>",
            Self::Guid => "uuid::Uuid",
        }
    }

    /// Check that `value` is NULL or of this type code's representation.
    #[must_use]
    pub fn accepts(&self, value: &SqlValue) -> bool {
        match (self, value) {
            (_, SqlValue::Null) => true,
            (
                Self::Integer,
                SqlValue::TinyInt(_) | SqlValue::SmallInt(_) | SqlValue::Int(_) | SqlValue::BigInt(_),
            ) => true,
            (Self::Float, SqlValue::Float(_) | SqlValue::Double(_)) => true,
            (Self::Decimal, SqlValue::Decimal(_)) => true,
            (Self::Boolean, SqlValue::Bool(_)) => true,
            (Self::Text, SqlValue::String(_) | SqlValue::Xml(_)) => true,
            (Self::Binary | Self::Udt, SqlValue::Binary(_)) => true,
            (Self::Date, SqlValue::Date(_)) => true,
            (Self::Time, SqlValue::Time(_)) => true,
            (Self::DateTime, SqlValue::DateTime(_)) => true,
            (Self::DateTimeOffset, SqlValue::DateTimeOffset(_)) => true,
            (Self::Guid, SqlValue::Uuid(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of resolving a wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Semantic type code.
    pub type_code: TypeCode,
    /// Driver-level type id.
    pub sql_type: SqlType,
}

/// Resolve a TDS type byte to its catalog entry.
///
/// `size_hint` is the declared maximum length from column metadata. It picks
/// the width of nullable integer and float types, SMALLDATETIME vs DATETIME,
/// and the long (MAX) variants of string and binary types.
pub fn resolve(type_id: u8, size_hint: Option<u32>) -> Result<CatalogEntry, TypeMappingError> {
    let id = TypeId::from_u8(type_id).ok_or(TypeMappingError::UnknownWireType(type_id))?;
    let is_max = size_hint == Some(MAX_LENGTH_PLP);

    let sql_type = match id {
        TypeId::Int1 => SqlType::TinyInt,
        TypeId::Int2 => SqlType::SmallInt,
        TypeId::Int4 => SqlType::Integer,
        TypeId::Int8 => SqlType::BigInt,
        TypeId::IntN => match size_hint {
            Some(1) => SqlType::TinyInt,
            Some(2) => SqlType::SmallInt,
            Some(8) => SqlType::BigInt,
            _ => SqlType::Integer,
        },
        TypeId::Bit | TypeId::BitN => SqlType::Bit,
        TypeId::Float4 => SqlType::Real,
        TypeId::Float8 => SqlType::Float,
        TypeId::FloatN => match size_hint {
            Some(4) => SqlType::Real,
            _ => SqlType::Float,
        },
        TypeId::Money | TypeId::Money4 | TypeId::MoneyN => SqlType::Decimal,
        TypeId::Decimal | TypeId::DecimalN => SqlType::Decimal,
        TypeId::Numeric | TypeId::NumericN => SqlType::Numeric,
        TypeId::DateTime | TypeId::DateTime4 | TypeId::DateTimeN | TypeId::DateTime2 => {
            SqlType::TypeTimestamp
        }
        TypeId::Date => SqlType::TypeDate,
        TypeId::Time => SqlType::SsTime2,
        TypeId::DateTimeOffset => SqlType::SsTimestampOffset,
        TypeId::Guid => SqlType::Guid,
        TypeId::Char | TypeId::BigChar => SqlType::Char,
        TypeId::VarChar => SqlType::VarChar,
        TypeId::BigVarChar if is_max => SqlType::LongVarChar,
        TypeId::BigVarChar => SqlType::VarChar,
        TypeId::Text => SqlType::LongVarChar,
        TypeId::NChar => SqlType::WChar,
        TypeId::NVarChar if is_max => SqlType::WLongVarChar,
        TypeId::NVarChar => SqlType::WVarChar,
        TypeId::NText => SqlType::WLongVarChar,
        TypeId::Binary | TypeId::BigBinary => SqlType::Binary,
        TypeId::VarBinary => SqlType::VarBinary,
        TypeId::BigVarBinary if is_max => SqlType::LongVarBinary,
        TypeId::BigVarBinary => SqlType::VarBinary,
        TypeId::Image => SqlType::LongVarBinary,
        TypeId::Xml => SqlType::SsXml,
        TypeId::Udt => SqlType::SsUdt,
        TypeId::Null | TypeId::Variant | TypeId::Tvp => {
            return Err(TypeMappingError::UnknownWireType(type_id));
        }
    };

    Ok(CatalogEntry {
        type_code: sql_type.type_code(),
        sql_type,
    })
}

/// Display metadata reported for a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayInfo {
    /// Maximum characters needed to render a value, `None` when unbounded.
    pub display_size: Option<u32>,
    /// Bytes a value occupies on the wire, `None` when unbounded.
    pub internal_size: Option<u32>,
    /// Precision (digits, or column size for date/time types).
    pub precision: Option<u8>,
    /// Scale (fractional digits).
    pub scale: Option<u8>,
}

impl DisplayInfo {
    const fn fixed(display: u32, internal: u32, precision: u8, scale: u8) -> Self {
        Self {
            display_size: Some(display),
            internal_size: Some(internal),
            precision: Some(precision),
            scale: Some(scale),
        }
    }

    const fn sized(display: Option<u32>, internal: Option<u32>) -> Self {
        Self {
            display_size: display,
            internal_size: internal,
            precision: None,
            scale: None,
        }
    }
}

/// Default display metadata for a column of the given wire type.
#[must_use]
pub fn describe(type_id: TypeId, info: &TypeInfo) -> DisplayInfo {
    let declared = info.max_length.filter(|&len| len != MAX_LENGTH_PLP);
    let scale = info.scale.unwrap_or(7);
    // Fractional seconds add a point plus `scale` digits.
    let fraction = if scale == 0 { 0 } else { u32::from(scale) + 1 };

    match type_id {
        TypeId::Int1 => DisplayInfo::fixed(3, 1, 3, 0),
        TypeId::Int2 => DisplayInfo::fixed(6, 2, 5, 0),
        TypeId::Int4 => DisplayInfo::fixed(11, 4, 10, 0),
        TypeId::Int8 => DisplayInfo::fixed(20, 8, 19, 0),
        TypeId::IntN => match info.max_length {
            Some(1) => DisplayInfo::fixed(3, 1, 3, 0),
            Some(2) => DisplayInfo::fixed(6, 2, 5, 0),
            Some(8) => DisplayInfo::fixed(20, 8, 19, 0),
            _ => DisplayInfo::fixed(11, 4, 10, 0),
        },
        TypeId::Bit | TypeId::BitN => DisplayInfo::fixed(1, 1, 1, 0),
        TypeId::Float4 => DisplayInfo::fixed(14, 4, 24, 0),
        TypeId::Float8 => DisplayInfo::fixed(24, 8, 53, 0),
        TypeId::FloatN => match info.max_length {
            Some(4) => DisplayInfo::fixed(14, 4, 24, 0),
            _ => DisplayInfo::fixed(24, 8, 53, 0),
        },
        TypeId::Money4 => DisplayInfo::fixed(12, 4, 10, 4),
        TypeId::Money => DisplayInfo::fixed(21, 8, 19, 4),
        TypeId::MoneyN => match info.max_length {
            Some(4) => DisplayInfo::fixed(12, 4, 10, 4),
            _ => DisplayInfo::fixed(21, 8, 19, 4),
        },
        TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN => {
            let precision = info.precision.unwrap_or(18);
            let scale = info.scale.unwrap_or(0);
            DisplayInfo {
                display_size: Some(u32::from(precision) + 2),
                internal_size: info.max_length,
                precision: Some(precision),
                scale: Some(scale),
            }
        }
        TypeId::DateTime4 => DisplayInfo::fixed(16, 4, 16, 0),
        TypeId::DateTime => DisplayInfo::fixed(23, 8, 23, 3),
        TypeId::DateTimeN => match info.max_length {
            Some(4) => DisplayInfo::fixed(16, 4, 16, 0),
            _ => DisplayInfo::fixed(23, 8, 23, 3),
        },
        TypeId::Date => DisplayInfo::fixed(10, 3, 10, 0),
        TypeId::Time => {
            let size = 8 + fraction;
            DisplayInfo::fixed(size, time_len(scale) as u32, size as u8, scale)
        }
        TypeId::DateTime2 => {
            let size = 19 + fraction;
            DisplayInfo::fixed(size, time_len(scale) as u32 + 3, size as u8, scale)
        }
        TypeId::DateTimeOffset => {
            let size = 26 + fraction;
            DisplayInfo::fixed(size, time_len(scale) as u32 + 5, size as u8, scale)
        }
        TypeId::Guid => DisplayInfo::fixed(36, 16, 36, 0),
        TypeId::NChar | TypeId::NVarChar => {
            DisplayInfo::sized(declared.map(|len| len / 2), declared)
        }
        TypeId::Char | TypeId::VarChar | TypeId::BigChar | TypeId::BigVarChar => {
            DisplayInfo::sized(declared, declared)
        }
        // Binary values render as two hex digits per byte.
        TypeId::Binary | TypeId::VarBinary | TypeId::BigBinary | TypeId::BigVarBinary => {
            DisplayInfo::sized(declared.map(|len| len.saturating_mul(2)), declared)
        }
        TypeId::Udt => DisplayInfo::sized(declared, declared),
        TypeId::Text
        | TypeId::NText
        | TypeId::Image
        | TypeId::Xml
        | TypeId::Null
        | TypeId::Variant
        | TypeId::Tvp => DisplayInfo::default(),
    }
}

/// Bytes holding the time-of-day part at the given fractional scale.
#[must_use]
pub const fn time_len(scale: u8) -> usize {
    match scale {
        0..=2 => 3,
        3..=4 => 4,
        _ => 5,
    }
}
