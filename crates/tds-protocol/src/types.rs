//! TDS data type definitions.
//!
//! These are the type bytes SQL Server places in COLMETADATA tokens. They
//! describe how a column value is framed on the wire, not what it means to
//! the caller; the semantic mapping lives in `mssql-types`.

/// Declared maximum length marking a `(MAX)` column for USHORTLEN types.
///
/// Columns declared this way are sent as PLP (partially length-prefixed)
/// streams instead of a single length-prefixed value.
pub const MAX_LENGTH_PLP: u32 = 0xFFFF;

/// TDS data type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeId {
    // Fixed-length types (no length prefix)
    /// Null type.
    Null = 0x1F,
    /// 8-bit unsigned integer (TINYINT).
    Int1 = 0x30,
    /// Bit (boolean).
    Bit = 0x32,
    /// 16-bit signed integer.
    Int2 = 0x34,
    /// 32-bit signed integer.
    Int4 = 0x38,
    /// 64-bit signed integer.
    Int8 = 0x7F,
    /// 4-byte small datetime.
    DateTime4 = 0x3A,
    /// 32-bit floating point.
    Float4 = 0x3B,
    /// 8-byte money.
    Money = 0x3C,
    /// 8-byte datetime.
    DateTime = 0x3D,
    /// 64-bit floating point.
    Float8 = 0x3E,
    /// 4-byte money.
    Money4 = 0x7A,

    // Variable-length types (1-byte length prefix)
    /// GUID.
    Guid = 0x24,
    /// Nullable integer.
    IntN = 0x26,
    /// Legacy decimal.
    Decimal = 0x37,
    /// Legacy numeric.
    Numeric = 0x3F,
    /// Nullable bit.
    BitN = 0x68,
    /// Decimal.
    DecimalN = 0x6A,
    /// Numeric.
    NumericN = 0x6C,
    /// Nullable float.
    FloatN = 0x6D,
    /// Nullable money.
    MoneyN = 0x6E,
    /// Nullable datetime (4 or 8 bytes).
    DateTimeN = 0x6F,
    /// Date (3 bytes).
    Date = 0x28,
    /// Time with variable precision.
    Time = 0x29,
    /// DateTime2 with variable precision.
    DateTime2 = 0x2A,
    /// DateTimeOffset with variable precision.
    DateTimeOffset = 0x2B,

    // Legacy byte-counted types
    /// Fixed-length character.
    Char = 0x2F,
    /// Variable-length character.
    VarChar = 0x27,
    /// Fixed-length binary.
    Binary = 0x2D,
    /// Variable-length binary.
    VarBinary = 0x25,

    // Counted types with 2-byte length
    /// Large variable-length character.
    BigVarChar = 0xA7,
    /// Large variable-length binary.
    BigVarBinary = 0xA5,
    /// Large fixed-length character.
    BigChar = 0xAF,
    /// Large fixed-length binary.
    BigBinary = 0xAD,
    /// Fixed-length Unicode character.
    NChar = 0xEF,
    /// Variable-length Unicode character.
    NVarChar = 0xE7,

    // Large object types
    /// Text (deprecated, use varchar(max)).
    Text = 0x23,
    /// Image (deprecated, use varbinary(max)).
    Image = 0x22,
    /// NText (deprecated, use nvarchar(max)).
    NText = 0x63,

    // Special types
    /// SQL Variant.
    Variant = 0x62,
    /// CLR user-defined type (geography, geometry, hierarchyid, ...).
    Udt = 0xF0,
    /// XML type.
    Xml = 0xF1,
    /// Table-valued parameter.
    Tvp = 0xF3,
}

impl TypeId {
    /// Create a type ID from a raw byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x1F => Self::Null,
            0x30 => Self::Int1,
            0x32 => Self::Bit,
            0x34 => Self::Int2,
            0x38 => Self::Int4,
            0x7F => Self::Int8,
            0x3A => Self::DateTime4,
            0x3B => Self::Float4,
            0x3C => Self::Money,
            0x3D => Self::DateTime,
            0x3E => Self::Float8,
            0x7A => Self::Money4,
            0x24 => Self::Guid,
            0x26 => Self::IntN,
            0x37 => Self::Decimal,
            0x3F => Self::Numeric,
            0x68 => Self::BitN,
            0x6A => Self::DecimalN,
            0x6C => Self::NumericN,
            0x6D => Self::FloatN,
            0x6E => Self::MoneyN,
            0x6F => Self::DateTimeN,
            0x28 => Self::Date,
            0x29 => Self::Time,
            0x2A => Self::DateTime2,
            0x2B => Self::DateTimeOffset,
            0x2F => Self::Char,
            0x27 => Self::VarChar,
            0x2D => Self::Binary,
            0x25 => Self::VarBinary,
            0xA7 => Self::BigVarChar,
            0xA5 => Self::BigVarBinary,
            0xAF => Self::BigChar,
            0xAD => Self::BigBinary,
            0xEF => Self::NChar,
            0xE7 => Self::NVarChar,
            0x23 => Self::Text,
            0x22 => Self::Image,
            0x63 => Self::NText,
            0x62 => Self::Variant,
            0xF0 => Self::Udt,
            0xF1 => Self::Xml,
            0xF3 => Self::Tvp,
            _ => return None,
        })
    }

    /// Get the fixed size of this type in bytes, if applicable.
    #[must_use]
    pub const fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Null => Some(0),
            Self::Int1 | Self::Bit => Some(1),
            Self::Int2 => Some(2),
            Self::Int4 | Self::Float4 | Self::Money4 | Self::DateTime4 => Some(4),
            Self::Int8 | Self::Float8 | Self::Money | Self::DateTime => Some(8),
            _ => None,
        }
    }

    /// Check if this is a fixed-length type.
    #[must_use]
    pub const fn is_fixed_length(&self) -> bool {
        self.fixed_size().is_some()
    }

    /// Check if values of this type are always sent as PLP streams.
    #[must_use]
    pub const fn is_plp(&self) -> bool {
        matches!(self, Self::Text | Self::Image | Self::NText | Self::Xml)
    }

    /// Check if a column of this type is sent as a PLP stream when declared
    /// with the given maximum length.
    #[must_use]
    pub const fn is_plp_with_length(&self, max_length: Option<u32>) -> bool {
        if self.is_plp() {
            return true;
        }
        let is_max = matches!(max_length, Some(MAX_LENGTH_PLP));
        is_max
            && matches!(
                self,
                Self::BigVarChar | Self::BigVarBinary | Self::NVarChar | Self::Udt
            )
    }

    /// Check if this is a Unicode type.
    #[must_use]
    pub const fn is_unicode(&self) -> bool {
        matches!(self, Self::NChar | Self::NVarChar | Self::NText | Self::Xml)
    }

    /// Check if this is a date/time type.
    #[must_use]
    pub const fn is_datetime(&self) -> bool {
        matches!(
            self,
            Self::DateTime
                | Self::DateTime4
                | Self::DateTimeN
                | Self::Date
                | Self::Time
                | Self::DateTime2
                | Self::DateTimeOffset
        )
    }
}

/// Column flags from COLMETADATA.
///
/// Only the bits this crate acts on are decoded; the raw value stays on
/// [`crate::ColumnData::flags`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnFlags {
    /// Column is nullable.
    pub nullable: bool,
    /// Column is an identity column.
    pub identity: bool,
    /// Column is computed.
    pub computed: bool,
    /// Column is hidden.
    pub hidden: bool,
    /// Nullability could not be determined at query time.
    pub nullable_unknown: bool,
}

impl ColumnFlags {
    /// Parse column flags from the 2-byte flags field.
    #[must_use]
    pub fn from_bits(flags: u16) -> Self {
        Self {
            nullable: (flags & 0x0001) != 0,
            identity: (flags & 0x0010) != 0,
            computed: (flags & 0x0020) != 0,
            hidden: (flags & 0x2000) != 0,
            nullable_unknown: (flags & 0x8000) != 0,
        }
    }

    /// Convert flags back to bits.
    #[must_use]
    pub fn to_bits(&self) -> u16 {
        [
            (self.nullable, 0x0001),
            (self.identity, 0x0010),
            (self.computed, 0x0020),
            (self.hidden, 0x2000),
            (self.nullable_unknown, 0x8000),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .fold(0, |acc, (_, bit)| acc | bit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_from_u8() {
        assert_eq!(TypeId::from_u8(0x38), Some(TypeId::Int4));
        assert_eq!(TypeId::from_u8(0xF0), Some(TypeId::Udt));
        assert_eq!(TypeId::from_u8(0x3A), Some(TypeId::DateTime4));
        assert_eq!(TypeId::from_u8(0x99), None);
    }

    #[test]
    fn test_every_known_byte_maps_back() {
        for byte in 0u8..=255 {
            if let Some(id) = TypeId::from_u8(byte) {
                assert_eq!(id as u8, byte);
            }
        }
    }

    #[test]
    fn test_plp_detection() {
        assert!(TypeId::Xml.is_plp_with_length(None));
        assert!(TypeId::Udt.is_plp_with_length(Some(MAX_LENGTH_PLP)));
        assert!(!TypeId::Udt.is_plp_with_length(Some(892)));
        assert!(TypeId::BigVarBinary.is_plp_with_length(Some(0xFFFF)));
        assert!(!TypeId::Int4.is_plp_with_length(Some(0xFFFF)));
    }

    #[test]
    fn test_column_flags_roundtrip() {
        let flags = ColumnFlags {
            nullable: true,
            identity: true,
            ..Default::default()
        };
        let restored = ColumnFlags::from_bits(flags.to_bits());
        assert_eq!(flags, restored);
        assert!(ColumnFlags::from_bits(0x0001).nullable);
        assert!(!ColumnFlags::from_bits(0x0010).nullable);
    }
}
