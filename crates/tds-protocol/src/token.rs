//! COLMETADATA token parsing.
//!
//! The server describes a result set with one COLMETADATA token ahead of the
//! row tokens. Each entry carries the wire type byte, flags, type-specific
//! length/precision/scale/collation info and the column name as reported
//! (aliases included, case preserved).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{read_b_varchar, read_us_varchar, write_b_varchar, write_us_varchar};
use crate::collation::Collation;
use crate::error::ProtocolError;
use crate::types::{ColumnFlags, TypeId};

/// Column metadata token.
#[derive(Debug, Clone, Default)]
pub struct ColMetaData {
    /// Column definitions in SELECT-list order.
    pub columns: Vec<ColumnData>,
}

/// Column definition within metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnData {
    /// Column name.
    pub name: String,
    /// Raw wire type byte.
    pub col_type: u8,
    /// Column flags.
    pub flags: u16,
    /// User type ID.
    pub user_type: u32,
    /// Type-specific metadata.
    pub type_info: TypeInfo,
}

/// Type-specific metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeInfo {
    /// Maximum length for variable-length types.
    pub max_length: Option<u32>,
    /// Precision for numeric types.
    pub precision: Option<u8>,
    /// Scale for numeric and time types.
    pub scale: Option<u8>,
    /// Collation for string types.
    pub collation: Option<Collation>,
    /// CLR type names for user-defined types.
    pub udt: Option<UdtInfo>,
}

/// Names attached to a CLR user-defined type column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UdtInfo {
    /// Database holding the type.
    pub db_name: String,
    /// Owning schema.
    pub schema_name: String,
    /// Type name (e.g. `geography`).
    pub type_name: String,
    /// Assembly-qualified CLR name.
    pub assembly_qualified_name: String,
}

impl ColMetaData {
    /// Special column count indicating no metadata.
    pub const NO_METADATA: u16 = 0xFFFF;

    /// Decode a COLMETADATA token body (after the token byte).
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < 2 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let column_count = src.get_u16_le();
        if column_count == Self::NO_METADATA {
            return Ok(Self::default());
        }

        let columns = (0..column_count)
            .map(|_| Self::decode_column(src))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { columns })
    }

    fn decode_column(src: &mut impl Buf) -> Result<ColumnData, ProtocolError> {
        // UserType (4) + Flags (2) + TypeId (1)
        if src.remaining() < 7 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let user_type = src.get_u32_le();
        let flags = src.get_u16_le();
        let col_type = src.get_u8();
        let type_id =
            TypeId::from_u8(col_type).ok_or(ProtocolError::UnsupportedColumnType(col_type))?;

        let type_info = Self::decode_type_info(src, type_id)?;
        let name = read_b_varchar(src).ok_or(ProtocolError::InvalidString("column name"))?;

        Ok(ColumnData {
            name,
            col_type,
            flags,
            user_type,
            type_info,
        })
    }

    fn decode_type_info(src: &mut impl Buf, type_id: TypeId) -> Result<TypeInfo, ProtocolError> {
        match type_id {
            _ if type_id.is_fixed_length() => Ok(TypeInfo::default()),
            TypeId::Date => Ok(TypeInfo::default()),

            TypeId::IntN
            | TypeId::BitN
            | TypeId::FloatN
            | TypeId::MoneyN
            | TypeId::DateTimeN
            | TypeId::Guid
            | TypeId::Char
            | TypeId::VarChar
            | TypeId::Binary
            | TypeId::VarBinary => Ok(TypeInfo {
                max_length: Some(u32::from(get_u8(src)?)),
                ..Default::default()
            }),

            TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN => {
                need(src, 3)?;
                Ok(TypeInfo {
                    max_length: Some(u32::from(src.get_u8())),
                    precision: Some(src.get_u8()),
                    scale: Some(src.get_u8()),
                    ..Default::default()
                })
            }

            TypeId::Time | TypeId::DateTime2 | TypeId::DateTimeOffset => Ok(TypeInfo {
                scale: Some(get_u8(src)?),
                ..Default::default()
            }),

            TypeId::BigVarChar | TypeId::BigChar | TypeId::NChar | TypeId::NVarChar => {
                need(src, 7)?;
                let max_length = u32::from(src.get_u16_le());
                Ok(TypeInfo {
                    max_length: Some(max_length),
                    collation: Some(decode_collation(src)?),
                    ..Default::default()
                })
            }

            TypeId::BigVarBinary | TypeId::BigBinary => {
                need(src, 2)?;
                Ok(TypeInfo {
                    max_length: Some(u32::from(src.get_u16_le())),
                    ..Default::default()
                })
            }

            TypeId::Text | TypeId::NText | TypeId::Image => {
                need(src, 4)?;
                let max_length = src.get_u32_le();
                let collation = if type_id == TypeId::Image {
                    None
                } else {
                    Some(decode_collation(src)?)
                };

                // Table name parts are not needed to decode values.
                let num_parts = get_u8(src)?;
                for _ in 0..num_parts {
                    read_us_varchar(src).ok_or(ProtocolError::InvalidString("table name"))?;
                }

                Ok(TypeInfo {
                    max_length: Some(max_length),
                    collation,
                    ..Default::default()
                })
            }

            TypeId::Xml => {
                let schema_present = get_u8(src)?;
                if schema_present != 0 {
                    for _ in 0..2 {
                        read_b_varchar(src).ok_or(ProtocolError::InvalidString("xml schema"))?;
                    }
                    read_us_varchar(src).ok_or(ProtocolError::InvalidString("xml schema"))?;
                }
                Ok(TypeInfo::default())
            }

            TypeId::Udt => {
                need(src, 2)?;
                let max_length = u32::from(src.get_u16_le());
                let mut names = [const { String::new() }; 3];
                for name in &mut names {
                    *name = read_b_varchar(src).ok_or(ProtocolError::InvalidString("udt name"))?;
                }
                let [db_name, schema_name, type_name] = names;
                let assembly_qualified_name =
                    read_us_varchar(src).ok_or(ProtocolError::InvalidString("udt assembly"))?;

                Ok(TypeInfo {
                    max_length: Some(max_length),
                    udt: Some(UdtInfo {
                        db_name,
                        schema_name,
                        type_name,
                        assembly_qualified_name,
                    }),
                    ..Default::default()
                })
            }

            TypeId::Variant => {
                need(src, 4)?;
                Ok(TypeInfo {
                    max_length: Some(src.get_u32_le()),
                    ..Default::default()
                })
            }

            // Fixed-length ids are handled by the guard arm; TVPs never
            // appear in result-set metadata.
            _ => Err(ProtocolError::UnsupportedColumnType(type_id as u8)),
        }
    }

    /// Encode this metadata as a COLMETADATA token body.
    ///
    /// Columns whose type byte is unknown are written without type-specific
    /// info, so the result only decodes again for known types.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut dst = BytesMut::new();
        dst.put_u16_le(self.columns.len() as u16);
        for column in &self.columns {
            column.encode(&mut dst);
        }
        dst.freeze()
    }

    /// Get the number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if this represents no metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl ColumnData {
    /// Create a column definition with default flags (nullable).
    pub fn new(name: impl Into<String>, type_id: TypeId, type_info: TypeInfo) -> Self {
        Self {
            name: name.into(),
            col_type: type_id as u8,
            flags: 0x0001,
            user_type: 0,
            type_info,
        }
    }

    /// Set the nullable flag.
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.flags = if nullable {
            self.flags | 0x0001
        } else {
            self.flags & !0x0001
        };
        self
    }

    /// The parsed wire type, if the type byte is known.
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        TypeId::from_u8(self.col_type)
    }

    /// Parsed column flags.
    #[must_use]
    pub fn column_flags(&self) -> ColumnFlags {
        ColumnFlags::from_bits(self.flags)
    }

    /// Check if this column is nullable.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.column_flags().nullable
    }

    /// Check if values of this column arrive as PLP streams.
    #[must_use]
    pub fn is_plp(&self) -> bool {
        self.type_id()
            .is_some_and(|id| id.is_plp_with_length(self.type_info.max_length))
    }

    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u32_le(self.user_type);
        dst.put_u16_le(self.flags);
        dst.put_u8(self.col_type);

        let info = &self.type_info;
        let max_length = info.max_length.unwrap_or(0);
        match self.type_id() {
            Some(
                TypeId::IntN
                | TypeId::BitN
                | TypeId::FloatN
                | TypeId::MoneyN
                | TypeId::DateTimeN
                | TypeId::Guid
                | TypeId::Char
                | TypeId::VarChar
                | TypeId::Binary
                | TypeId::VarBinary,
            ) => dst.put_u8(max_length as u8),
            Some(TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN) => {
                dst.put_u8(max_length as u8);
                dst.put_u8(info.precision.unwrap_or(18));
                dst.put_u8(info.scale.unwrap_or(0));
            }
            Some(TypeId::Time | TypeId::DateTime2 | TypeId::DateTimeOffset) => {
                dst.put_u8(info.scale.unwrap_or(7));
            }
            Some(TypeId::BigVarChar | TypeId::BigChar | TypeId::NChar | TypeId::NVarChar) => {
                dst.put_u16_le(max_length as u16);
                encode_collation(dst, info.collation.unwrap_or_default());
            }
            Some(TypeId::BigVarBinary | TypeId::BigBinary) => dst.put_u16_le(max_length as u16),
            Some(id @ (TypeId::Text | TypeId::NText | TypeId::Image)) => {
                dst.put_u32_le(max_length);
                if id != TypeId::Image {
                    encode_collation(dst, info.collation.unwrap_or_default());
                }
                dst.put_u8(0);
            }
            Some(TypeId::Xml) => dst.put_u8(0),
            Some(TypeId::Udt) => {
                dst.put_u16_le(max_length as u16);
                let udt = info.udt.clone().unwrap_or_default();
                write_b_varchar(dst, &udt.db_name);
                write_b_varchar(dst, &udt.schema_name);
                write_b_varchar(dst, &udt.type_name);
                write_us_varchar(dst, &udt.assembly_qualified_name);
            }
            Some(TypeId::Variant) => dst.put_u32_le(max_length),
            _ => {}
        }

        write_b_varchar(dst, &self.name);
    }
}

fn need(src: &impl Buf, n: usize) -> Result<(), ProtocolError> {
    if src.remaining() < n {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(())
}

fn get_u8(src: &mut impl Buf) -> Result<u8, ProtocolError> {
    need(src, 1)?;
    Ok(src.get_u8())
}

fn decode_collation(src: &mut impl Buf) -> Result<Collation, ProtocolError> {
    need(src, 5)?;
    let lcid = src.get_u32_le();
    let sort_id = src.get_u8();
    Ok(Collation { lcid, sort_id })
}

fn encode_collation(dst: &mut BytesMut, collation: Collation) {
    dst.put_u32_le(collation.lcid);
    dst.put_u8(collation.sort_id);
}
