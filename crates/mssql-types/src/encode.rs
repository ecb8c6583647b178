//! TDS binary encoding for SQL values.
//!
//! [`encode_cell`] produces exactly the framing [`crate::decode_cell`]
//! consumes for a column of the given wire type. Transports use it to build
//! row data and parameter values; test backends use it to stand in for the
//! server.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use tds_protocol::{TypeId, TypeInfo, encode_plp, encode_plp_null};

use crate::catalog::time_len;
use crate::decode::{DATETIME_EPOCH_CE, DATETIME_TICKS_PER_DAY};
use crate::error::TypeError;
use crate::value::SqlValue;

/// Chunk size used when a `(MAX)` value is framed in one buffer.
pub const DEFAULT_PLP_CHUNK_SIZE: usize = 8000;

/// Encode `value` as one cell of a column with the given wire type.
pub fn encode_cell(value: &SqlValue, type_id: TypeId, info: &TypeInfo) -> Result<Bytes, TypeError> {
    if type_id.is_plp_with_length(info.max_length) {
        return Ok(match encode_payload(value, type_id)? {
            Some(payload) => encode_plp(&payload, DEFAULT_PLP_CHUNK_SIZE, true),
            None => encode_plp_null(),
        });
    }

    let mut buf = BytesMut::new();
    match type_id {
        TypeId::Null => {}

        TypeId::Int1
        | TypeId::Bit
        | TypeId::Int2
        | TypeId::Int4
        | TypeId::Int8
        | TypeId::Float4
        | TypeId::Float8
        | TypeId::Money
        | TypeId::Money4
        | TypeId::DateTime
        | TypeId::DateTime4 => {
            if value.is_null() {
                return Err(TypeError::UnexpectedNull);
            }
            buf.put_slice(&encode_scalar(value, type_id, info)?);
        }

        TypeId::IntN
        | TypeId::BitN
        | TypeId::FloatN
        | TypeId::MoneyN
        | TypeId::DateTimeN
        | TypeId::Guid
        | TypeId::Decimal
        | TypeId::Numeric
        | TypeId::DecimalN
        | TypeId::NumericN
        | TypeId::Date
        | TypeId::Time
        | TypeId::DateTime2
        | TypeId::DateTimeOffset => {
            if value.is_null() {
                buf.put_u8(0);
            } else {
                let body = encode_scalar(value, type_id, info)?;
                buf.put_u8(body.len() as u8);
                buf.put_slice(&body);
            }
        }

        TypeId::Char | TypeId::VarChar | TypeId::Binary | TypeId::VarBinary => {
            match encode_payload(value, type_id)? {
                None => buf.put_u8(0xFF),
                Some(payload) if payload.len() < 0xFF => {
                    buf.put_u8(payload.len() as u8);
                    buf.put_slice(&payload);
                }
                Some(_) => {
                    return Err(TypeError::OutOfRange {
                        target_type: "BYTELEN value",
                    });
                }
            }
        }

        TypeId::BigVarChar
        | TypeId::BigChar
        | TypeId::NChar
        | TypeId::NVarChar
        | TypeId::BigVarBinary
        | TypeId::BigBinary
        | TypeId::Udt => match encode_payload(value, type_id)? {
            None => buf.put_u16_le(0xFFFF),
            Some(payload) if payload.len() < 0xFFFF => {
                buf.put_u16_le(payload.len() as u16);
                buf.put_slice(&payload);
            }
            Some(_) => {
                return Err(TypeError::OutOfRange {
                    target_type: "USHORTLEN value",
                });
            }
        },

        TypeId::Text
        | TypeId::NText
        | TypeId::Image
        | TypeId::Xml
        | TypeId::Variant
        | TypeId::Tvp => {
            return Err(TypeError::UnsupportedConversion {
                from: value.type_name().to_string(),
                to: "TDS cell",
            });
        }
    }

    Ok(buf.freeze())
}

/// Unframed payload of a string, binary, XML or UDT value.
///
/// Returns `None` for NULL. Large-object transports split the payload into
/// PLP chunks themselves.
pub fn encode_payload(value: &SqlValue, type_id: TypeId) -> Result<Option<Bytes>, TypeError> {
    let payload = match (type_id, value) {
        (_, SqlValue::Null) => return Ok(None),
        (
            TypeId::NChar | TypeId::NVarChar | TypeId::NText | TypeId::Xml,
            SqlValue::String(s) | SqlValue::Xml(s),
        ) => Bytes::from(encode_utf16(s)),
        (
            TypeId::Char | TypeId::VarChar | TypeId::BigChar | TypeId::BigVarChar | TypeId::Text,
            SqlValue::String(s),
        ) => Bytes::copy_from_slice(s.as_bytes()),
        (
            TypeId::Binary
            | TypeId::VarBinary
            | TypeId::BigBinary
            | TypeId::BigVarBinary
            | TypeId::Image
            | TypeId::Udt,
            SqlValue::Binary(b),
        ) => b.clone(),
        _ => return Err(mismatch(type_id, value)),
    };
    Ok(Some(payload))
}

/// Encode a string as UTF-16LE without a length prefix.
#[must_use]
pub fn encode_utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Scalar bytes without length prefix.
fn encode_scalar(value: &SqlValue, type_id: TypeId, info: &TypeInfo) -> Result<Vec<u8>, TypeError> {
    let width = type_id
        .fixed_size()
        .or_else(|| info.max_length.map(|len| len as usize));
    let mut buf = Vec::with_capacity(16);

    match type_id {
        TypeId::Int1 | TypeId::Int2 | TypeId::Int4 | TypeId::Int8 | TypeId::IntN => {
            let v = value.as_i64().ok_or_else(|| mismatch(type_id, value))?;
            match width.unwrap_or(8) {
                1 => buf.push(u8::try_from(v).map_err(|_| out_of_range("TINYINT"))?),
                2 => buf.extend(i16::try_from(v).map_err(|_| out_of_range("SMALLINT"))?.to_le_bytes()),
                4 => buf.extend(i32::try_from(v).map_err(|_| out_of_range("INT"))?.to_le_bytes()),
                _ => buf.extend(v.to_le_bytes()),
            }
        }
        TypeId::Bit | TypeId::BitN => {
            let v = value.as_bool().ok_or_else(|| mismatch(type_id, value))?;
            buf.push(u8::from(v));
        }
        TypeId::Float4 | TypeId::Float8 | TypeId::FloatN => {
            let v = value.as_f64().ok_or_else(|| mismatch(type_id, value))?;
            if width == Some(4) {
                buf.extend((v as f32).to_le_bytes());
            } else {
                buf.extend(v.to_le_bytes());
            }
        }
        TypeId::Money | TypeId::Money4 | TypeId::MoneyN => {
            let SqlValue::Decimal(d) = value else {
                return Err(mismatch(type_id, value));
            };
            let mut d = *d;
            d.rescale(4);
            let raw = i64::try_from(d.mantissa()).map_err(|_| out_of_range("MONEY"))?;
            if width == Some(4) {
                buf.extend(i32::try_from(raw).map_err(|_| out_of_range("SMALLMONEY"))?.to_le_bytes());
            } else {
                buf.extend(((raw >> 32) as i32).to_le_bytes());
                buf.extend((raw as u32).to_le_bytes());
            }
        }
        TypeId::DateTime | TypeId::DateTime4 | TypeId::DateTimeN => {
            let SqlValue::DateTime(dt) = value else {
                return Err(mismatch(type_id, value));
            };
            if width == Some(4) {
                encode_small_datetime(*dt, &mut buf)?;
            } else {
                encode_datetime(*dt, &mut buf)?;
            }
        }
        TypeId::Guid => {
            let SqlValue::Uuid(u) = value else {
                return Err(mismatch(type_id, value));
            };
            buf.extend(u.to_bytes_le());
        }
        TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN => {
            let SqlValue::Decimal(d) = value else {
                return Err(mismatch(type_id, value));
            };
            encode_decimal(*d, info, &mut buf)?;
        }
        TypeId::Date => {
            let SqlValue::Date(d) = value else {
                return Err(mismatch(type_id, value));
            };
            put_uint_le(&mut buf, u64::from(days_since_year_one(*d)?), 3);
        }
        TypeId::Time => {
            let SqlValue::Time(t) = value else {
                return Err(mismatch(type_id, value));
            };
            encode_time(*t, scale(info), &mut buf);
        }
        TypeId::DateTime2 => {
            let SqlValue::DateTime(dt) = value else {
                return Err(mismatch(type_id, value));
            };
            encode_time(dt.time(), scale(info), &mut buf);
            put_uint_le(&mut buf, u64::from(days_since_year_one(dt.date())?), 3);
        }
        TypeId::DateTimeOffset => {
            let dto = match value {
                SqlValue::DateTimeOffset(dto) => *dto,
                SqlValue::DateTime(dt) => DateTime::<FixedOffset>::from_naive_utc_and_offset(
                    *dt,
                    FixedOffset::east_opt(0).ok_or_else(|| out_of_range("DATETIMEOFFSET"))?,
                ),
                _ => return Err(mismatch(type_id, value)),
            };
            encode_datetimeoffset(dto, scale(info), &mut buf)?;
        }
        _ => return Err(mismatch(type_id, value)),
    }

    Ok(buf)
}

fn encode_decimal(mut d: Decimal, info: &TypeInfo, buf: &mut Vec<u8>) -> Result<(), TypeError> {
    d.rescale(u32::from(info.scale.unwrap_or(0)));
    buf.push(u8::from(!d.is_sign_negative()));
    let mantissa = d.mantissa().unsigned_abs();
    let digits = match info.precision.unwrap_or(38) {
        0..=9 => 4,
        10..=19 => 8,
        20..=28 => 12,
        _ => 16,
    };
    if digits < 16 && mantissa >> (digits * 8) != 0 {
        return Err(out_of_range("DECIMAL"));
    }
    buf.extend_from_slice(&mantissa.to_le_bytes()[..digits]);
    Ok(())
}

fn encode_time(time: NaiveTime, scale: u8, buf: &mut Vec<u8>) {
    let nanos = u64::from(time.num_seconds_from_midnight()) * 1_000_000_000
        + u64::from(time.nanosecond().min(999_999_999));
    let intervals = nanos / 10u64.pow(9 - u32::from(scale));
    put_uint_le(buf, intervals, time_len(scale));
}

fn encode_datetimeoffset(
    dto: DateTime<FixedOffset>,
    scale: u8,
    buf: &mut Vec<u8>,
) -> Result<(), TypeError> {
    let utc = dto.naive_utc();
    encode_time(utc.time(), scale, buf);
    put_uint_le(buf, u64::from(days_since_year_one(utc.date())?), 3);
    let minutes = dto.offset().local_minus_utc() / 60;
    buf.extend((minutes as i16).to_le_bytes());
    Ok(())
}

fn encode_datetime(dt: NaiveDateTime, buf: &mut Vec<u8>) -> Result<(), TypeError> {
    let days = dt.date().num_days_from_ce() - DATETIME_EPOCH_CE;
    let nanos = u64::from(dt.time().num_seconds_from_midnight()) * 1_000_000_000
        + u64::from(dt.time().nanosecond().min(999_999_999));
    let ticks = ((nanos * 3 + 5_000_000) / 10_000_000) as u32;
    buf.extend(days.to_le_bytes());
    buf.extend(ticks.min(DATETIME_TICKS_PER_DAY - 1).to_le_bytes());
    Ok(())
}

fn encode_small_datetime(dt: NaiveDateTime, buf: &mut Vec<u8>) -> Result<(), TypeError> {
    let days = u16::try_from(dt.date().num_days_from_ce() - DATETIME_EPOCH_CE)
        .map_err(|_| out_of_range("SMALLDATETIME"))?;
    let minutes = (dt.time().num_seconds_from_midnight() / 60) as u16;
    buf.extend(days.to_le_bytes());
    buf.extend(minutes.to_le_bytes());
    Ok(())
}

fn days_since_year_one(date: NaiveDate) -> Result<u32, TypeError> {
    u32::try_from(date.num_days_from_ce() - 1).map_err(|_| out_of_range("DATE"))
}

fn put_uint_le(buf: &mut Vec<u8>, value: u64, n: usize) {
    buf.extend_from_slice(&value.to_le_bytes()[..n]);
}

fn scale(info: &TypeInfo) -> u8 {
    info.scale.unwrap_or(7).min(7)
}

fn mismatch(type_id: TypeId, value: &SqlValue) -> TypeError {
    TypeError::UnsupportedConversion {
        from: value.type_name().to_string(),
        to: type_name(type_id),
    }
}

fn out_of_range(target_type: &'static str) -> TypeError {
    TypeError::OutOfRange { target_type }
}

fn type_name(type_id: TypeId) -> &'static str {
    match type_id {
        TypeId::Int1 | TypeId::Int2 | TypeId::Int4 | TypeId::Int8 | TypeId::IntN => "integer column",
        TypeId::Bit | TypeId::BitN => "BIT column",
        TypeId::Float4 | TypeId::Float8 | TypeId::FloatN => "float column",
        TypeId::Money | TypeId::Money4 | TypeId::MoneyN => "MONEY column",
        TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN => {
            "DECIMAL column"
        }
        TypeId::Guid => "UNIQUEIDENTIFIER column",
        _ if type_id.is_datetime() => "date/time column",
        TypeId::Udt => "UDT column",
        _ if type_id.is_unicode() => "NVARCHAR column",
        _ => "column",
    }
}
