//! TDS binary decoding for SQL values.
//!
//! Decoding is strict: a cell whose length does not match its declared type,
//! whose bytes run short, or which leaves bytes behind is an error, never a
//! NULL or a truncated value.

use bytes::{Buf, Bytes};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use rust_decimal::Decimal;
use tds_protocol::{Collation, PlpReader, TypeId, TypeInfo};

use crate::catalog::time_len;
use crate::error::TypeError;
use crate::value::SqlValue;

/// CE day number of 1900-01-01, the DATETIME epoch.
pub(crate) const DATETIME_EPOCH_CE: i32 = 693_596;

/// 1/300 s ticks per day for DATETIME.
pub(crate) const DATETIME_TICKS_PER_DAY: u32 = 300 * 86_400;

const MAX_TIME_SCALE: u8 = 7;

/// Decode one complete cell.
///
/// `buf` holds exactly one value with its length prefix (or PLP framing for
/// `(MAX)` columns). Bytes left over after the value are rejected.
pub fn decode_cell(mut buf: Bytes, type_id: TypeId, info: &TypeInfo) -> Result<SqlValue, TypeError> {
    let value = decode_value(&mut buf, type_id, info)?;
    if buf.has_remaining() {
        return Err(TypeError::TrailingBytes {
            remaining: buf.remaining(),
        });
    }
    Ok(value)
}

/// Decode a value from the front of `buf`, consuming its framing.
pub fn decode_value(buf: &mut Bytes, type_id: TypeId, info: &TypeInfo) -> Result<SqlValue, TypeError> {
    if type_id.is_plp_with_length(info.max_length) {
        return decode_plp(buf, type_id, info);
    }

    match type_id {
        TypeId::Null => Ok(SqlValue::Null),

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
            let size = type_id.fixed_size().unwrap_or(0);
            let data = take(buf, size)?;
            decode_fixed(type_id, data, info)
        }

        // BYTELEN-prefixed scalars: zero length is NULL.
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
        | TypeId::DateTimeOffset => match get_u8(buf)? {
            0 => Ok(SqlValue::Null),
            len => {
                let data = take(buf, usize::from(len))?;
                decode_fixed(type_id, data, info)
            }
        },

        // Legacy byte-counted strings and binaries: 0xFF is NULL.
        TypeId::Char | TypeId::VarChar | TypeId::Binary | TypeId::VarBinary => {
            match get_u8(buf)? {
                0xFF => Ok(SqlValue::Null),
                len => {
                    let data = take(buf, usize::from(len))?;
                    decode_payload(type_id, data, info)
                }
            }
        }

        // USHORTLEN types: 0xFFFF is NULL.
        TypeId::BigVarChar
        | TypeId::BigChar
        | TypeId::NChar
        | TypeId::NVarChar
        | TypeId::BigVarBinary
        | TypeId::BigBinary
        | TypeId::Udt => match get_u16(buf)? {
            0xFFFF => Ok(SqlValue::Null),
            len => {
                let data = take(buf, usize::from(len))?;
                decode_payload(type_id, data, info)
            }
        },

        TypeId::Text
        | TypeId::NText
        | TypeId::Image
        | TypeId::Xml
        | TypeId::Variant
        | TypeId::Tvp => Err(unsupported(type_id)),
    }
}

/// Decode the unframed payload of a string, binary, XML or UDT value.
///
/// This is the second half of large-object decoding: the caller assembles
/// the payload from PLP chunks and hands the complete bytes here.
pub fn decode_payload(type_id: TypeId, data: Bytes, info: &TypeInfo) -> Result<SqlValue, TypeError> {
    match type_id {
        TypeId::NChar | TypeId::NVarChar | TypeId::NText => {
            Ok(SqlValue::String(decode_utf16_string(&data)?))
        }
        TypeId::Xml => Ok(SqlValue::Xml(decode_utf16_string(&data)?)),
        TypeId::Char | TypeId::VarChar | TypeId::BigChar | TypeId::BigVarChar | TypeId::Text => Ok(
            SqlValue::String(decode_varchar_string(&data, info.collation.as_ref())),
        ),
        TypeId::Binary
        | TypeId::VarBinary
        | TypeId::BigBinary
        | TypeId::BigVarBinary
        | TypeId::Image
        | TypeId::Udt => Ok(SqlValue::Binary(data)),
        _ => Err(unsupported(type_id)),
    }
}

/// A whole PLP value held in `buf` can never be longer than `buf` itself, so
/// its remaining length bounds the declared total.
fn decode_plp(buf: &mut Bytes, type_id: TypeId, info: &TypeInfo) -> Result<SqlValue, TypeError> {
    let max_size = buf.remaining() as u64;
    let Some(reader) = PlpReader::open(Buf::reader(&mut *buf), max_size)? else {
        return Ok(SqlValue::Null);
    };
    let payload = reader.into_bytes()?;
    decode_payload(type_id, payload, info)
}

/// Decode a scalar whose bytes (without length prefix) are exactly `data`.
fn decode_fixed(type_id: TypeId, mut data: Bytes, info: &TypeInfo) -> Result<SqlValue, TypeError> {
    let len = data.len();
    let value = match (type_id, len) {
        (TypeId::Int1 | TypeId::IntN, 1) => SqlValue::TinyInt(data.get_u8()),
        (TypeId::Int2 | TypeId::IntN, 2) => SqlValue::SmallInt(data.get_i16_le()),
        (TypeId::Int4 | TypeId::IntN, 4) => SqlValue::Int(data.get_i32_le()),
        (TypeId::Int8 | TypeId::IntN, 8) => SqlValue::BigInt(data.get_i64_le()),
        (TypeId::Bit | TypeId::BitN, 1) => SqlValue::Bool(data.get_u8() != 0),
        (TypeId::Float4 | TypeId::FloatN, 4) => SqlValue::Float(data.get_f32_le()),
        (TypeId::Float8 | TypeId::FloatN, 8) => SqlValue::Double(data.get_f64_le()),
        (TypeId::Money4 | TypeId::MoneyN, 4) => {
            SqlValue::Decimal(Decimal::new(i64::from(data.get_i32_le()), 4))
        }
        (TypeId::Money | TypeId::MoneyN, 8) => {
            let hi = data.get_i32_le();
            let lo = data.get_u32_le();
            SqlValue::Decimal(Decimal::new((i64::from(hi) << 32) | i64::from(lo), 4))
        }
        (TypeId::DateTime4 | TypeId::DateTimeN, 4) => {
            let days = data.get_u16_le();
            let minutes = data.get_u16_le();
            SqlValue::DateTime(small_datetime(days, minutes)?)
        }
        (TypeId::DateTime | TypeId::DateTimeN, 8) => {
            let days = data.get_i32_le();
            let ticks = data.get_u32_le();
            SqlValue::DateTime(datetime(days, ticks)?)
        }
        (TypeId::Guid, 16) => {
            let mut raw = [0u8; 16];
            data.copy_to_slice(&mut raw);
            // SQL Server stores the first three groups little-endian.
            SqlValue::Uuid(uuid::Uuid::from_bytes_le(raw))
        }
        (
            TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN,
            5 | 9 | 13 | 17,
        ) => SqlValue::Decimal(decimal(data, info.scale.unwrap_or(0))?),
        (TypeId::Date, 3) => SqlValue::Date(date_from_days(read_uint_le(&mut data, 3))?),
        (TypeId::Time, _) => {
            let scale = checked_scale(info, len)?;
            SqlValue::Time(time_from_intervals(read_uint_le(&mut data, len), scale)?)
        }
        (TypeId::DateTime2, _) if len > 3 => {
            let scale = checked_scale(info, len - 3)?;
            let time = time_from_intervals(read_uint_le(&mut data, len - 3), scale)?;
            let date = date_from_days(read_uint_le(&mut data, 3))?;
            SqlValue::DateTime(date.and_time(time))
        }
        (TypeId::DateTimeOffset, _) if len > 5 => {
            let scale = checked_scale(info, len - 5)?;
            let time = time_from_intervals(read_uint_le(&mut data, len - 5), scale)?;
            let date = date_from_days(read_uint_le(&mut data, 3))?;
            let offset_minutes = data.get_i16_le();
            let offset = chrono::FixedOffset::east_opt(i32::from(offset_minutes) * 60)
                .ok_or_else(|| {
                    TypeError::InvalidDateTime(format!("invalid offset: {offset_minutes}"))
                })?;
            // The stored date and time are UTC.
            SqlValue::DateTimeOffset(offset.from_utc_datetime(&date.and_time(time)))
        }
        _ => {
            return Err(TypeError::InvalidBinary(format!(
                "invalid {type_id:?} length: {len}"
            )));
        }
    };
    Ok(value)
}

fn decimal(mut data: Bytes, scale: u8) -> Result<Decimal, TypeError> {
    let sign = data.get_u8();
    let mut mantissa = [0u8; 16];
    let digits = data.remaining();
    data.copy_to_slice(&mut mantissa[..digits]);

    let mantissa = i128::try_from(u128::from_le_bytes(mantissa))
        .map_err(|_| TypeError::InvalidDecimal("mantissa out of range".to_string()))?;
    let mut value = Decimal::try_from_i128_with_scale(mantissa, u32::from(scale))
        .map_err(|e| TypeError::InvalidDecimal(e.to_string()))?;
    // Sign byte: 0 = negative, 1 = positive.
    if sign == 0 {
        value.set_sign_negative(true);
    }
    Ok(value)
}

fn checked_scale(info: &TypeInfo, time_bytes: usize) -> Result<u8, TypeError> {
    let scale = info.scale.unwrap_or(MAX_TIME_SCALE);
    if scale > MAX_TIME_SCALE {
        return Err(TypeError::InvalidDateTime(format!("invalid scale: {scale}")));
    }
    if time_len(scale) != time_bytes {
        return Err(TypeError::InvalidDateTime(format!(
            "{time_bytes} time bytes do not match scale {scale}"
        )));
    }
    Ok(scale)
}

fn read_uint_le(data: &mut Bytes, n: usize) -> u64 {
    let mut raw = [0u8; 8];
    data.copy_to_slice(&mut raw[..n]);
    u64::from_le_bytes(raw)
}

/// Date from days since 0001-01-01.
fn date_from_days(days: u64) -> Result<NaiveDate, TypeError> {
    i32::try_from(days)
        .ok()
        .and_then(|days| NaiveDate::from_num_days_from_ce_opt(days + 1))
        .ok_or_else(|| TypeError::InvalidDateTime(format!("day {days} out of range")))
}

/// Time of day from `10^-scale` second intervals since midnight.
fn time_from_intervals(intervals: u64, scale: u8) -> Result<NaiveTime, TypeError> {
    let nanos = intervals
        .checked_mul(10u64.pow(9 - u32::from(scale)))
        .ok_or_else(|| TypeError::InvalidDateTime("time out of range".to_string()))?;
    let secs = u32::try_from(nanos / 1_000_000_000).unwrap_or(u32::MAX);
    NaiveTime::from_num_seconds_from_midnight_opt(secs, (nanos % 1_000_000_000) as u32)
        .ok_or_else(|| TypeError::InvalidDateTime(format!("{intervals} intervals past midnight")))
}

fn datetime(days: i32, ticks: u32) -> Result<NaiveDateTime, TypeError> {
    if ticks >= DATETIME_TICKS_PER_DAY {
        return Err(TypeError::InvalidDateTime(format!("DATETIME ticks {ticks}")));
    }
    let date = days
        .checked_add(DATETIME_EPOCH_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| TypeError::InvalidDateTime(format!("DATETIME day {days}")))?;

    // Round 1/300 s ticks to whole milliseconds (.000, .003, .007).
    let millis = (u64::from(ticks) * 10 + 1) / 3;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(
        (millis / 1000) as u32,
        ((millis % 1000) * 1_000_000) as u32,
    )
    .ok_or_else(|| TypeError::InvalidDateTime(format!("DATETIME ticks {ticks}")))?;
    Ok(date.and_time(time))
}

fn small_datetime(days: u16, minutes: u16) -> Result<NaiveDateTime, TypeError> {
    let date = NaiveDate::from_num_days_from_ce_opt(DATETIME_EPOCH_CE + i32::from(days))
        .ok_or_else(|| TypeError::InvalidDateTime(format!("SMALLDATETIME day {days}")))?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(u32::from(minutes) * 60, 0)
        .ok_or_else(|| TypeError::InvalidDateTime(format!("SMALLDATETIME minute {minutes}")))?;
    Ok(date.and_time(time))
}

/// Decode a UTF-16LE string from bytes.
pub fn decode_utf16_string(data: &[u8]) -> Result<String, TypeError> {
    if data.len() % 2 != 0 {
        return Err(TypeError::InvalidEncoding(
            "UTF-16 data must have even length".to_string(),
        ));
    }

    let utf16: Vec<u16> = data
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    String::from_utf16(&utf16).map_err(|e| TypeError::InvalidEncoding(e.to_string()))
}

/// Decode VARCHAR bytes using the column collation.
///
/// UTF-8 is tried first, then the collation's code page, then lossy UTF-8.
pub fn decode_varchar_string(data: &[u8], collation: Option<&Collation>) -> String {
    if let Ok(s) = std::str::from_utf8(data) {
        return s.to_owned();
    }

    #[cfg(feature = "encoding")]
    if let Some(encoding) = collation.and_then(Collation::encoding) {
        let (decoded, _, had_errors) = encoding.decode(data);
        if !had_errors {
            return decoded.into_owned();
        }
    }

    tracing::warn!(
        bytes = data.len(),
        lcid = collation.map(|c| c.lcid),
        "VARCHAR data is not valid in its collation, decoding lossily"
    );
    String::from_utf8_lossy(data).into_owned()
}

fn get_u8(buf: &mut Bytes) -> Result<u8, TypeError> {
    need(buf, 1)?;
    Ok(buf.get_u8())
}

fn get_u16(buf: &mut Bytes) -> Result<u16, TypeError> {
    need(buf, 2)?;
    Ok(buf.get_u16_le())
}

fn take(buf: &mut Bytes, n: usize) -> Result<Bytes, TypeError> {
    need(buf, n)?;
    Ok(buf.split_to(n))
}

fn need(buf: &Bytes, n: usize) -> Result<(), TypeError> {
    if buf.remaining() < n {
        return Err(TypeError::BufferTooSmall {
            needed: n,
            available: buf.remaining(),
        });
    }
    Ok(())
}

fn unsupported(type_id: TypeId) -> TypeError {
    TypeError::UnsupportedConversion {
        from: format!("TDS type 0x{:02X}", type_id as u8),
        to: "SqlValue",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use tds_protocol::{MAX_LENGTH_PLP, encode_plp, encode_plp_null};

    fn info() -> TypeInfo {
        TypeInfo::default()
    }

    fn scaled(scale: u8) -> TypeInfo {
        TypeInfo {
            scale: Some(scale),
            ..Default::default()
        }
    }

    fn days_since_year_one(y: i32, m: u32, d: u32) -> u32 {
        (NaiveDate::from_ymd_opt(y, m, d).unwrap().num_days_from_ce() - 1) as u32
    }

    #[test]
    fn test_decode_date() {
        let days = days_since_year_one(2024, 1, 15).to_le_bytes();
        let cell = Bytes::from(vec![3, days[0], days[1], days[2]]);
        let value = decode_cell(cell, TypeId::Date, &info()).unwrap();
        let date = value.as_date().unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 1, 15));
    }

    #[test]
    fn test_null_markers() {
        assert!(decode_cell(Bytes::from_static(&[0]), TypeId::Date, &info()).unwrap().is_null());
        assert!(
            decode_cell(Bytes::from_static(&[0xFF, 0xFF]), TypeId::Udt, &info())
                .unwrap()
                .is_null()
        );
        let plp = TypeInfo {
            max_length: Some(MAX_LENGTH_PLP),
            ..Default::default()
        };
        assert!(decode_cell(encode_plp_null(), TypeId::Udt, &plp).unwrap().is_null());
    }

    #[test]
    fn test_decode_intn_by_length() {
        let cell = Bytes::from_static(&[8, 1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(decode_cell(cell, TypeId::IntN, &info()).unwrap(), SqlValue::BigInt(1));
        let cell = Bytes::from_static(&[3, 1, 0, 0]);
        assert!(matches!(
            decode_cell(cell, TypeId::IntN, &info()),
            Err(TypeError::InvalidBinary(_))
        ));
    }

    #[test]
    fn test_decode_money() {
        let raw = 123_456_789i64;
        let mut cell = vec![8];
        cell.extend_from_slice(&((raw >> 32) as i32).to_le_bytes());
        cell.extend_from_slice(&(raw as u32).to_le_bytes());
        let value = decode_cell(Bytes::from(cell), TypeId::MoneyN, &info()).unwrap();
        assert_eq!(value, SqlValue::Decimal(Decimal::new(raw, 4)));

        let small = Bytes::from_static(&[0x3C, 0xEC, 0xFF, 0xFF]);
        let value = decode_cell(small, TypeId::Money4, &info()).unwrap();
        assert_eq!(value, SqlValue::Decimal(Decimal::new(-5060, 4)));
    }

    #[test]
    fn test_decode_decimal() {
        let info = TypeInfo {
            precision: Some(10),
            scale: Some(2),
            ..Default::default()
        };
        let mut cell = vec![5, 0];
        cell.extend_from_slice(&12345u32.to_le_bytes());
        let value = decode_cell(Bytes::from(cell), TypeId::DecimalN, &info).unwrap();
        assert_eq!(value, SqlValue::Decimal(Decimal::new(-12345, 2)));
    }

    #[test]
    fn test_decode_datetime_rounding() {
        let mut cell = vec![8];
        cell.extend_from_slice(&0i32.to_le_bytes());
        cell.extend_from_slice(&2u32.to_le_bytes());
        let SqlValue::DateTime(dt) = decode_cell(Bytes::from(cell), TypeId::DateTimeN, &info()).unwrap()
        else {
            panic!("expected datetime");
        };
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());
        assert_eq!(dt.nanosecond(), 7_000_000);
    }

    #[test]
    fn test_decode_smalldatetime() {
        let mut cell = Vec::new();
        cell.extend_from_slice(&1u16.to_le_bytes());
        cell.extend_from_slice(&90u16.to_le_bytes());
        let SqlValue::DateTime(dt) = decode_cell(Bytes::from(cell), TypeId::DateTime4, &info()).unwrap()
        else {
            panic!("expected datetime");
        };
        assert_eq!(dt.to_string(), "1900-01-02 01:30:00");
    }

    #[test]
    fn test_decode_time_and_scale_mismatch() {
        // 12:34:56 at scale 0 fits in 3 bytes.
        let secs = 12 * 3600 + 34 * 60 + 56u32;
        let b = secs.to_le_bytes();
        let cell = Bytes::from(vec![3, b[0], b[1], b[2]]);
        let value = decode_cell(cell.clone(), TypeId::Time, &scaled(0)).unwrap();
        assert_eq!(value, SqlValue::Time(NaiveTime::from_hms_opt(12, 34, 56).unwrap()));

        assert!(matches!(
            decode_cell(cell, TypeId::Time, &scaled(7)),
            Err(TypeError::InvalidDateTime(_))
        ));
    }

    #[test]
    fn test_decode_datetimeoffset_keeps_offset() {
        // 2024-01-15 10:00:00 UTC stored with +05:30.
        let intervals = 10u64 * 3600 * 10_000_000;
        let mut cell = vec![10];
        cell.extend_from_slice(&intervals.to_le_bytes()[..5]);
        cell.extend_from_slice(&days_since_year_one(2024, 1, 15).to_le_bytes()[..3]);
        cell.extend_from_slice(&330i16.to_le_bytes());

        let SqlValue::DateTimeOffset(dto) =
            decode_cell(Bytes::from(cell), TypeId::DateTimeOffset, &scaled(7)).unwrap()
        else {
            panic!("expected datetimeoffset");
        };
        assert_eq!(dto.offset().local_minus_utc(), 330 * 60);
        assert_eq!(dto.naive_utc().hour(), 10);
        assert_eq!(dto.naive_local().to_string(), "2024-01-15 15:30:00");
    }

    #[test]
    fn test_decode_guid_mixed_endian() {
        let cell = Bytes::from_static(&[
            16, 0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xAA, 0xBB, 0xCC,
            0xDD, 0xEE, 0xFF,
        ]);
        let value = decode_cell(cell, TypeId::Guid, &info()).unwrap();
        assert_eq!(
            value,
            SqlValue::Uuid("00112233-4455-6677-8899-aabbccddeeff".parse().unwrap())
        );
    }

    #[test]
    fn test_decode_udt_inline_and_plp() {
        let blob = [0xE6, 0x10, 0x00, 0x00, 0x01, 0x0C];
        let mut cell = (blob.len() as u16).to_le_bytes().to_vec();
        cell.extend_from_slice(&blob);
        let inline = TypeInfo {
            max_length: Some(892),
            ..Default::default()
        };
        let value = decode_cell(Bytes::from(cell), TypeId::Udt, &inline).unwrap();
        assert_eq!(value.as_bytes(), Some(&blob[..]));

        let max = TypeInfo {
            max_length: Some(MAX_LENGTH_PLP),
            ..Default::default()
        };
        let value = decode_cell(encode_plp(&blob, 4, true), TypeId::Udt, &max).unwrap();
        assert_eq!(value.as_bytes(), Some(&blob[..]));
    }

    #[test]
    fn test_truncated_and_trailing() {
        let cell = Bytes::from_static(&[10, 0, 1, 2]);
        assert!(matches!(
            decode_cell(cell, TypeId::BigVarBinary, &info()),
            Err(TypeError::BufferTooSmall { needed: 10, available: 2 })
        ));

        let cell = Bytes::from_static(&[4, 1, 0, 0, 0, 9]);
        assert!(matches!(
            decode_cell(cell, TypeId::IntN, &info()),
            Err(TypeError::TrailingBytes { remaining: 1 })
        ));

        let max = TypeInfo {
            max_length: Some(MAX_LENGTH_PLP),
            ..Default::default()
        };
        let plp = encode_plp(&[1u8; 40], 16, true);
        assert!(matches!(
            decode_cell(plp.slice(..plp.len() - 10), TypeId::BigVarBinary, &max),
            Err(TypeError::Protocol(_))
        ));
    }

    #[test]
    fn test_plp_declared_length_beyond_buffer() {
        let plp = TypeInfo {
            max_length: Some(MAX_LENGTH_PLP),
            ..Default::default()
        };
        let mut wire = Vec::new();
        wire.extend_from_slice(&0x7FFF_FFFF_FFFF_FFF0u64.to_le_bytes());
        wire.extend_from_slice(&0u32.to_le_bytes());

        let result = decode_cell(Bytes::from(wire), TypeId::BigVarBinary, &plp);
        assert!(matches!(
            result,
            Err(TypeError::Protocol(tds_protocol::ProtocolError::LobTooLarge { .. }))
        ));

        // A chunk header larger than the rest of the cell is rejected too.
        let mut wire = Vec::new();
        wire.extend_from_slice(&tds_protocol::PLP_UNKNOWN_LEN.to_le_bytes());
        wire.extend_from_slice(&u32::MAX.to_le_bytes());
        wire.extend_from_slice(b"abc");
        assert!(decode_cell(Bytes::from(wire), TypeId::NVarChar, &plp).is_err());
    }

    #[test]
    fn test_decode_nvarchar() {
        let text: Vec<u8> = "héllo".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let mut cell = (text.len() as u16).to_le_bytes().to_vec();
        cell.extend_from_slice(&text);
        let value = decode_cell(Bytes::from(cell), TypeId::NVarChar, &info()).unwrap();
        assert_eq!(value.as_str(), Some("héllo"));

        assert!(decode_utf16_string(&[0x41]).is_err());
    }

    #[cfg(feature = "encoding")]
    #[test]
    fn test_varchar_collation_fallback() {
        let latin1 = Collation::new(0x0409, 52);
        assert_eq!(decode_varchar_string(&[0x63, 0x61, 0x66, 0xE9], Some(&latin1)), "café");

        let cyrillic = Collation::new(0x0419, 0);
        assert_eq!(decode_varchar_string(&[0xCF, 0xF0, 0xE8], Some(&cyrillic)), "При");
    }
}
