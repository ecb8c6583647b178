//! Row decoding.
//!
//! Cells are decoded strictly in column order. For each cell:
//!
//! 1. A null indicator short-circuits to NULL; no type logic or converter
//!    runs.
//! 2. `Inline` columns decode the length-prefixed cell directly.
//! 3. `Streamed` columns read the PLP stream chunk by chunk into one buffer
//!    and decode the assembled payload. Partial values are never returned.
//! 4. DATETIMEOFFSET values are normalized to UTC when configured.
//! 5. The output converter registered for the column's driver type id, if
//!    any, is applied exactly once.
//!
//! Any failure aborts the row with [`Error::Decode`] naming the column and
//! the number of raw bytes seen.

use std::io::Read;

use bytes::{Buf, Bytes, BytesMut};
use mssql_types::{SqlValue, TypeError, decode_cell, decode_payload};
use tds_protocol::{PLP_INITIAL_CAPACITY, PlpReader};

use crate::config::Config;
use crate::converter::ConverterSnapshot;
use crate::description::{ColumnDescriptor, Description, FetchMode};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::source::{RawCell, RawRow};

/// Decoder settings taken from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Largest piece requested from a LOB stream per read.
    pub lob_chunk_size: usize,
    /// Largest LOB value assembled.
    pub max_lob_size: u64,
    /// Convert DATETIMEOFFSET values to UTC.
    pub normalize_offsets_to_utc: bool,
}

impl From<&Config> for DecodeOptions {
    fn from(config: &Config) -> Self {
        Self {
            lob_chunk_size: config.lob_chunk_size,
            max_lob_size: config.max_lob_size,
            normalize_offsets_to_utc: config.normalize_offsets_to_utc,
        }
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Decodes raw rows of one result set.
#[derive(Debug)]
pub struct RowDecoder<'a> {
    columns: &'a Description,
    converters: ConverterSnapshot,
    options: DecodeOptions,
}

impl<'a> RowDecoder<'a> {
    /// Create a decoder for rows described by `columns`.
    #[must_use]
    pub fn new(
        columns: &'a Description,
        converters: ConverterSnapshot,
        options: DecodeOptions,
    ) -> Self {
        Self {
            columns,
            converters,
            options,
        }
    }

    /// Decode every cell of `raw` into a [`Row`].
    pub fn decode_row(&self, raw: RawRow) -> Result<Row> {
        if raw.len() != self.columns.len() {
            return Err(self.cell_count_error(&raw));
        }

        let values = self
            .columns
            .iter()
            .zip(raw.into_cells())
            .map(|(column, cell)| self.decode_column(column, cell))
            .collect::<Result<Vec<_>>>()?;

        Ok(Row::new(self.columns.clone(), values))
    }

    /// Decode one cell of `column`.
    pub fn decode_column(&self, column: &ColumnDescriptor, cell: RawCell) -> Result<SqlValue> {
        let value = match (column.fetch_mode, cell) {
            (_, RawCell::Null) => return Ok(SqlValue::Null),
            (FetchMode::Inline, RawCell::Bytes(data)) => {
                let byte_len = data.len();
                decode_cell(data, column.type_id, &column.type_info)
                    .map_err(|source| decode_error(column, byte_len, source))?
            }
            (FetchMode::Streamed, RawCell::Bytes(data)) => self.read_lob(column, data.reader())?,
            (FetchMode::Streamed, RawCell::Stream(stream)) => self.read_lob(column, stream)?,
            (FetchMode::Inline, RawCell::Stream(_)) => {
                return Err(decode_error(
                    column,
                    0,
                    TypeError::FramingMismatch {
                        expected: "inline",
                        actual: "streamed",
                    },
                ));
            }
        };

        if value.is_null() {
            return Ok(value);
        }

        let value = match value {
            SqlValue::DateTimeOffset(dto) if self.options.normalize_offsets_to_utc => {
                SqlValue::DateTimeOffset(dto.to_utc().fixed_offset())
            }
            other => other,
        };

        Ok(match self.converters.get(column.sql_type) {
            Some(convert) => convert(value),
            None => value,
        })
    }

    /// Assemble a PLP value and decode the payload.
    fn read_lob(&self, column: &ColumnDescriptor, inner: impl Read) -> Result<SqlValue> {
        let reader = PlpReader::open(inner, self.options.max_lob_size)
            .map_err(|e| decode_error(column, 0, e.into()))?;
        let Some(mut reader) = reader else {
            return Ok(SqlValue::Null);
        };

        let mut payload = BytesMut::with_capacity(reader.initial_capacity(PLP_INITIAL_CAPACITY));

        loop {
            match reader.next_chunk(self.options.lob_chunk_size) {
                Ok(Some(piece)) => payload.extend_from_slice(&piece),
                Ok(None) => break,
                Err(e) => {
                    return Err(decode_error(column, reader.received() as usize, e.into()));
                }
            }
        }

        tracing::debug!(
            column = %column.name,
            bytes = payload.len(),
            chunks = reader.chunks(),
            "assembled LOB value"
        );

        let payload: Bytes = payload.freeze();
        let byte_len = payload.len();
        decode_payload(column.type_id, payload, &column.type_info)
            .map_err(|source| decode_error(column, byte_len, source))
    }
}

impl RowDecoder<'_> {
    /// Mismatch reported against the first column without a cell, or the
    /// last column when the row has too many.
    fn cell_count_error(&self, raw: &RawRow) -> Error {
        let expected = self.columns.len();
        let byte_len = raw
            .cells()
            .iter()
            .map(|cell| match cell {
                RawCell::Bytes(data) => data.len(),
                RawCell::Null | RawCell::Stream(_) => 0,
            })
            .sum();
        let source = TypeError::CellCount {
            expected,
            actual: raw.len(),
        };
        match self.columns.get(raw.len().min(expected.saturating_sub(1))) {
            Some(column) => decode_error(column, byte_len, source),
            None => Error::Decode {
                column: String::new(),
                byte_len,
                source,
            },
        }
    }
}

fn decode_error(column: &ColumnDescriptor, byte_len: usize, source: TypeError) -> Error {
    Error::Decode {
        column: column.name.clone(),
        byte_len,
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::converter::ConverterRegistry;
    use crate::source::LobStream;
    use bytes::BufMut;
    use chrono::NaiveDate;
    use mssql_types::{SqlType, encode_cell};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tds_protocol::{
        ColMetaData, ColumnData, MAX_LENGTH_PLP, TypeId, TypeInfo, encode_plp, encode_plp_null,
    };

    fn sized(max_length: u32) -> TypeInfo {
        TypeInfo {
            max_length: Some(max_length),
            ..Default::default()
        }
    }

    fn description(columns: Vec<ColumnData>) -> Description {
        Description::from_metadata(&ColMetaData { columns }, 8000).unwrap()
    }

    fn decoder(desc: &Description) -> RowDecoder<'_> {
        RowDecoder::new(desc, ConverterSnapshot::default(), DecodeOptions::default())
    }

    #[test]
    fn test_inline_row() {
        let desc = description(vec![
            ColumnData::new("id", TypeId::IntN, sized(4)),
            ColumnData::new("d", TypeId::Date, TypeInfo::default()),
        ]);
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let raw = RawRow::new(vec![
            RawCell::Bytes(encode_cell(&SqlValue::Int(7), TypeId::IntN, &sized(4)).unwrap()),
            RawCell::Bytes(
                encode_cell(&SqlValue::Date(date), TypeId::Date, &TypeInfo::default()).unwrap(),
            ),
        ]);

        let row = decoder(&desc).decode_row(raw).unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 7);
        assert_eq!(row.get::<NaiveDate>(1).unwrap(), date);
    }

    #[test]
    fn test_streamed_udt_is_assembled() {
        let desc = description(vec![ColumnData::new(
            "shape",
            TypeId::Udt,
            sized(MAX_LENGTH_PLP),
        )]);
        let blob: Vec<u8> = (0..=255u8).cycle().take(20_000).collect();
        let stream = LobStream::from_bytes(encode_plp(&blob, 1000, true));

        let row = decoder(&desc)
            .decode_row(RawRow::new(vec![RawCell::Stream(stream)]))
            .unwrap();
        assert_eq!(row.get_value(0).unwrap().as_bytes(), Some(blob.as_slice()));
    }

    #[test]
    fn test_plp_null_and_unknown_length() {
        let desc = description(vec![
            ColumnData::new("a", TypeId::BigVarBinary, sized(MAX_LENGTH_PLP)),
            ColumnData::new("b", TypeId::BigVarBinary, sized(MAX_LENGTH_PLP)),
        ]);
        let raw = RawRow::new(vec![
            RawCell::Bytes(encode_plp_null()),
            RawCell::Bytes(encode_plp(b"xyz", 2, false)),
        ]);

        let row = decoder(&desc).decode_row(raw).unwrap();
        assert!(row.is_null(0));
        assert_eq!(row.get_value(1).unwrap().as_bytes(), Some(&b"xyz"[..]));
    }

    #[test]
    fn test_truncated_lob_fails_with_context() {
        let desc = description(vec![ColumnData::new(
            "doc",
            TypeId::BigVarBinary,
            sized(MAX_LENGTH_PLP),
        )]);
        let framed = encode_plp(&[9u8; 100], 40, true);
        let truncated = framed.slice(..framed.len() - 20);

        let err = decoder(&desc)
            .decode_row(RawRow::new(vec![RawCell::Bytes(truncated)]))
            .unwrap_err();
        match err {
            Error::Decode {
                column, byte_len, ..
            } => {
                assert_eq!(column, "doc");
                assert_eq!(byte_len, 80);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lob_size_limit() {
        let desc = description(vec![ColumnData::new(
            "doc",
            TypeId::BigVarBinary,
            sized(MAX_LENGTH_PLP),
        )]);
        let options = DecodeOptions {
            max_lob_size: 10,
            ..DecodeOptions::default()
        };
        let decoder = RowDecoder::new(&desc, ConverterSnapshot::default(), options);
        let cell = RawCell::Bytes(encode_plp(&[0u8; 11], 4, false));

        let err = decoder.decode_row(RawRow::new(vec![cell])).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                source: TypeError::Protocol(tds_protocol::ProtocolError::LobTooLarge { .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_corrupt_inline_cell() {
        let desc = description(vec![ColumnData::new("d", TypeId::Date, TypeInfo::default())]);
        let err = decoder(&desc)
            .decode_row(RawRow::new(vec![RawCell::Bytes(Bytes::from_static(&[
                0x03, 0x01,
            ]))]))
            .unwrap_err();
        assert!(matches!(err, Error::Decode { byte_len: 2, .. }));
    }

    #[test]
    fn test_converter_called_once_and_skipped_for_null() {
        let desc = description(vec![ColumnData::new("n", TypeId::NVarChar, sized(20))]);
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ConverterRegistry::new();
        let counter = Arc::clone(&calls);
        registry.register(SqlType::WVarChar, move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            SqlValue::String(format!("<{}>", v.as_str().unwrap_or_default()))
        });
        let decoder = RowDecoder::new(&desc, registry.snapshot(), DecodeOptions::default());

        let cell = encode_cell(&SqlValue::from("hi"), TypeId::NVarChar, &sized(20)).unwrap();
        let row = decoder
            .decode_row(RawRow::new(vec![RawCell::Bytes(cell)]))
            .unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "<hi>");

        let null_row = decoder
            .decode_row(RawRow::new(vec![RawCell::Null]))
            .unwrap();
        assert!(null_row.is_null(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_converter_may_return_null() {
        let desc = description(vec![ColumnData::new("n", TypeId::IntN, sized(4))]);
        let registry = ConverterRegistry::new();
        registry.register(SqlType::Integer, |_| SqlValue::Null);
        let decoder = RowDecoder::new(&desc, registry.snapshot(), DecodeOptions::default());

        let cell = encode_cell(&SqlValue::Int(1), TypeId::IntN, &sized(4)).unwrap();
        let row = decoder
            .decode_row(RawRow::new(vec![RawCell::Bytes(cell)]))
            .unwrap();
        assert!(row.is_null(0));
    }

    #[test]
    fn test_offset_normalization() {
        let info = TypeInfo {
            scale: Some(7),
            ..Default::default()
        };
        let desc = description(vec![ColumnData::new(
            "ts",
            TypeId::DateTimeOffset,
            info.clone(),
        )]);
        let dto = chrono::DateTime::parse_from_rfc3339("2024-01-15T10:00:00-08:00").unwrap();
        let cell = || {
            RawRow::new(vec![RawCell::Bytes(
                encode_cell(&SqlValue::DateTimeOffset(dto), TypeId::DateTimeOffset, &info)
                    .unwrap(),
            )])
        };

        let kept = decoder(&desc).decode_row(cell()).unwrap();
        let SqlValue::DateTimeOffset(v) = kept.get_value(0).unwrap() else {
            panic!("expected DATETIMEOFFSET");
        };
        assert_eq!(v.offset().local_minus_utc(), -8 * 3600);

        let options = DecodeOptions {
            normalize_offsets_to_utc: true,
            ..DecodeOptions::default()
        };
        let normalized = RowDecoder::new(&desc, ConverterSnapshot::default(), options)
            .decode_row(cell())
            .unwrap();
        let SqlValue::DateTimeOffset(v) = normalized.get_value(0).unwrap() else {
            panic!("expected DATETIMEOFFSET");
        };
        assert_eq!(v.offset().local_minus_utc(), 0);
        assert_eq!(*v, dto);
    }

    #[test]
    fn test_cell_count_mismatch() {
        let desc = description(vec![
            ColumnData::new("a", TypeId::IntN, sized(4)),
            ColumnData::new("b", TypeId::IntN, sized(4)),
        ]);
        let one = encode_cell(&SqlValue::Int(1), TypeId::IntN, &sized(4)).unwrap();

        let err = decoder(&desc)
            .decode_row(RawRow::new(vec![RawCell::Bytes(one.clone())]))
            .unwrap_err();
        let Error::Decode {
            column,
            byte_len,
            source,
        } = &err
        else {
            panic!("expected a decode error, got {err:?}");
        };
        assert_eq!(column, "b");
        assert_eq!(*byte_len, 5);
        assert!(matches!(
            source,
            TypeError::CellCount {
                expected: 2,
                actual: 1
            }
        ));

        let extra = RawRow::new(vec![RawCell::Null, RawCell::Null, RawCell::Null]);
        let err = decoder(&desc).decode_row(extra).unwrap_err();
        assert_eq!(err.column(), Some("b"));
    }

    #[test]
    fn test_stream_for_inline_column() {
        let desc = description(vec![ColumnData::new("node", TypeId::Udt, sized(892))]);
        let stream = LobStream::from_bytes(encode_plp(b"\x58", 1, true));

        let err = decoder(&desc)
            .decode_row(RawRow::new(vec![RawCell::Stream(stream)]))
            .unwrap_err();
        assert_eq!(err.column(), Some("node"));
        assert!(matches!(
            err,
            Error::Decode {
                byte_len: 0,
                source: TypeError::FramingMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_inflated_declared_length_is_rejected() {
        let desc = description(vec![ColumnData::new(
            "blob",
            TypeId::BigVarBinary,
            sized(MAX_LENGTH_PLP),
        )]);
        // Header claims 512 MiB, stream ends immediately.
        let mut wire = BytesMut::new();
        wire.put_u64_le(1 << 29);
        wire.put_u32_le(0);

        let err = decoder(&desc)
            .decode_row(RawRow::new(vec![RawCell::Bytes(wire.freeze())]))
            .unwrap_err();
        assert_eq!(err.column(), Some("blob"));
    }
}
