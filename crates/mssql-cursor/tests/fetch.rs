//! End-to-end fetch tests over raw row sources.
//!
//! These drive the public surface the way a transport does: build a
//! description from column metadata, hand the cursor a row source, and
//! read typed rows back.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bytes::Bytes;
use mssql_cursor::{
    Config, ConverterRegistry, Cursor, Description, Error, FetchMode, LobStream, RawCell, RawRow,
    SqlType, SqlValue, TypeCode, VecRowSource,
};
use mssql_types::{TypeError, encode_cell};
use tds_protocol::{ColMetaData, ColumnData, MAX_LENGTH_PLP, TypeId, TypeInfo, encode_plp};

fn sized(max_length: u32) -> TypeInfo {
    TypeInfo {
        max_length: Some(max_length),
        ..Default::default()
    }
}

fn metadata() -> ColMetaData {
    ColMetaData {
        columns: vec![
            ColumnData::new("id", TypeId::IntN, sized(4)).with_nullable(false),
            ColumnData::new("name", TypeId::NVarChar, sized(200)).with_nullable(true),
            ColumnData::new("blob", TypeId::BigVarBinary, sized(MAX_LENGTH_PLP))
                .with_nullable(true),
        ],
    }
}

fn inline(value: SqlValue, type_id: TypeId, max_length: u32) -> RawCell {
    RawCell::Bytes(encode_cell(&value, type_id, &sized(max_length)).unwrap())
}

fn row(id: i32, name: Option<&str>, blob: Option<&[u8]>) -> RawRow {
    RawRow::new(vec![
        inline(SqlValue::Int(id), TypeId::IntN, 4),
        match name {
            Some(name) => inline(SqlValue::String(name.into()), TypeId::NVarChar, 200),
            None => RawCell::Null,
        },
        match blob {
            Some(blob) => RawCell::Stream(LobStream::from_bytes(encode_plp(blob, 3, true))),
            None => RawCell::Null,
        },
    ])
}

fn cursor(rows: Vec<RawRow>, registry: ConverterRegistry, config: &Config) -> Cursor {
    let description = Description::from_metadata(&metadata(), config.inline_threshold).unwrap();
    Cursor::new(description, VecRowSource::new(rows), registry, config)
}

#[test]
fn test_description_matches_metadata() {
    let cursor = cursor(Vec::new(), ConverterRegistry::new(), &Config::default());
    let columns = cursor.description().columns();

    assert_eq!(columns.len(), 3);
    assert_eq!(columns[0].as_tuple().0, "id");
    assert_eq!(columns[0].type_code, TypeCode::Integer);
    assert!(!columns[0].nullable);
    assert_eq!(columns[1].sql_type, SqlType::WVarChar);
    assert_eq!(columns[1].fetch_mode, FetchMode::Inline);
    assert_eq!(columns[2].type_code, TypeCode::Binary);
    assert_eq!(columns[2].fetch_mode, FetchMode::Streamed);
}

#[test]
fn test_mixed_inline_and_streamed_rows() {
    let rows = vec![
        row(1, Some("alpha"), Some(b"0123456789")),
        row(2, None, None),
        row(3, Some(""), Some(b"")),
    ];
    let mut cursor = cursor(rows, ConverterRegistry::new(), &Config::default());

    let all = cursor.fetchall().unwrap();
    assert_eq!(all.len(), 3);

    assert_eq!(all[0].get::<i32>(0).unwrap(), 1);
    assert_eq!(all[0].get_by_name::<String>("name").unwrap(), "alpha");
    assert_eq!(
        all[0].get_value(2).unwrap().as_bytes(),
        Some(&b"0123456789"[..])
    );

    assert!(all[1].is_null(1));
    assert!(all[1].is_null(2));
    assert_eq!(all[1].try_get::<String>(1), None);

    assert_eq!(all[2].get::<String>(1).unwrap(), "");
    assert_eq!(all[2].get_value(2).unwrap().as_bytes(), Some(&b""[..]));

    assert!(cursor.is_exhausted());
    assert!(cursor.fetchall().unwrap().is_empty());
    assert!(cursor.fetchone().unwrap().is_none());
}

#[test]
fn test_small_lob_chunks_reassemble() {
    let blob: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
    let config = Config::new().lob_chunk_size(7);
    let mut cursor = cursor(
        vec![row(1, None, Some(&blob))],
        ConverterRegistry::new(),
        &config,
    );

    let row = cursor.fetchone().unwrap().unwrap();
    assert_eq!(row.get::<Vec<u8>>(2).unwrap(), blob);
}

#[test]
fn test_lob_over_limit_names_the_column() {
    let config = Config::new().max_lob_size(4);
    let mut cursor = cursor(
        vec![row(1, None, Some(b"too large")), row(2, None, Some(b"ok"))],
        ConverterRegistry::new(),
        &config,
    );

    let err = cursor.fetchone().unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(err.column(), Some("blob"));

    let next = cursor.fetchone().unwrap().unwrap();
    assert_eq!(next.get::<i32>(0).unwrap(), 2);
}

#[test]
fn test_converter_applies_to_driver_type() {
    let registry = ConverterRegistry::new();
    registry.register(SqlType::WVarChar, |value| match value {
        SqlValue::String(s) => SqlValue::String(s.to_uppercase()),
        other => other,
    });

    let mut cursor = cursor(
        vec![row(1, Some("abc"), None), row(2, None, None)],
        registry,
        &Config::default(),
    );
    let rows = cursor.fetchmany(10).unwrap();
    assert_eq!(rows[0].get::<String>(1).unwrap(), "ABC");
    assert!(rows[1].is_null(1));
    // Integer column is untouched.
    assert_eq!(rows[0].get::<i32>(0).unwrap(), 1);
}

#[test]
fn test_streamed_cell_as_single_buffer() {
    let mut cursor = cursor(
        vec![RawRow::new(vec![
            inline(SqlValue::Int(9), TypeId::IntN, 4),
            RawCell::Null,
            RawCell::Bytes(encode_plp(b"framed", 2, false)),
        ])],
        ConverterRegistry::new(),
        &Config::default(),
    );

    let row = cursor.fetchone().unwrap().unwrap();
    assert_eq!(row.get_value(2).unwrap().as_bytes(), Some(&b"framed"[..]));
}

#[test]
fn test_row_shape_mismatch_names_the_column() {
    let mut cursor = cursor(
        vec![RawRow::new(vec![RawCell::Bytes(Bytes::from_static(&[4, 1, 0, 0, 0]))])],
        ConverterRegistry::new(),
        &Config::default(),
    );
    let err = cursor.fetchone().unwrap_err();
    assert_eq!(err.column(), Some("name"));
    match err {
        Error::Decode {
            byte_len, source, ..
        } => {
            assert_eq!(byte_len, 5);
            assert!(matches!(
                source,
                TypeError::CellCount {
                    expected: 3,
                    actual: 1
                }
            ));
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[test]
fn test_iterate_then_close() {
    let rows = (1..=4).map(|i| row(i, None, None)).collect();
    let mut cursor = cursor(rows, ConverterRegistry::new(), &Config::new().array_size(3));

    assert_eq!(cursor.fetchmany(None).unwrap().len(), 3);
    let rest: Vec<_> = cursor.by_ref().collect::<Result<_, _>>().unwrap();
    assert_eq!(rest.len(), 1);

    cursor.close();
    assert!(matches!(cursor.fetchone(), Err(Error::CursorClosed)));
}
