#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use mssql_types::{SqlValue, decode_cell, encode_cell};
use tds_protocol::{MAX_LENGTH_PLP, TypeId, TypeInfo};

#[derive(Debug, Arbitrary)]
enum FuzzSqlValue {
    Null,
    Bool(bool),
    TinyInt(u8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    LongString(String),
}

fuzz_target!(|input: FuzzSqlValue| {
    let (value, type_id, max_length) = match input {
        FuzzSqlValue::Null => (SqlValue::Null, TypeId::IntN, Some(4)),
        FuzzSqlValue::Bool(v) => (SqlValue::Bool(v), TypeId::BitN, Some(1)),
        FuzzSqlValue::TinyInt(v) => (SqlValue::TinyInt(v), TypeId::IntN, Some(1)),
        FuzzSqlValue::SmallInt(v) => (SqlValue::SmallInt(v), TypeId::IntN, Some(2)),
        FuzzSqlValue::Int(v) => (SqlValue::Int(v), TypeId::IntN, Some(4)),
        FuzzSqlValue::BigInt(v) => (SqlValue::BigInt(v), TypeId::IntN, Some(8)),
        FuzzSqlValue::Double(v) => (SqlValue::Double(v), TypeId::FloatN, Some(8)),
        FuzzSqlValue::String(v) => (SqlValue::String(v), TypeId::NVarChar, Some(8000)),
        FuzzSqlValue::Binary(v) => (SqlValue::Binary(Bytes::from(v)), TypeId::BigVarBinary, Some(8000)),
        FuzzSqlValue::LongString(v) => (SqlValue::String(v), TypeId::NVarChar, Some(MAX_LENGTH_PLP)),
    };
    let info = TypeInfo {
        max_length,
        ..Default::default()
    };

    let Ok(cell) = encode_cell(&value, type_id, &info) else {
        return;
    };
    let decoded = decode_cell(cell, type_id, &info).expect("encoded cell decodes");

    match (&value, &decoded) {
        (SqlValue::Double(a), SqlValue::Double(b)) => assert_eq!(a.to_bits(), b.to_bits()),
        _ => assert_eq!(value, decoded),
    }
});
