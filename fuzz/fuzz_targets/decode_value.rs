#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use tds_protocol::{TypeId, TypeInfo};

#[derive(Debug, Arbitrary)]
struct FuzzTypeInfo {
    type_id: u8,
    max_length: Option<u32>,
    scale: Option<u8>,
    precision: Option<u8>,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    type_info: FuzzTypeInfo,
    streamed: bool,
    data: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let Some(type_id) = TypeId::from_u8(input.type_info.type_id) else {
        return;
    };
    let info = TypeInfo {
        max_length: input.type_info.max_length,
        precision: input.type_info.precision,
        scale: input.type_info.scale,
        ..Default::default()
    };

    let data = Bytes::from(input.data);
    if input.streamed {
        let _ = mssql_types::decode_payload(type_id, data, &info);
    } else {
        let _ = mssql_types::decode_cell(data, type_id, &info);
    }
});
