#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tds_protocol::{PlpReader, encode_plp};

#[derive(Debug, Arbitrary)]
enum FuzzInput {
    /// Raw bytes fed straight to the reader.
    Raw { data: Vec<u8>, limit: u16, max_size: u16 },
    /// A well-formed stream that must reassemble exactly.
    Framed { payload: Vec<u8>, chunk: u16, known_length: bool, limit: u16 },
}

fuzz_target!(|input: FuzzInput| {
    match input {
        FuzzInput::Raw { data, limit, max_size } => {
            if let Ok(Some(mut reader)) = PlpReader::open(data.as_slice(), u64::from(max_size)) {
                while let Ok(Some(piece)) = reader.next_chunk(usize::from(limit)) {
                    assert!(!piece.is_empty());
                }
            }
        }
        FuzzInput::Framed { payload, chunk, known_length, limit } => {
            let chunk = usize::from(chunk).max(1);
            let stream = encode_plp(&payload, chunk, known_length);
            let mut reader = PlpReader::open(&stream[..], u64::MAX)
                .expect("header")
                .expect("not null");

            let mut out = Vec::with_capacity(payload.len());
            while let Some(piece) = reader.next_chunk(usize::from(limit)).expect("chunk") {
                out.extend_from_slice(&piece);
            }
            assert_eq!(out, payload);
        }
    }
});
