#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use mssql_cursor::Description;
use tds_protocol::ColMetaData;

fuzz_target!(|data: &[u8]| {
    let mut buf = Bytes::copy_from_slice(data);
    let Ok(meta) = ColMetaData::decode(&mut buf) else {
        return;
    };

    // Building a description must either succeed or report a mapping error.
    if let Ok(description) = Description::from_metadata(&meta, 8000) {
        assert_eq!(description.len(), meta.column_count());
        for column in description.columns() {
            let _ = column.as_tuple();
        }
    }
});
