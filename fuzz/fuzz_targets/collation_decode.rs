#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tds_protocol::Collation;

#[derive(Debug, Arbitrary)]
struct FuzzCollationInput {
    lcid: u32,
    sort_id: u8,
    string_data: Vec<u8>,
}

fuzz_target!(|input: FuzzCollationInput| {
    let collation = Collation::new(input.lcid, input.sort_id);

    let code_page = collation.code_page();
    let _name = collation.encoding_name();
    if collation.is_utf8() {
        assert_eq!(code_page, tds_protocol::collation::CODE_PAGE_UTF8);
    }

    let text = mssql_types::decode_varchar_string(&input.string_data, Some(&collation));
    if input.string_data.is_empty() {
        assert!(text.is_empty());
    }
});
