//! Low-level string helpers shared by the token parsers.

use bytes::{Buf, BufMut};

/// Read a B_VARCHAR: 1-byte character count followed by UTF-16LE data.
pub fn read_b_varchar(src: &mut impl Buf) -> Option<String> {
    if src.remaining() < 1 {
        return None;
    }
    let len = src.get_u8() as usize;
    read_utf16_string(src, len)
}

/// Read a US_VARCHAR: 2-byte character count followed by UTF-16LE data.
pub fn read_us_varchar(src: &mut impl Buf) -> Option<String> {
    if src.remaining() < 2 {
        return None;
    }
    let len = src.get_u16_le() as usize;
    read_utf16_string(src, len)
}

/// Read `char_count` UTF-16LE code units.
pub fn read_utf16_string(src: &mut impl Buf, char_count: usize) -> Option<String> {
    if src.remaining() < char_count * 2 {
        return None;
    }
    let units: Vec<u16> = (0..char_count).map(|_| src.get_u16_le()).collect();
    String::from_utf16(&units).ok()
}

/// Write a B_VARCHAR, truncating to 255 code units.
pub fn write_b_varchar(dst: &mut impl BufMut, s: &str) {
    let units: Vec<u16> = s.encode_utf16().take(u8::MAX as usize).collect();
    dst.put_u8(units.len() as u8);
    units.iter().for_each(|&u| dst.put_u16_le(u));
}

/// Write a US_VARCHAR, truncating to 65535 code units.
pub fn write_us_varchar(dst: &mut impl BufMut, s: &str) {
    let units: Vec<u16> = s.encode_utf16().take(u16::MAX as usize).collect();
    dst.put_u16_le(units.len() as u16);
    units.iter().for_each(|&u| dst.put_u16_le(u));
}
