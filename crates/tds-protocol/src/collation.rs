//! SQL Server collations and their character encodings.
//!
//! Non-Unicode (`VARCHAR`/`CHAR`/`TEXT`) data is stored in the code page
//! implied by the column collation's LCID. SQL Server 2019+ UTF-8 collations
//! set bit 27 of the LCID and need no transcoding.

#[cfg(feature = "encoding")]
use encoding_rs::Encoding;

/// Flag bit indicating UTF-8 collation (SQL Server 2019+).
pub const COLLATION_FLAG_UTF8: u32 = 0x0800_0000;

/// Mask to extract the primary language ID (lower 16 bits of LCID).
pub const PRIMARY_LANGUAGE_MASK: u32 = 0x0000_FFFF;

/// Code page reported for UTF-8 collations.
pub const CODE_PAGE_UTF8: u16 = 65001;

/// SQL Server collation (5 bytes on the wire: LCID + sort id).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Collation {
    /// Locale ID, including the UTF-8 flag bit.
    pub lcid: u32,
    /// Sort ID.
    pub sort_id: u8,
}

impl Collation {
    /// Create a collation from its parts.
    #[must_use]
    pub const fn new(lcid: u32, sort_id: u8) -> Self {
        Self { lcid, sort_id }
    }

    /// Returns whether this collation stores UTF-8.
    #[must_use]
    pub const fn is_utf8(&self) -> bool {
        self.lcid & COLLATION_FLAG_UTF8 != 0
    }

    /// Windows code page for this collation.
    ///
    /// Unrecognised languages fall back to 1252 (Western European), which is
    /// what the server itself uses for them.
    #[must_use]
    pub fn code_page(&self) -> u16 {
        if self.is_utf8() {
            return CODE_PAGE_UTF8;
        }

        match self.lcid & PRIMARY_LANGUAGE_MASK {
            0x0411 => 932,
            0x0804 | 0x1004 => 936,
            0x0404 | 0x0C04 | 0x1404 => 950,
            0x0412 => 949,
            0x041E => 874,
            0x042A => 1258,
            0x0405 | 0x0415 | 0x040E | 0x041A | 0x081A | 0x141A | 0x101A | 0x041B | 0x0424
            | 0x0418 | 0x041C => 1250,
            0x0419 | 0x0422 | 0x0423 | 0x0402 | 0x042F | 0x0C1A | 0x201A | 0x0440 | 0x0843
            | 0x0444 | 0x0450 | 0x0485 => 1251,
            0x0408 => 1253,
            0x041F | 0x042C => 1254,
            0x040D => 1255,
            0x0401 | 0x0801 | 0x0C01 | 0x1001 | 0x1401 | 0x1801 | 0x1C01 | 0x2001 | 0x2401
            | 0x2801 | 0x2C01 | 0x3001 | 0x3401 | 0x3801 | 0x3C01 | 0x4001 | 0x0429 | 0x0420
            | 0x048C | 0x0463 => 1256,
            0x0425..=0x0427 => 1257,
            _ => 1252,
        }
    }

    /// Character encoding used to transcode this collation's bytes.
    ///
    /// Returns `None` for UTF-8 collations, whose data needs no transcoding.
    #[cfg(feature = "encoding")]
    #[must_use]
    pub fn encoding(&self) -> Option<&'static Encoding> {
        Some(match self.code_page() {
            CODE_PAGE_UTF8 => return None,
            874 => encoding_rs::WINDOWS_874,
            932 => encoding_rs::SHIFT_JIS,
            936 => encoding_rs::GB18030,
            949 => encoding_rs::EUC_KR,
            950 => encoding_rs::BIG5,
            1250 => encoding_rs::WINDOWS_1250,
            1251 => encoding_rs::WINDOWS_1251,
            1253 => encoding_rs::WINDOWS_1253,
            1254 => encoding_rs::WINDOWS_1254,
            1255 => encoding_rs::WINDOWS_1255,
            1256 => encoding_rs::WINDOWS_1256,
            1257 => encoding_rs::WINDOWS_1257,
            1258 => encoding_rs::WINDOWS_1258,
            _ => encoding_rs::WINDOWS_1252,
        })
    }

    /// Encoding name for logs and error messages.
    #[cfg(feature = "encoding")]
    #[must_use]
    pub fn encoding_name(&self) -> &'static str {
        self.encoding().map_or("UTF-8", |enc| enc.name())
    }
}
