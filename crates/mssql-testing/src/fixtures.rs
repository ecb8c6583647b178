//! Server-side value fixtures.
//!
//! The cursor layer never interprets UDT payloads. Tests that play the
//! server's role still need to produce and render them; these helpers do
//! that for the shapes the scenario tests use.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

/// SRID for WGS 84, the default geography reference system.
pub const WGS84_SRID: i32 = 4326;

const GEOGRAPHY_VERSION: u8 = 1;
const PROP_VALID: u8 = 0x04;
const PROP_SINGLE_POINT: u8 = 0x08;

/// Install a test-writer `tracing` subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// A single geography point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeographyPoint {
    /// Spatial reference id.
    pub srid: i32,
    /// Longitude (WKT x).
    pub long: f64,
    /// Latitude (WKT y).
    pub lat: f64,
}

impl GeographyPoint {
    /// Parse `POINT(x y)` well-known text.
    ///
    /// Returns `None` for anything else, including a missing parenthesis
    /// and latitudes outside ±90.
    pub fn from_wkt(wkt: &str, srid: i32) -> Option<Self> {
        let rest = wkt.trim();
        let rest = rest
            .get(..5)
            .filter(|tag| tag.eq_ignore_ascii_case("POINT"))
            .map(|_| rest[5..].trim_start())?;
        let body = rest.strip_prefix('(')?.strip_suffix(')')?;

        let mut coords = body.split_whitespace().map(str::parse::<f64>);
        let long = coords.next()?.ok()?;
        let lat = coords.next()?.ok()?;
        if coords.next().is_some() || !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        Some(Self { srid, long, lat })
    }

    /// Render as `POINT (x y)`.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        format!("POINT ({} {})", self.long, self.lat)
    }

    /// Serialize in the CLR geography layout.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(22);
        buf.put_i32_le(self.srid);
        buf.put_u8(GEOGRAPHY_VERSION);
        buf.put_u8(PROP_VALID | PROP_SINGLE_POINT);
        buf.put_f64_le(self.lat);
        buf.put_f64_le(self.long);
        buf.freeze()
    }

    /// Parse the CLR geography layout of a single point.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() != 22 || data[4] != GEOGRAPHY_VERSION || data[5] & PROP_SINGLE_POINT == 0 {
            return None;
        }
        let f64_at = |at: usize| data.get(at..at + 8)?.try_into().ok().map(f64::from_le_bytes);
        Some(Self {
            srid: i32::from_le_bytes(data.get(..4)?.try_into().ok()?),
            lat: f64_at(6)?,
            long: f64_at(14)?,
        })
    }
}

/// A hierarchy path such as `/1/2/3/`.
///
/// Serialized as LEB128 ordinals; this is a stand-in for the server's
/// bit-packed format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HierarchyPath(Vec<u32>);

impl HierarchyPath {
    /// Parse a slash-delimited path. The root is `/`.
    pub fn parse(path: &str) -> Option<Self> {
        let inner = path.strip_prefix('/')?;
        if inner.is_empty() {
            return Some(Self::default());
        }
        inner
            .strip_suffix('/')?
            .split('/')
            .map(|part| part.parse().ok())
            .collect::<Option<Vec<u32>>>()
            .map(Self)
    }

    /// Depth below the root.
    #[must_use]
    pub fn level(&self) -> usize {
        self.0.len()
    }

    /// Ancestor `n` levels up, or `None` above the root.
    #[must_use]
    pub fn ancestor(&self, n: usize) -> Option<Self> {
        let depth = self.0.len().checked_sub(n)?;
        Some(Self(self.0[..depth].to_vec()))
    }

    /// Serialize.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for &ordinal in &self.0 {
            let mut v = ordinal;
            loop {
                let byte = (v & 0x7F) as u8;
                v >>= 7;
                if v == 0 {
                    buf.put_u8(byte);
                    break;
                }
                buf.put_u8(byte | 0x80);
            }
        }
        buf.freeze()
    }

    /// Deserialize.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let mut ordinals = Vec::new();
        let mut value = 0u32;
        let mut shift = 0u32;
        for &byte in data {
            value |= u32::from(byte & 0x7F).checked_shl(shift)?;
            if byte & 0x80 == 0 {
                ordinals.push(value);
                value = 0;
                shift = 0;
            } else {
                shift += 7;
            }
        }
        (shift == 0).then_some(Self(ordinals))
    }
}

impl fmt::Display for HierarchyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        for ordinal in &self.0 {
            write!(f, "{ordinal}/")?;
        }
        Ok(())
    }
}
