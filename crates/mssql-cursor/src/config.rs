//! Cursor configuration.

use crate::error::Error;

/// Default size above which binary and string columns are streamed.
pub const DEFAULT_INLINE_THRESHOLD: usize = 8000;

/// Default largest piece read from a LOB stream at a time.
pub const DEFAULT_LOB_CHUNK_SIZE: usize = 8192;

/// Default largest LOB value the decoder will assemble (1 GiB).
pub const DEFAULT_MAX_LOB_SIZE: u64 = 1 << 30;

/// Configuration for result-set materialization.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future releases without breaking semver. Use [`Config::default()`]
/// or [`Config::from_connection_string()`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// Declared column size above which values are fetched through the
    /// chunked LOB path instead of inline.
    pub inline_threshold: usize,

    /// Largest piece requested from a LOB stream per read.
    pub lob_chunk_size: usize,

    /// Largest LOB value assembled before the fetch fails.
    pub max_lob_size: u64,

    /// Default number of rows returned by `fetchmany`.
    pub array_size: usize,

    /// Convert DATETIMEOFFSET values to UTC instead of keeping the server
    /// offset.
    pub normalize_offsets_to_utc: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inline_threshold: DEFAULT_INLINE_THRESHOLD,
            lob_chunk_size: DEFAULT_LOB_CHUNK_SIZE,
            max_lob_size: DEFAULT_MAX_LOB_SIZE,
            array_size: 1,
            normalize_offsets_to_utc: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a connection string into configuration.
    ///
    /// Keys are case-insensitive; keys that do not concern this layer
    /// (`Server`, `Database`, ...) are ignored:
    /// ```text
    /// Server=localhost;InlineThreshold=4000;ArraySize=100;NormalizeOffsets=true;
    /// ```
    pub fn from_connection_string(conn_str: &str) -> Result<Self, Error> {
        let mut config = Self::default();

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid key-value: {part}")))?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "inlinethreshold" | "inline threshold" => {
                    config.inline_threshold = parse_number(&key, value)?;
                }
                "lobchunksize" | "lob chunk size" => {
                    config.lob_chunk_size = parse_number(&key, value)?;
                }
                "maxlobsize" | "max lob size" => {
                    config.max_lob_size = parse_number(&key, value)?;
                }
                "arraysize" | "array size" => {
                    config.array_size = parse_number(&key, value)?;
                }
                "normalizeoffsets" | "normalize offsets" => {
                    config.normalize_offsets_to_utc = parse_bool(&key, value)?;
                }
                _ => {
                    tracing::debug!(
                        key = key,
                        value = value,
                        "ignoring unknown connection string option"
                    );
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the inline fetch threshold.
    #[must_use]
    pub fn inline_threshold(mut self, bytes: usize) -> Self {
        self.inline_threshold = bytes;
        self
    }

    /// Set the LOB read piece size.
    #[must_use]
    pub fn lob_chunk_size(mut self, bytes: usize) -> Self {
        self.lob_chunk_size = bytes;
        self
    }

    /// Set the largest LOB value the decoder will assemble.
    #[must_use]
    pub fn max_lob_size(mut self, bytes: u64) -> Self {
        self.max_lob_size = bytes;
        self
    }

    /// Set the default `fetchmany` size.
    #[must_use]
    pub fn array_size(mut self, rows: usize) -> Self {
        self.array_size = rows;
        self
    }

    /// Normalize DATETIMEOFFSET values to UTC.
    #[must_use]
    pub fn normalize_offsets_to_utc(mut self, enabled: bool) -> Self {
        self.normalize_offsets_to_utc = enabled;
        self
    }

    /// Check that every size is usable.
    pub fn validate(&self) -> Result<(), Error> {
        if self.lob_chunk_size == 0 {
            return Err(Error::Config("LobChunkSize must be greater than 0".into()));
        }
        if self.array_size == 0 {
            return Err(Error::Config("ArraySize must be greater than 0".into()));
        }
        if self.max_lob_size == 0 {
            return Err(Error::Config("MaxLobSize must be greater than 0".into()));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("invalid {key}: {value}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") || value == "1" {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") || value.eq_ignore_ascii_case("no") || value == "0"
    {
        Ok(false)
    } else {
        Err(Error::Config(format!("invalid {key}: {value}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.inline_threshold, 8000);
        assert_eq!(config.array_size, 1);
        assert!(!config.normalize_offsets_to_utc);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connection_string() {
        let config = Config::from_connection_string(
            "Server=localhost;INLINETHRESHOLD=4000;LobChunkSize=512;ArraySize=50;NormalizeOffsets=yes;",
        )
        .unwrap();
        assert_eq!(config.inline_threshold, 4000);
        assert_eq!(config.lob_chunk_size, 512);
        assert_eq!(config.array_size, 50);
        assert!(config.normalize_offsets_to_utc);
    }

    #[test]
    fn test_connection_string_errors() {
        assert!(matches!(
            Config::from_connection_string("ArraySize=many"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_connection_string("NormalizeOffsets=maybe"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_connection_string("LobChunkSize=0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_connection_string("garbage"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = Config::new().inline_threshold(16).max_lob_size(1024);
        assert_eq!(config.inline_threshold, 16);
        assert_eq!(config.max_lob_size, 1024);
    }
}
