//! PLP (partially length-prefixed) large-object framing.
//!
//! `(MAX)` columns, XML and large UDT values are sent as a PLP stream:
//!
//! ```text
//! u64 total length   (0xFFFFFFFFFFFFFFFF = NULL, 0xFFFFFFFFFFFFFFFE = unknown)
//! { u32 chunk length, chunk bytes }*
//! u32 0              (terminator)
//! ```
//!
//! [`PlpReader`] consumes that framing from any [`Read`] source one chunk at
//! a time, so a value is never required to be resident in a single buffer.

use std::io::{self, Read};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Total length announcing a NULL value.
pub const PLP_NULL: u64 = 0xFFFF_FFFF_FFFF_FFFF;

/// Total length announcing a value of unknown length.
pub const PLP_UNKNOWN_LEN: u64 = 0xFFFF_FFFF_FFFF_FFFE;

/// Largest up-front allocation made on the strength of a declared length.
pub const PLP_INITIAL_CAPACITY: usize = 64 * 1024;

/// Chunk length terminating the stream.
pub const PLP_TERMINATOR: u32 = 0;

/// Incremental reader over a PLP stream.
#[derive(Debug)]
pub struct PlpReader<R> {
    inner: R,
    declared: Option<u64>,
    received: u64,
    max_size: u64,
    chunk_remaining: u32,
    finished: bool,
    chunks: u64,
}

impl<R: Read> PlpReader<R> {
    /// Read the PLP header from `inner`.
    ///
    /// Returns `Ok(None)` for a NULL value. A declared length above
    /// `max_size` is rejected before any payload is read.
    pub fn open(mut inner: R, max_size: u64) -> Result<Option<Self>, ProtocolError> {
        let mut header = [0u8; 8];
        read_exact(&mut inner, &mut header)?;

        let declared = match u64::from_le_bytes(header) {
            PLP_NULL => return Ok(None),
            PLP_UNKNOWN_LEN => None,
            len if len > max_size => {
                return Err(ProtocolError::LobTooLarge {
                    size: len,
                    limit: max_size,
                });
            }
            len => Some(len),
        };

        Ok(Some(Self {
            inner,
            declared,
            received: 0,
            max_size,
            chunk_remaining: 0,
            finished: false,
            chunks: 0,
        }))
    }

    /// Total length from the header, if the server announced one.
    #[must_use]
    pub fn declared_len(&self) -> Option<u64> {
        self.declared
    }

    /// Capacity to reserve for the rest of the payload, at most `cap`.
    #[must_use]
    pub fn initial_capacity(&self, cap: usize) -> usize {
        self.declared.map_or(0, |len| {
            usize::try_from(len.saturating_sub(self.received)).map_or(cap, |rest| rest.min(cap))
        })
    }

    /// Payload bytes consumed so far.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Number of wire chunks started so far.
    #[must_use]
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Whether the terminator has been read.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read up to `limit` payload bytes.
    ///
    /// Returns `Ok(None)` once the terminator has been consumed. The returned
    /// piece never spans two wire chunks.
    pub fn next_chunk(&mut self, limit: usize) -> Result<Option<Bytes>, ProtocolError> {
        if !self.fill_chunk_header()? {
            return Ok(None);
        }

        let take = (self.chunk_remaining as usize).min(limit.max(1));
        let mut buf = vec![0u8; take];
        read_exact(&mut self.inner, &mut buf)?;
        self.chunk_remaining -= take as u32;
        self.received += take as u64;

        tracing::trace!(
            bytes = take,
            received = self.received,
            declared = ?self.declared,
            "read PLP chunk"
        );

        Ok(Some(Bytes::from(buf)))
    }

    /// Drain the remaining payload into one buffer.
    ///
    /// The buffer grows as chunks arrive; the declared length only sizes the
    /// first allocation, up to [`PLP_INITIAL_CAPACITY`].
    pub fn into_bytes(mut self) -> Result<Bytes, ProtocolError> {
        let mut out = BytesMut::with_capacity(self.initial_capacity(PLP_INITIAL_CAPACITY));
        while let Some(piece) = self.next_chunk(PLP_INITIAL_CAPACITY)? {
            out.extend_from_slice(&piece);
        }
        Ok(out.freeze())
    }

    /// Consume the next chunk header if the current chunk is exhausted.
    ///
    /// Returns `false` when the stream is complete.
    fn fill_chunk_header(&mut self) -> Result<bool, ProtocolError> {
        if self.finished {
            return Ok(false);
        }

        while self.chunk_remaining == 0 {
            let mut len = [0u8; 4];
            read_exact(&mut self.inner, &mut len)?;
            let len = u32::from_le_bytes(len);

            if len == PLP_TERMINATOR {
                self.finished = true;
                if let Some(declared) = self.declared {
                    if declared != self.received {
                        return Err(ProtocolError::PlpLengthMismatch {
                            declared,
                            received: self.received,
                        });
                    }
                }
                return Ok(false);
            }

            let size = self.received + u64::from(len);
            if size > self.max_size {
                return Err(ProtocolError::LobTooLarge {
                    size,
                    limit: self.max_size,
                });
            }
            if let Some(declared) = self.declared {
                if size > declared {
                    return Err(ProtocolError::PlpLengthMismatch {
                        declared,
                        received: size,
                    });
                }
            }

            self.chunk_remaining = len;
            self.chunks += 1;
        }

        Ok(true)
    }
}

impl<R: Read> Read for PlpReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.next_chunk(buf.len()) {
            Ok(Some(piece)) => {
                buf[..piece.len()].copy_from_slice(&piece);
                Ok(piece.len())
            }
            Ok(None) => Ok(0),
            Err(ProtocolError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }
}

fn read_exact(src: &mut impl Read, buf: &mut [u8]) -> Result<(), ProtocolError> {
    src.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ProtocolError::UnexpectedEof,
        _ => ProtocolError::Io(e),
    })
}

/// Frame `payload` as a PLP stream split into `chunk_size` pieces.
///
/// `known_length` controls whether the header carries the total length or
/// the unknown-length marker.
#[must_use]
pub fn encode_plp(payload: &[u8], chunk_size: usize, known_length: bool) -> Bytes {
    let chunk_size = chunk_size.max(1);
    let pieces = payload.len().div_ceil(chunk_size);
    let mut dst = BytesMut::with_capacity(8 + payload.len() + 4 * (pieces + 1));

    dst.put_u64_le(if known_length {
        payload.len() as u64
    } else {
        PLP_UNKNOWN_LEN
    });
    for piece in payload.chunks(chunk_size) {
        dst.put_u32_le(piece.len() as u32);
        dst.put_slice(piece);
    }
    dst.put_u32_le(PLP_TERMINATOR);
    dst.freeze()
}

/// A PLP stream carrying NULL.
#[must_use]
pub fn encode_plp_null() -> Bytes {
    Bytes::copy_from_slice(&PLP_NULL.to_le_bytes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::Buf;

    const LIMIT: u64 = 1 << 30;

    #[test]
    fn test_null_stream() {
        let encoded = encode_plp_null();
        assert!(PlpReader::open(encoded.reader(), LIMIT).unwrap().is_none());
    }

    #[test]
    fn test_chunked_read() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(20_000).collect();
        let encoded = encode_plp(&payload, 8192, true);

        let mut reader = PlpReader::open(encoded.reader(), LIMIT).unwrap().unwrap();
        assert_eq!(reader.declared_len(), Some(20_000));

        let mut pieces = Vec::new();
        while let Some(piece) = reader.next_chunk(usize::MAX).unwrap() {
            pieces.push(piece);
        }
        assert_eq!(pieces.len(), 3);
        assert_eq!(reader.chunks(), 3);
        assert!(reader.is_finished());
        assert_eq!(pieces.concat(), payload);
    }

    #[test]
    fn test_unknown_length_and_small_limit() {
        let payload = b"hello, large object";
        let encoded = encode_plp(payload, 4, false);
        let mut reader = PlpReader::open(encoded.reader(), LIMIT).unwrap().unwrap();
        assert_eq!(reader.declared_len(), None);

        let first = reader.next_chunk(3).unwrap().unwrap();
        assert_eq!(&first[..], b"hel");
        let rest = reader.into_bytes().unwrap();
        assert_eq!(&rest[..], &payload[3..]);
    }

    #[test]
    fn test_empty_payload() {
        let encoded = encode_plp(b"", 16, true);
        let reader = PlpReader::open(encoded.reader(), LIMIT).unwrap().unwrap();
        assert!(reader.into_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_io_read_impl() {
        let payload = vec![7u8; 1000];
        let encoded = encode_plp(&payload, 100, true);
        let mut reader = PlpReader::open(encoded.reader(), LIMIT).unwrap().unwrap();
        let mut out = Vec::new();
        Read::read_to_end(&mut reader, &mut out).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn test_truncated_stream() {
        let encoded = encode_plp(&[1u8; 100], 50, true);
        let truncated = encoded.slice(..encoded.len() - 30);
        let reader = PlpReader::open(truncated.reader(), LIMIT).unwrap().unwrap();
        assert!(matches!(
            reader.into_bytes(),
            Err(ProtocolError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_declared_length_mismatch() {
        let mut encoded = BytesMut::new();
        encoded.put_u64_le(10);
        encoded.put_u32_le(4);
        encoded.put_slice(b"abcd");
        encoded.put_u32_le(0);
        let reader = PlpReader::open(encoded.freeze().reader(), LIMIT)
            .unwrap()
            .unwrap();
        assert!(matches!(
            reader.into_bytes(),
            Err(ProtocolError::PlpLengthMismatch {
                declared: 10,
                received: 4
            })
        ));
    }

    #[test]
    fn test_max_size_enforced() {
        let encoded = encode_plp(&[0u8; 64], 16, true);
        assert!(matches!(
            PlpReader::open(encoded.reader(), 32),
            Err(ProtocolError::LobTooLarge { size: 64, limit: 32 })
        ));

        let encoded = encode_plp(&[0u8; 64], 16, false);
        let reader = PlpReader::open(encoded.reader(), 32).unwrap().unwrap();
        assert!(matches!(
            reader.into_bytes(),
            Err(ProtocolError::LobTooLarge { size: 48, limit: 32 })
        ));
    }

    #[test]
    fn test_initial_capacity_is_capped() {
        let mut header = BytesMut::new();
        header.put_u64_le(0x7FFF_FFFF_FFFF_FFF0);
        header.put_u32_le(0);
        let reader = PlpReader::open(header.freeze().reader(), u64::MAX)
            .unwrap()
            .unwrap();
        assert_eq!(reader.initial_capacity(PLP_INITIAL_CAPACITY), PLP_INITIAL_CAPACITY);
        assert!(matches!(
            reader.into_bytes(),
            Err(ProtocolError::PlpLengthMismatch { received: 0, .. })
        ));

        let small = encode_plp(b"abc", 2, true);
        let reader = PlpReader::open(small.reader(), LIMIT).unwrap().unwrap();
        assert_eq!(reader.initial_capacity(PLP_INITIAL_CAPACITY), 3);

        let unknown = encode_plp(b"abc", 2, false);
        let reader = PlpReader::open(unknown.reader(), LIMIT).unwrap().unwrap();
        assert_eq!(reader.initial_capacity(PLP_INITIAL_CAPACITY), 0);
    }

    proptest::proptest! {
        #[test]
        fn prop_reassembles_any_chunking(
            payload in proptest::collection::vec(proptest::num::u8::ANY, 0..4096),
            chunk in 1usize..600,
            limit in 1usize..700,
            known in proptest::bool::ANY,
        ) {
            let encoded = encode_plp(&payload, chunk, known);
            let mut reader = PlpReader::open(encoded.reader(), LIMIT).unwrap().unwrap();
            let mut out = Vec::new();
            while let Some(piece) = reader.next_chunk(limit).unwrap() {
                proptest::prop_assert!(piece.len() <= limit);
                out.extend_from_slice(&piece);
            }
            proptest::prop_assert_eq!(out, payload);
        }
    }
}
