//! Raw row input from the transport.
//!
//! The execution layer hands the cursor a [`RowSource`]. Each call yields
//! one row of undecoded [`RawCell`]s, framed according to the column's
//! [`FetchMode`](crate::FetchMode):
//!
//! | Fetch mode | Cell | Contents |
//! |------------|------|----------|
//! | any | `Null` | null indicator set, no bytes |
//! | `Inline` | `Bytes` | the length-prefixed wire cell |
//! | `Streamed` | `Bytes` | a complete PLP stream in memory |
//! | `Streamed` | `Stream` | a PLP stream read on demand |

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read};

use bytes::Bytes;

use crate::description::Description;
use crate::error::Result;

/// Blocking reader over a PLP-framed large value.
pub struct LobStream {
    inner: Box<dyn Read + Send>,
}

impl LobStream {
    /// Wrap a blocking reader.
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: Box::new(reader),
        }
    }

    /// Stream over bytes already in memory.
    #[must_use]
    pub fn from_bytes(data: Bytes) -> Self {
        Self::new(io::Cursor::new(data))
    }
}

impl Read for LobStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl fmt::Debug for LobStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LobStream").finish_non_exhaustive()
    }
}

/// The undecoded representation of one cell.
#[derive(Debug)]
pub enum RawCell {
    /// Null indicator.
    Null,
    /// Framed bytes delivered in one buffer.
    Bytes(Bytes),
    /// PLP stream read chunk by chunk.
    Stream(LobStream),
}

impl RawCell {
    /// Whether the null indicator is set.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<Bytes> for RawCell {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<LobStream> for RawCell {
    fn from(stream: LobStream) -> Self {
        Self::Stream(stream)
    }
}

/// One row of raw cells in column order.
#[derive(Debug, Default)]
pub struct RawRow {
    cells: Vec<RawCell>,
}

impl RawRow {
    /// Create a row from cells in column order.
    #[must_use]
    pub fn new(cells: Vec<RawCell>) -> Self {
        Self { cells }
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in column order.
    #[must_use]
    pub fn cells(&self) -> &[RawCell] {
        &self.cells
    }

    /// Take the cells.
    #[must_use]
    pub fn into_cells(self) -> Vec<RawCell> {
        self.cells
    }
}

impl From<Vec<RawCell>> for RawRow {
    fn from(cells: Vec<RawCell>) -> Self {
        Self::new(cells)
    }
}

impl FromIterator<RawCell> for RawRow {
    fn from_iter<I: IntoIterator<Item = RawCell>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Producer of raw rows for one result set.
///
/// Implemented by the transport. `next_row` may block while the server
/// sends data; retrying transport failures is the implementor's concern.
pub trait RowSource: Send {
    /// Read the next row, or `None` once the result set is complete.
    ///
    /// `columns` is the description of the result set, so the transport can
    /// frame each cell per the column's fetch mode.
    fn next_row(&mut self, columns: &Description) -> Result<Option<RawRow>>;
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn next_row(&mut self, columns: &Description) -> Result<Option<RawRow>> {
        (**self).next_row(columns)
    }
}

/// A result set already buffered in memory.
#[derive(Debug, Default)]
pub struct VecRowSource {
    rows: VecDeque<RawRow>,
}

impl VecRowSource {
    /// Create a source yielding `rows` in order.
    pub fn new(rows: impl IntoIterator<Item = RawRow>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }

    /// Rows not yet yielded.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowSource for VecRowSource {
    fn next_row(&mut self, _columns: &Description) -> Result<Option<RawRow>> {
        Ok(self.rows.pop_front())
    }
}
