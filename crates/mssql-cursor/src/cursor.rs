//! Forward-only result cursors.
//!
//! A [`Cursor`] moves through three states:
//!
//! ```text
//! Open ──(source returns no row)──> Exhausted
//!   │                                  │
//!   └──────────(close)──────────> Closed <┘
//! ```
//!
//! Exhaustion is never an error: every fetch on an exhausted cursor returns
//! an empty result. Fetching from a closed cursor fails with
//! [`Error::CursorClosed`].
//!
//! A decode failure costs exactly the row that caused it. Rows decoded
//! earlier in the same call are returned first and the failure is reported
//! by the next fetch; the offending row is consumed, so fetching continues
//! with the row after it. Failures reported by the row source itself end
//! the result set, again after any rows already decoded are handed out.
//!
//! Cursors are `Send` but not `Sync`. Fetches take `&mut self`; sharing one
//! cursor between threads requires external synchronization.

use crate::config::Config;
use crate::converter::ConverterRegistry;
use crate::decoder::{DecodeOptions, RowDecoder};
use crate::description::Description;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::source::RowSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Exhausted,
    Closed,
}

/// A forward-only cursor over one result set.
///
/// # Example
///
/// ```rust,ignore
/// let mut cursor = conn.execute("SELECT id, shape FROM places", &[])?;
///
/// for column in cursor.description() {
///     println!("{} {:?}", column.name, column.type_code);
/// }
///
/// while let Some(row) = cursor.fetchone()? {
///     let id: i32 = row.get(0)?;
///     let shape: Option<Vec<u8>> = row.get(1)?;
/// }
/// ```
pub struct Cursor {
    description: Description,
    source: Option<Box<dyn RowSource>>,
    converters: ConverterRegistry,
    options: DecodeOptions,
    arraysize: usize,
    rowcount: u64,
    state: State,
    deferred: Option<Error>,
}

impl Cursor {
    /// Create a cursor over the rows produced by `source`.
    ///
    /// `converters` is the owning connection's registry; a snapshot of it is
    /// taken at the start of every fetch.
    pub fn new(
        description: Description,
        source: impl RowSource + 'static,
        converters: ConverterRegistry,
        config: &Config,
    ) -> Self {
        Self {
            description,
            source: Some(Box::new(source)),
            converters,
            options: DecodeOptions::from(config),
            arraysize: config.array_size.max(1),
            rowcount: 0,
            state: State::Open,
            deferred: None,
        }
    }

    /// Create a cursor for a statement that returned no result set.
    ///
    /// The cursor starts exhausted with an empty description; `rowcount`
    /// reports `rows_affected`.
    #[must_use]
    pub fn rows_affected(rows_affected: u64, config: &Config) -> Self {
        Self {
            description: Description::empty(),
            source: None,
            converters: ConverterRegistry::new(),
            options: DecodeOptions::from(config),
            arraysize: config.array_size.max(1),
            rowcount: rows_affected,
            state: State::Exhausted,
            deferred: None,
        }
    }

    /// Column descriptors of the result set.
    ///
    /// Available before the first fetch and unchanged afterwards. Empty for
    /// statements that produced no result set.
    #[must_use]
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Fetch the next row, or `None` once the result set is exhausted.
    pub fn fetchone(&mut self) -> Result<Option<Row>> {
        Ok(self.fetch(Some(1))?.pop())
    }

    /// Fetch up to `size` rows, defaulting to [`arraysize`](Self::arraysize).
    ///
    /// Returns fewer rows (possibly none) when the result set runs out.
    pub fn fetchmany(&mut self, size: impl Into<Option<usize>>) -> Result<Vec<Row>> {
        let size = size.into().unwrap_or(self.arraysize);
        self.fetch(Some(size))
    }

    /// Fetch every remaining row.
    pub fn fetchall(&mut self) -> Result<Vec<Row>> {
        self.fetch(None)
    }

    /// Default number of rows returned by `fetchmany`.
    #[must_use]
    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    /// Set the default `fetchmany` size. Values below 1 are raised to 1.
    pub fn set_arraysize(&mut self, rows: usize) {
        self.arraysize = rows.max(1);
    }

    /// Rows fetched so far, or rows affected for statements without a
    /// result set.
    #[must_use]
    pub fn rowcount(&self) -> u64 {
        self.rowcount
    }

    /// Whether every row has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    /// Whether the cursor has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Close the cursor and release the row source.
    ///
    /// Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.state == State::Closed {
            return;
        }
        self.source = None;
        self.deferred = None;
        self.state = State::Closed;
        tracing::debug!(rowcount = self.rowcount, "cursor closed");
    }

    fn fetch(&mut self, limit: Option<usize>) -> Result<Vec<Row>> {
        let Self {
            description,
            source,
            converters,
            options,
            rowcount,
            state,
            deferred,
            ..
        } = self;

        if *state == State::Closed {
            return Err(Error::CursorClosed);
        }
        if let Some(err) = deferred.take() {
            return Err(err);
        }
        if *state == State::Exhausted {
            return Ok(Vec::new());
        }
        let Some(reader) = source.as_mut() else {
            *state = State::Exhausted;
            return Ok(Vec::new());
        };

        let decoder = RowDecoder::new(description, converters.snapshot(), *options);
        let mut rows = Vec::with_capacity(limit.unwrap_or(0).min(1024));

        let mut failure = None;
        let mut exhausted = false;

        while limit.is_none_or(|n| rows.len() < n) {
            match reader.next_row(description) {
                Ok(Some(raw)) => match decoder.decode_row(raw) {
                    Ok(row) => rows.push(row),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                },
                Ok(None) => {
                    exhausted = true;
                    break;
                }
                Err(e) => {
                    failure = Some(e);
                    exhausted = true;
                    break;
                }
            }
        }

        *rowcount += rows.len() as u64;
        tracing::trace!(rows = rows.len(), rowcount = *rowcount, "fetched rows");

        if exhausted {
            *source = None;
            *state = State::Exhausted;
            match &failure {
                None => tracing::debug!(rowcount = *rowcount, "result set exhausted"),
                Some(e) => tracing::debug!(error = %e, "row source failed"),
            }
        }

        match failure {
            Some(e) if rows.is_empty() => Err(e),
            Some(e) => {
                tracing::debug!(error = %e, delivered = rows.len(), "deferring fetch error");
                *deferred = Some(e);
                Ok(rows)
            }
            None => Ok(rows),
        }
    }
}

impl Iterator for Cursor {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != State::Open && self.deferred.is_none() {
            return None;
        }
        self.fetchone().transpose()
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("columns", &self.description.len())
            .field("state", &self.state)
            .field("rowcount", &self.rowcount)
            .field("arraysize", &self.arraysize)
            .finish_non_exhaustive()
    }
}
