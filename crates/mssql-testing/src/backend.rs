//! Scripted backend for cursor tests.
//!
//! [`ScriptedBackend`] implements [`Backend`] without a server. Statements
//! are matched against rules in registration order and answered with a
//! [`MockResponse`]. Result rows are encoded to real TDS cells when they are
//! fetched, so every value travels through the same decode path as server
//! data:
//!
//! - `Inline` columns receive length-prefixed cells from `encode_cell`
//! - `Streamed` columns receive PLP streams split into
//!   [`with_lob_chunk_size`](ScriptedBackend::with_lob_chunk_size) chunks
//! - NULL values arrive as null indicators
//!
//! ## Example
//!
//! ```rust,ignore
//! use mssql_testing::{MockColumn, MockResponse, ScriptedBackend};
//!
//! let backend = ScriptedBackend::new()
//!     .with_prefix(
//!         "SELECT",
//!         MockResponse::rows(
//!             vec![MockColumn::int("id"), MockColumn::nvarchar("name", 50)],
//!             vec![vec![1.into(), "Alice".into()]],
//!         ),
//!     )
//!     .with_default_response(MockResponse::affected(1));
//! let mut conn = Connection::new(backend, Config::default())?;
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use mssql_cursor::{
    Backend, ColumnDescriptor, Description, Error, ExecuteResult, FetchMode, LobStream, Param,
    RawCell, RawRow, Result, RowSource,
};
use mssql_types::{SqlValue, encode_cell, encode_payload};
use tds_protocol::{ColMetaData, ColumnData, MAX_LENGTH_PLP, TypeId, TypeInfo, UdtInfo, encode_plp};

/// Handler computing a response from the statement and its parameters.
pub type Handler = Arc<dyn Fn(&str, &[Param]) -> MockResponse + Send + Sync>;

/// Hook observing transaction ends.
pub type TransactionHook = Arc<dyn Fn(TransactionEnd) + Send + Sync>;

/// Mock response configuration.
#[derive(Clone)]
pub enum MockResponse {
    /// Return a result set.
    Rows {
        /// Column definitions.
        columns: Vec<MockColumn>,
        /// Row data in column order.
        rows: Vec<Vec<SqlValue>>,
    },

    /// Return a rows affected count (for INSERT/UPDATE/DELETE).
    Affected(u64),

    /// Reject the statement.
    Error {
        /// Error number.
        number: i32,
        /// Severity class.
        class: u8,
        /// Error message.
        message: String,
    },

    /// Compute the response when the statement runs.
    Custom(Handler),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows { columns, rows } => f
                .debug_struct("Rows")
                .field("columns", columns)
                .field("rows", &rows.len())
                .finish(),
            Self::Affected(n) => f.debug_tuple("Affected").field(n).finish(),
            Self::Error {
                number,
                class,
                message,
            } => f
                .debug_struct("Error")
                .field("number", number)
                .field("class", class)
                .field("message", message)
                .finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<fn>").finish(),
        }
    }
}

impl MockResponse {
    /// Create a result set response.
    pub fn rows(columns: Vec<MockColumn>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self::Rows { columns, rows }
    }

    /// Create a one-row, one-column result set.
    pub fn scalar(column: MockColumn, value: impl Into<SqlValue>) -> Self {
        Self::rows(vec![column], vec![vec![value.into()]])
    }

    /// Create an empty result response.
    pub fn empty() -> Self {
        Self::Affected(0)
    }

    /// Create a rows affected response.
    pub fn affected(count: u64) -> Self {
        Self::Affected(count)
    }

    /// Create a user error (class 16) response.
    pub fn error(number: i32, message: impl Into<String>) -> Self {
        Self::Error {
            number,
            class: 16,
            message: message.into(),
        }
    }

    /// Create a response computed per execution.
    pub fn custom<F>(handler: F) -> Self
    where
        F: Fn(&str, &[Param]) -> MockResponse + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(handler))
    }
}

/// Mock column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct MockColumn {
    /// Column name.
    pub name: String,
    /// Wire type.
    pub type_id: TypeId,
    /// Length, precision, scale and UDT names.
    pub type_info: TypeInfo,
    /// Whether the column is nullable.
    pub nullable: bool,
}

impl MockColumn {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, type_id: TypeId) -> Self {
        Self {
            name: name.into(),
            type_id,
            type_info: TypeInfo::default(),
            nullable: true,
        }
    }

    /// Create an INT column.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, TypeId::IntN).with_max_length(4)
    }

    /// Create a BIGINT column.
    pub fn bigint(name: impl Into<String>) -> Self {
        Self::new(name, TypeId::IntN).with_max_length(8)
    }

    /// Create a BIT column.
    pub fn bit(name: impl Into<String>) -> Self {
        Self::new(name, TypeId::BitN).with_max_length(1)
    }

    /// Create a FLOAT column.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, TypeId::FloatN).with_max_length(8)
    }

    /// Create a DECIMAL(p, s) column.
    pub fn decimal(name: impl Into<String>, precision: u8, scale: u8) -> Self {
        let mut column = Self::new(name, TypeId::DecimalN).with_max_length(17);
        column.type_info.precision = Some(precision);
        column.type_info.scale = Some(scale);
        column
    }

    /// Create an NVARCHAR(n) column.
    pub fn nvarchar(name: impl Into<String>, max_chars: u32) -> Self {
        Self::new(name, TypeId::NVarChar).with_max_length(max_chars * 2)
    }

    /// Create an NVARCHAR(MAX) column.
    pub fn nvarchar_max(name: impl Into<String>) -> Self {
        Self::new(name, TypeId::NVarChar).with_max_length(MAX_LENGTH_PLP)
    }

    /// Create a VARBINARY(n) column.
    pub fn varbinary(name: impl Into<String>, max_len: u32) -> Self {
        Self::new(name, TypeId::BigVarBinary).with_max_length(max_len)
    }

    /// Create a VARBINARY(MAX) column.
    pub fn varbinary_max(name: impl Into<String>) -> Self {
        Self::new(name, TypeId::BigVarBinary).with_max_length(MAX_LENGTH_PLP)
    }

    /// Create a DATE column.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, TypeId::Date)
    }

    /// Create a TIME(s) column.
    pub fn time(name: impl Into<String>, scale: u8) -> Self {
        Self::new(name, TypeId::Time).with_scale(scale)
    }

    /// Create a DATETIME column.
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, TypeId::DateTimeN).with_max_length(8)
    }

    /// Create a DATETIME2(s) column.
    pub fn datetime2(name: impl Into<String>, scale: u8) -> Self {
        Self::new(name, TypeId::DateTime2).with_scale(scale)
    }

    /// Create a DATETIMEOFFSET(s) column.
    pub fn datetimeoffset(name: impl Into<String>, scale: u8) -> Self {
        Self::new(name, TypeId::DateTimeOffset).with_scale(scale)
    }

    /// Create a CLR UDT column (`geography`, `geometry`, `hierarchyid`).
    ///
    /// Spatial types are declared `MAX` by the server; `hierarchyid` is
    /// declared with a fixed 892-byte limit.
    pub fn udt(name: impl Into<String>, type_name: &str) -> Self {
        let max_length = if type_name.eq_ignore_ascii_case("hierarchyid") {
            892
        } else {
            MAX_LENGTH_PLP
        };
        let mut column = Self::new(name, TypeId::Udt).with_max_length(max_length);
        column.type_info.udt = Some(UdtInfo {
            db_name: String::new(),
            schema_name: "sys".into(),
            type_name: type_name.into(),
            assembly_qualified_name: format!(
                "Microsoft.SqlServer.Types.Sql{type_name}, Microsoft.SqlServer.Types"
            ),
        });
        column
    }

    /// Set the maximum length.
    #[must_use]
    pub fn with_max_length(mut self, len: u32) -> Self {
        self.type_info.max_length = Some(len);
        self
    }

    /// Set the fractional seconds scale.
    #[must_use]
    pub fn with_scale(mut self, scale: u8) -> Self {
        self.type_info.scale = Some(scale);
        self
    }

    /// Set nullable flag.
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// The column as a COLMETADATA record.
    #[must_use]
    pub fn to_column_data(&self) -> ColumnData {
        ColumnData::new(self.name.clone(), self.type_id, self.type_info.clone())
            .with_nullable(self.nullable)
    }
}

/// How a transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEnd {
    /// `commit` was called.
    Commit,
    /// `rollback` was called.
    Rollback,
}

/// A statement the backend received.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    /// SQL text.
    pub sql: String,
    /// Bound parameters.
    pub params: Vec<Param>,
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact(String),
    Prefix(String),
    Contains(String),
}

impl Matcher {
    fn matches(&self, sql: &str) -> bool {
        let sql = sql.trim().to_lowercase();
        match self {
            Self::Exact(s) => sql == *s,
            Self::Prefix(s) => sql.starts_with(s.as_str()),
            Self::Contains(s) => sql.contains(s.as_str()),
        }
    }
}

/// In-process [`Backend`] answering statements from a script.
pub struct ScriptedBackend {
    rules: Vec<(Matcher, MockResponse)>,
    default_response: Option<MockResponse>,
    lob_chunk_size: usize,
    plp_known_length: bool,
    transaction_hook: Option<TransactionHook>,
    statements: Vec<ExecutedStatement>,
    commits: usize,
    rollbacks: usize,
    closed: bool,
}

impl ScriptedBackend {
    /// Create a backend with no rules.
    ///
    /// Unmatched statements report zero rows affected.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_response: None,
            lob_chunk_size: 8000,
            plp_known_length: true,
            transaction_hook: None,
            statements: Vec::new(),
            commits: 0,
            rollbacks: 0,
            closed: false,
        }
    }

    /// Answer statements equal to `sql` (case-insensitive, trimmed).
    #[must_use]
    pub fn with_response(mut self, sql: &str, response: MockResponse) -> Self {
        self.rules
            .push((Matcher::Exact(sql.trim().to_lowercase()), response));
        self
    }

    /// Answer statements starting with `prefix` (case-insensitive).
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str, response: MockResponse) -> Self {
        self.rules
            .push((Matcher::Prefix(prefix.trim().to_lowercase()), response));
        self
    }

    /// Answer statements containing `needle` (case-insensitive).
    #[must_use]
    pub fn with_contains(mut self, needle: &str, response: MockResponse) -> Self {
        self.rules
            .push((Matcher::Contains(needle.to_lowercase()), response));
        self
    }

    /// Answer statements no rule matches.
    #[must_use]
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Split streamed values into chunks of at most `bytes`.
    #[must_use]
    pub fn with_lob_chunk_size(mut self, bytes: usize) -> Self {
        self.lob_chunk_size = bytes.max(1);
        self
    }

    /// Send streamed values with an unknown total length.
    #[must_use]
    pub fn with_unknown_lob_length(mut self) -> Self {
        self.plp_known_length = false;
        self
    }

    /// Observe commits and rollbacks.
    #[must_use]
    pub fn with_transaction_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(TransactionEnd) + Send + Sync + 'static,
    {
        self.transaction_hook = Some(Arc::new(hook));
        self
    }

    /// Statements executed so far, in order.
    #[must_use]
    pub fn statements(&self) -> &[ExecutedStatement] {
        &self.statements
    }

    /// The most recent statement.
    #[must_use]
    pub fn last_statement(&self) -> Option<&ExecutedStatement> {
        self.statements.last()
    }

    /// Number of commits.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Number of rollbacks.
    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    /// Whether the backend was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn find_response(&self, sql: &str, params: &[Param]) -> MockResponse {
        let mut response = self
            .rules
            .iter()
            .find(|(matcher, _)| matcher.matches(sql))
            .map(|(_, response)| response.clone())
            .or_else(|| self.default_response.clone())
            .unwrap_or_else(MockResponse::empty);

        while let MockResponse::Custom(handler) = response {
            response = handler(sql, params);
        }
        response
    }

    fn end_transaction(&mut self, end: TransactionEnd) {
        match end {
            TransactionEnd::Commit => self.commits += 1,
            TransactionEnd::Rollback => self.rollbacks += 1,
        }
        if let Some(hook) = &self.transaction_hook {
            hook(end);
        }
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScriptedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedBackend")
            .field("rules", &self.rules.len())
            .field("statements", &self.statements.len())
            .field("commits", &self.commits)
            .field("rollbacks", &self.rollbacks)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Backend for ScriptedBackend {
    fn execute(&mut self, sql: &str, params: &[Param]) -> Result<ExecuteResult> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        self.statements.push(ExecutedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        match self.find_response(sql, params) {
            MockResponse::Rows { columns, rows } => {
                if let Some(bad) = rows.iter().find(|row| row.len() != columns.len()) {
                    return Err(Error::Transport(format!(
                        "scripted row has {} values, result set has {} columns",
                        bad.len(),
                        columns.len()
                    )));
                }
                tracing::trace!(sql = sql, rows = rows.len(), "scripted result set");

                let metadata = ColMetaData {
                    columns: columns.iter().map(MockColumn::to_column_data).collect(),
                };
                Ok(ExecuteResult::ResultSet {
                    metadata,
                    source: Box::new(ScriptedRows {
                        rows: rows.into(),
                        lob_chunk_size: self.lob_chunk_size,
                        plp_known_length: self.plp_known_length,
                    }),
                })
            }
            MockResponse::Affected(n) => Ok(ExecuteResult::RowsAffected(n)),
            MockResponse::Error {
                number,
                class,
                message,
            } => Err(Error::database(number, class, message)),
            MockResponse::Custom(_) => Ok(ExecuteResult::RowsAffected(0)),
        }
    }

    fn commit(&mut self) -> Result<()> {
        self.end_transaction(TransactionEnd::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.end_transaction(TransactionEnd::Rollback);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Rows of one scripted result set, encoded on demand.
struct ScriptedRows {
    rows: VecDeque<Vec<SqlValue>>,
    lob_chunk_size: usize,
    plp_known_length: bool,
}

impl ScriptedRows {
    fn encode(&self, value: &SqlValue, column: &ColumnDescriptor) -> Result<RawCell> {
        if value.is_null() {
            return Ok(RawCell::Null);
        }

        match column.fetch_mode {
            FetchMode::Inline => Ok(RawCell::Bytes(encode_cell(
                value,
                column.type_id,
                &column.type_info,
            )?)),
            FetchMode::Streamed => {
                let Some(payload) = encode_payload(value, column.type_id)? else {
                    return Ok(RawCell::Null);
                };
                let framed = encode_plp(&payload, self.lob_chunk_size, self.plp_known_length);
                Ok(RawCell::Stream(LobStream::from_bytes(framed)))
            }
        }
    }
}

impl RowSource for ScriptedRows {
    fn next_row(&mut self, columns: &Description) -> Result<Option<RawRow>> {
        let Some(values) = self.rows.pop_front() else {
            return Ok(None);
        };

        values
            .iter()
            .zip(columns)
            .map(|(value, column)| self.encode(value, column))
            .collect::<Result<RawRow>>()
            .map(Some)
    }
}
