//! Connection facade.
//!
//! [`Connection`] owns an execution [`Backend`] and the connection-scoped
//! [`ConverterRegistry`]. Every cursor it creates shares that registry, so
//! converters added or removed on the connection apply to the next fetch of
//! any open cursor.

use mssql_types::{SqlType, SqlValue, ToSql};
use tds_protocol::ColMetaData;

use crate::config::Config;
use crate::converter::{ConverterRegistry, OutputConverter};
use crate::cursor::Cursor;
use crate::description::Description;
use crate::error::{Error, Result};
use crate::instrumentation;
use crate::source::RowSource;

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Driver type id the value is bound as.
    pub sql_type: SqlType,
    /// Parameter value.
    pub value: SqlValue,
}

impl Param {
    /// Create a parameter.
    pub fn new(sql_type: SqlType, value: impl Into<SqlValue>) -> Self {
        Self {
            sql_type,
            value: value.into(),
        }
    }

    /// Bind a Rust value.
    pub fn bind(value: &dyn ToSql) -> Result<Self> {
        Ok(Self {
            sql_type: value.sql_type(),
            value: value.to_sql()?,
        })
    }
}

/// Outcome of one statement on the backend.
pub enum ExecuteResult {
    /// The statement produced a result set.
    ResultSet {
        /// Column metadata as sent by the server.
        metadata: ColMetaData,
        /// Rows of the result set.
        source: Box<dyn RowSource>,
    },
    /// The statement produced no result set.
    RowsAffected(u64),
}

impl std::fmt::Debug for ExecuteResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResultSet { metadata, .. } => f
                .debug_struct("ResultSet")
                .field("columns", &metadata.columns.len())
                .finish_non_exhaustive(),
            Self::RowsAffected(n) => f.debug_tuple("RowsAffected").field(n).finish(),
        }
    }
}

/// Statement execution and transaction control.
///
/// Implemented by the transport. Server rejections are returned as
/// [`Error::Database`] with the server's number, class and message intact.
pub trait Backend: Send {
    /// Execute one statement with bound parameters.
    fn execute(&mut self, sql: &str, params: &[Param]) -> Result<ExecuteResult>;

    /// Commit the current transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Release transport resources.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A database connection.
///
/// # Example
///
/// ```rust,ignore
/// use mssql_cursor::{Connection, Config};
/// use mssql_types::SqlType;
///
/// let mut conn = Connection::new(backend, Config::default())?;
///
/// // Render hierarchyid and geography columns as hex instead of raw bytes
/// conn.add_output_converter(SqlType::SsUdt, |v| match v.as_bytes() {
///     Some(b) => SqlValue::String(hex(b)),
///     None => v,
/// });
///
/// let mut cursor = conn.execute("SELECT node FROM org WHERE id = @p1", &[&42i32])?;
/// let rows = cursor.fetchall()?;
/// ```
pub struct Connection<B: Backend> {
    backend: B,
    config: Config,
    converters: ConverterRegistry,
    closed: bool,
}

impl<B: Backend> Connection<B> {
    /// Wrap a backend.
    ///
    /// Fails with [`Error::Config`] when `config` is invalid.
    pub fn new(backend: B, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            config,
            converters: ConverterRegistry::new(),
            closed: false,
        })
    }

    /// Execute a statement and return a cursor over its result.
    ///
    /// Statements without a result set yield an exhausted cursor whose
    /// `rowcount` is the number of rows affected.
    pub fn execute(&mut self, sql: &str, params: &[&dyn ToSql]) -> Result<Cursor> {
        self.ensure_open()?;
        let span = instrumentation::execute_span(sql);
        let _enter = span.enter();

        let params = bind_all(params)?;
        tracing::debug!(params_count = params.len(), "executing statement");

        let result = self
            .backend
            .execute(sql, &params)
            .inspect_err(|e| tracing::debug!(error = %e, "statement failed"))?;

        match result {
            ExecuteResult::ResultSet { metadata, source } => {
                let description =
                    Description::from_metadata(&metadata, self.config.inline_threshold)?;
                Ok(Cursor::new(
                    description,
                    source,
                    self.converters.clone(),
                    &self.config,
                ))
            }
            ExecuteResult::RowsAffected(rows) => {
                span.record(instrumentation::attributes::DB_ROWS_AFFECTED, rows);
                Ok(Cursor::rows_affected(rows, &self.config))
            }
        }
    }

    /// Execute a statement once per parameter set.
    ///
    /// Returns the total number of rows affected. Result sets produced by
    /// individual executions are discarded. The first failure stops the
    /// batch; earlier executions are not undone.
    pub fn execute_many(&mut self, sql: &str, param_sets: &[&[&dyn ToSql]]) -> Result<u64> {
        self.ensure_open()?;
        let span = instrumentation::execute_many_span(sql, param_sets.len());
        let _enter = span.enter();

        let mut total = 0u64;
        for (index, params) in param_sets.iter().enumerate() {
            let params = bind_all(params)?;
            let result = self.backend.execute(sql, &params).inspect_err(|e| {
                tracing::debug!(set = index, error = %e, "batch execution failed");
            })?;
            if let ExecuteResult::RowsAffected(rows) = result {
                total += rows;
            }
        }

        span.record(instrumentation::attributes::DB_ROWS_AFFECTED, total);
        tracing::debug!(sets = param_sets.len(), rows_affected = total, "batch complete");
        Ok(total)
    }

    /// Register an output converter for `sql_type`, replacing any previous
    /// one.
    pub fn add_output_converter<F>(&self, sql_type: SqlType, converter: F)
    where
        F: Fn(SqlValue) -> SqlValue + Send + Sync + 'static,
    {
        self.converters.register(sql_type, converter);
    }

    /// Remove the output converter for `sql_type`. No-op when none is set.
    pub fn remove_output_converter(&self, sql_type: SqlType) {
        self.converters.unregister(sql_type);
    }

    /// Converter currently registered for `sql_type`.
    #[must_use]
    pub fn get_output_converter(&self, sql_type: SqlType) -> Option<OutputConverter> {
        self.converters.lookup(sql_type)
    }

    /// Remove every output converter.
    pub fn clear_output_converters(&self) {
        self.converters.clear();
    }

    /// Commit the current transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        let _enter = instrumentation::transaction_span(true).entered();
        self.backend.commit()?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    /// Roll back the current transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        let _enter = instrumentation::transaction_span(false).entered();
        self.backend.rollback()?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    /// Close the connection. Closing twice is a no-op.
    ///
    /// Cursors already handed out keep their row sources.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        tracing::debug!("closing connection");
        self.backend.close()
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Connection configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the underlying backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::ConnectionClosed)
        } else {
            Ok(())
        }
    }
}

impl<B: Backend + std::fmt::Debug> std::fmt::Debug for Connection<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("backend", &self.backend)
            .field("config", &self.config)
            .field("converters", &self.converters)
            .field("closed", &self.closed)
            .finish()
    }
}

fn bind_all(params: &[&dyn ToSql]) -> Result<Vec<Param>> {
    params.iter().map(|p| Param::bind(*p)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::source::{RawCell, RawRow, VecRowSource};
    use mssql_types::encode_cell;
    use tds_protocol::{ColumnData, TypeId, TypeInfo};

    /// Echoes the first parameter back as a one-row result set.
    #[derive(Debug, Default)]
    struct EchoBackend {
        seen: Vec<(String, Vec<Param>)>,
        commits: usize,
        rollbacks: usize,
        closed: bool,
    }

    fn int_info() -> TypeInfo {
        TypeInfo {
            max_length: Some(4),
            ..Default::default()
        }
    }

    impl Backend for EchoBackend {
        fn execute(&mut self, sql: &str, params: &[Param]) -> Result<ExecuteResult> {
            self.seen.push((sql.to_string(), params.to_vec()));
            if sql.starts_with("BAD") {
                return Err(Error::database(102, 15, "Incorrect syntax near 'BAD'."));
            }
            if !sql.starts_with("SELECT") {
                return Ok(ExecuteResult::RowsAffected(params.len() as u64));
            }

            let value = params.first().map_or(SqlValue::Null, |p| p.value.clone());
            let cell = match value {
                SqlValue::Null => RawCell::Null,
                v => RawCell::Bytes(encode_cell(&v, TypeId::IntN, &int_info())?),
            };
            Ok(ExecuteResult::ResultSet {
                metadata: ColMetaData {
                    columns: vec![ColumnData::new("v", TypeId::IntN, int_info())],
                },
                source: Box::new(VecRowSource::new([RawRow::new(vec![cell])])),
            })
        }

        fn commit(&mut self) -> Result<()> {
            self.commits += 1;
            Ok(())
        }

        fn rollback(&mut self) -> Result<()> {
            self.rollbacks += 1;
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn connection() -> Connection<EchoBackend> {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .try_init();
        Connection::new(EchoBackend::default(), Config::default()).unwrap()
    }

    #[test]
    fn test_execute_binds_params() {
        let mut conn = connection();
        let mut cursor = conn.execute("SELECT @p1", &[&41i32]).unwrap();
        assert_eq!(cursor.description().len(), 1);
        assert_eq!(cursor.fetchone().unwrap().unwrap().get::<i32>(0).unwrap(), 41);

        let (sql, params) = &conn.backend().seen[0];
        assert_eq!(sql, "SELECT @p1");
        assert_eq!(params[0], Param::new(SqlType::Integer, 41i32));
    }

    #[test]
    fn test_null_param_type() {
        let mut conn = connection();
        let none: Option<i32> = None;
        let mut cursor = conn.execute("SELECT @p1", &[&none]).unwrap();
        assert!(cursor.fetchone().unwrap().unwrap().is_null(0));
        assert_eq!(conn.backend().seen[0].1[0].sql_type, SqlType::Integer);
    }

    #[test]
    fn test_rows_affected_and_execute_many() {
        let mut conn = connection();
        let cursor = conn.execute("UPDATE t SET a = @p1", &[&1i32]).unwrap();
        assert_eq!(cursor.rowcount(), 1);
        assert!(cursor.description().is_empty());

        let total = conn
            .execute_many("INSERT INTO t VALUES (@p1, @p2)", &[&[&1i32, &"a"], &[&2i32, &"b"]])
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(conn.execute_many("INSERT", &[]).unwrap(), 0);
    }

    #[test]
    fn test_server_error_surfaces_verbatim() {
        let mut conn = connection();
        let err = conn.execute("BAD SQL", &[]).unwrap_err();
        assert!(err.is_database_error());
        assert!(err.is_server_error(102));
        assert!(err.to_string().contains("Incorrect syntax"));

        conn.rollback().unwrap();
        assert_eq!(conn.backend().rollbacks, 1);
        assert!(conn.execute("SELECT @p1", &[&1i32]).is_ok());
    }

    #[test]
    fn test_converters_are_connection_scoped() {
        let mut a = connection();
        let mut b = connection();
        a.add_output_converter(SqlType::Integer, |_| SqlValue::Int(0));
        assert!(a.get_output_converter(SqlType::Integer).is_some());

        let row = a.execute("SELECT @p1", &[&5i32]).unwrap().fetchone().unwrap().unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 0);
        let row = b.execute("SELECT @p1", &[&5i32]).unwrap().fetchone().unwrap().unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 5);

        a.remove_output_converter(SqlType::Integer);
        a.remove_output_converter(SqlType::Integer);
        a.add_output_converter(SqlType::SsUdt, |v| v);
        a.clear_output_converters();
        assert!(a.get_output_converter(SqlType::SsUdt).is_none());
    }

    #[test]
    fn test_closed_connection() {
        let mut conn = connection();
        conn.commit().unwrap();
        conn.close().unwrap();
        conn.close().unwrap();
        assert!(conn.backend().closed);
        assert!(matches!(conn.execute("SELECT 1", &[]), Err(Error::ConnectionClosed)));
        assert!(matches!(conn.commit(), Err(Error::ConnectionClosed)));
        assert!(matches!(conn.execute_many("X", &[]), Err(Error::ConnectionClosed)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config::default().array_size(0);
        assert!(matches!(
            Connection::new(EchoBackend::default(), config),
            Err(Error::Config(_))
        ));
    }
}
