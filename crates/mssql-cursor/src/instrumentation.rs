//! Tracing spans for statement execution.
//!
//! Span and attribute names follow the OpenTelemetry database semantic
//! conventions so that a `tracing-opentelemetry` layer installed by the
//! application exports them unchanged:
//!
//! - `db.system`: "mssql"
//! - `db.operation`: statement verb (SELECT, INSERT, ...)
//! - `db.statement`: SQL text with literals replaced by `?`
//! - `db.rows_affected`: recorded once the statement completes

use tracing::Span;

/// Database system identifier for MSSQL.
pub const DB_SYSTEM: &str = "mssql";

/// Longest statement text recorded on a span.
pub const MAX_STATEMENT_LEN: usize = 2048;

/// Span names for database operations.
pub mod span_names {
    /// Single statement execution.
    pub const EXECUTE: &str = "mssql.execute";
    /// Batch execution over several parameter sets.
    pub const EXECUTE_MANY: &str = "mssql.execute_many";
    /// Transaction commit.
    pub const COMMIT: &str = "mssql.commit";
    /// Transaction rollback.
    pub const ROLLBACK: &str = "mssql.rollback";
}

/// Attribute keys following OpenTelemetry semantic conventions.
pub mod attributes {
    /// Database system type.
    pub const DB_SYSTEM: &str = "db.system";
    /// SQL statement, sanitized.
    pub const DB_STATEMENT: &str = "db.statement";
    /// Database operation type.
    pub const DB_OPERATION: &str = "db.operation";
    /// Number of rows affected.
    pub const DB_ROWS_AFFECTED: &str = "db.rows_affected";
    /// Number of parameter sets in a batch.
    pub const DB_BATCH_SIZE: &str = "db.batch_size";
}

/// Span for a single statement.
#[must_use]
pub fn execute_span(sql: &str) -> Span {
    tracing::debug_span!(
        span_names::EXECUTE,
        db.system = DB_SYSTEM,
        db.operation = extract_operation(sql),
        db.statement = %sanitize_sql(sql),
        db.rows_affected = tracing::field::Empty,
    )
}

/// Span for a statement executed once per parameter set.
#[must_use]
pub fn execute_many_span(sql: &str, batch_size: usize) -> Span {
    tracing::debug_span!(
        span_names::EXECUTE_MANY,
        db.system = DB_SYSTEM,
        db.operation = extract_operation(sql),
        db.statement = %sanitize_sql(sql),
        db.batch_size = batch_size,
        db.rows_affected = tracing::field::Empty,
    )
}

/// Span for commit or rollback.
#[must_use]
pub fn transaction_span(commit: bool) -> Span {
    if commit {
        tracing::debug_span!(span_names::COMMIT, db.system = DB_SYSTEM)
    } else {
        tracing::debug_span!(span_names::ROLLBACK, db.system = DB_SYSTEM)
    }
}

/// Replace string and numeric literals with `?` and cap the length.
#[must_use]
pub fn sanitize_sql(sql: &str) -> String {
    let mut result = String::with_capacity(sql.len().min(MAX_STATEMENT_LEN));
    let mut chars = sql.chars().peekable();
    let mut quote = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                // doubled quote is an escape
                if chars.peek() == Some(&q) {
                    chars.next();
                    continue;
                }
                quote = None;
                result.push('?');
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                if result.ends_with('N') && !ends_with_word(&result[..result.len() - 1]) {
                    result.pop();
                }
                quote = Some(c);
            }
            c if c.is_ascii_digit() && !ends_with_word(&result) => {
                while chars
                    .peek()
                    .is_some_and(|ch| ch.is_ascii_digit() || *ch == '.')
                {
                    chars.next();
                }
                result.push('?');
            }
            _ => result.push(c),
        }
    }

    if quote.is_some() {
        result.push('?');
    }

    truncate(result, MAX_STATEMENT_LEN)
}

fn ends_with_word(s: &str) -> bool {
    s.ends_with(|ch: char| ch.is_alphanumeric() || ch == '_' || ch == '@')
}

fn truncate(mut s: String, max_len: usize) -> String {
    if s.len() <= max_len {
        return s;
    }
    let mut cut = max_len.saturating_sub(3);
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    s.push_str("...");
    s
}

/// Extract the operation type from a SQL statement.
#[must_use]
pub fn extract_operation(sql: &str) -> &'static str {
    let verb = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();

    match verb.as_str() {
        "SELECT" | "WITH" => "SELECT",
        "INSERT" => "INSERT",
        "UPDATE" => "UPDATE",
        "DELETE" => "DELETE",
        "MERGE" => "MERGE",
        "EXEC" | "EXECUTE" => "EXECUTE",
        "BEGIN" => "BEGIN",
        "COMMIT" => "COMMIT",
        "ROLLBACK" => "ROLLBACK",
        "CREATE" => "CREATE",
        "ALTER" => "ALTER",
        "DROP" => "DROP",
        "TRUNCATE" => "TRUNCATE",
        "DECLARE" | "SET" => "DECLARE",
        _ => "OTHER",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_name(make: impl FnOnce() -> Span) -> Option<&'static str> {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || make().metadata().map(|m| m.name()))
    }

    #[test]
    fn test_span_names() {
        assert_eq!(span_name(|| execute_span("SELECT 1")), Some(span_names::EXECUTE));
        assert_eq!(
            span_name(|| execute_many_span("INSERT INTO t VALUES (@p1)", 3)),
            Some(span_names::EXECUTE_MANY)
        );
        assert_eq!(span_name(|| transaction_span(true)), Some(span_names::COMMIT));
        assert_eq!(span_name(|| transaction_span(false)), Some(span_names::ROLLBACK));
    }

    #[test]
    fn test_extract_operation() {
        assert_eq!(extract_operation("SELECT * FROM t"), "SELECT");
        assert_eq!(extract_operation("  select 1"), "SELECT");
        assert_eq!(extract_operation("with c as (select 1) select * from c"), "SELECT");
        assert_eq!(extract_operation("INSERT INTO t VALUES (1)"), "INSERT");
        assert_eq!(extract_operation("EXEC sp_who"), "EXECUTE");
        assert_eq!(extract_operation("DROP TABLE t"), "DROP");
        assert_eq!(extract_operation(""), "OTHER");
        assert_eq!(extract_operation("SELECTED"), "OTHER");
    }

    #[test]
    fn test_sanitize_literals() {
        assert_eq!(
            sanitize_sql("INSERT INTO g VALUES (geography::STGeomFromText('POINT(-122.349 47.651)', 4326))"),
            "INSERT INTO g VALUES (geography::STGeomFromText(?, ?))"
        );
        assert_eq!(
            sanitize_sql("SELECT * FROM t WHERE name = N'O''Brien' AND id = @p1"),
            "SELECT * FROM t WHERE name = ? AND id = @p1"
        );
        assert_eq!(sanitize_sql("SELECT col1 FROM t2"), "SELECT col1 FROM t2");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = format!("SELECT {}", "x".repeat(5000));
        let out = sanitize_sql(&long);
        assert_eq!(out.len(), MAX_STATEMENT_LEN);
        assert!(out.ends_with("..."));
    }
}
