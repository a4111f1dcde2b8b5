//! SQLite connection implementation

use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, OpenFlags, params_from_iter};
use std::path::Path;
use std::time::{Duration, Instant};
use tabula_core::{ColumnMeta, Connection, QueryResult, Result, Row, TabulaError, Value};

/// SQLite connection wrapper
pub struct SqliteConnection {
    conn: Mutex<Option<RusqliteConnection>>,
    path: String,
}

impl SqliteConnection {
    /// Open a SQLite database, creating the file if needed.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");

        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory().map_err(|e| {
                TabulaError::ConnectionFailed(format!("failed to open in-memory database: {}", e))
            })?
        } else {
            if !path.starts_with("file:")
                && let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                return Err(TabulaError::ConnectionFailed(format!(
                    "parent directory does not exist: {}",
                    parent.display()
                )));
            }

            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;

            RusqliteConnection::open_with_flags(path, flags).map_err(|e| {
                TabulaError::ConnectionFailed(format!(
                    "failed to open SQLite database at '{}': {}",
                    path, e
                ))
            })?
        };

        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| {
                TabulaError::ConnectionFailed(format!("failed to enable foreign keys: {}", e))
            })?;

        tracing::info!(path = %path, "SQLite database connection established");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn with_conn<T>(&self, f: impl FnOnce(&RusqliteConnection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock();
        let conn = guard
            .as_ref()
            .ok_or_else(|| TabulaError::Driver("SQLite connection is closed".into()))?;
        f(conn)
    }
}

impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let rusqlite_params = values_to_rusqlite(params)?;
        let rows_affected = self.with_conn(|conn| {
            conn.execute(sql, params_from_iter(rusqlite_params.iter()))
                .map_err(|e| TabulaError::Driver(format!("failed to execute statement: {}", e)))
        })?;

        tracing::debug!(affected_rows = rows_affected, "statement executed");
        Ok(rows_affected as u64)
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = Instant::now();
        let rusqlite_params = values_to_rusqlite(params)?;

        let (columns, rows) = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| TabulaError::Driver(format!("failed to prepare query: {}", e)))?;

            // Declared types come from the CREATE TABLE text when the column maps to one
            let columns: Vec<ColumnMeta> = stmt
                .columns()
                .iter()
                .enumerate()
                .map(|(ordinal, col)| ColumnMeta {
                    name: col.name().to_string(),
                    data_type: col.decl_type().unwrap_or("DYNAMIC").to_string(),
                    ordinal,
                })
                .collect();

            let mut rows = Vec::new();
            let mut query_rows = stmt
                .query(params_from_iter(rusqlite_params.iter()))
                .map_err(|e| TabulaError::Driver(format!("failed to execute query: {}", e)))?;

            while let Some(row) = query_rows
                .next()
                .map_err(|e| TabulaError::Driver(format!("failed to fetch row: {}", e)))?
            {
                let values = (0..columns.len())
                    .map(|i| rusqlite_to_value(row, i))
                    .collect::<Result<Vec<_>>>()?;
                rows.push(Row::new(values));
            }
            Ok((columns, rows))
        })?;

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms = execution_time_ms,
            "query executed successfully"
        );
        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms,
        })
    }

    fn prepare(&self, sql: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.prepare(sql)
                .map(|_| ())
                .map_err(|e| TabulaError::Driver(format!("failed to prepare statement: {}", e)))
        })
    }

    fn is_valid(&self, _timeout: Duration) -> bool {
        // In-process database: the probe cannot block on a network round trip
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| TabulaError::Driver(e.to_string()))
        })
        .is_ok()
    }

    #[tracing::instrument(skip(self))]
    fn list_tables(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        tracing::debug!("listing tables from sqlite_master");
        let mut sql = String::from(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        );
        let mut params = Vec::new();
        if let Some(pattern) = pattern {
            sql.push_str(" AND name LIKE ?");
            params.push(Value::Text(pattern.to_string()));
        }
        sql.push_str(" ORDER BY name");

        let result = self.query(&sql, &params)?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.get(0).and_then(|v| v.as_str()).map(str::to_string))
            .collect())
    }

    fn close(&self) -> Result<()> {
        tracing::info!(path = %self.path, "closing SQLite connection");
        if let Some(conn) = self.conn.lock().take() {
            conn.close()
                .map_err(|(_, e)| TabulaError::Driver(format!("failed to close database: {}", e)))?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }
}

/// Convert our Value types to rusqlite-compatible types
fn values_to_rusqlite(values: &[Value]) -> Result<Vec<rusqlite::types::Value>> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> Result<rusqlite::types::Value> {
    Ok(match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        Value::Integer(i) => rusqlite::types::Value::Integer(*i),
        Value::Float(f) => rusqlite::types::Value::Real(*f),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
        Value::Array(_) => {
            return Err(TabulaError::InvalidArgument(
                "array values cannot be bound to a SQLite statement".into(),
            ));
        }
    })
}

/// Convert rusqlite row value to our Value type
fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| TabulaError::Driver(e.to_string()))?;

    Ok(match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> SqliteConnection {
        SqliteConnection::open(":memory:").expect("failed to open in-memory db")
    }

    #[test]
    fn test_execute_and_query_with_params() {
        let conn = memory();
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, data BLOB)", &[])
            .unwrap();
        let affected = conn
            .execute(
                "INSERT INTO t (name, data) VALUES (?, ?)",
                &[Value::Text("a'b".into()), Value::Blob(vec![1, 2])],
            )
            .unwrap();
        assert_eq!(affected, 1);

        let result = conn
            .query("SELECT id, name, data FROM t WHERE name = ?", &[Value::Text("a'b".into())])
            .unwrap();
        assert_eq!(result.column_names(), vec!["id", "name", "data"]);
        assert_eq!(result.columns[1].data_type, "TEXT");
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].get(0), Some(&Value::Integer(1)));
        assert_eq!(result.rows[0].get(2), Some(&Value::Blob(vec![1, 2])));
    }

    #[test]
    fn test_list_tables_with_pattern() {
        let conn = memory();
        conn.execute("CREATE TABLE alpha (id INTEGER)", &[]).unwrap();
        conn.execute("CREATE TABLE beta (id INTEGER)", &[]).unwrap();
        assert_eq!(conn.list_tables(None).unwrap(), vec!["alpha", "beta"]);
        assert_eq!(conn.list_tables(Some("beta")).unwrap(), vec!["beta"]);
        assert!(conn.list_tables(Some("gamma")).unwrap().is_empty());
    }

    #[test]
    fn test_prepare_reports_syntax_errors() {
        let conn = memory();
        assert!(conn.prepare("SELECT 1").is_ok());
        assert!(matches!(
            conn.prepare("SELEC 1"),
            Err(TabulaError::Driver(_))
        ));
    }

    #[test]
    fn test_close() {
        let conn = memory();
        assert!(conn.is_valid(Duration::from_secs(1)));
        conn.close().unwrap();
        assert!(conn.is_closed());
        assert!(!conn.is_valid(Duration::from_secs(1)));
        assert!(conn.execute("SELECT 1", &[]).is_err());
    }

    #[test]
    fn test_array_params_rejected() {
        let conn = memory();
        let err = conn
            .query("SELECT ?", &[Value::Array(vec![Value::Integer(1)])])
            .unwrap_err();
        assert!(matches!(err, TabulaError::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_parent_directory() {
        let err = SqliteConnection::open("/definitely/not/here/db.sqlite").err().unwrap();
        assert!(matches!(err, TabulaError::ConnectionFailed(_)));
    }
}
