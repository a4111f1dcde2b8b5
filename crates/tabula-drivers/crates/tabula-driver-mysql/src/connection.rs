//! MySQL/MariaDB connection implementation

use mysql_async::{Conn, Opts, OptsBuilder, Params, Row as MySqlRow, consts::ColumnType, prelude::*};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tabula_core::{
    ColumnMeta, Connection, Dialect, QueryResult, Result, Row, TabulaError, Value,
};

use crate::block_on_mysql;

/// MySQL/MariaDB connection wrapper
///
/// Holds a single server session. Every call blocks the calling thread while
/// the MySQL runtime drives the network I/O.
pub struct MySqlConnection {
    conn: Mutex<Option<Conn>>,
    dialect: Dialect,
    database_name: Option<String>,
}

impl MySqlConnection {
    /// Connect to a MySQL or MariaDB server
    pub fn connect(
        dialect: Dialect,
        host: &str,
        port: u16,
        database: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        tracing::info!(host = %host, port = %port, database = ?database, dialect = %dialect, "connecting to server");

        let opts: Opts = OptsBuilder::default()
            .ip_or_hostname(host)
            .tcp_port(port)
            .db_name(database)
            .user(user)
            .pass(password)
            .into();

        let conn = block_on_mysql(Conn::new(opts))?.map_err(|e| {
            TabulaError::ConnectionFailed(format!("failed to connect to {}: {}", dialect, e))
        })?;

        tracing::info!(host = %host, port = %port, database = ?database, "server connection established");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            dialect,
            database_name: database.map(str::to_string),
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Database selected at connect time
    pub fn database_name(&self) -> Option<&str> {
        self.database_name.as_deref()
    }

    fn live_conn(&self) -> Result<MappedMutexGuard<'_, Conn>> {
        MutexGuard::try_map(self.conn.lock(), Option::as_mut)
            .map_err(|_| TabulaError::Driver(format!("{} connection is closed", self.dialect)))
    }
}

impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        self.dialect.driver_id()
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let params = values_to_mysql(params)?;
        let mut conn = self.live_conn()?;

        let affected_rows = block_on_mysql(async {
            if params.is_empty() {
                // Text protocol: DDL and other statements the server refuses to prepare
                conn.query_drop(sql).await?;
            } else {
                conn.exec_drop(sql, Params::Positional(params)).await?;
            }
            Ok::<u64, mysql_async::Error>(conn.affected_rows())
        })?
        .map_err(|e| TabulaError::Driver(format!("failed to execute statement: {}", e)))?;

        tracing::debug!(affected_rows = affected_rows, "statement executed");
        Ok(affected_rows)
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = Instant::now();
        let params = if params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(values_to_mysql(params)?)
        };
        let mut conn = self.live_conn()?;

        let (columns, column_kinds, mysql_rows) = block_on_mysql(async {
            let mut result = conn.exec_iter(sql, params).await?;
            let mut columns = Vec::new();
            let mut column_kinds = Vec::new();
            for (ordinal, col) in result.columns_ref().iter().enumerate() {
                column_kinds.push((col.column_type(), col.character_set() == BINARY_CHARSET));
                columns.push(ColumnMeta {
                    name: col.name_str().into_owned(),
                    data_type: column_type_name(col.column_type()).to_string(),
                    ordinal,
                });
            }
            let rows: Vec<MySqlRow> = result.collect().await?;
            Ok::<_, mysql_async::Error>((columns, column_kinds, rows))
        })?
        .map_err(|e| TabulaError::Driver(format!("failed to execute query: {}", e)))?;

        let rows: Vec<Row> = mysql_rows
            .into_iter()
            .map(|mysql_row| {
                let values = column_kinds
                    .iter()
                    .enumerate()
                    .map(|(idx, &(col_type, binary))| {
                        let raw: mysql_async::Value =
                            mysql_row.get(idx).unwrap_or(mysql_async::Value::NULL);
                        mysql_value_to_value(raw, col_type, binary)
                    })
                    .collect();
                Row::new(values)
            })
            .collect();

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
        let mut conn = self.live_conn()?;
        block_on_mysql(async { conn.prep(sql).await.map(|_| ()) })?
            .map_err(|e| TabulaError::Driver(format!("failed to prepare statement: {}", e)))
    }

    fn is_valid(&self, timeout: Duration) -> bool {
        let Ok(mut conn) = self.live_conn() else {
            return false;
        };
        let outcome = block_on_mysql(async { tokio::time::timeout(timeout, conn.ping()).await });
        match outcome {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(e))) => {
                tracing::debug!(error = %e, "liveness probe failed");
                false
            }
            Ok(Err(_)) => {
                tracing::debug!(timeout_ms = timeout.as_millis() as u64, "liveness probe timed out");
                false
            }
            Err(_) => false,
        }
    }

    #[tracing::instrument(skip(self))]
    fn list_tables(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        tracing::debug!("listing tables from information_schema");
        let mut sql = String::from(
            "SELECT TABLE_NAME FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'",
        );
        let mut params = Vec::new();
        if let Some(pattern) = pattern {
            sql.push_str(" AND TABLE_NAME LIKE ?");
            params.push(Value::Text(pattern.to_string()));
        }
        sql.push_str(" ORDER BY TABLE_NAME");

        let result = self.query(&sql, &params)?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.get(0).and_then(|v| v.as_str()).map(str::to_string))
            .collect())
    }

    fn close(&self) -> Result<()> {
        tracing::info!(dialect = %self.dialect, database = ?self.database_name, "closing server connection");
        let conn = self.conn.lock().take();
        if let Some(conn) = conn {
            block_on_mysql(conn.disconnect())?
                .map_err(|e| TabulaError::Driver(format!("failed to disconnect: {}", e)))?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }
}

fn values_to_mysql(values: &[Value]) -> Result<Vec<mysql_async::Value>> {
    values.iter().map(value_to_mysql).collect()
}

fn value_to_mysql(value: &Value) -> Result<mysql_async::Value> {
    Ok(match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(b) => mysql_async::Value::Int(i64::from(*b)),
        Value::Integer(i) => mysql_async::Value::Int(*i),
        Value::Float(f) => mysql_async::Value::Double(*f),
        Value::Text(s) => mysql_async::Value::Bytes(s.as_bytes().to_vec()),
        Value::Blob(b) => mysql_async::Value::Bytes(b.clone()),
        Value::Array(_) => {
            return Err(TabulaError::InvalidArgument(
                "array values cannot be bound to a MySQL statement".into(),
            ));
        }
    })
}

/// Collation id the server reports for binary strings (`binary` charset)
const BINARY_CHARSET: u16 = 63;

/// Convert a mysql_async value, using the column type to interpret byte strings
/// the server sends for numeric columns.
///
/// `binary` is the column's charset flag: BLOB, BINARY and VARBINARY columns
/// come back as blobs whatever their bytes, TEXT and CHAR columns as text.
fn mysql_value_to_value(val: mysql_async::Value, col_type: ColumnType, binary: bool) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) if binary && is_string_column(col_type) => {
            Value::Blob(bytes)
        }
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => match col_type {
                ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_YEAR => {
                    s.parse::<i64>().map(Value::Integer).unwrap_or(Value::Text(s))
                }
                ColumnType::MYSQL_TYPE_FLOAT
                | ColumnType::MYSQL_TYPE_DOUBLE
                | ColumnType::MYSQL_TYPE_DECIMAL
                | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                    s.parse::<f64>().map(Value::Float).unwrap_or(Value::Text(s))
                }
                _ => Value::Text(s),
            },
            Err(e) => Value::Blob(e.into_bytes()),
        },
        mysql_async::Value::Int(i) => Value::Integer(i),
        mysql_async::Value::UInt(u) => match i64::try_from(u) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(u.to_string()),
        },
        mysql_async::Value::Float(f) => Value::Float(f64::from(f)),
        mysql_async::Value::Double(d) => Value::Float(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            if hour == 0 && min == 0 && sec == 0 && micro == 0 {
                Value::Text(format!("{:04}-{:02}-{:02}", year, month, day))
            } else if micro == 0 {
                Value::Text(format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, min, sec
                ))
            } else {
                Value::Text(format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
                    year, month, day, hour, min, sec, micro
                ))
            }
        }
        mysql_async::Value::Time(negative, days, hours, mins, secs, micros) => {
            let total_hours = days * 24 + u32::from(hours);
            let sign = if negative { "-" } else { "" };
            if micros == 0 {
                Value::Text(format!("{}{:02}:{:02}:{:02}", sign, total_hours, mins, secs))
            } else {
                Value::Text(format!(
                    "{}{:02}:{:02}:{:02}.{:06}",
                    sign, total_hours, mins, secs, micros
                ))
            }
        }
    }
}

// Numeric and temporal columns also report the binary charset
fn is_string_column(col_type: ColumnType) -> bool {
    matches!(
        col_type,
        ColumnType::MYSQL_TYPE_TINY_BLOB
            | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
            | ColumnType::MYSQL_TYPE_LONG_BLOB
            | ColumnType::MYSQL_TYPE_BLOB
            | ColumnType::MYSQL_TYPE_VARCHAR
            | ColumnType::MYSQL_TYPE_VAR_STRING
            | ColumnType::MYSQL_TYPE_STRING
    )
}

fn column_type_name(col_type: ColumnType) -> &'static str {
    match col_type {
        ColumnType::MYSQL_TYPE_TINY => "TINYINT",
        ColumnType::MYSQL_TYPE_SHORT => "SMALLINT",
        ColumnType::MYSQL_TYPE_INT24 => "MEDIUMINT",
        ColumnType::MYSQL_TYPE_LONG => "INT",
        ColumnType::MYSQL_TYPE_LONGLONG => "BIGINT",
        ColumnType::MYSQL_TYPE_FLOAT => "FLOAT",
        ColumnType::MYSQL_TYPE_DOUBLE => "DOUBLE",
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => "DECIMAL",
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => "DATE",
        ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => "TIME",
        ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_DATETIME2 => "DATETIME",
        ColumnType::MYSQL_TYPE_TIMESTAMP | ColumnType::MYSQL_TYPE_TIMESTAMP2 => "TIMESTAMP",
        ColumnType::MYSQL_TYPE_YEAR => "YEAR",
        ColumnType::MYSQL_TYPE_JSON => "JSON",
        ColumnType::MYSQL_TYPE_VARCHAR | ColumnType::MYSQL_TYPE_VAR_STRING => "VARCHAR",
        ColumnType::MYSQL_TYPE_STRING => "CHAR",
        ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB
        | ColumnType::MYSQL_TYPE_BLOB => "BLOB",
        ColumnType::MYSQL_TYPE_NULL => "NULL",
        _ => "UNKNOWN",
    }
}
