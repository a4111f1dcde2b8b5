//! Connection trait and prepared statements

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::{Dialect, QueryResult, Result, TabulaError, Value};

/// An open database connection.
///
/// Every call blocks until the database answers. Parameters bind to `?`
/// placeholders in order.
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite", "mysql")
    fn driver_name(&self) -> &str;

    /// Execute a statement that modifies data or schema. Returns the affected row count.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute a query that returns rows
    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Ask the database to parse `sql` without running it.
    fn prepare(&self, sql: &str) -> Result<()>;

    /// Probe the connection. Must give up and return `false` after `timeout`.
    fn is_valid(&self, timeout: Duration) -> bool;

    /// Names of existing tables, optionally filtered by a SQL `LIKE` pattern
    fn list_tables(&self, pattern: Option<&str>) -> Result<Vec<String>>;

    /// Close the connection. Later calls fail.
    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// A statement that has been checked by the database and can run repeatedly.
///
/// Parameter binding is left to the driver, which knows the placeholder
/// forms its database accepts (`?1`, `?NNN`).
pub struct PreparedStatement {
    conn: Arc<dyn Connection>,
    dialect: Dialect,
    sql: String,
}

impl PreparedStatement {
    pub fn new(conn: Arc<dyn Connection>, dialect: Dialect, sql: impl Into<String>) -> Result<Self> {
        let sql = sql.into();
        conn.prepare(&sql)
            .map_err(|e| TabulaError::statement(sql.as_str(), e))?;
        Ok(Self { conn, dialect, sql })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of bare `?` placeholders in the statement text
    pub fn parameter_count(&self) -> usize {
        crate::count_placeholders(&self.sql, self.dialect)
    }

    pub fn execute(&self, params: &[Value]) -> Result<u64> {
        crate::statement::check_scalar_args(params)?;
        self.conn
            .execute(&self.sql, params)
            .map_err(|e| TabulaError::statement(self.sql.as_str(), e))
    }

    pub fn query(&self, params: &[Value]) -> Result<QueryResult> {
        crate::statement::check_scalar_args(params)?;
        self.conn
            .query(&self.sql, params)
            .map_err(|e| TabulaError::statement(self.sql.as_str(), e))
    }
}

impl fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("driver", &self.conn.driver_name())
            .field("dialect", &self.dialect)
            .field("sql", &self.sql)
            .finish()
    }
}
