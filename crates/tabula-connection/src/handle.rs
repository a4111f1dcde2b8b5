//! Connection handle: lifecycle plus statement execution

use std::sync::Arc;
use tabula_core::{
    Connection, ConnectionConfig, DatabaseRecord, DatabaseResult, DatabaseValue, DdlGenerator,
    Dialect, PreparedStatement, Result, Statement, TableSchema, TabulaError, Value, marshal,
};
use tabula_drivers::DriverRegistry;

use crate::{LivenessCache, StatementComposer};

/// One database, one connection.
///
/// Created disconnected; [`connect`](Self::connect) opens the underlying
/// connection through the driver registered for the configured dialect.
/// Every statement operation requires a live connection and fails with
/// [`TabulaError::NotConnected`] otherwise.
///
/// A handle is not meant to be shared between threads without external
/// synchronization: callers serialize operations on one handle.
pub struct ConnectionHandle {
    config: ConnectionConfig,
    registry: Arc<DriverRegistry>,
    connection: Option<Arc<dyn Connection>>,
    liveness: LivenessCache,
}

impl ConnectionHandle {
    /// Handle using the built-in drivers
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_registry(config, Arc::new(DriverRegistry::with_defaults()))
    }

    pub fn with_registry(config: ConnectionConfig, registry: Arc<DriverRegistry>) -> Self {
        Self {
            config,
            registry,
            connection: None,
            liveness: LivenessCache::new(),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Open the connection. A no-op when the handle is already live.
    #[tracing::instrument(skip(self), fields(dialect = %self.config.dialect))]
    pub fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            tracing::debug!("already connected");
            return Ok(());
        }
        if let Some(stale) = self.connection.take() {
            tracing::info!("replacing dead connection");
            if let Err(e) = stale.close() {
                tracing::debug!(error = %e, "closing dead connection failed");
            }
        }

        let driver = self.registry.for_dialect(self.config.dialect)?;
        tracing::info!(
            target_db = %driver.build_connection_string(&self.config),
            "connecting"
        );
        let conn = driver.connect(&self.config).map_err(|e| match e {
            TabulaError::ConnectionFailed(_) => e,
            other => TabulaError::ConnectionFailed(other.to_string()),
        })?;

        self.connection = Some(conn);
        self.liveness.mark(true);
        tracing::info!("connection established");
        Ok(())
    }

    /// Close the connection. Does nothing when not connected.
    #[tracing::instrument(skip(self), fields(dialect = %self.config.dialect))]
    pub fn disconnect(&mut self) -> Result<()> {
        self.liveness.reset();
        match self.connection.take() {
            Some(conn) => {
                tracing::info!("disconnecting");
                conn.close()
            }
            None => Ok(()),
        }
    }

    /// Whether the connection is open and answered its last liveness probe.
    ///
    /// Probe results are cached for `liveness.ttl_ms`.
    pub fn is_connected(&self) -> bool {
        match &self.connection {
            Some(conn) if !conn.is_closed() => {
                self.liveness.check(conn.as_ref(), &self.config.liveness)
            }
            _ => false,
        }
    }

    fn live_connection(&self) -> Result<&Arc<dyn Connection>> {
        match &self.connection {
            Some(conn) if self.is_connected() => Ok(conn),
            _ => Err(TabulaError::NotConnected),
        }
    }

    /// Whether a table named like `table` exists, compared ignoring case.
    pub fn does_table_exist(&self, table: &TableSchema) -> Result<bool> {
        let conn = self.live_connection()?;
        let names = conn.list_tables(Some(table.name()))?;
        Ok(names.iter().any(|n| n.eq_ignore_ascii_case(table.name())))
    }

    pub fn create_table(&self, table: &TableSchema) -> Result<()> {
        self.create_table_with(table, false)
    }

    /// Create `table`, first dropping an existing table of the same name when `replace` is set.
    #[tracing::instrument(skip(self, table), fields(table = %table.name()))]
    pub fn create_table_with(&self, table: &TableSchema, replace: bool) -> Result<()> {
        let conn = self.live_connection()?;
        if replace && self.does_table_exist(table)? {
            tracing::info!("dropping existing table before create");
            self.drop_table(table)?;
        }
        let sql = DdlGenerator::compile_table(table, self.dialect())?;
        conn.execute(&sql, &[])
            .map_err(|e| TabulaError::statement(sql.as_str(), e))?;
        tracing::info!("table created");
        Ok(())
    }

    /// `DROP TABLE <name>`. Tables referenced by foreign keys must be dropped
    /// after the tables that reference them.
    #[tracing::instrument(skip(self, table), fields(table = %table.name()))]
    pub fn drop_table(&self, table: &TableSchema) -> Result<()> {
        let conn = self.live_connection()?;
        let sql = DdlGenerator::drop_table(table);
        conn.execute(&sql, &[])
            .map_err(|e| TabulaError::statement(sql.as_str(), e))?;
        tracing::info!("table dropped");
        Ok(())
    }

    /// Insert one row. Returns the affected row count.
    pub fn insert(&self, table: &TableSchema, values: &[DatabaseValue]) -> Result<u64> {
        let stmt = StatementComposer::insert(table, values, self.dialect())?;
        self.run_update(stmt)
    }

    /// Select rows of `table` matching `where_clause`, whose `?` placeholders bind to `args`.
    ///
    /// A negative `limit` returns every row.
    pub fn select(
        &self,
        table: &TableSchema,
        limit: i64,
        where_clause: &str,
        args: &[Value],
    ) -> Result<DatabaseResult> {
        let stmt = StatementComposer::select(table, limit, where_clause, args)?;
        self.run_query(stmt)
    }

    /// [`select`](Self::select) with the default limit of 100 rows
    pub fn select_where(
        &self,
        table: &TableSchema,
        where_clause: &str,
        args: &[Value],
    ) -> Result<DatabaseResult> {
        self.select(table, StatementComposer::DEFAULT_LIMIT, where_clause, args)
    }

    pub fn select_all(&self, table: &TableSchema, limit: i64) -> Result<DatabaseResult> {
        self.select(table, limit, "", &[])
    }

    pub fn select_all_default(&self, table: &TableSchema) -> Result<DatabaseResult> {
        self.select_all(table, StatementComposer::DEFAULT_LIMIT)
    }

    /// Update rows matching `where_clause`. An empty `where_clause` updates every row.
    pub fn update(
        &self,
        table: &TableSchema,
        where_clause: &str,
        args: &[Value],
        set: &[DatabaseValue],
    ) -> Result<u64> {
        let stmt = StatementComposer::update(table, where_clause, args, set)?;
        self.run_update(stmt)
    }

    /// Delete rows matching `where_clause`.
    pub fn delete(&self, table: &TableSchema, where_clause: &str, args: &[Value]) -> Result<u64> {
        let stmt = StatementComposer::delete(table, where_clause, args)?;
        self.run_update(stmt)
    }

    pub fn delete_all(&self, table: &TableSchema) -> Result<u64> {
        self.delete(table, "", &[])
    }

    /// Insert `record` into its table, leaving generated keys to the database.
    pub fn insert_record<R: DatabaseRecord>(&self, record: &R) -> Result<u64> {
        let table = R::table_schema();
        self.insert(&table, &marshal::to_values(&table, record))
    }

    pub fn update_record<R: DatabaseRecord>(&self, record: &R) -> Result<u64> {
        self.run_update(StatementComposer::update_record(record)?)
    }

    pub fn delete_record<R: DatabaseRecord>(&self, record: &R) -> Result<u64> {
        self.run_update(StatementComposer::delete_record(record)?)
    }

    pub fn select_records<R: DatabaseRecord>(
        &self,
        limit: i64,
        where_clause: &str,
        args: &[Value],
    ) -> Result<Vec<R>> {
        let table = R::table_schema();
        self.select(&table, limit, where_clause, args)?
            .to_records(&table)
    }

    pub fn select_all_records<R: DatabaseRecord>(&self, limit: i64) -> Result<Vec<R>> {
        self.select_records(limit, "", &[])
    }

    /// Run SQL outside the schema model. Returns the affected row count.
    ///
    /// The text goes to the driver as written; only array arguments are
    /// rejected up front.
    pub fn raw_execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let stmt = Statement::with_params(sql, params.iter().cloned());
        stmt.validate_args()?;
        self.execute_statement(&stmt)
    }

    /// Parameterless [`raw_execute`](Self::raw_execute)
    pub fn raw_update(&self, sql: &str) -> Result<u64> {
        self.raw_execute(sql, &[])
    }

    pub fn raw_query(&self, sql: &str, params: &[Value]) -> Result<DatabaseResult> {
        let stmt = Statement::with_params(sql, params.iter().cloned());
        stmt.validate_args()?;
        self.query_statement(&stmt)
    }

    /// Prepare `sql` on the live connection for repeated execution.
    pub fn raw_prepare(&self, sql: &str) -> Result<PreparedStatement> {
        let conn = self.live_connection()?;
        PreparedStatement::new(Arc::clone(conn), self.dialect(), sql)
    }

    fn run_update(&self, stmt: Statement) -> Result<u64> {
        stmt.validate(self.dialect())?;
        self.execute_statement(&stmt)
    }

    fn run_query(&self, stmt: Statement) -> Result<DatabaseResult> {
        stmt.validate(self.dialect())?;
        self.query_statement(&stmt)
    }

    fn execute_statement(&self, stmt: &Statement) -> Result<u64> {
        let conn = self.live_connection()?;
        tracing::debug!(sql = %stmt.sql(), params = stmt.params().len(), "executing statement");
        conn.execute(stmt.sql(), stmt.params())
            .map_err(|e| TabulaError::statement(stmt.to_literal_sql(self.dialect()), e))
    }

    fn query_statement(&self, stmt: &Statement) -> Result<DatabaseResult> {
        let conn = self.live_connection()?;
        tracing::debug!(sql = %stmt.sql(), params = stmt.params().len(), "running query");
        let rows = conn
            .query(stmt.sql(), stmt.params())
            .map_err(|e| TabulaError::statement(stmt.to_literal_sql(self.dialect()), e))?;
        DatabaseResult::from_query_result(rows)
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("dialect", &self.config.dialect)
            .field("database", &self.config.database)
            .field("open", &self.connection.is_some())
            .finish()
    }
}
