//! Scripted connection and driver for exercising the handle without a database

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tabula_connection::ConnectionHandle;
use tabula_core::{
    CanonicalType, ColumnMeta, ColumnSchema, Connection, ConnectionConfig, DatabaseDriver,
    Dialect, LivenessConfig, QueryResult, Result, Row, TableSchema, TabulaError, Value,
    database_record,
};
use tabula_drivers::DriverRegistry;

/// Every statement the connection saw, with its parameters
pub type Log = Vec<(String, Vec<Value>)>;

#[derive(Default)]
pub struct MockConnection {
    pub log: Mutex<Log>,
    pub tables: Mutex<Vec<String>>,
    pub results: Mutex<VecDeque<QueryResult>>,
    pub dead: AtomicBool,
    pub fail_statements: AtomicBool,
    pub probes: AtomicUsize,
    pub closes: AtomicUsize,
    closed: AtomicBool,
}

impl MockConnection {
    pub fn statements(&self) -> Vec<String> {
        self.log.lock().iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub fn last(&self) -> Option<(String, Vec<Value>)> {
        self.log.lock().last().cloned()
    }

    pub fn queue_result(&self, result: QueryResult) {
        self.results.lock().push_back(result);
    }

    fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    fn record(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.log.lock().push((sql.to_string(), params.to_vec()));
        if self.fail_statements.load(Ordering::SeqCst) {
            return Err(TabulaError::Driver("scripted failure".into()));
        }
        Ok(())
    }
}

impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.record(sql, params)?;
        Ok(1)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.record(sql, params)?;
        Ok(self.results.lock().pop_front().unwrap_or_default())
    }

    fn prepare(&self, sql: &str) -> Result<()> {
        if sql.trim().is_empty() {
            return Err(TabulaError::Driver("empty statement".into()));
        }
        Ok(())
    }

    fn is_valid(&self, _timeout: Duration) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        !self.dead.load(Ordering::SeqCst)
    }

    fn list_tables(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let tables = self.tables.lock();
        Ok(tables
            .iter()
            .filter(|t| pattern.is_none_or(|p| t.eq_ignore_ascii_case(p)))
            .cloned()
            .collect())
    }

    fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct MockDriver {
    pub dialect: Dialect,
    pub conn: Arc<MockConnection>,
    pub connects: AtomicUsize,
    pub refuse: bool,
}

impl MockDriver {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            conn: Arc::new(MockConnection::default()),
            connects: AtomicUsize::new(0),
            refuse: false,
        }
    }
}

impl DatabaseDriver for MockDriver {
    fn name(&self) -> &'static str {
        self.dialect.driver_id()
    }

    fn display_name(&self) -> &'static str {
        "Mock"
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn connect(&self, _config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(TabulaError::Driver("access denied".into()));
        }
        self.conn.reopen();
        Ok(self.conn.clone())
    }

    fn build_connection_string(&self, _config: &ConnectionConfig) -> String {
        "mock://".to_string()
    }
}

/// A handle on `dialect` backed by a fresh mock driver, with the given liveness TTL.
pub fn mock_handle(dialect: Dialect, ttl: Duration) -> (ConnectionHandle, Arc<MockDriver>) {
    let driver = Arc::new(MockDriver::new(dialect));
    let mut registry = DriverRegistry::new();
    registry.register(driver.clone());
    let config = ConnectionConfig::new(dialect)
        .with_liveness(LivenessConfig::default().with_ttl(ttl));
    (
        ConnectionHandle::with_registry(config, Arc::new(registry)),
        driver,
    )
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `T(id INTEGER PK AUTOINCREMENT, name VARCHAR(20), flag TINYINT)`
pub fn scenario_table() -> Arc<TableSchema> {
    static TABLE: OnceLock<Arc<TableSchema>> = OnceLock::new();
    TABLE
        .get_or_init(|| {
            Arc::new(
                TableSchema::builder("T")
                    .column(
                        ColumnSchema::builder("id", CanonicalType::Integer)
                            .primary_key()
                            .auto_increment()
                            .build()
                            .expect("id column"),
                    )
                    .column(
                        ColumnSchema::builder("name", CanonicalType::VarChar)
                            .size(20)
                            .build()
                            .expect("name column"),
                    )
                    .column(
                        ColumnSchema::builder("flag", CanonicalType::TinyInt)
                            .build()
                            .expect("flag column"),
                    )
                    .build()
                    .expect("scenario table"),
            )
        })
        .clone()
}

/// Record for [`scenario_table`]; `transient_counter` has no column.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Gadget {
    pub id: i64,
    pub name: Option<String>,
    pub flag: bool,
    pub transient_counter: u32,
}

database_record!(Gadget, table = scenario_table(), fields { id, name, flag, transient_counter });

/// A rowset shaped like `SELECT id, name, flag FROM T`
pub fn gadget_rows(rows: &[(i64, &str, i64)]) -> QueryResult {
    let columns = ["id", "name", "flag"]
        .iter()
        .enumerate()
        .map(|(ordinal, name)| ColumnMeta {
            name: name.to_string(),
            data_type: "INTEGER".to_string(),
            ordinal,
        })
        .collect();
    QueryResult {
        columns,
        rows: rows
            .iter()
            .map(|(id, name, flag)| {
                Row::new(vec![Value::Integer(*id), Value::from(*name), Value::Integer(*flag)])
            })
            .collect(),
        execution_time_ms: 0,
    }
}
