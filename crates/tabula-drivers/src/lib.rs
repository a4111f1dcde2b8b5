//! Tabula Drivers - Database driver implementations
//!
//! Concrete implementations of the driver traits defined in `tabula-core`,
//! each behind a cargo feature, plus the registry that looks them up by
//! dialect.

#[cfg(feature = "mysql")]
pub use tabula_driver_mysql as mysql;
#[cfg(feature = "sqlite")]
pub use tabula_driver_sqlite as sqlite;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from tabula-core
pub use tabula_core::{
    ColumnMeta, Connection, ConnectionConfig, DatabaseDriver, Dialect, PreparedStatement,
    QueryResult, Result, Row, TabulaError, Value,
};
