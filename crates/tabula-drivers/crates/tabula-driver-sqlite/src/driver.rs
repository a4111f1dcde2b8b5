//! SQLite driver implementation

use std::sync::Arc;
use tabula_core::{Connection, ConnectionConfig, DatabaseDriver, Dialect, Result};

use crate::SqliteConnection;

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    #[tracing::instrument(skip(self, config), fields(path = config.database.as_deref()))]
    fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let path = self.build_connection_string(config);
        let conn = SqliteConnection::open(&path).inspect_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQLite database");
        })?;

        tracing::info!(path = %path, "SQLite connection created");
        Ok(Arc::new(conn))
    }

    /// The database file path, falling back to the `path` parameter and then to `:memory:`.
    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        config
            .database
            .clone()
            .or_else(|| config.get_string("path"))
            .unwrap_or_else(|| ":memory:".to_string())
    }
}
