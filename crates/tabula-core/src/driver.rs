//! Database driver trait and connection configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{Connection, Dialect, Result, TabulaError};

/// A database driver: opens connections for one dialect
pub trait DatabaseDriver: Send + Sync {
    /// Registry key, matching [`Dialect::driver_id`]
    fn name(&self) -> &'static str;

    /// Human readable name
    fn display_name(&self) -> &'static str;

    fn dialect(&self) -> Dialect;

    fn default_port(&self) -> Option<u16> {
        self.dialect().info().default_port
    }

    /// Open a connection
    fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Open a connection, run a trivial query and close it again.
    fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        let conn = self.connect(config)?;
        conn.query("SELECT 1", &[])?;
        conn.close()
    }

    /// Connection string for display and logging
    fn build_connection_string(&self, config: &ConnectionConfig) -> String;
}

/// Timing of the cached liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// How long a probe result is trusted, in milliseconds
    pub ttl_ms: u64,
    /// How long a probe may take, in seconds
    pub probe_timeout_secs: u64,
}

impl LivenessConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = ttl.as_millis() as u64;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_secs = timeout.as_secs();
        self
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 2500,
            probe_timeout_secs: 5,
        }
    }
}

/// Where and how to connect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub dialect: Dialect,
    /// Host address (empty for file-based databases)
    pub host: String,
    /// Port number (0 for the dialect default)
    pub port: u16,
    /// Database name, or file path for file-based dialects
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Additional driver parameters
    pub params: HashMap<String, String>,
    pub liveness: LivenessConfig,
}

impl ConnectionConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            host: String::new(),
            port: 0,
            database: None,
            username: None,
            password: None,
            params: HashMap::new(),
            liveness: LivenessConfig::default(),
        }
    }

    /// Create a SQLite configuration. `":memory:"` opens a private in-memory database.
    pub fn new_sqlite(database_path: &str) -> Self {
        let mut config = Self::new(Dialect::Sqlite);
        config.database = Some(database_path.to_string());
        config
    }

    /// Create a MySQL configuration
    pub fn new_mysql(host: &str, port: u16, database: &str, username: &str) -> Self {
        Self::new_server(Dialect::MySql, host, port, database, username)
    }

    /// Create a MariaDB configuration
    pub fn new_mariadb(host: &str, port: u16, database: &str, username: &str) -> Self {
        Self::new_server(Dialect::MariaDb, host, port, database, username)
    }

    fn new_server(dialect: Dialect, host: &str, port: u16, database: &str, username: &str) -> Self {
        let mut config = Self::new(dialect);
        config.host = host.to_string();
        config.port = port;
        config.database = Some(database.to_string());
        config.username = Some(username.to_string());
        config
    }

    /// Parse a configuration from a TOML document.
    ///
    /// ```toml
    /// dialect = "mariadb"
    /// host = "db.internal"
    /// database = "inventory"
    /// username = "app"
    ///
    /// [liveness]
    /// ttl_ms = 1000
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| TabulaError::Configuration(e.to_string()))
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_liveness(mut self, liveness: LivenessConfig) -> Self {
        self.liveness = liveness;
        self
    }

    /// Configured port, or the dialect default when unset
    pub fn port_or_default(&self) -> u16 {
        if self.port > 0 {
            self.port
        } else {
            self.dialect.info().default_port.unwrap_or(0)
        }
    }

    /// Host, or `localhost` when unset
    pub fn host_or_default(&self) -> &str {
        if self.host.is_empty() {
            "localhost"
        } else {
            &self.host
        }
    }

    /// Get a parameter value
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.params.get(key).cloned()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(Dialect::Sqlite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_from_toml() {
        let config = ConnectionConfig::from_toml_str(indoc! {r#"
            dialect = "mariadb"
            host = "db.internal"
            database = "inventory"
            username = "app"
            password = "secret"

            [params]
            charset = "utf8mb4"

            [liveness]
            ttl_ms = 1000
        "#})
        .unwrap();
        assert_eq!(config.dialect, Dialect::MariaDb);
        assert_eq!(config.port_or_default(), 3306);
        assert_eq!(config.database.as_deref(), Some("inventory"));
        assert_eq!(config.get_string("charset").as_deref(), Some("utf8mb4"));
        assert_eq!(config.liveness.ttl(), Duration::from_millis(1000));
        assert_eq!(config.liveness.probe_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_liveness_builders() {
        let liveness = LivenessConfig::default()
            .with_ttl(Duration::from_millis(250))
            .with_probe_timeout(Duration::from_secs(2));
        assert_eq!(liveness.ttl(), Duration::from_millis(250));
        assert_eq!(liveness.probe_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_toml_defaults_to_sqlite() {
        let config = ConnectionConfig::from_toml_str(r#"database = "app.db""#).unwrap();
        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(config.liveness, LivenessConfig::default());
    }

    #[test]
    fn test_bad_toml_is_configuration_error() {
        let err = ConnectionConfig::from_toml_str(r#"dialect = "oracle""#).unwrap_err();
        assert!(matches!(err, TabulaError::Configuration(_)));
    }

    #[test]
    fn test_constructors() {
        let config = ConnectionConfig::new_mysql("", 0, "shop", "root").with_password("pw");
        assert_eq!(config.host_or_default(), "localhost");
        assert_eq!(config.port_or_default(), 3306);
        assert_eq!(config.password.as_deref(), Some("pw"));

        let config = ConnectionConfig::new_sqlite(":memory:");
        assert_eq!(config.port_or_default(), 0);
    }
}
