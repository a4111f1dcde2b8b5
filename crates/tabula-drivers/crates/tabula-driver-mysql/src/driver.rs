//! MySQL/MariaDB driver implementation

use std::sync::Arc;
use tabula_core::{Connection, ConnectionConfig, DatabaseDriver, Dialect, Result};

use crate::MySqlConnection;

/// Driver for the MySQL wire protocol, serving either MySQL or MariaDB
pub struct MySqlDriver {
    dialect: Dialect,
}

impl MySqlDriver {
    pub fn mysql() -> Self {
        tracing::debug!("MySQL driver initialized");
        Self {
            dialect: Dialect::MySql,
        }
    }

    pub fn mariadb() -> Self {
        tracing::debug!("MariaDB driver initialized");
        Self {
            dialect: Dialect::MariaDb,
        }
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::mysql()
    }
}

impl DatabaseDriver for MySqlDriver {
    fn name(&self) -> &'static str {
        self.dialect.driver_id()
    }

    fn display_name(&self) -> &'static str {
        match self.dialect {
            Dialect::MariaDb => "MariaDB",
            _ => "MySQL",
        }
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[tracing::instrument(skip(self, config), fields(host = %config.host_or_default(), database = config.database.as_deref()))]
    fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let host = config.host_or_default();
        let port = config.port_or_default();
        let user = config.username.clone().or_else(|| config.get_string("user"));

        let conn = MySqlConnection::connect(
            self.dialect,
            host,
            port,
            config.database.as_deref(),
            user.as_deref(),
            config.password.as_deref(),
        )
        .inspect_err(|e| {
            tracing::error!(error = %e, dialect = %self.dialect, "failed to connect");
        })?;

        tracing::info!(host = %host, port = %port, "{} connection created", self.display_name());
        Ok(Arc::new(conn))
    }

    /// `<driver>://user@host:port/database`; the password is never rendered.
    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let mut url = format!("{}://", self.dialect.driver_id());
        if let Some(user) = config.username.as_deref() {
            url.push_str(user);
            url.push('@');
        }
        url.push_str(&format!(
            "{}:{}",
            config.host_or_default(),
            config.port_or_default()
        ));
        if let Some(db) = config.database.as_deref() {
            url.push('/');
            url.push_str(db);
        }
        url
    }
}
