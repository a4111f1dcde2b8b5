//! Driver registry for managing available database drivers

use std::collections::HashMap;
use std::sync::Arc;
use tabula_core::{DatabaseDriver, Dialect, Result, TabulaError};

/// Registry of available database drivers, keyed by driver name
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "sqlite")]
        registry.register(Arc::new(crate::sqlite::SqliteDriver::new()));
        #[cfg(feature = "mysql")]
        {
            registry.register(Arc::new(crate::mysql::MySqlDriver::mysql()));
            registry.register(Arc::new(crate::mysql::MySqlDriver::mariadb()));
        }

        registry
    }

    /// Register a new driver, replacing any driver of the same name
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let name = driver.name().to_string();
        tracing::info!(driver = %name, dialect = %driver.dialect(), "registering database driver");
        self.drivers.insert(name, driver);
    }

    /// Get a driver by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatabaseDriver>> {
        let driver = self.drivers.get(name).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %name, "driver not found in registry");
        }
        driver
    }

    /// Get the driver serving `dialect`
    pub fn for_dialect(&self, dialect: Dialect) -> Result<Arc<dyn DatabaseDriver>> {
        self.get(dialect.driver_id())
            .ok_or(TabulaError::MissingDriver(dialect))
    }

    /// List all registered driver names
    pub fn list(&self) -> Vec<&str> {
        self.drivers.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a driver is registered
    pub fn has(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
