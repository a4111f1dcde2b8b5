//! Error types for Tabula

use thiserror::Error;

use crate::Dialect;

/// Core error type for Tabula operations
#[derive(Error, Debug)]
pub enum TabulaError {
    #[error("No driver registered for dialect {0}")]
    MissingDriver(Dialect),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Data type {data_type} is not supported by {dialect}")]
    UnsupportedDatabaseType {
        data_type: String,
        dialect: Dialect,
    },

    /// `dialect` is `None` when the feature is not expressible on any dialect.
    #[error("{feature} is not supported{}", on_dialect(.dialect))]
    UnsupportedFeature {
        dialect: Option<Dialect>,
        feature: String,
    },

    #[error("Mapping error: {0}")]
    Mapping(String),

    /// A statement was rejected by the driver. `sql` is the exact text that was sent.
    #[error("Statement failed: {source}\n  sql: {sql}")]
    Statement {
        sql: String,
        #[source]
        source: Box<TabulaError>,
    },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TabulaError {
    /// Wrap a driver failure together with the SQL that triggered it.
    pub fn statement(sql: impl Into<String>, source: TabulaError) -> Self {
        Self::Statement {
            sql: sql.into(),
            source: Box::new(source),
        }
    }

    pub fn unsupported_feature(dialect: Option<Dialect>, feature: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            dialect,
            feature: feature.into(),
        }
    }
}

fn on_dialect(dialect: &Option<Dialect>) -> String {
    dialect.map(|d| format!(" by {}", d)).unwrap_or_default()
}

/// Result type alias for Tabula operations
pub type Result<T> = std::result::Result<T, TabulaError>;
