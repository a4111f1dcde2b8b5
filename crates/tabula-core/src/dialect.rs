//! SQL dialect registry
//!
//! Every backend Tabula can talk to is a [`Dialect`]. The syntactic quirks
//! that the DDL and statement compilers care about live in a static
//! [`DialectInfo`] table, one entry per dialect.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Result, TabulaError};

/// Supported database dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    MariaDb,
    Sqlite,
}

/// How string literals escape an embedded single quote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteEscape {
    /// `O\'Brien`
    Backslash,
    /// `O''Brien`
    Doubled,
}

/// Static syntax profile of a dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectInfo {
    /// Dialect identifier (e.g., "mysql", "sqlite")
    pub id: &'static str,
    /// Display name
    pub display_name: &'static str,
    /// Name of the driver that must be registered to open connections
    pub driver_id: &'static str,
    /// Identifier quote character; text inside it takes no backslash escapes
    pub identifier_quote: char,
    /// Keyword appended to auto-increment columns
    pub auto_increment_keyword: &'static str,
    /// Keyword appended to unique columns
    pub unique_key_keyword: &'static str,
    /// Whether `CREATE OR REPLACE TABLE` is accepted
    pub supports_or_replace: bool,
    pub string_escape: QuoteEscape,
    /// Default TCP port, `None` for file based dialects
    pub default_port: Option<u16>,
}

static MYSQL: DialectInfo = DialectInfo {
    id: "mysql",
    display_name: "MySQL",
    driver_id: "mysql",
    identifier_quote: '`',
    auto_increment_keyword: "AUTO_INCREMENT",
    unique_key_keyword: "UNIQUE KEY",
    supports_or_replace: false,
    string_escape: QuoteEscape::Backslash,
    default_port: Some(3306),
};

static MARIADB: DialectInfo = DialectInfo {
    id: "mariadb",
    display_name: "MariaDB",
    driver_id: "mariadb",
    identifier_quote: '`',
    auto_increment_keyword: "AUTO_INCREMENT",
    unique_key_keyword: "UNIQUE KEY",
    supports_or_replace: true,
    string_escape: QuoteEscape::Backslash,
    default_port: Some(3306),
};

static SQLITE: DialectInfo = DialectInfo {
    id: "sqlite",
    display_name: "SQLite",
    driver_id: "sqlite",
    identifier_quote: '"',
    auto_increment_keyword: "AUTOINCREMENT",
    unique_key_keyword: "UNIQUE",
    supports_or_replace: false,
    string_escape: QuoteEscape::Doubled,
    default_port: None,
};

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::MySql, Dialect::MariaDb, Dialect::Sqlite];

    pub fn info(self) -> &'static DialectInfo {
        match self {
            Dialect::MySql => &MYSQL,
            Dialect::MariaDb => &MARIADB,
            Dialect::Sqlite => &SQLITE,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.info().id
    }

    pub fn driver_id(self) -> &'static str {
        self.info().driver_id
    }

    pub fn auto_increment_keyword(self) -> &'static str {
        self.info().auto_increment_keyword
    }

    pub fn unique_key_keyword(self) -> &'static str {
        self.info().unique_key_keyword
    }

    pub fn supports_or_replace(self) -> bool {
        self.info().supports_or_replace
    }

    /// Render text as a single-quoted string literal using the dialect's escape rule.
    pub fn quote_string(self, text: &str) -> String {
        let escaped = match self.info().string_escape {
            QuoteEscape::Backslash => text.replace('\\', "\\\\").replace('\'', "\\'"),
            QuoteEscape::Doubled => text.replace('\'', "''"),
        };
        format!("'{}'", escaped)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().display_name)
    }
}

impl FromStr for Dialect {
    type Err = TabulaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySql),
            "mariadb" => Ok(Dialect::MariaDb),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(TabulaError::Configuration(format!(
                "unknown dialect '{}'",
                other
            ))),
        }
    }
}
