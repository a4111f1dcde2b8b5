//! Canonical column types and their per-dialect resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Dialect, Result, TabulaError};

/// Dialect independent column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CanonicalType {
    Null,
    Integer,
    TinyInt,
    SmallInt,
    MediumInt,
    BigInt,
    Boolean,
    Float,
    Double,
    Decimal,
    Text,
    VarChar,
    Char,
    Blob,
    Date,
    Time,
    DateTime,
    Timestamp,
    Year,
    Json,
}

const ALL_DIALECTS: &[Dialect] = &[Dialect::MySql, Dialect::MariaDb, Dialect::Sqlite];
const SERVER_DIALECTS: &[Dialect] = &[Dialect::MySql, Dialect::MariaDb];

impl CanonicalType {
    pub const ALL: [CanonicalType; 20] = [
        CanonicalType::Null,
        CanonicalType::Integer,
        CanonicalType::TinyInt,
        CanonicalType::SmallInt,
        CanonicalType::MediumInt,
        CanonicalType::BigInt,
        CanonicalType::Boolean,
        CanonicalType::Float,
        CanonicalType::Double,
        CanonicalType::Decimal,
        CanonicalType::Text,
        CanonicalType::VarChar,
        CanonicalType::Char,
        CanonicalType::Blob,
        CanonicalType::Date,
        CanonicalType::Time,
        CanonicalType::DateTime,
        CanonicalType::Timestamp,
        CanonicalType::Year,
        CanonicalType::Json,
    ];

    /// Type name as written in DDL
    pub fn sql_name(self) -> &'static str {
        match self {
            CanonicalType::Null => "NULL",
            CanonicalType::Integer => "INTEGER",
            CanonicalType::TinyInt => "TINYINT",
            CanonicalType::SmallInt => "SMALLINT",
            CanonicalType::MediumInt => "MEDIUMINT",
            CanonicalType::BigInt => "BIGINT",
            CanonicalType::Boolean => "BOOLEAN",
            CanonicalType::Float => "FLOAT",
            CanonicalType::Double => "DOUBLE",
            CanonicalType::Decimal => "DECIMAL",
            CanonicalType::Text => "TEXT",
            CanonicalType::VarChar => "VARCHAR",
            CanonicalType::Char => "CHAR",
            CanonicalType::Blob => "BLOB",
            CanonicalType::Date => "DATE",
            CanonicalType::Time => "TIME",
            CanonicalType::DateTime => "DATETIME",
            CanonicalType::Timestamp => "TIMESTAMP",
            CanonicalType::Year => "YEAR",
            CanonicalType::Json => "JSON",
        }
    }

    /// Dialects on which this type is valid as written
    pub fn native_dialects(self) -> &'static [Dialect] {
        match self {
            CanonicalType::Null
            | CanonicalType::Integer
            | CanonicalType::Float
            | CanonicalType::Text
            | CanonicalType::Blob => ALL_DIALECTS,
            _ => SERVER_DIALECTS,
        }
    }

    pub fn supports(self, dialect: Dialect) -> bool {
        self.native_dialects().contains(&dialect)
    }

    /// Substitute used when `dialect` lacks this type natively
    pub fn fallback(self, dialect: Dialect) -> Option<CanonicalType> {
        match dialect {
            Dialect::MySql | Dialect::MariaDb => None,
            Dialect::Sqlite => match self {
                CanonicalType::TinyInt
                | CanonicalType::SmallInt
                | CanonicalType::MediumInt
                | CanonicalType::BigInt
                | CanonicalType::Boolean => Some(CanonicalType::Integer),
                CanonicalType::Double | CanonicalType::Decimal => Some(CanonicalType::Float),
                CanonicalType::VarChar
                | CanonicalType::Char
                | CanonicalType::Date
                | CanonicalType::Time
                | CanonicalType::DateTime
                | CanonicalType::Timestamp
                | CanonicalType::Json => Some(CanonicalType::Text),
                _ => None,
            },
        }
    }

    /// Resolve this type to one `dialect` accepts.
    ///
    /// Returns the type unchanged when it is native, otherwise its fallback.
    pub fn resolve(self, dialect: Dialect) -> Result<CanonicalType> {
        if self.supports(dialect) {
            return Ok(self);
        }
        match self.fallback(dialect) {
            Some(fallback) => {
                tracing::debug!(
                    data_type = self.sql_name(),
                    fallback = fallback.sql_name(),
                    dialect = %dialect,
                    "falling back to substitute type"
                );
                Ok(fallback)
            }
            None => Err(TabulaError::UnsupportedDatabaseType {
                data_type: self.sql_name().to_string(),
                dialect,
            }),
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

impl FromStr for CanonicalType {
    type Err = TabulaError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        CanonicalType::ALL
            .iter()
            .copied()
            .find(|t| t.sql_name() == upper)
            .ok_or_else(|| TabulaError::UnsupportedDataType(s.to_string()))
    }
}
