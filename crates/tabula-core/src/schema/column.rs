//! Column schema

use std::fmt;
use std::sync::Arc;

use super::TableSchema;
use crate::{CanonicalType, Dialect, Result, TabulaError, Value};

/// A reference from a column to a column of another table.
///
/// The target table is shared, never owned: dropping the referencing table
/// leaves the target untouched.
#[derive(Clone)]
pub struct ForeignKey {
    table: Arc<TableSchema>,
    column: Arc<ColumnSchema>,
}

impl ForeignKey {
    /// Reference `column` of `table`. The column is looked up by exact name
    /// first, then case-insensitively.
    pub fn new(table: &Arc<TableSchema>, column: &str) -> Result<Self> {
        let target = table
            .column(column)
            .or_else(|| table.column_ignore_case(column))
            .cloned()
            .ok_or_else(|| {
                TabulaError::Schema(format!(
                    "foreign column '{}' does not exist in table '{}'",
                    column,
                    table.name()
                ))
            })?;
        Ok(Self {
            table: Arc::clone(table),
            column: target,
        })
    }

    pub fn table(&self) -> &Arc<TableSchema> {
        &self.table
    }

    pub fn column(&self) -> &Arc<ColumnSchema> {
        &self.column
    }
}

impl fmt::Debug for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKey")
            .field("table", &self.table.name())
            .field("column", &self.column.name())
            .finish()
    }
}

/// One column of a table. Built through [`ColumnSchema::builder`] and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    name: String,
    data_type: CanonicalType,
    size: Option<String>,
    default_value: Option<Value>,
    primary_key: bool,
    unique_key: bool,
    auto_increment: bool,
    not_null: bool,
    foreign_key: Option<ForeignKey>,
}

impl ColumnSchema {
    pub fn builder(name: impl Into<String>, data_type: CanonicalType) -> ColumnSchemaBuilder {
        ColumnSchemaBuilder {
            column: ColumnSchema {
                name: name.into(),
                data_type,
                size: None,
                default_value: None,
                primary_key: false,
                unique_key: false,
                auto_increment: false,
                not_null: false,
                foreign_key: None,
            },
        }
    }

    /// Start a builder pre-filled with this column's settings.
    pub fn to_builder(&self) -> ColumnSchemaBuilder {
        ColumnSchemaBuilder {
            column: self.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> CanonicalType {
        self.data_type
    }

    /// Length or precision, written as `(<size>)` after the type
    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_unique_key(&self) -> bool {
        self.unique_key
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn is_not_null(&self) -> bool {
        self.not_null
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        self.foreign_key.as_ref()
    }

    /// Whether the database generates this column's value on insert
    pub fn is_generated_key(&self) -> bool {
        self.primary_key && self.auto_increment
    }

    /// Compile this column's definition for `dialect`.
    pub fn compile(&self, dialect: Dialect) -> Result<String> {
        crate::DdlGenerator::compile_column(self, dialect)
    }

    /// Fails when a foreign reference is combined with a key flag.
    pub(crate) fn check_foreign_key(&self, dialect: Option<Dialect>) -> Result<()> {
        if self.foreign_key.is_none() {
            return Ok(());
        }
        let conflict = if self.primary_key {
            "PRIMARY KEY"
        } else if self.unique_key {
            "UNIQUE KEY"
        } else if self.auto_increment {
            "AUTO INCREMENT"
        } else {
            return Ok(());
        };
        Err(TabulaError::unsupported_feature(
            dialect,
            format!("FOREIGN KEY on {} column '{}'", conflict, self.name),
        ))
    }
}

/// Builder for [`ColumnSchema`]
#[derive(Debug, Clone)]
pub struct ColumnSchemaBuilder {
    column: ColumnSchema,
}

impl ColumnSchemaBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.column.name = name.into();
        self
    }

    pub fn data_type(mut self, data_type: CanonicalType) -> Self {
        self.column.data_type = data_type;
        self
    }

    pub fn size(mut self, size: impl fmt::Display) -> Self {
        self.column.size = Some(size.to_string());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.column.default_value = Some(value.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.column.primary_key = true;
        self
    }

    pub fn unique_key(mut self) -> Self {
        self.column.unique_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.column.auto_increment = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.column.not_null = true;
        self
    }

    pub fn references(mut self, foreign_key: ForeignKey) -> Self {
        self.column.foreign_key = Some(foreign_key);
        self
    }

    pub fn build(self) -> Result<ColumnSchema> {
        let column = self.column;
        if column.name.trim().is_empty() {
            return Err(TabulaError::Schema("column name must not be empty".into()));
        }
        if column.default_value.as_ref().is_some_and(Value::is_array) {
            return Err(TabulaError::Schema(format!(
                "default value of column '{}' cannot be an array",
                column.name
            )));
        }
        column.check_foreign_key(None)?;
        Ok(column)
    }
}
