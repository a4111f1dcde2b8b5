//! Table schema

use std::sync::Arc;

use super::ColumnSchema;
use crate::{Dialect, Result, TabulaError};

/// An ordered set of columns plus table-level DDL options.
///
/// Column order is significant: it is the SELECT column order and the
/// positional order of result rows. Cloning a table gives an independent
/// column list that still shares the individual column objects.
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    columns: Vec<Arc<ColumnSchema>>,
    if_not_exists: bool,
    or_replace: bool,
}

impl TableSchema {
    pub fn builder(name: impl Into<String>) -> TableSchemaBuilder {
        TableSchemaBuilder {
            name: name.into(),
            columns: Vec::new(),
            if_not_exists: false,
            or_replace: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Arc<ColumnSchema>] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn if_not_exists(&self) -> bool {
        self.if_not_exists
    }

    pub fn or_replace(&self) -> bool {
        self.or_replace
    }

    /// Exact-name column lookup
    pub fn column(&self, name: &str) -> Option<&Arc<ColumnSchema>> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Case-insensitive column lookup
    pub fn column_ignore_case(&self, name: &str) -> Option<&Arc<ColumnSchema>> {
        self.columns
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Index of a column by case-insensitive name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// First column flagged as primary key
    pub fn primary_key(&self) -> Option<&Arc<ColumnSchema>> {
        self.columns.iter().find(|c| c.is_primary_key())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_if_not_exists(&mut self, if_not_exists: bool) {
        self.if_not_exists = if_not_exists;
    }

    pub fn set_or_replace(&mut self, or_replace: bool) {
        self.or_replace = or_replace;
    }

    /// Append a column. Fails if a column with the same name (ignoring case) exists.
    pub fn add_column(&mut self, column: impl Into<Arc<ColumnSchema>>) -> Result<()> {
        let column = column.into();
        if self.column_ignore_case(column.name()).is_some() {
            return Err(TabulaError::Schema(format!(
                "duplicate column '{}' in table '{}'",
                column.name(),
                self.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Remove a column by case-insensitive name and return it.
    pub fn remove_column(&mut self, name: &str) -> Option<Arc<ColumnSchema>> {
        let idx = self.position(name)?;
        Some(self.columns.remove(idx))
    }

    /// Swap the column named `name` for `column`, keeping its position.
    ///
    /// Only this table sees the new column; clones keep the old one.
    pub fn replace_column(
        &mut self,
        name: &str,
        column: impl Into<Arc<ColumnSchema>>,
    ) -> Result<Arc<ColumnSchema>> {
        let column = column.into();
        let idx = self.position(name).ok_or_else(|| {
            TabulaError::Schema(format!("no column '{}' in table '{}'", name, self.name))
        })?;
        let clash = self
            .columns
            .iter()
            .enumerate()
            .any(|(i, c)| i != idx && c.name().eq_ignore_ascii_case(column.name()));
        if clash {
            return Err(TabulaError::Schema(format!(
                "duplicate column '{}' in table '{}'",
                column.name(),
                self.name
            )));
        }
        Ok(std::mem::replace(&mut self.columns[idx], column))
    }

    /// Compile the `CREATE TABLE` statement for `dialect`.
    pub fn compile(&self, dialect: Dialect) -> Result<String> {
        crate::DdlGenerator::compile_table(self, dialect)
    }
}

/// Builder for [`TableSchema`]
#[derive(Debug)]
pub struct TableSchemaBuilder {
    name: String,
    columns: Vec<Arc<ColumnSchema>>,
    if_not_exists: bool,
    or_replace: bool,
}

impl TableSchemaBuilder {
    pub fn column(mut self, column: impl Into<Arc<ColumnSchema>>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Arc<ColumnSchema>>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn or_replace(mut self) -> Self {
        self.or_replace = true;
        self
    }

    pub fn build(self) -> Result<TableSchema> {
        if self.name.trim().is_empty() {
            return Err(TabulaError::Schema("table name must not be empty".into()));
        }
        let mut table = TableSchema {
            name: self.name,
            columns: Vec::with_capacity(self.columns.len()),
            if_not_exists: self.if_not_exists,
            or_replace: self.or_replace,
        };
        for column in self.columns {
            table.add_column(column)?;
        }
        Ok(table)
    }
}
