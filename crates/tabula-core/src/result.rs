//! Flattened query results

use crate::{
    DatabaseRecord, DatabaseValue, QueryResult, Result, TableSchema, TabulaError, marshal,
};

/// Values of a query, stored row after row in a single flat list.
///
/// `values.len()` is always a multiple of `column_count`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatabaseResult {
    values: Vec<DatabaseValue>,
    column_count: usize,
}

impl DatabaseResult {
    /// Wrap already flattened values. Fails if the values do not fill whole rows.
    pub fn new(values: Vec<DatabaseValue>, column_count: usize) -> Result<Self> {
        let ragged = if column_count == 0 {
            !values.is_empty()
        } else {
            values.len() % column_count != 0
        };
        if ragged {
            return Err(TabulaError::InvalidArgument(format!(
                "{} values do not form rows of {} columns",
                values.len(),
                column_count
            )));
        }
        Ok(Self {
            values,
            column_count,
        })
    }

    /// Flatten a driver rowset. Each row contributes one value per column,
    /// in column order.
    pub fn from_query_result(result: QueryResult) -> Result<Self> {
        let column_count = result.column_count();
        let names: Vec<String> = result.columns.into_iter().map(|c| c.name).collect();
        let mut values = Vec::with_capacity(column_count * result.rows.len());
        for (row_idx, row) in result.rows.into_iter().enumerate() {
            if row.values.len() != column_count {
                return Err(TabulaError::InvalidArgument(format!(
                    "row {} has {} values, expected {}",
                    row_idx + 1,
                    row.values.len(),
                    column_count
                )));
            }
            values.extend(
                names
                    .iter()
                    .zip(row.values)
                    .map(|(name, value)| DatabaseValue::new(name.as_str(), value)),
            );
        }
        Self::new(values, column_count)
    }

    pub fn values(&self) -> &[DatabaseValue] {
        &self.values
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn row_count(&self) -> usize {
        if self.column_count == 0 {
            0
        } else {
            self.values.len() / self.column_count
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values of row `row`, counting from 1.
    pub fn values_for_row(&self, row: usize) -> Result<&[DatabaseValue]> {
        if row == 0 || row > self.row_count() {
            return Err(TabulaError::InvalidArgument(format!(
                "row {} is out of range 1..={}",
                row,
                self.row_count()
            )));
        }
        let start = (row - 1) * self.column_count;
        Ok(&self.values[start..start + self.column_count])
    }

    /// Every value of the named column, top to bottom. Empty if no column has that name.
    pub fn values_for_column(&self, column: &str) -> Vec<&DatabaseValue> {
        self.values
            .iter()
            .filter(|v| v.column() == column)
            .collect()
    }

    /// Iterate rows as slices
    pub fn rows(&self) -> impl Iterator<Item = &[DatabaseValue]> {
        self.values.chunks(self.column_count.max(1))
    }

    /// Build one record per row.
    pub fn to_records<R: DatabaseRecord>(&self, table: &TableSchema) -> Result<Vec<R>> {
        self.rows()
            .map(|row| marshal::from_values(table, row))
            .collect()
    }
}
