//! INSERT/SELECT/UPDATE/DELETE composition
//!
//! Every value lands in the statement as a `?` placeholder with a bound
//! parameter. Caller-written WHERE text is appended verbatim together with
//! its own arguments.

use tabula_core::{
    ColumnSchema, DatabaseRecord, DatabaseValue, Dialect, Result, Statement, TableSchema,
    TabulaError, Value, marshal,
};

/// Stateless builder for data manipulation statements
pub struct StatementComposer;

impl StatementComposer {
    /// Row limit used when the caller does not give one
    pub const DEFAULT_LIMIT: i64 = 100;

    /// `INSERT INTO <table> (<cols>) VALUES (?, ...)`
    ///
    /// Every value must name a column of `table`; array payloads are rejected.
    pub fn insert(
        table: &TableSchema,
        values: &[DatabaseValue],
        dialect: Dialect,
    ) -> Result<Statement> {
        let mut stmt = Statement::new(format!("INSERT INTO {}", table.name()));
        if values.is_empty() {
            // Every column takes its default
            stmt.push_sql(match dialect {
                Dialect::Sqlite => " DEFAULT VALUES",
                Dialect::MySql | Dialect::MariaDb => " () VALUES ()",
            });
            return Ok(stmt);
        }

        let mut columns = Vec::with_capacity(values.len());
        for value in values {
            columns.push(Self::target_column(table, value)?.name());
        }
        stmt.push_sql(" (").push_sql(&columns.join(", ")).push_sql(") VALUES (");
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                stmt.push_sql(", ");
            }
            stmt.push_param(value.value().clone());
        }
        stmt.push_sql(")");
        Ok(stmt)
    }

    /// `SELECT <cols> FROM <table> [WHERE <where>] [LIMIT <limit>]`
    ///
    /// Columns come out in schema order. A negative `limit` omits the clause
    /// and an empty `where_clause` omits WHERE.
    pub fn select(
        table: &TableSchema,
        limit: i64,
        where_clause: &str,
        args: &[Value],
    ) -> Result<Statement> {
        if table.columns().is_empty() {
            return Err(TabulaError::InvalidArgument(format!(
                "table '{}' has no columns to select",
                table.name()
            )));
        }
        let mut stmt = Statement::new(format!(
            "SELECT {} FROM {}",
            table.column_names().join(", "),
            table.name()
        ));
        Self::push_where(&mut stmt, where_clause, args);
        if limit >= 0 {
            stmt.push_sql(&format!(" LIMIT {}", limit));
        }
        Ok(stmt)
    }

    /// `UPDATE <table> SET <col> = ?, ... [WHERE <where>]`
    pub fn update(
        table: &TableSchema,
        where_clause: &str,
        args: &[Value],
        set: &[DatabaseValue],
    ) -> Result<Statement> {
        if set.is_empty() {
            return Err(TabulaError::InvalidArgument(format!(
                "update of '{}' sets no columns",
                table.name()
            )));
        }
        let mut stmt = Statement::new(format!("UPDATE {} SET ", table.name()));
        for (i, value) in set.iter().enumerate() {
            let column = Self::target_column(table, value)?;
            if i > 0 {
                stmt.push_sql(", ");
            }
            stmt.push_sql(&format!("{} = ", column.name()))
                .push_param(value.value().clone());
        }
        Self::push_where(&mut stmt, where_clause, args);
        Ok(stmt)
    }

    /// `DELETE FROM <table> [WHERE <where>]`. An empty `where_clause` deletes every row.
    pub fn delete(table: &TableSchema, where_clause: &str, args: &[Value]) -> Result<Statement> {
        let mut stmt = Statement::new(format!("DELETE FROM {}", table.name()));
        Self::push_where(&mut stmt, where_clause, args);
        Ok(stmt)
    }

    /// Update every non primary key field of `record`, matching the row by primary key.
    pub fn update_record<R: DatabaseRecord>(record: &R) -> Result<Statement> {
        let table = R::table_schema();
        let primary_key = table.primary_key().ok_or_else(|| {
            TabulaError::InvalidArgument(format!(
                "table '{}' has no primary key to update by",
                table.name()
            ))
        })?;

        let mut key = None;
        let mut set = Vec::new();
        for value in marshal::mapped_values(&table, record) {
            if value.column() == primary_key.name() {
                key = Some(value);
            } else {
                set.push(value);
            }
        }
        let key = key.ok_or_else(|| {
            TabulaError::Mapping(format!(
                "record has no field for primary key '{}'",
                primary_key.name()
            ))
        })?;

        let where_clause = format!("{} = ?", primary_key.name());
        Self::update(&table, &where_clause, &[key.into_value()], &set)
    }

    /// Delete rows equal to `record` on every mapped field.
    ///
    /// Null fields compare with `IS NULL`.
    pub fn delete_record<R: DatabaseRecord>(record: &R) -> Result<Statement> {
        let table = R::table_schema();
        let values = marshal::mapped_values(&table, record);
        if values.is_empty() {
            return Err(TabulaError::Mapping(format!(
                "record maps no field to table '{}'",
                table.name()
            )));
        }

        let mut stmt = Statement::new(format!("DELETE FROM {} WHERE ", table.name()));
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                stmt.push_sql(" AND ");
            }
            if value.value().is_null() {
                stmt.push_sql(&format!("{} IS NULL", value.column()));
            } else {
                stmt.push_sql(&format!("{} = ", value.column()))
                    .push_param(value.into_value());
            }
        }
        Ok(stmt)
    }

    fn target_column<'t>(table: &'t TableSchema, value: &DatabaseValue) -> Result<&'t ColumnSchema> {
        let column = table
            .column(value.column())
            .or_else(|| table.column_ignore_case(value.column()))
            .ok_or_else(|| {
                TabulaError::InvalidArgument(format!(
                    "column '{}' does not exist in table '{}'",
                    value.column(),
                    table.name()
                ))
            })?;
        if value.value().is_array() {
            return Err(TabulaError::InvalidArgument(format!(
                "value for column '{}' is an array; wrap it in a string to store it",
                value.column()
            )));
        }
        Ok(&**column)
    }

    fn push_where(stmt: &mut Statement, where_clause: &str, args: &[Value]) {
        let where_clause = where_clause.trim();
        if !where_clause.is_empty() {
            stmt.push_sql(" WHERE ")
                .push_fragment(where_clause, args.iter().cloned());
        } else {
            // Stray arguments surface as a placeholder mismatch on validate
            stmt.push_fragment("", args.iter().cloned());
        }
    }
}
