//! DDL generation for table schemas
//!
//! Produces `CREATE TABLE` and `DROP TABLE` text for a [`TableSchema`] on a
//! given [`Dialect`]. Output is a pure function of its inputs.

use crate::{ColumnSchema, Dialect, Result, TableSchema, TabulaError, Value};

/// DDL generator for table schemas
///
/// Stateless: all methods are associated functions.
pub struct DdlGenerator;

impl DdlGenerator {
    /// Generate one column definition, e.g. `id INTEGER PRIMARY KEY AUTO_INCREMENT`.
    pub fn compile_column(column: &ColumnSchema, dialect: Dialect) -> Result<String> {
        let resolved = column.data_type().resolve(dialect)?;
        column.check_foreign_key(Some(dialect))?;

        let mut def = format!("{} {}", column.name(), resolved.sql_name());

        // Kept on substituted types too: SQLite reads `TEXT(20)` as TEXT affinity
        if let Some(size) = column.size() {
            def.push_str(&format!("({})", size));
        }

        if column.is_not_null() {
            def.push_str(" NOT NULL");
        }
        if column.is_primary_key() {
            def.push_str(" PRIMARY KEY");
        }
        if column.is_unique_key() && !column.is_primary_key() {
            def.push(' ');
            def.push_str(dialect.unique_key_keyword());
        }
        if column.is_auto_increment() {
            def.push(' ');
            def.push_str(dialect.auto_increment_keyword());
        }
        if let Some(default) = column.default_value() {
            def.push_str(" DEFAULT ");
            def.push_str(&Self::default_literal(default));
        }

        Ok(def)
    }

    /// Generate the CREATE TABLE statement.
    pub fn compile_table(table: &TableSchema, dialect: Dialect) -> Result<String> {
        if table.columns().is_empty() {
            return Err(TabulaError::Schema(format!(
                "table '{}' has no columns",
                table.name()
            )));
        }

        let prefix = if table.if_not_exists() {
            "CREATE TABLE IF NOT EXISTS "
        } else if table.or_replace() {
            if !dialect.supports_or_replace() {
                return Err(TabulaError::unsupported_feature(
                    Some(dialect),
                    "CREATE OR REPLACE TABLE",
                ));
            }
            "CREATE OR REPLACE TABLE "
        } else {
            "CREATE TABLE "
        };

        let mut defs = table
            .columns()
            .iter()
            .map(|col| Self::compile_column(col, dialect))
            .collect::<Result<Vec<_>>>()?;

        defs.extend(
            table
                .columns()
                .iter()
                .filter_map(|col| Self::foreign_key_constraint(table, col)),
        );

        let ddl = format!("{}{} ( {} );", prefix, table.name(), defs.join(", "));
        tracing::debug!(table = %table.name(), dialect = %dialect, ddl = %ddl, "compiled table");
        Ok(ddl)
    }

    /// Generate the DROP TABLE statement.
    pub fn drop_table(table: &TableSchema) -> String {
        format!("DROP TABLE {}", table.name())
    }

    /// Deterministic constraint name for a foreign reference
    pub fn foreign_key_name(table: &TableSchema, column: &ColumnSchema) -> Option<String> {
        let fk = column.foreign_key()?;
        Some(format!(
            "fk_{}_{}_{}",
            table.name(),
            fk.table().name(),
            column.name()
        ))
    }

    fn foreign_key_constraint(table: &TableSchema, column: &ColumnSchema) -> Option<String> {
        let fk = column.foreign_key()?;
        let name = Self::foreign_key_name(table, column)?;
        Some(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
            name,
            column.name(),
            fk.table().name(),
            fk.column().name()
        ))
    }

    /// Numbers are bare, text is single-quoted as is.
    fn default_literal(value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => format!("'{}'", s),
            Value::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
                format!("X'{}'", hex)
            }
            // rejected by ColumnSchemaBuilder::build
            Value::Array(_) => "NULL".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CanonicalType, ForeignKey};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn sample() -> TableSchema {
        TableSchema::builder("T")
            .column(
                ColumnSchema::builder("id", CanonicalType::Integer)
                    .primary_key()
                    .auto_increment()
                    .build()
                    .unwrap(),
            )
            .column(
                ColumnSchema::builder("name", CanonicalType::VarChar)
                    .size(20)
                    .build()
                    .unwrap(),
            )
            .column(
                ColumnSchema::builder("flag", CanonicalType::TinyInt)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_create_table_mysql() {
        assert_eq!(
            sample().compile(Dialect::MySql).unwrap(),
            "CREATE TABLE T ( id INTEGER PRIMARY KEY AUTO_INCREMENT, name VARCHAR(20), flag TINYINT );"
        );
    }

    #[test]
    fn test_create_table_sqlite_falls_back() {
        assert_eq!(
            sample().compile(Dialect::Sqlite).unwrap(),
            "CREATE TABLE T ( id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT(20), flag INTEGER );"
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let table = sample();
        for dialect in Dialect::ALL {
            assert_eq!(
                table.compile(dialect).unwrap(),
                table.compile(dialect).unwrap()
            );
        }
    }

    #[test]
    fn test_column_clause_order() {
        let col = ColumnSchema::builder("email", CanonicalType::VarChar)
            .size(255)
            .not_null()
            .unique_key()
            .default_value("none")
            .build()
            .unwrap();
        assert_eq!(
            col.compile(Dialect::MariaDb).unwrap(),
            "email VARCHAR(255) NOT NULL UNIQUE KEY DEFAULT 'none'"
        );
        assert_eq!(
            col.compile(Dialect::Sqlite).unwrap(),
            "email TEXT(255) NOT NULL UNIQUE DEFAULT 'none'"
        );
    }

    #[test]
    fn test_unique_suppressed_on_primary_key() {
        let col = ColumnSchema::builder("id", CanonicalType::Integer)
            .primary_key()
            .unique_key()
            .build()
            .unwrap();
        assert_eq!(col.compile(Dialect::MySql).unwrap(), "id INTEGER PRIMARY KEY");
    }

    #[test]
    fn test_defaults() {
        let compile = |value: Value| {
            ColumnSchema::builder("c", CanonicalType::Text)
                .default_value(value)
                .build()
                .unwrap()
                .compile(Dialect::MySql)
                .unwrap()
        };
        assert_eq!(compile(Value::Integer(5)), "c TEXT DEFAULT 5");
        assert_eq!(compile(Value::Float(0.5)), "c TEXT DEFAULT 0.5");
        assert_eq!(compile(Value::Bool(true)), "c TEXT DEFAULT 1");
        assert_eq!(compile(Value::Null), "c TEXT DEFAULT NULL");
        assert_eq!(compile(Value::Text("it's".into())), "c TEXT DEFAULT 'it's'");
    }

    #[test]
    fn test_unsupported_type_propagates() {
        let table = TableSchema::builder("calendar")
            .column(
                ColumnSchema::builder("y", CanonicalType::Year)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        assert!(matches!(
            table.compile(Dialect::Sqlite),
            Err(TabulaError::UnsupportedDatabaseType { .. })
        ));
        assert_eq!(
            table.compile(Dialect::MySql).unwrap(),
            "CREATE TABLE calendar ( y YEAR );"
        );
    }

    #[test]
    fn test_foreign_key_constraint() {
        let users = Arc::new(sample());
        let orders = TableSchema::builder("orders")
            .if_not_exists()
            .column(
                ColumnSchema::builder("order_id", CanonicalType::Integer)
                    .primary_key()
                    .build()
                    .unwrap(),
            )
            .column(
                ColumnSchema::builder("owner", CanonicalType::Integer)
                    .not_null()
                    .references(ForeignKey::new(&users, "id").unwrap())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        assert_eq!(
            orders.compile(Dialect::MySql).unwrap(),
            "CREATE TABLE IF NOT EXISTS orders ( order_id INTEGER PRIMARY KEY, owner INTEGER NOT NULL, \
             CONSTRAINT fk_orders_T_owner FOREIGN KEY (owner) REFERENCES T(id) );"
        );
    }

    #[test]
    fn test_or_replace() {
        let mut table = sample();
        table.set_or_replace(true);
        assert!(
            table
                .compile(Dialect::MariaDb)
                .unwrap()
                .starts_with("CREATE OR REPLACE TABLE T ( ")
        );
        assert!(matches!(
            table.compile(Dialect::Sqlite),
            Err(TabulaError::UnsupportedFeature { dialect: Some(Dialect::Sqlite), .. })
        ));
        assert!(table.compile(Dialect::MySql).is_err());

        table.set_if_not_exists(true);
        assert!(
            table
                .compile(Dialect::Sqlite)
                .unwrap()
                .starts_with("CREATE TABLE IF NOT EXISTS T ( ")
        );
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(DdlGenerator::drop_table(&sample()), "DROP TABLE T");
    }

    #[test]
    fn test_empty_table_rejected() {
        let table = TableSchema::builder("empty").build().unwrap();
        assert!(matches!(
            table.compile(Dialect::MySql),
            Err(TabulaError::Schema(_))
        ));
    }
}
