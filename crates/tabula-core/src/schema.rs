//! Column and table schema objects

mod column;
mod table;

pub use column::{ColumnSchema, ColumnSchemaBuilder, ForeignKey};
pub use table::{TableSchema, TableSchemaBuilder};
