//! Tabula Core - schema model, SQL generation and driver abstractions
//!
//! This crate provides the types every other Tabula crate depends on:
//!
//! - `Dialect` - supported backends and their syntax quirks
//! - `CanonicalType` - dialect independent column types and their resolution
//! - `ColumnSchema` / `TableSchema` - declarative table descriptions
//! - `DdlGenerator` - CREATE/DROP TABLE text per dialect
//! - `DatabaseRecord` and the `marshal` functions - typed record conversion
//! - `DatabaseResult` - flattened query results
//! - `Connection` / `DatabaseDriver` - the seams drivers implement

mod connection;
mod data_type;
mod ddl;
mod dialect;
mod driver;
mod error;
pub mod marshal;
mod result;
mod schema;
mod statement;
mod types;

pub use connection::*;
pub use data_type::*;
pub use ddl::*;
pub use dialect::*;
pub use driver::*;
pub use error::*;
pub use marshal::{DatabaseRecord, FieldValue};
pub use result::*;
pub use schema::*;
pub use statement::*;
pub use types::*;
