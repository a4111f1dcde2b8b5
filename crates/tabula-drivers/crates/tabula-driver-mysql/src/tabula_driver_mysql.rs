//! MySQL/MariaDB driver implementation

mod connection;
mod driver;
mod runtime;

pub use connection::MySqlConnection;
pub use driver::MySqlDriver;
pub use runtime::block_on_mysql;
