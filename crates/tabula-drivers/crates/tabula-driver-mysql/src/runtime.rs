//! Tokio runtime for MySQL operations
//!
//! mysql_async needs a Tokio reactor for networking. The connection API is
//! blocking, so every call is driven to completion on a dedicated runtime.

use std::future::Future;
use std::sync::OnceLock;
use tabula_core::{Result, TabulaError};
use tokio::runtime::Runtime;

static MYSQL_RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn mysql_runtime() -> Result<&'static Runtime> {
    if let Some(runtime) = MYSQL_RUNTIME.get() {
        return Ok(runtime);
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("tabula-mysql-runtime")
        .build()
        .map_err(|e| TabulaError::Driver(format!("failed to start MySQL runtime: {}", e)))?;
    // A concurrent initializer may have won; its runtime is kept and ours dropped
    Ok(MYSQL_RUNTIME.get_or_init(|| runtime))
}

/// Run a future on the MySQL runtime, blocking the current thread until it completes.
///
/// Must not be called from inside another Tokio runtime.
pub fn block_on_mysql<F, T>(future: F) -> Result<T>
where
    F: Future<Output = T>,
{
    Ok(mysql_runtime()?.block_on(future))
}
