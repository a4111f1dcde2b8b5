//! Tabula Connection - the connection handle and the statements it runs
//!
//! A [`ConnectionHandle`] owns one driver connection for one dialect. It
//! composes INSERT/SELECT/UPDATE/DELETE statements from a [`TableSchema`],
//! always binding values as parameters, and caches liveness probes for a
//! short window.
//!
//! [`TableSchema`]: tabula_core::TableSchema

mod composer;
mod handle;
mod liveness;

pub use composer::StatementComposer;
pub use handle::ConnectionHandle;
pub use liveness::LivenessCache;
