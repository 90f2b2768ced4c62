//! Shared `SQLite` infrastructure for the graph backend.
//!
//! ## Module Structure
//!
//! - [`connection`]: Connection handling ([`Mutex<Connection>`](rusqlite::Connection), lock acquisition, configuration)
//! - [`metrics`]: Shared metrics recording helpers
//!
//! ## Design Principles
//!
//! - **Single connection per backend**: no shared state across backend instances.
//! - **Graceful degradation**: a poisoned mutex is recovered rather than propagated as a panic.
//! - **Performance**: `SQLite` WAL mode enables excellent concurrency even with a single connection.

mod connection;
mod metrics;

pub use connection::{
    MUTEX_LOCK_TIMEOUT, acquire_lock, acquire_lock_with_timeout, configure_connection,
};
pub use metrics::record_operation_metrics;
