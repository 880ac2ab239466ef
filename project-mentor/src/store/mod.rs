//! Persistence backends for project records.
//!
//! - **memory**: tokio-mutexed map, used by tests and the `--memory` flag
//! - **sqlite**: durable store, one JSON record per session id

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
