//! Storage backends for Scholia
//!
//! Published batches persist through the `SnapshotStore` trait.
//! The primary implementation is `SqliteStore`.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{BatchSummary, OpenStore, SnapshotStore, StorageError, StorageResult};
