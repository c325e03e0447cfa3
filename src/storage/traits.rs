//! Storage trait definitions

use crate::graph::{BatchId, GraphSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    /// Stored rows no longer form a valid snapshot
    #[error("Corrupt batch {batch}: {reason}")]
    Corrupt { batch: String, reason: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One line of a batch listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: BatchId,
    pub created_at: DateTime<Utc>,
    pub concept_count: usize,
    pub relationship_count: usize,
}

/// Trait for snapshot storage backends
///
/// A snapshot is written and replaced as a whole. Implementations must be
/// thread-safe (Send + Sync) so one store can back a shared engine.
pub trait SnapshotStore: Send + Sync {
    /// Insert or replace the snapshot for its batch
    fn save_snapshot(&self, snapshot: &GraphSnapshot) -> StorageResult<()>;

    fn load_snapshot(&self, id: &BatchId) -> StorageResult<Option<GraphSnapshot>>;

    /// Delete a batch with its concepts and relationships
    fn delete_snapshot(&self, id: &BatchId) -> StorageResult<bool>;

    /// Batch ids, oldest first
    fn list_batches(&self) -> StorageResult<Vec<BatchId>>;

    /// Batch ids with row counts, oldest first
    fn batch_summaries(&self) -> StorageResult<Vec<BatchSummary>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: SnapshotStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
