//! ScholiaEngine: registry of published, immutable batch snapshots

use super::concept::ConceptId;
use super::snapshot::GraphSnapshot;
use crate::storage::{SnapshotStore, StorageError};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in Scholia operations
#[derive(Debug, Error)]
pub enum ScholiaError {
    #[error("Concept not found: {0}")]
    ConceptNotFound(ConceptId),

    #[error("Batch not found: {0}")]
    BatchNotFound(BatchId),

    /// A caller-supplied edge set is not acyclic
    #[error("Cycle detected among {} concepts", remaining.len())]
    CycleDetected { remaining: Vec<ConceptId> },

    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("Operation cancelled")]
    Cancelled,

    /// Fatal: the batch had no usable paper text
    #[error("Corpus for batch {0} contains no readable text")]
    EmptyCorpus(BatchId),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for Scholia operations
pub type ScholiaResult<T> = Result<T, ScholiaError>;

/// Identifier of one processing batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    /// Generate a new random batch id
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BatchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The main Scholia engine
///
/// Holds one immutable snapshot per published batch. Readers receive `Arc`
/// clones, so a rebuild of a batch swaps the whole snapshot in one step and
/// nobody observes a half-built graph. With a store attached, every publish
/// is persisted before it becomes visible.
#[derive(Default)]
pub struct ScholiaEngine {
    snapshots: DashMap<BatchId, Arc<GraphSnapshot>>,
    store: Option<Arc<dyn SnapshotStore>>,
}

impl std::fmt::Debug for ScholiaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScholiaEngine")
            .field("batches", &self.snapshots.len())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl ScholiaEngine {
    /// Create an in-memory engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine that persists every published snapshot
    pub fn with_store(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            snapshots: DashMap::new(),
            store: Some(store),
        }
    }

    /// Load every stored snapshot into memory. Returns how many were loaded.
    pub fn load_all(&self) -> ScholiaResult<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let mut loaded = 0;
        for id in store.list_batches()? {
            if let Some(snapshot) = store.load_snapshot(&id)? {
                self.snapshots.insert(id, Arc::new(snapshot));
                loaded += 1;
            }
        }
        tracing::debug!(loaded, "loaded stored snapshots");
        Ok(loaded)
    }

    /// Publish a finished snapshot, replacing any previous one for the batch.
    pub fn publish(&self, snapshot: GraphSnapshot) -> ScholiaResult<Arc<GraphSnapshot>> {
        if let Some(store) = &self.store {
            store.save_snapshot(&snapshot)?;
        }
        let id = snapshot.batch_id().clone();
        let snapshot = Arc::new(snapshot);
        self.snapshots.insert(id.clone(), Arc::clone(&snapshot));
        tracing::info!(batch = %id, concepts = snapshot.hierarchy().len(), "published snapshot");
        Ok(snapshot)
    }

    /// Get the current snapshot of a batch
    pub fn snapshot(&self, id: &BatchId) -> Option<Arc<GraphSnapshot>> {
        self.snapshots.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Get a snapshot or fail with `BatchNotFound`
    pub fn require(&self, id: &BatchId) -> ScholiaResult<Arc<GraphSnapshot>> {
        self.snapshot(id).ok_or_else(|| ScholiaError::BatchNotFound(id.clone()))
    }

    /// Remove a batch from memory and from the store
    pub fn remove(&self, id: &BatchId) -> ScholiaResult<Option<Arc<GraphSnapshot>>> {
        if let Some(store) = &self.store {
            store.delete_snapshot(id)?;
        }
        Ok(self.snapshots.remove(id).map(|(_, s)| s))
    }

    /// Batch ids, oldest first
    pub fn list_batches(&self) -> Vec<BatchId> {
        let mut entries: Vec<_> = self
            .snapshots
            .iter()
            .map(|r| (r.value().created_at(), r.key().clone()))
            .collect();
        entries.sort();
        entries.into_iter().map(|(_, id)| id).collect()
    }

    pub fn batch_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn has_batch(&self, id: &BatchId) -> bool {
        self.snapshots.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Concept, QualityReport};
    use crate::hierarchy::ConceptHierarchy;
    use crate::graph::KnowledgeGraph;

    fn snapshot(id: &str) -> GraphSnapshot {
        let concept = Concept::new("loops", "concept");
        let mut graph = KnowledgeGraph::new();
        graph.add_concept(concept.id);
        let hierarchy = ConceptHierarchy::from_concepts(vec![concept]).unwrap();
        GraphSnapshot::new(BatchId::from(id), hierarchy, graph, QualityReport::default())
    }

    #[test]
    fn test_create_engine() {
        let engine = ScholiaEngine::new();
        assert_eq!(engine.batch_count(), 0);
        assert_eq!(engine.load_all().unwrap(), 0);
    }

    #[test]
    fn test_publish_and_get() {
        let engine = ScholiaEngine::new();
        engine.publish(snapshot("b1")).unwrap();

        assert!(engine.has_batch(&BatchId::from("b1")));
        let snap = engine.snapshot(&BatchId::from("b1")).unwrap();
        assert_eq!(snap.hierarchy().len(), 1);
        assert!(engine.snapshot(&BatchId::from("missing")).is_none());
        assert!(matches!(
            engine.require(&BatchId::from("missing")),
            Err(ScholiaError::BatchNotFound(_))
        ));
    }

    #[test]
    fn test_republish_replaces_but_readers_keep_old_snapshot() {
        let engine = ScholiaEngine::new();
        let first = engine.publish(snapshot("b1")).unwrap();
        let held = engine.snapshot(&BatchId::from("b1")).unwrap();
        engine.publish(snapshot("b1")).unwrap();

        assert_eq!(engine.batch_count(), 1);
        assert!(Arc::ptr_eq(&first, &held));
        let current = engine.snapshot(&BatchId::from("b1")).unwrap();
        assert!(!Arc::ptr_eq(&current, &held));
    }

    #[test]
    fn test_remove_batch() {
        let engine = ScholiaEngine::new();
        engine.publish(snapshot("b1")).unwrap();
        engine.publish(snapshot("b2")).unwrap();

        assert!(engine.remove(&BatchId::from("b1")).unwrap().is_some());
        assert_eq!(engine.list_batches(), vec![BatchId::from("b2")]);
    }
}
