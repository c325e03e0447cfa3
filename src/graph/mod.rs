//! Core graph data structures

mod change;
mod concept;
mod engine;
mod knowledge;
mod relationship;
mod snapshot;

#[cfg(test)]
mod tests;

pub use change::{GraphChange, ParentRejection};
pub use concept::{Concept, ConceptFlags, ConceptId, EvidenceSentence, Strategy, SurfaceForm};
pub use engine::{BatchId, ScholiaEngine, ScholiaError, ScholiaResult};
pub use knowledge::KnowledgeGraph;
pub use relationship::{ConceptRelationship, EdgeKey, RelationshipKind};
pub use snapshot::{BatchWarning, GraphSnapshot, QualityReport};
