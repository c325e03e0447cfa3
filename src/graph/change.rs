//! Change log records emitted on every structural mutation
//!
//! Callers poll them with `drain_changes()` or receive them over the
//! pipeline's change channel. Nothing fires callbacks.

use super::concept::ConceptId;
use super::relationship::RelationshipKind;
use serde::{Deserialize, Serialize};

/// Why a parent assignment was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRejection {
    /// Child and parent are the same concept
    SelfParent,
    /// The child already appears in the parent's ancestor chain
    WouldCycle,
}

/// A single graph or hierarchy mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum GraphChange {
    ConceptAdded {
        concept_id: ConceptId,
    },
    RelationshipAdded {
        from: ConceptId,
        to: ConceptId,
        kind: RelationshipKind,
    },
    /// An existing relationship was detected again
    RelationshipReinforced {
        from: ConceptId,
        to: ConceptId,
        kind: RelationshipKind,
        evidence_count: u32,
    },
    RelationshipRemoved {
        from: ConceptId,
        to: ConceptId,
        kind: RelationshipKind,
    },
    ParentAssigned {
        child: ConceptId,
        parent: ConceptId,
    },
    ParentRejected {
        child: ConceptId,
        parent: ConceptId,
        reason: ParentRejection,
    },
}
