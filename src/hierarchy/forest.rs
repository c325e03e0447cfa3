//! ConceptHierarchy: arena of concepts with cycle-guarded parent pointers
//!
//! Concepts live in a `Vec` addressed through an id table. Each concept
//! stores at most one parent; children are derived and kept in step with
//! the parent pointers on every assignment.

use crate::extraction::cosine_similarity;
use crate::graph::{
    Concept, ConceptId, EvidenceSentence, GraphChange, ParentRejection, ScholiaError, ScholiaResult,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of a parent assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentAssignment {
    Assigned,
    /// The child already had this parent
    Unchanged,
    Rejected(ParentRejection),
}

/// Shape and quality of a hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyMetrics {
    pub concept_count: usize,
    pub root_count: usize,
    /// Concepts without children
    pub leaf_count: usize,
    /// Number of levels; a forest of bare roots has depth 1
    pub max_depth: usize,
    /// Mean intra-level cosine similarity of concept embeddings
    pub coherence: f64,
}

/// The parent/child forest over a batch's concepts
#[derive(Debug, Clone, Default)]
pub struct ConceptHierarchy {
    concepts: Vec<Concept>,
    index: HashMap<ConceptId, usize>,
    children: Vec<Vec<usize>>,
    changes: Vec<GraphChange>,
}

impl ConceptHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a hierarchy from concepts carrying their stored parent ids.
    ///
    /// Parent pointers go back through `set_parent`, so a stored set with a
    /// dangling parent or a cycle is refused.
    pub fn from_concepts(concepts: Vec<Concept>) -> ScholiaResult<Self> {
        let mut hierarchy = Self::new();
        let mut links = Vec::new();
        for concept in concepts {
            if let Some(parent) = concept.parent {
                links.push((concept.id, parent));
            }
            hierarchy.insert(concept);
        }
        for (child, parent) in links {
            if let ParentAssignment::Rejected(_) = hierarchy.set_parent(child, parent)? {
                return Err(ScholiaError::CycleDetected {
                    remaining: vec![child, parent],
                });
            }
        }
        hierarchy.changes.clear();
        Ok(hierarchy)
    }

    /// Add a concept as a root. Returns false if the id is already present.
    pub fn insert(&mut self, mut concept: Concept) -> bool {
        if self.index.contains_key(&concept.id) {
            return false;
        }
        concept.parent = None;
        let id = concept.id;
        self.index.insert(id, self.concepts.len());
        self.concepts.push(concept);
        self.children.push(Vec::new());
        self.changes.push(GraphChange::ConceptAdded { concept_id: id });
        true
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn contains(&self, id: &ConceptId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &ConceptId) -> Option<&Concept> {
        self.index.get(id).map(|&i| &self.concepts[i])
    }

    /// Concepts in insertion order
    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.iter()
    }

    pub fn parent(&self, id: &ConceptId) -> Option<ConceptId> {
        self.get(id).and_then(|c| c.parent)
    }

    pub fn children(&self, id: &ConceptId) -> Vec<ConceptId> {
        self.index
            .get(id)
            .map(|&i| self.children[i].iter().map(|&c| self.concepts[c].id).collect())
            .unwrap_or_default()
    }

    pub fn roots(&self) -> Vec<ConceptId> {
        self.concepts.iter().filter(|c| c.parent.is_none()).map(|c| c.id).collect()
    }

    /// Ancestors from the direct parent upwards
    pub fn ancestors(&self, id: &ConceptId) -> Vec<ConceptId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if chain.len() >= self.concepts.len() {
                break;
            }
            chain.push(ancestor);
            current = self.parent(&ancestor);
        }
        chain
    }

    /// Depth of a concept; roots are level 0
    pub fn level(&self, id: &ConceptId) -> Option<usize> {
        self.contains(id).then(|| self.ancestors(id).len())
    }

    pub fn concepts_at_level(&self, level: usize) -> Vec<&Concept> {
        self.concepts
            .iter()
            .filter(|c| self.ancestors(&c.id).len() == level)
            .collect()
    }

    /// Assign `parent` as the parent of `child`
    ///
    /// Walks the parent's ancestor chain first; if `child` is on it the
    /// assignment is refused and nothing changes.
    pub fn set_parent(&mut self, child: ConceptId, parent: ConceptId) -> ScholiaResult<ParentAssignment> {
        let child_idx = *self.index.get(&child).ok_or(ScholiaError::ConceptNotFound(child))?;
        let parent_idx = *self.index.get(&parent).ok_or(ScholiaError::ConceptNotFound(parent))?;

        if child == parent {
            return Ok(self.reject(child, parent, ParentRejection::SelfParent));
        }
        if self.concepts[child_idx].parent == Some(parent) {
            return Ok(ParentAssignment::Unchanged);
        }
        if self.ancestors(&parent).contains(&child) {
            return Ok(self.reject(child, parent, ParentRejection::WouldCycle));
        }

        self.detach(child_idx);
        self.concepts[child_idx].parent = Some(parent);
        self.children[parent_idx].push(child_idx);
        self.changes.push(GraphChange::ParentAssigned { child, parent });
        Ok(ParentAssignment::Assigned)
    }

    fn reject(&mut self, child: ConceptId, parent: ConceptId, reason: ParentRejection) -> ParentAssignment {
        tracing::debug!(%child, %parent, ?reason, "parent assignment rejected");
        self.changes.push(GraphChange::ParentRejected { child, parent, reason });
        ParentAssignment::Rejected(reason)
    }

    fn detach(&mut self, child_idx: usize) {
        let Some(old) = self.concepts[child_idx].parent.take() else {
            return;
        };
        if let Some(&old_idx) = self.index.get(&old) {
            self.children[old_idx].retain(|&c| c != child_idx);
        }
    }

    /// Append evidence to a concept, skipping duplicates
    pub fn append_evidence(&mut self, id: &ConceptId, evidence: EvidenceSentence) -> ScholiaResult<bool> {
        let idx = *self.index.get(id).ok_or(ScholiaError::ConceptNotFound(*id))?;
        Ok(self.concepts[idx].add_evidence(evidence))
    }

    /// Scale a concept's confidence down; the concept itself stays
    pub fn demote(&mut self, id: &ConceptId, factor: f64) -> ScholiaResult<f64> {
        let idx = *self.index.get(id).ok_or(ScholiaError::ConceptNotFound(*id))?;
        let concept = &mut self.concepts[idx];
        concept.demote(factor);
        Ok(concept.confidence)
    }

    pub fn drain_changes(&mut self) -> Vec<GraphChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn metrics(&self) -> HierarchyMetrics {
        let mut levels: Vec<Vec<&Concept>> = Vec::new();
        for concept in &self.concepts {
            let level = self.ancestors(&concept.id).len();
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(concept);
        }

        let level_scores: Vec<f64> = levels
            .iter()
            .filter_map(|members| {
                let vectors: Vec<&[f32]> = members.iter().filter_map(|c| c.embedding.as_deref()).collect();
                mean_pairwise_similarity(&vectors)
            })
            .collect();
        let coherence = if level_scores.is_empty() {
            0.0
        } else {
            level_scores.iter().sum::<f64>() / level_scores.len() as f64
        };

        HierarchyMetrics {
            concept_count: self.concepts.len(),
            root_count: self.concepts.iter().filter(|c| c.parent.is_none()).count(),
            leaf_count: self.children.iter().filter(|c| c.is_empty()).count(),
            max_depth: levels.len(),
            coherence,
        }
    }
}

/// Mean cosine similarity over all pairs; `None` for fewer than two vectors
pub(crate) fn mean_pairwise_similarity(vectors: &[&[f32]]) -> Option<f64> {
    if vectors.len() < 2 {
        return None;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            total += cosine_similarity(vectors[i], vectors[j]) as f64;
            pairs += 1;
        }
    }
    Some(total / pairs as f64)
}
