//! Immutable per-batch output: hierarchy, graph and quality report

use super::concept::{Concept, ConceptId, EvidenceSentence, Strategy};
use super::engine::{BatchId, ScholiaError, ScholiaResult};
use super::knowledge::KnowledgeGraph;
use crate::corpus::PaperId;
use crate::hierarchy::{ConceptHierarchy, HierarchyMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A recoverable problem recorded while building a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum BatchWarning {
    /// A generator reported its provider unavailable for one paper
    StrategyUnavailable {
        strategy: Strategy,
        paper_id: PaperId,
        message: String,
    },
    /// Candidate embedding failed for the whole batch; clustering fell back
    /// to exact surface matches
    EmbeddingUnavailable { message: String },
    /// The paper had no readable text and was skipped
    BlankPaper { paper_id: PaperId },
    /// No evidence sentence mentions the concept
    UngroundedConcept { concept_id: ConceptId, name: String },
}

/// Per-batch quality metadata handed back with the graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub paper_count: usize,
    /// Candidates emitted per strategy
    pub candidate_counts: BTreeMap<Strategy, usize>,
    pub concept_count: usize,
    pub low_confidence: usize,
    /// Concepts left without evidence
    pub ungrounded: Vec<ConceptId>,
    /// Evidence sentences bound across all concepts
    pub evidence_count: usize,
    pub relationship_count: usize,
    /// Parent assignments turned into `related-to` edges
    pub rejected_parents: usize,
    pub hierarchy: HierarchyMetrics,
    pub warnings: Vec<BatchWarning>,
}

impl QualityReport {
    /// True when at least one strategy ran degraded
    pub fn is_degraded(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, BatchWarning::StrategyUnavailable { .. } | BatchWarning::EmbeddingUnavailable { .. }))
    }
}

/// A finished batch
///
/// Built once by the pipeline and never mutated afterwards; the engine shares
/// it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    batch_id: BatchId,
    created_at: DateTime<Utc>,
    hierarchy: ConceptHierarchy,
    graph: KnowledgeGraph,
    report: QualityReport,
}

impl GraphSnapshot {
    pub fn new(batch_id: BatchId, hierarchy: ConceptHierarchy, graph: KnowledgeGraph, report: QualityReport) -> Self {
        Self {
            batch_id,
            created_at: Utc::now(),
            hierarchy,
            graph,
            report,
        }
    }

    /// Reassemble a stored snapshot
    pub fn restore(
        batch_id: BatchId,
        created_at: DateTime<Utc>,
        concepts: Vec<Concept>,
        relationships: Vec<super::ConceptRelationship>,
        report: QualityReport,
    ) -> ScholiaResult<Self> {
        let graph = KnowledgeGraph::from_parts(concepts.iter().map(|c| c.id), relationships)?;
        let hierarchy = ConceptHierarchy::from_concepts(concepts)?;
        Ok(Self {
            batch_id,
            created_at,
            hierarchy,
            graph,
            report,
        })
    }

    pub fn batch_id(&self) -> &BatchId {
        &self.batch_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn hierarchy(&self) -> &ConceptHierarchy {
        &self.hierarchy
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn report(&self) -> &QualityReport {
        &self.report
    }

    pub fn concept(&self, id: &ConceptId) -> Option<&Concept> {
        self.hierarchy.get(id)
    }

    /// Concepts at a hierarchy level (roots are level 0)
    pub fn concepts_at_level(&self, level: usize) -> Vec<&Concept> {
        self.hierarchy.concepts_at_level(level)
    }

    /// Look a concept up by canonical name or alias
    pub fn find_by_name(&self, name: &str) -> Option<&Concept> {
        self.hierarchy.concepts().find(|c| c.matches_surface(name))
    }

    /// Evidence bound to a concept
    pub fn evidence(&self, id: &ConceptId) -> ScholiaResult<&[EvidenceSentence]> {
        self.hierarchy
            .get(id)
            .map(|c| c.evidence.as_slice())
            .ok_or(ScholiaError::ConceptNotFound(*id))
    }
}
