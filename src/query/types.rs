//! Query types and result structures

use crate::graph::{ConceptId, ConceptRelationship, KnowledgeGraph, RelationshipKind};
use serde::Serialize;
use std::collections::HashMap;

/// Direction for edge traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Follow outgoing edges (from -> to)
    #[default]
    Outgoing,
    /// Follow incoming edges (to <- from)
    Incoming,
    /// Follow edges in both directions
    Both,
}

/// Edge cost for goal-directed search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostModel {
    /// `2 - strength`: strong edges are cheaper, and every hop costs at least 1
    #[default]
    Strength,
    /// Every hop costs 1
    Unit,
}

impl CostModel {
    pub fn cost(&self, relationship: &ConceptRelationship) -> f64 {
        match self {
            CostModel::Strength => 2.0 - relationship.strength.clamp(0.0, 1.0),
            CostModel::Unit => 1.0,
        }
    }
}

/// Result of a goal-directed search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Concepts from start to goal inclusive
    pub path: Vec<ConceptId>,
    /// Cumulative edge cost of the path
    pub cost: f64,
    /// Number of nodes expanded
    pub expanded: usize,
}

/// Importance scores, in graph insertion order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankResult {
    pub scores: Vec<(ConceptId, f64)>,
    pub iterations: usize,
}

impl RankResult {
    pub fn get(&self, id: &ConceptId) -> Option<f64> {
        self.scores.iter().find(|(c, _)| c == id).map(|(_, s)| *s)
    }

    /// Highest scores first; equal scores keep insertion order
    pub fn top_k(&self, k: usize) -> Vec<(ConceptId, f64)> {
        let mut sorted = self.scores.clone();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
        sorted.truncate(k);
        sorted
    }

    pub fn as_map(&self) -> HashMap<ConceptId, f64> {
        self.scores.iter().copied().collect()
    }

    pub fn total(&self) -> f64 {
        self.scores.iter().map(|(_, s)| s).sum()
    }
}

/// Neighbors of a concept along matching edges, in edge insertion order
pub(crate) fn neighbors<'a>(
    graph: &'a KnowledgeGraph,
    id: &ConceptId,
    direction: Direction,
    kinds: Option<&[RelationshipKind]>,
) -> Vec<(ConceptId, &'a ConceptRelationship)> {
    let accept = |r: &ConceptRelationship| kinds.map_or(true, |k| k.contains(&r.kind));
    let mut out = Vec::new();
    if matches!(direction, Direction::Outgoing | Direction::Both) {
        out.extend(graph.outgoing(id).filter(|r| accept(r)).map(|r| (r.to, r)));
    }
    if matches!(direction, Direction::Incoming | Direction::Both) {
        out.extend(graph.incoming(id).filter(|r| accept(r)).map(|r| (r.from, r)));
    }
    out
}
