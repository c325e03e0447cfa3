//! Visualization output: flat node and edge lists

use crate::graph::{ConceptId, GraphSnapshot, RelationshipKind, ScholiaResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: ConceptId,
    pub canonical_name: String,
    pub category: String,
    pub confidence: f64,
    pub evidence_count: usize,
    pub source_domains: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEdge {
    pub from: ConceptId,
    pub to: ConceptId,
    pub kind: RelationshipKind,
    pub strength: f64,
}

/// Node/edge payload for downstream renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationExport {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

impl VisualizationExport {
    /// Nodes in concept order, edges in insertion order
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let nodes = snapshot
            .hierarchy()
            .concepts()
            .map(|c| ExportNode {
                id: c.id,
                canonical_name: c.canonical_name.clone(),
                category: c.category.clone(),
                confidence: c.confidence,
                evidence_count: c.evidence_count(),
                source_domains: c.domains.clone(),
            })
            .collect();
        let edges = snapshot
            .graph()
            .relationships()
            .map(|r| ExportEdge {
                from: r.from,
                to: r.to,
                kind: r.kind,
                strength: r.strength,
            })
            .collect();
        Self { nodes, edges }
    }

    /// Drop nodes below a confidence and every edge touching them
    pub fn min_confidence(mut self, floor: f64) -> Self {
        self.nodes.retain(|n| n.confidence >= floor);
        let kept: BTreeSet<ConceptId> = self.nodes.iter().map(|n| n.id).collect();
        self.edges.retain(|e| kept.contains(&e.from) && kept.contains(&e.to));
        self
    }

    pub fn to_json(&self) -> ScholiaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
