//! Dependency ordering (Kahn's topological sort)

use crate::graph::{ConceptId, KnowledgeGraph, RelationshipKind, ScholiaError, ScholiaResult};
use std::collections::{HashMap, VecDeque};

/// Topological order over a chosen edge set
///
/// Defaults to `parent-of` edges, which the graph keeps acyclic. Adding other
/// kinds or caller-supplied edges can introduce a cycle; that fails with
/// `CycleDetected` naming the concepts that could not be ordered.
#[derive(Debug, Clone)]
pub struct OrderQuery {
    pub kinds: Vec<RelationshipKind>,
    /// Extra `(before, after)` constraints supplied by the caller
    pub extra_edges: Vec<(ConceptId, ConceptId)>,
}

impl OrderQuery {
    /// Order along `parent-of` edges only
    pub fn hierarchy() -> Self {
        Self {
            kinds: vec![RelationshipKind::ParentOf],
            extra_edges: Vec::new(),
        }
    }

    pub fn including(mut self, kind: RelationshipKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    pub fn with_edges(mut self, edges: impl IntoIterator<Item = (ConceptId, ConceptId)>) -> Self {
        self.extra_edges.extend(edges);
        self
    }

    pub fn execute(&self, graph: &KnowledgeGraph) -> ScholiaResult<Vec<ConceptId>> {
        for (from, to) in &self.extra_edges {
            for id in [from, to] {
                if !graph.contains(id) {
                    return Err(ScholiaError::ConceptNotFound(*id));
                }
            }
        }

        let ids = graph.concept_ids();
        let mut successors: HashMap<ConceptId, Vec<ConceptId>> = HashMap::new();
        let mut in_degree: HashMap<ConceptId, usize> = ids.iter().map(|id| (*id, 0)).collect();

        let graph_edges = graph
            .relationships()
            .filter(|r| self.kinds.contains(&r.kind))
            .map(|r| (r.from, r.to));
        for (from, to) in graph_edges.chain(self.extra_edges.iter().copied()) {
            successors.entry(from).or_default().push(to);
            *in_degree.entry(to).or_default() += 1;
        }

        let mut queue: VecDeque<ConceptId> = ids.iter().copied().filter(|id| in_degree[id] == 0).collect();
        let mut order = Vec::with_capacity(ids.len());

        while let Some(id) = queue.pop_front() {
            order.push(id);
            for next in successors.get(&id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*next);
                    }
                }
            }
        }

        if order.len() < ids.len() {
            let remaining: Vec<ConceptId> = ids.iter().copied().filter(|id| in_degree[id] > 0).collect();
            tracing::warn!(remaining = remaining.len(), "dependency ordering hit a cycle");
            return Err(ScholiaError::CycleDetected { remaining });
        }
        Ok(order)
    }
}
