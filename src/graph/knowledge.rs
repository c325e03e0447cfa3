//! KnowledgeGraph: concept ids plus typed relationships, with forward and
//! reverse adjacency kept consistent on every insertion and removal

use super::change::GraphChange;
use super::concept::ConceptId;
use super::engine::{ScholiaError, ScholiaResult};
use super::relationship::{ConceptRelationship, EdgeKey, RelationshipKind};
use crate::extraction::CancellationToken;
use crate::query::{
    ComponentsQuery, Heuristic, OrderQuery, PathQuery, RankQuery, RankResult, SearchQuery,
    SearchResult,
};
use std::collections::{HashMap, HashSet};

/// Adjacency structure over concepts and their relationships
///
/// Edges are unique per (from, to, kind); inserting an existing edge
/// reinforces it instead. Iteration follows insertion order so traversal
/// ties resolve the same way on every run.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    /// Concept ids in insertion order
    order: Vec<ConceptId>,
    nodes: HashSet<ConceptId>,
    edges: HashMap<EdgeKey, ConceptRelationship>,
    /// Edge keys in insertion order
    edge_order: Vec<EdgeKey>,
    forward: HashMap<ConceptId, Vec<EdgeKey>>,
    reverse: HashMap<ConceptId, Vec<EdgeKey>>,
    changes: Vec<GraphChange>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from stored parts without recording changes.
    pub fn from_parts(
        concepts: impl IntoIterator<Item = ConceptId>,
        relationships: impl IntoIterator<Item = ConceptRelationship>,
    ) -> ScholiaResult<Self> {
        let mut graph = Self::new();
        for id in concepts {
            graph.add_concept(id);
        }
        for relationship in relationships {
            graph.add_relationship(relationship)?;
        }
        graph.changes.clear();
        Ok(graph)
    }

    /// Add a concept node. Returns false if it was already present.
    pub fn add_concept(&mut self, id: ConceptId) -> bool {
        if !self.nodes.insert(id) {
            return false;
        }
        self.order.push(id);
        self.changes.push(GraphChange::ConceptAdded { concept_id: id });
        true
    }

    pub fn contains(&self, id: &ConceptId) -> bool {
        self.nodes.contains(id)
    }

    /// Concept ids in insertion order
    pub fn concept_ids(&self) -> &[ConceptId] {
        &self.order
    }

    pub fn concept_count(&self) -> usize {
        self.order.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.edge_order.len()
    }

    /// Insert or reinforce a relationship
    ///
    /// Both endpoints must already be in the graph. Self-loops are refused,
    /// and a `parent-of` edge that would close a cycle through existing
    /// `parent-of` edges is refused with `CycleDetected` before anything
    /// is written.
    pub fn add_relationship(&mut self, relationship: ConceptRelationship) -> ScholiaResult<()> {
        for id in [&relationship.from, &relationship.to] {
            if !self.contains(id) {
                return Err(ScholiaError::ConceptNotFound(*id));
            }
        }
        if relationship.from == relationship.to {
            return Err(ScholiaError::InvalidRelationship(format!(
                "{} edge from {} to itself",
                relationship.kind, relationship.from
            )));
        }

        let key = relationship.key();
        if let Some(existing) = self.edges.get_mut(&key) {
            existing.reinforce(&relationship);
            self.changes.push(GraphChange::RelationshipReinforced {
                from: key.from,
                to: key.to,
                kind: key.kind,
                evidence_count: existing.evidence_count,
            });
            return Ok(());
        }

        if key.kind == RelationshipKind::ParentOf && self.reaches(key.to, key.from, RelationshipKind::ParentOf) {
            return Err(ScholiaError::CycleDetected {
                remaining: vec![key.from, key.to],
            });
        }

        self.forward.entry(key.from).or_default().push(key);
        self.reverse.entry(key.to).or_default().push(key);
        self.edge_order.push(key);
        self.edges.insert(key, relationship);
        self.changes.push(GraphChange::RelationshipAdded {
            from: key.from,
            to: key.to,
            kind: key.kind,
        });
        Ok(())
    }

    /// Remove a relationship from both adjacency maps.
    pub fn remove_relationship(
        &mut self,
        from: ConceptId,
        to: ConceptId,
        kind: RelationshipKind,
    ) -> Option<ConceptRelationship> {
        let key = EdgeKey { from, to, kind };
        let removed = self.edges.remove(&key)?;

        if let Some(keys) = self.forward.get_mut(&from) {
            keys.retain(|k| k != &key);
        }
        if let Some(keys) = self.reverse.get_mut(&to) {
            keys.retain(|k| k != &key);
        }
        self.edge_order.retain(|k| k != &key);
        self.changes.push(GraphChange::RelationshipRemoved { from, to, kind });
        Some(removed)
    }

    pub fn relationship(&self, from: ConceptId, to: ConceptId, kind: RelationshipKind) -> Option<&ConceptRelationship> {
        self.edges.get(&EdgeKey { from, to, kind })
    }

    /// All relationships in insertion order
    pub fn relationships(&self) -> impl Iterator<Item = &ConceptRelationship> {
        self.edge_order.iter().filter_map(|k| self.edges.get(k))
    }

    /// Outgoing relationships of a concept, in insertion order
    pub fn outgoing(&self, id: &ConceptId) -> impl Iterator<Item = &ConceptRelationship> {
        self.forward
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|k| self.edges.get(k))
    }

    /// Incoming relationships of a concept, in insertion order
    pub fn incoming(&self, id: &ConceptId) -> impl Iterator<Item = &ConceptRelationship> {
        self.reverse
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|k| self.edges.get(k))
    }

    /// Distinct out-neighbors, first edge first
    pub fn successors(&self, id: &ConceptId) -> Vec<ConceptId> {
        let mut seen = HashSet::new();
        self.outgoing(id).map(|r| r.to).filter(|to| seen.insert(*to)).collect()
    }

    /// Distinct in-neighbors, first edge first
    pub fn predecessors(&self, id: &ConceptId) -> Vec<ConceptId> {
        let mut seen = HashSet::new();
        self.incoming(id).map(|r| r.from).filter(|from| seen.insert(*from)).collect()
    }

    /// Whether `target` is reachable from `start` over edges of one kind
    fn reaches(&self, start: ConceptId, target: ConceptId, kind: RelationshipKind) -> bool {
        let mut stack = vec![start];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.extend(self.outgoing(&current).filter(|r| r.kind == kind).map(|r| r.to));
        }
        false
    }

    /// Take every change recorded since the last drain.
    pub fn drain_changes(&mut self) -> Vec<GraphChange> {
        std::mem::take(&mut self.changes)
    }

    /// Verify that forward and reverse adjacency describe the same edge set.
    pub fn is_consistent(&self) -> bool {
        let forward: usize = self.forward.values().map(Vec::len).sum();
        let reverse: usize = self.reverse.values().map(Vec::len).sum();
        if forward != self.edges.len() || reverse != self.edges.len() || self.edge_order.len() != self.edges.len() {
            return false;
        }
        self.forward
            .iter()
            .all(|(from, keys)| keys.iter().all(|k| k.from == *from && self.edges.contains_key(k)))
            && self
                .reverse
                .iter()
                .all(|(to, keys)| keys.iter().all(|k| k.to == *to && self.edges.contains_key(k)))
    }

    /// Shortest unweighted path; empty when unreachable.
    pub fn shortest_path(&self, start: ConceptId, goal: ConceptId) -> Vec<ConceptId> {
        PathQuery::between(start, goal).execute(self)
    }

    /// Best-first search guided by a caller-supplied heuristic.
    pub fn goal_directed_search<H>(&self, start: ConceptId, goal: ConceptId, heuristic: H) -> Option<SearchResult>
    where
        H: Fn(&ConceptId) -> f64 + Send + Sync + 'static,
    {
        SearchQuery::between(start, goal)
            .with_heuristic(Box::new(heuristic) as Heuristic)
            .execute(self)
    }

    /// Random-walk importance over every edge kind.
    pub fn importance_ranking(&self, damping: f64, iterations: usize) -> ScholiaResult<RankResult> {
        RankQuery::new()
            .damping(damping)
            .iterations(iterations)
            .execute(self, &CancellationToken::new())
    }

    /// Topological order over `parent-of` edges.
    pub fn dependency_order(&self) -> ScholiaResult<Vec<ConceptId>> {
        OrderQuery::hierarchy().execute(self)
    }

    /// Weakly connected components, each in insertion order.
    pub fn connected_components(&self) -> Vec<Vec<ConceptId>> {
        ComponentsQuery::new().execute(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(names: &[&str]) -> (KnowledgeGraph, Vec<ConceptId>) {
        let mut graph = KnowledgeGraph::new();
        let ids: Vec<ConceptId> = names.iter().map(|n| ConceptId::from_name(n)).collect();
        for id in &ids {
            graph.add_concept(*id);
        }
        (graph, ids)
    }

    #[test]
    fn adjacency_stays_consistent_through_insert_and_remove() {
        let (mut graph, ids) = graph_with(&["a", "b", "c"]);
        graph.add_relationship(ConceptRelationship::related_to(ids[0], ids[1], 0.5)).unwrap();
        graph.add_relationship(ConceptRelationship::parent_of(ids[1], ids[2], 0.7)).unwrap();
        assert!(graph.is_consistent());
        assert_eq!(graph.successors(&ids[0]), vec![ids[1]]);
        assert_eq!(graph.predecessors(&ids[2]), vec![ids[1]]);

        let removed = graph.remove_relationship(ids[0], ids[1], RelationshipKind::RelatedTo);
        assert!(removed.is_some());
        assert!(graph.is_consistent());
        assert!(graph.successors(&ids[0]).is_empty());
        assert_eq!(graph.relationship_count(), 1);
    }

    #[test]
    fn repeated_edge_reinforces() {
        let (mut graph, ids) = graph_with(&["a", "b"]);
        graph.add_relationship(ConceptRelationship::related_to(ids[0], ids[1], 0.4)).unwrap();
        graph.add_relationship(ConceptRelationship::related_to(ids[0], ids[1], 0.8)).unwrap();

        assert_eq!(graph.relationship_count(), 1);
        let edge = graph.relationship(ids[0], ids[1], RelationshipKind::RelatedTo).unwrap();
        assert_eq!(edge.evidence_count, 2);
        assert_eq!(edge.strength, 0.8);

        let changes = graph.drain_changes();
        assert!(matches!(
            changes.last(),
            Some(GraphChange::RelationshipReinforced { evidence_count: 2, .. })
        ));
        assert!(graph.drain_changes().is_empty());
    }

    #[test]
    fn parent_cycle_is_rejected_before_commit() {
        let (mut graph, ids) = graph_with(&["a", "b", "c"]);
        graph.add_relationship(ConceptRelationship::parent_of(ids[0], ids[1], 1.0)).unwrap();
        graph.add_relationship(ConceptRelationship::parent_of(ids[1], ids[2], 1.0)).unwrap();

        let err = graph
            .add_relationship(ConceptRelationship::parent_of(ids[2], ids[0], 1.0))
            .unwrap_err();
        assert!(matches!(err, ScholiaError::CycleDetected { .. }));
        assert_eq!(graph.relationship_count(), 2);

        // the same pair as a side relationship is fine
        graph.add_relationship(ConceptRelationship::related_to(ids[2], ids[0], 0.5)).unwrap();
        assert!(graph.is_consistent());
    }

    #[test]
    fn unknown_endpoints_and_self_loops_are_refused() {
        let (mut graph, ids) = graph_with(&["a"]);
        let ghost = ConceptId::from_name("ghost");
        assert!(matches!(
            graph.add_relationship(ConceptRelationship::related_to(ids[0], ghost, 0.5)),
            Err(ScholiaError::ConceptNotFound(id)) if id == ghost
        ));
        assert!(matches!(
            graph.add_relationship(ConceptRelationship::related_to(ids[0], ids[0], 0.5)),
            Err(ScholiaError::InvalidRelationship(_))
        ));
    }

    #[test]
    fn from_parts_records_no_changes() {
        let ids = [ConceptId::from_name("a"), ConceptId::from_name("b")];
        let mut graph =
            KnowledgeGraph::from_parts(ids, vec![ConceptRelationship::related_to(ids[0], ids[1], 0.3)]).unwrap();
        assert_eq!(graph.concept_count(), 2);
        assert_eq!(graph.relationship_count(), 1);
        assert!(graph.drain_changes().is_empty());
    }
}
