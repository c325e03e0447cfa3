//! Shortest conceptual path (unweighted BFS)

use super::types::{neighbors, Direction};
use crate::graph::{ConceptId, KnowledgeGraph, RelationshipKind};
use std::collections::{HashMap, HashSet, VecDeque};

/// Query for the shortest path between two concepts
#[derive(Debug, Clone)]
pub struct PathQuery {
    pub source: ConceptId,
    pub target: ConceptId,
    /// Maximum number of hops, unbounded when `None`
    pub max_length: Option<usize>,
    pub direction: Direction,
    /// Relationship kinds to follow, all when `None`
    pub kinds: Option<Vec<RelationshipKind>>,
}

impl PathQuery {
    pub fn between(source: ConceptId, target: ConceptId) -> Self {
        Self {
            source,
            target,
            max_length: None,
            direction: Direction::Outgoing,
            kinds: None,
        }
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Restrict traversal to one relationship kind (repeatable)
    pub fn with_kind(mut self, kind: RelationshipKind) -> Self {
        self.kinds.get_or_insert_with(Vec::new).push(kind);
        self
    }

    /// Run the BFS. Returns the concepts from source to target inclusive, or
    /// an empty vector if the target is unreachable. Ties go to the edge
    /// inserted first.
    pub fn execute(&self, graph: &KnowledgeGraph) -> Vec<ConceptId> {
        if !graph.contains(&self.source) || !graph.contains(&self.target) {
            return Vec::new();
        }
        if self.source == self.target {
            return vec![self.source];
        }

        let mut visited: HashSet<ConceptId> = HashSet::from([self.source]);
        let mut predecessors: HashMap<ConceptId, ConceptId> = HashMap::new();
        let mut queue: VecDeque<(ConceptId, usize)> = VecDeque::from([(self.source, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if self.max_length.is_some_and(|max| depth >= max) {
                continue;
            }
            for (next, _) in neighbors(graph, &current, self.direction, self.kinds.as_deref()) {
                if !visited.insert(next) {
                    continue;
                }
                predecessors.insert(next, current);
                if next == self.target {
                    return self.reconstruct(&predecessors);
                }
                queue.push_back((next, depth + 1));
            }
        }
        Vec::new()
    }

    fn reconstruct(&self, predecessors: &HashMap<ConceptId, ConceptId>) -> Vec<ConceptId> {
        let mut path = vec![self.target];
        let mut current = self.target;
        while let Some(&previous) = predecessors.get(&current) {
            path.push(previous);
            current = previous;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ConceptRelationship;

    /// a -> b -> c -> d, b -> e -> f (e edges are related-to)
    fn create_test_graph() -> (KnowledgeGraph, Vec<ConceptId>) {
        let mut graph = KnowledgeGraph::new();
        let ids: Vec<ConceptId> = ["a", "b", "c", "d", "e", "f"].iter().map(|n| ConceptId::from_name(n)).collect();
        for id in &ids {
            graph.add_concept(*id);
        }
        let co = |a, b| ConceptRelationship::new(a, b, RelationshipKind::CoOccursWith, 1.0);
        graph.add_relationship(co(ids[0], ids[1])).unwrap();
        graph.add_relationship(co(ids[1], ids[2])).unwrap();
        graph.add_relationship(co(ids[2], ids[3])).unwrap();
        graph.add_relationship(ConceptRelationship::related_to(ids[1], ids[4], 1.0)).unwrap();
        graph.add_relationship(ConceptRelationship::related_to(ids[4], ids[5], 1.0)).unwrap();
        (graph, ids)
    }

    #[test]
    fn test_path_same_node() {
        let (graph, ids) = create_test_graph();
        assert_eq!(PathQuery::between(ids[0], ids[0]).execute(&graph), vec![ids[0]]);
    }

    #[test]
    fn test_path_three_hops() {
        let (graph, ids) = create_test_graph();
        let path = PathQuery::between(ids[0], ids[3]).execute(&graph);
        assert_eq!(path, vec![ids[0], ids[1], ids[2], ids[3]]);
    }

    #[test]
    fn test_path_not_found_against_direction() {
        let (graph, ids) = create_test_graph();
        assert!(PathQuery::between(ids[3], ids[0]).execute(&graph).is_empty());
    }

    #[test]
    fn test_path_bidirectional() {
        let (graph, ids) = create_test_graph();
        let path = PathQuery::between(ids[3], ids[0]).direction(Direction::Both).execute(&graph);
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_path_with_max_length() {
        let (graph, ids) = create_test_graph();
        assert!(PathQuery::between(ids[0], ids[3]).max_length(2).execute(&graph).is_empty());
        assert_eq!(PathQuery::between(ids[0], ids[3]).max_length(3).execute(&graph).len(), 4);
    }

    #[test]
    fn test_path_with_kind_filter() {
        let (graph, ids) = create_test_graph();
        let path = PathQuery::between(ids[0], ids[4])
            .with_kind(RelationshipKind::CoOccursWith)
            .execute(&graph);
        assert!(path.is_empty());
    }

    #[test]
    fn test_path_ties_follow_edge_insertion_order() {
        let mut graph = KnowledgeGraph::new();
        let ids: Vec<ConceptId> = ["s", "x", "y", "t"].iter().map(|n| ConceptId::from_name(n)).collect();
        for id in &ids {
            graph.add_concept(*id);
        }
        for (a, b) in [(0, 2), (0, 1), (1, 3), (2, 3)] {
            graph.add_relationship(ConceptRelationship::related_to(ids[a], ids[b], 1.0)).unwrap();
        }
        assert_eq!(PathQuery::between(ids[0], ids[3]).execute(&graph), vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn test_path_nonexistent_source() {
        let (graph, ids) = create_test_graph();
        assert!(PathQuery::between(ConceptId::from_name("ghost"), ids[0]).execute(&graph).is_empty());
    }
}
