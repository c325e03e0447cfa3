//! Connected components via union-find

use crate::graph::{ConceptId, KnowledgeGraph, RelationshipKind};
use std::collections::HashMap;

/// Disjoint-set forest with path compression and union by rank
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = x;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. Returns false if already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

/// Weakly connected components of a knowledge graph
#[derive(Debug, Clone, Default)]
pub struct ComponentsQuery {
    /// Relationship kinds that connect concepts; all when `None`
    pub kinds: Option<Vec<RelationshipKind>>,
}

impl ComponentsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: RelationshipKind) -> Self {
        self.kinds.get_or_insert_with(Vec::new).push(kind);
        self
    }

    /// Components ordered by their first concept; members in insertion order.
    pub fn execute(&self, graph: &KnowledgeGraph) -> Vec<Vec<ConceptId>> {
        let ids = graph.concept_ids();
        let position: HashMap<ConceptId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut sets = UnionFind::new(ids.len());

        for relationship in graph.relationships() {
            if self.kinds.as_ref().is_some_and(|k| !k.contains(&relationship.kind)) {
                continue;
            }
            if let (Some(&a), Some(&b)) = (position.get(&relationship.from), position.get(&relationship.to)) {
                sets.union(a, b);
            }
        }

        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut components: Vec<Vec<ConceptId>> = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            let root = sets.find(i);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                components.push(Vec::new());
                components.len() - 1
            });
            components[slot].push(*id);
        }
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ConceptRelationship;

    #[test]
    fn union_find_merges_and_compresses() {
        let mut uf = UnionFind::new(5);
        assert!(uf.union(0, 1));
        assert!(uf.union(1, 2));
        assert!(!uf.union(0, 2));
        assert_eq!(uf.find(2), uf.find(0));
        assert_ne!(uf.find(3), uf.find(0));
    }

    #[test]
    fn components_ignore_direction() {
        let mut graph = KnowledgeGraph::new();
        let ids: Vec<ConceptId> = ["a", "b", "c", "d", "e"].iter().map(|n| ConceptId::from_name(n)).collect();
        for id in &ids {
            graph.add_concept(*id);
        }
        graph.add_relationship(ConceptRelationship::parent_of(ids[1], ids[0], 1.0)).unwrap();
        graph.add_relationship(ConceptRelationship::related_to(ids[3], ids[2], 0.5)).unwrap();
        graph.add_relationship(ConceptRelationship::related_to(ids[1], ids[3], 0.5)).unwrap();

        let components = ComponentsQuery::new().execute(&graph);
        assert_eq!(components, vec![vec![ids[0], ids[1], ids[2], ids[3]], vec![ids[4]]]);

        let hierarchy_only = ComponentsQuery::new().with_kind(RelationshipKind::ParentOf).execute(&graph);
        assert_eq!(hierarchy_only.len(), 4);
    }
}
