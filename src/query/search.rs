//! Goal-directed best-first search (A*)

use super::types::{neighbors, CostModel, Direction, SearchResult};
use crate::graph::{ConceptId, KnowledgeGraph, RelationshipKind};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Estimate of the remaining cost from a concept to the goal.
///
/// Must be admissible for the result to be optimal; nothing here checks it.
/// Consistency is not required: a node reached again more cheaply is
/// reopened.
pub type Heuristic = Box<dyn Fn(&ConceptId) -> f64 + Send + Sync>;

/// Heap entry. Lowest `f` first, then lowest `g`, then first pushed.
struct Frontier {
    f: f64,
    g: f64,
    seq: usize,
    node: ConceptId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    // reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.g.total_cmp(&self.g))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Cost-guided search between two concepts
pub struct SearchQuery {
    pub source: ConceptId,
    pub target: ConceptId,
    pub direction: Direction,
    pub cost_model: CostModel,
    pub kinds: Option<Vec<RelationshipKind>>,
    heuristic: Option<Heuristic>,
}

impl SearchQuery {
    pub fn between(source: ConceptId, target: ConceptId) -> Self {
        Self {
            source,
            target,
            direction: Direction::Outgoing,
            cost_model: CostModel::default(),
            kinds: None,
            heuristic: None,
        }
    }

    /// Without a heuristic the search degrades to uniform-cost search.
    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = Some(heuristic);
        self
    }

    pub fn cost_model(mut self, cost_model: CostModel) -> Self {
        self.cost_model = cost_model;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_kind(mut self, kind: RelationshipKind) -> Self {
        self.kinds.get_or_insert_with(Vec::new).push(kind);
        self
    }

    fn estimate(&self, id: &ConceptId) -> f64 {
        self.heuristic.as_ref().map_or(0.0, |h| h(id).max(0.0))
    }

    /// Run the search; `None` if the goal is unreachable.
    pub fn execute(&self, graph: &KnowledgeGraph) -> Option<SearchResult> {
        if !graph.contains(&self.source) || !graph.contains(&self.target) {
            return None;
        }

        let mut seq = 0;
        let mut heap = BinaryHeap::new();
        let mut best: HashMap<ConceptId, f64> = HashMap::from([(self.source, 0.0)]);
        let mut predecessors: HashMap<ConceptId, ConceptId> = HashMap::new();
        let mut expanded = 0;

        heap.push(Frontier {
            f: self.estimate(&self.source),
            g: 0.0,
            seq,
            node: self.source,
        });

        while let Some(Frontier { g, node, .. }) = heap.pop() {
            // superseded by a cheaper route pushed later
            if best.get(&node).is_some_and(|&known| g > known) {
                continue;
            }
            expanded += 1;
            if node == self.target {
                let mut path = vec![node];
                let mut current = node;
                while let Some(&previous) = predecessors.get(&current) {
                    path.push(previous);
                    current = previous;
                }
                path.reverse();
                return Some(SearchResult {
                    path,
                    cost: g,
                    expanded,
                });
            }

            for (next, relationship) in neighbors(graph, &node, self.direction, self.kinds.as_deref()) {
                let tentative = g + self.cost_model.cost(relationship);
                if best.get(&next).is_some_and(|&known| known <= tentative) {
                    continue;
                }
                best.insert(next, tentative);
                predecessors.insert(next, node);
                seq += 1;
                heap.push(Frontier {
                    f: tentative + self.estimate(&next),
                    g: tentative,
                    seq,
                    node: next,
                });
            }
        }
        None
    }
}
