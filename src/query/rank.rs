//! Importance ranking: fixed-iteration random walk with teleportation

use super::types::RankResult;
use crate::extraction::CancellationToken;
use crate::graph::{KnowledgeGraph, RelationshipKind, ScholiaResult};
use std::collections::HashMap;

/// Random-walk ranking over an index-addressed weighted adjacency list.
///
/// Each node passes `damping` of its score to its out-neighbors in
/// proportion to edge weight; the remaining `1 - damping` is spread
/// uniformly. Nodes without positive out-weight spread their damped mass
/// uniformly too, so the scores sum to 1 after every iteration. Runs exactly
/// `iterations` rounds, checking `cancel` before each.
pub(crate) fn random_walk(
    adjacency: &[Vec<(usize, f64)>],
    damping: f64,
    iterations: usize,
    cancel: &CancellationToken,
) -> ScholiaResult<Vec<f64>> {
    let n = adjacency.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let uniform = 1.0 / n as f64;
    let totals: Vec<f64> = adjacency
        .iter()
        .map(|edges| edges.iter().map(|(_, w)| w.max(0.0)).sum())
        .collect();

    let mut scores = vec![uniform; n];
    for _ in 0..iterations {
        cancel.check()?;

        let dangling: f64 = (0..n).filter(|&i| totals[i] <= 0.0).map(|i| scores[i]).sum();
        let base = (1.0 - damping) * uniform + damping * dangling * uniform;
        let mut next = vec![base; n];

        for (i, edges) in adjacency.iter().enumerate() {
            if totals[i] <= 0.0 {
                continue;
            }
            let share = damping * scores[i] / totals[i];
            for &(j, w) in edges {
                next[j] += share * w.max(0.0);
            }
        }
        scores = next;
    }
    Ok(scores)
}

/// Importance ranking over a knowledge graph
#[derive(Debug, Clone)]
pub struct RankQuery {
    pub damping: f64,
    pub iterations: usize,
    /// Relationship kinds that carry rank; all when `None`
    pub kinds: Option<Vec<RelationshipKind>>,
    /// Weight edges by strength instead of counting them equally
    pub weighted: bool,
}

impl Default for RankQuery {
    fn default() -> Self {
        Self {
            damping: 0.85,
            iterations: 100,
            kinds: None,
            weighted: true,
        }
    }
}

impl RankQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn damping(mut self, damping: f64) -> Self {
        self.damping = damping.clamp(0.0, 1.0);
        self
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = RelationshipKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn unweighted(mut self) -> Self {
        self.weighted = false;
        self
    }

    pub fn execute(&self, graph: &KnowledgeGraph, cancel: &CancellationToken) -> ScholiaResult<RankResult> {
        let ids = graph.concept_ids();
        let position: HashMap<_, _> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let adjacency: Vec<Vec<(usize, f64)>> = ids
            .iter()
            .map(|id| {
                graph
                    .outgoing(id)
                    .filter(|r| self.kinds.as_ref().map_or(true, |k| k.contains(&r.kind)))
                    .filter_map(|r| {
                        let weight = if self.weighted { r.strength } else { 1.0 };
                        position.get(&r.to).map(|&j| (j, weight))
                    })
                    .collect()
            })
            .collect();

        let scores = random_walk(&adjacency, self.damping, self.iterations, cancel)?;
        Ok(RankResult {
            scores: ids.iter().copied().zip(scores).collect(),
            iterations: self.iterations,
        })
    }
}
