//! Consensus confidence from strategy agreement

use crate::extraction::CandidateConcept;
use crate::graph::{Concept, Strategy};
use crate::hierarchy::mean_pairwise_similarity;

const RULE_WEIGHT: f64 = 0.4;
const STATISTICAL_WEIGHT: f64 = 0.3;
const COHERENCE_WEIGHT: f64 = 0.3;

/// Scores concepts against the statistical score distribution of one batch
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    floor: f64,
    /// Every statistical candidate score in the batch, ascending
    statistical_scores: Vec<f64>,
}

impl ConfidenceScorer {
    pub fn new(floor: f64, candidates: &[CandidateConcept]) -> Self {
        let mut statistical_scores: Vec<f64> = candidates
            .iter()
            .filter(|c| c.strategy == Strategy::Statistical)
            .map(|c| c.score)
            .collect();
        statistical_scores.sort_by(f64::total_cmp);
        Self {
            floor: floor.clamp(0.0, 1.0),
            statistical_scores,
        }
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Share of batch statistical scores at or below `score`
    pub fn percentile(&self, score: f64) -> f64 {
        if self.statistical_scores.is_empty() {
            return 0.0;
        }
        let at_or_below = self.statistical_scores.partition_point(|s| *s <= score);
        at_or_below as f64 / self.statistical_scores.len() as f64
    }

    /// `0.4 * rule + 0.3 * percentile + 0.3 * coherence`, in [0, 1]
    pub fn score(&self, concept: &Concept) -> f64 {
        let rule = if concept.strategies.contains(&Strategy::RuleBased) { 1.0 } else { 0.0 };
        let percentile = concept.statistical_score.map_or(0.0, |s| self.percentile(s));
        let score = RULE_WEIGHT * rule + STATISTICAL_WEIGHT * percentile + COHERENCE_WEIGHT * coherence(concept);
        score.clamp(0.0, 1.0)
    }

    /// Score every concept and flag those under the floor. Returns the flagged count.
    pub fn apply(&self, concepts: &mut [Concept]) -> usize {
        let mut flagged = 0;
        for concept in concepts.iter_mut() {
            concept.confidence = self.score(concept);
            concept.flags.low_confidence = concept.confidence < self.floor;
            if concept.flags.low_confidence {
                flagged += 1;
            }
        }
        tracing::debug!(concepts = concepts.len(), flagged, floor = self.floor, "scored confidence");
        flagged
    }
}

/// Mean pairwise cosine over embedded surfaces.
///
/// With fewer than two embedded surfaces, one surface reported by two or more
/// strategies counts as full agreement.
pub fn coherence(concept: &Concept) -> f64 {
    let vectors: Vec<&[f32]> = concept.surfaces.iter().filter_map(|s| s.embedding.as_deref()).collect();
    match mean_pairwise_similarity(&vectors) {
        Some(similarity) => similarity.clamp(0.0, 1.0),
        None if concept.surfaces.iter().any(|s| s.strategies.len() >= 2) => 1.0,
        None => 0.0,
    }
}
