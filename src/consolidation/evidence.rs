//! Evidence binding and co-occurrence edges

use crate::corpus::{LocatedSentence, SourceCorpus};
use crate::graph::{Concept, ConceptId, ConceptRelationship, EvidenceSentence, RelationshipKind, Strategy};
use crate::text::normalize;
use std::collections::HashSet;

/// Outcome of binding one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingReport {
    /// Evidence sentences attached across all concepts
    pub bound: usize,
    /// Concepts no sentence mentions, in concept order
    pub ungrounded: Vec<ConceptId>,
}

/// Attaches source sentences naming each concept
#[derive(Debug, Clone)]
pub struct EvidenceBinder {
    max_per_concept: usize,
    floor: f64,
    decay: f64,
}

impl EvidenceBinder {
    pub fn new(floor: f64, decay: f64) -> Self {
        Self {
            max_per_concept: 25,
            floor: floor.clamp(0.0, 1.0),
            decay: decay.clamp(0.0, 1.0),
        }
    }

    pub fn with_max_per_concept(mut self, max: usize) -> Self {
        self.max_per_concept = max.max(1);
        self
    }

    /// Scan the corpus for sentences containing any of a concept's names.
    ///
    /// Matching is a case-insensitive substring test after whitespace
    /// collapsing. Concepts left without evidence are flagged ungrounded and
    /// demoted below the confidence floor; they stay in the batch.
    pub fn bind(&self, concepts: &mut [Concept], corpus: &dyn SourceCorpus) -> BindingReport {
        let sentences: Vec<(String, LocatedSentence)> = corpus
            .papers()
            .iter()
            .flat_map(|paper| paper.sentences())
            .map(|sentence| (normalize(&sentence.text), sentence))
            .collect();

        let mut report = BindingReport::default();
        for concept in concepts.iter_mut() {
            let needles: Vec<(String, Strategy)> = concept
                .names()
                .map(|name| (normalize(name), surface_strategy(concept, name)))
                .filter(|(needle, _)| !needle.is_empty())
                .collect();

            for (haystack, sentence) in &sentences {
                if concept.evidence.len() >= self.max_per_concept {
                    break;
                }
                let Some((_, strategy)) = needles.iter().find(|(needle, _)| haystack.contains(needle.as_str())) else {
                    continue;
                };
                let evidence = EvidenceSentence::new(
                    sentence.paper_id.clone(),
                    sentence.locator,
                    sentence.text.clone(),
                    *strategy,
                );
                if concept.add_evidence(evidence) {
                    report.bound += 1;
                }
            }

            if concept.evidence.is_empty() {
                concept.flags.ungrounded = true;
                concept.flags.low_confidence = true;
                concept.confidence = concept.confidence.min(self.floor) * self.decay;
                tracing::warn!(concept = %concept.canonical_name, id = %concept.id, "ungrounded concept");
                report.ungrounded.push(concept.id);
            }
        }

        tracing::info!(
            concepts = concepts.len(),
            bound = report.bound,
            ungrounded = report.ungrounded.len(),
            "evidence bound"
        );
        report
    }
}

/// First strategy that reported the surface a name came from
fn surface_strategy(concept: &Concept, name: &str) -> Strategy {
    concept
        .surfaces
        .iter()
        .find(|s| s.text == name)
        .and_then(|s| s.strategies.iter().next().copied())
        .or_else(|| concept.strategies.iter().next().copied())
        .unwrap_or(Strategy::RuleBased)
}

/// Symmetric `co-occurs-with` edges between concepts sharing evidence.
///
/// Strength is the pair's shared-sentence count over the batch maximum;
/// evidence count is the shared-sentence count. Pairs below `min_count`
/// are skipped.
pub fn cooccurrence(concepts: &[Concept], min_count: usize) -> Vec<ConceptRelationship> {
    let sets: Vec<HashSet<&EvidenceSentence>> = concepts.iter().map(|c| c.evidence.iter().collect()).collect();

    let mut pairs = Vec::new();
    for i in 0..concepts.len() {
        for j in (i + 1)..concepts.len() {
            let shared = sets[i].intersection(&sets[j]).count();
            if shared > 0 && shared >= min_count {
                pairs.push((i, j, shared));
            }
        }
    }

    let Some(max) = pairs.iter().map(|(_, _, n)| *n).max() else {
        return Vec::new();
    };

    pairs
        .into_iter()
        .flat_map(|(i, j, shared)| {
            let strength = shared as f64 / max as f64;
            let (a, b) = (concepts[i].id, concepts[j].id);
            [(a, b), (b, a)].map(|(from, to)| {
                ConceptRelationship::new(from, to, RelationshipKind::CoOccursWith, strength)
                    .with_evidence_count(shared as u32)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{InMemoryCorpus, Paper};

    fn corpus() -> InMemoryCorpus {
        InMemoryCorpus::new()
            .with_paper(Paper::from_text(
                "p1",
                "Convolutional  Neural Networks dominate vision. A CNN uses pooling.\u{c}Pooling reduces resolution.",
            ))
            .with_paper(Paper::from_text("p2", "Transformers use attention. Attention and pooling differ."))
    }

    fn concept(name: &str) -> Concept {
        Concept::new(name, "concept").with_strategy(Strategy::Statistical).with_confidence(0.5)
    }

    #[test]
    fn binds_sentences_by_name_and_alias() {
        let mut concepts = vec![concept("convolutional neural network").with_alias("CNN"), concept("pooling")];
        let report = EvidenceBinder::new(0.3, 0.5).bind(&mut concepts, &corpus());

        let cnn = &concepts[0];
        assert_eq!(cnn.evidence_count(), 2);
        assert_eq!(cnn.evidence[0].locator.page, 1);
        assert_eq!(cnn.evidence[0].strategy, Strategy::Statistical);

        let pooling = &concepts[1];
        assert_eq!(pooling.evidence_count(), 3);
        assert_eq!(pooling.evidence[1].locator.page, 2);
        assert_eq!(pooling.evidence[2].paper_id.as_str(), "p2");

        assert_eq!(report.bound, 5);
        assert!(report.ungrounded.is_empty());
    }

    #[test]
    fn rebinding_does_not_duplicate() {
        let mut concepts = vec![concept("attention")];
        let binder = EvidenceBinder::new(0.3, 0.5);
        binder.bind(&mut concepts, &corpus());
        let again = binder.bind(&mut concepts, &corpus());
        assert_eq!(concepts[0].evidence_count(), 2);
        assert_eq!(again.bound, 0);
    }

    #[test]
    fn ungrounded_concepts_are_flagged_and_demoted() {
        let mut concepts = vec![concept("quantum annealing")];
        let report = EvidenceBinder::new(0.3, 0.5).bind(&mut concepts, &corpus());

        let c = &concepts[0];
        assert!(c.is_ungrounded());
        assert!(c.is_low_confidence());
        assert!((c.confidence - 0.15).abs() < 1e-9);
        assert_eq!(report.ungrounded, vec![c.id]);
    }

    #[test]
    fn evidence_is_capped() {
        let mut concepts = vec![concept("pooling")];
        EvidenceBinder::new(0.3, 0.5)
            .with_max_per_concept(1)
            .bind(&mut concepts, &corpus());
        assert_eq!(concepts[0].evidence_count(), 1);
    }

    #[test]
    fn shared_sentences_become_symmetric_edges() {
        let mut concepts = vec![concept("CNN"), concept("pooling"), concept("attention")];
        EvidenceBinder::new(0.3, 0.5).bind(&mut concepts, &corpus());

        let edges = cooccurrence(&concepts, 1);
        assert_eq!(edges.len(), 4);
        assert!(edges.iter().all(|e| e.kind == RelationshipKind::CoOccursWith));
        assert!(edges.iter().all(|e| e.strength == 1.0 && e.evidence_count == 1));
        assert_eq!((edges[0].from, edges[0].to), (concepts[0].id, concepts[1].id));
        assert_eq!((edges[1].from, edges[1].to), (concepts[1].id, concepts[0].id));

        assert!(cooccurrence(&concepts, 2).is_empty());
    }
}
