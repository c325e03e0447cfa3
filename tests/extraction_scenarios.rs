//! End-to-end extraction behavior: consolidation, hierarchy hints and
//! evidence provenance.

mod common;

use common::{lecture_corpus, page_text, MockEmbedder, OfflineEmbedder};
use scholia::consolidation::{ConfidenceScorer, Consolidator};
use scholia::extraction::{CandidateConcept, IsAHint};
use scholia::hierarchy::HierarchyBuilder;
use scholia::text::normalize;
use scholia::{
    BatchId, BatchPipeline, BatchWarning, CancellationToken, ConceptId, EngineConfig, PaperId,
    RelationshipKind, Strategy,
};
use std::sync::Arc;

fn candidate(surface: &str, strategy: Strategy, score: f64, embedding: Vec<f32>) -> CandidateConcept {
    CandidateConcept::new(surface, "term", strategy, score, PaperId::new("paper-1")).with_embedding(embedding)
}

#[test]
fn test_cnn_variants_consolidate_into_one_concept() {
    let candidates = vec![
        candidate("CNN", Strategy::Embedding, 0.0, vec![1.0, 0.0, 0.0]),
        candidate("convolutional neural network", Strategy::RuleBased, 1.0, vec![0.97, 0.2, 0.0]),
        candidate("ConvNet", Strategy::Statistical, 0.4, vec![0.96, 0.0, 0.25]),
    ];

    let mut concepts = Consolidator::new(0.85).consolidate(&candidates);
    assert_eq!(concepts.len(), 1);
    ConfidenceScorer::new(0.3, &candidates).apply(&mut concepts);

    let cnn = &concepts[0];
    assert_eq!(cnn.strategies.len(), 3);
    assert!(cnn.confidence >= 0.6, "confidence = {}", cnn.confidence);
    assert!(!cnn.is_low_confidence());
    let names: Vec<&str> = cnn.names().collect();
    for surface in ["CNN", "convolutional neural network", "ConvNet"] {
        assert!(names.contains(&surface), "missing {surface} in {names:?}");
    }
}

#[test]
fn test_dissimilar_candidates_stay_apart() {
    let candidates = vec![
        candidate("CNN", Strategy::Embedding, 0.0, vec![1.0, 0.0, 0.0]),
        candidate("gradient descent", Strategy::Statistical, 0.5, vec![0.0, 1.0, 0.0]),
    ];
    let concepts = Consolidator::new(0.85).consolidate(&candidates);
    assert_eq!(concepts.len(), 2);
}

#[test]
fn test_contradictory_is_a_hints_leave_a_related_edge() {
    let concepts = vec![
        scholia::Concept::new("A", "concept"),
        scholia::Concept::new("B", "concept"),
    ];
    let hints = vec![IsAHint::new("A", "B"), IsAHint::new("B", "A")];
    let build = HierarchyBuilder::default().build(concepts, &hints).unwrap();

    let (a, b) = (ConceptId::from_name("A"), ConceptId::from_name("B"));
    assert_eq!(build.hierarchy.parent(&a), None);
    assert_eq!(build.hierarchy.parent(&b), None);
    assert!(build
        .relationships
        .iter()
        .any(|r| r.kind == RelationshipKind::RelatedTo && [r.from, r.to].contains(&a) && [r.from, r.to].contains(&b)));
    assert!(build.relationships.iter().all(|r| r.kind != RelationshipKind::ParentOf));
}

#[tokio::test]
async fn test_every_evidence_sentence_points_back_into_its_paper() {
    let corpus = lecture_corpus();
    let pipeline = BatchPipeline::new(EngineConfig::default()).with_embedder(Arc::new(MockEmbedder::new()));
    let snapshot = pipeline
        .run(BatchId::from("evidence"), &corpus, &CancellationToken::new())
        .await
        .unwrap();

    let mut checked = 0;
    for concept in snapshot.hierarchy().concepts() {
        let names: Vec<String> = concept.names().map(normalize).collect();
        for evidence in snapshot.evidence(&concept.id).unwrap() {
            let page = page_text(&corpus, evidence.paper_id.as_str(), evidence.locator.page)
                .expect("evidence names an existing page");
            assert!(
                page[evidence.locator.offset..].starts_with(&evidence.text),
                "locator {} does not point at '{}'",
                evidence.locator,
                evidence.text
            );
            let sentence = normalize(&evidence.text);
            assert!(names.iter().any(|n| sentence.contains(n.as_str())));
            checked += 1;
        }
        if concept.evidence.is_empty() {
            assert!(concept.is_ungrounded());
            assert!(concept.is_low_confidence());
        }
    }
    assert!(checked > 0);
    assert_eq!(snapshot.report().evidence_count, checked);
}

#[tokio::test]
async fn test_second_page_evidence_carries_its_page_number() {
    let corpus = lecture_corpus();
    let snapshot = BatchPipeline::new(EngineConfig::default())
        .run(BatchId::from("pages"), &corpus, &CancellationToken::new())
        .await
        .unwrap();

    let pooling = snapshot
        .hierarchy()
        .concepts()
        .find(|c| c.evidence.iter().any(|e| e.text.starts_with("Max pooling")))
        .expect("some concept is grounded in the second page");
    let evidence = pooling
        .evidence
        .iter()
        .find(|e| e.text.starts_with("Max pooling"))
        .unwrap();
    assert_eq!(evidence.paper_id.as_str(), "cnn-intro");
    assert_eq!(evidence.locator.page, 2);
    assert_eq!(evidence.locator.offset, 0);
}

#[tokio::test]
async fn test_offline_embedder_degrades_the_batch() {
    let corpus = lecture_corpus();
    let snapshot = BatchPipeline::new(EngineConfig::default())
        .with_embedder(Arc::new(OfflineEmbedder))
        .run(BatchId::from("offline"), &corpus, &CancellationToken::new())
        .await
        .unwrap();

    assert!(snapshot.report().is_degraded());
    assert!(snapshot.report().warnings.iter().any(|w| matches!(
        w,
        BatchWarning::StrategyUnavailable {
            strategy: Strategy::Embedding,
            ..
        }
    )));
    assert!(snapshot.find_by_name("neural network").is_some());
}
