//! Serialization tests against the stored-concept fixtures

use serde_json::{json, Value};

/// Fixture: a concept row as written by the SQLite store
fn stored_concept_fixture() -> Value {
    json!({
        "id": "7b0c6a70-3a1e-5c39-9d0e-9b8f4c1d2e3f",
        "canonical_name": "convolutional neural network",
        "category": "model",
        "aliases": ["CNN", "ConvNet"],
        "confidence": 0.82,
        "domains": ["vision"],
        "strategies": ["rule_based", "statistical", "embedding"],
        "evidence": [
            {
                "paper_id": "lecun98",
                "locator": { "page": 3, "offset": 120 },
                "text": "A convolutional neural network shares weights.",
                "strategy": "rule_based"
            }
        ]
    })
}

/// Fixture: a relationship in its JSON form
fn stored_relationship_fixture() -> Value {
    json!({
        "from": "7b0c6a70-3a1e-5c39-9d0e-9b8f4c1d2e3f",
        "to": "0d5e4c11-8f2a-5b7e-a1c3-2e4f6a8b0c1d",
        "kind": "co-occurs-with",
        "strength": 0.5,
        "evidence_count": 2,
        "created_at": "2025-11-29T08:00:00Z",
        "last_reinforced": "2025-11-30T10:23:00Z"
    })
}

#[cfg(test)]
mod serialization_tests {
    use super::*;
    use crate::corpus::Locator;
    use crate::graph::{
        BatchWarning, Concept, ConceptId, ConceptRelationship, EvidenceSentence, QualityReport,
        RelationshipKind, Strategy,
    };

    #[test]
    fn concept_id_serializes_as_uuid_string() {
        let id = ConceptId::from_name("loops");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn strategy_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Strategy::RuleBased).unwrap(), "\"rule_based\"");
        let s: Strategy = serde_json::from_str("\"embedding\"").unwrap();
        assert_eq!(s, Strategy::Embedding);
    }

    #[test]
    fn relationship_kind_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&RelationshipKind::ParentOf).unwrap(), "\"parent-of\"");
        assert_eq!(
            serde_json::to_string(&RelationshipKind::CoOccursWith).unwrap(),
            "\"co-occurs-with\""
        );
    }

    #[test]
    fn concept_optional_fields_skipped_when_none() {
        let concept = Concept::new("loops", "concept");
        let json = serde_json::to_value(&concept).unwrap();
        assert!(json.get("parent").is_none());
        assert!(json.get("embedding").is_none());
        assert!(json.get("statistical_score").is_none());
    }

    #[test]
    fn concept_roundtrip() {
        let mut concept = Concept::new("recurrent neural network", "model")
            .with_alias("RNN")
            .with_domain("nlp")
            .with_strategy(Strategy::Statistical)
            .with_confidence(0.7);
        concept.add_evidence(EvidenceSentence::new(
            "p1".into(),
            Locator::new(2, 14),
            "An RNN keeps state.",
            Strategy::RuleBased,
        ));

        let json = serde_json::to_string(&concept).unwrap();
        let concept2: Concept = serde_json::from_str(&json).unwrap();
        assert_eq!(concept, concept2);
    }

    #[test]
    fn can_deserialize_stored_concept_fixture() {
        let result: Result<Concept, _> = serde_json::from_value(stored_concept_fixture());
        assert!(result.is_ok(), "Failed to deserialize concept fixture: {:?}", result.err());

        let concept = result.unwrap();
        assert_eq!(concept.canonical_name, "convolutional neural network");
        assert!(concept.aliases.contains("CNN"));
        assert_eq!(concept.strategies.len(), 3);
        assert_eq!(concept.evidence[0].locator, Locator::new(3, 120));
        assert!(concept.parent().is_none());
        assert!(!concept.flags.ungrounded);
    }

    #[test]
    fn can_deserialize_stored_relationship_fixture() {
        let result: Result<ConceptRelationship, _> = serde_json::from_value(stored_relationship_fixture());
        assert!(result.is_ok(), "Failed to deserialize relationship fixture: {:?}", result.err());

        let rel = result.unwrap();
        assert_eq!(rel.kind, RelationshipKind::CoOccursWith);
        assert_eq!(rel.evidence_count, 2);
    }

    #[test]
    fn quality_report_roundtrip() {
        let mut report = QualityReport::default();
        report.candidate_counts.insert(Strategy::Statistical, 12);
        report.warnings.push(BatchWarning::StrategyUnavailable {
            strategy: Strategy::Embedding,
            paper_id: "p1".into(),
            message: "provider down".into(),
        });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["candidate_counts"]["statistical"], 12);
        assert_eq!(json["warnings"][0]["warning"], "strategy_unavailable");

        let report2: QualityReport = serde_json::from_value(json).unwrap();
        assert_eq!(report, report2);
        assert!(report2.is_degraded());
    }
}
