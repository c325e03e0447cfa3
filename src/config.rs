//! Engine configuration
//!
//! Plain tunable values with documented defaults. A YAML strategy file only
//! needs to name the fields it overrides; everything else keeps its default.
//!
//! ```yaml
//! similarity_threshold: 0.8
//! strategies: [rule_based, statistical]
//! rule_based:
//!   ontology:
//!     - { term: "transformer", category: "model" }
//! ```

use crate::extraction::OntologyTerm;
use crate::graph::{RelationshipKind, Strategy};
use crate::query::RankQuery;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticalConfig {
    /// Terms kept per paper
    pub top_k: usize,
    /// Co-occurrence window, in content words
    pub window: usize,
    pub min_frequency: usize,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            top_k: 20,
            window: 4,
            min_frequency: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Spans embedded per paper
    pub max_spans: usize,
    pub max_span_words: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            max_spans: 64,
            max_span_words: 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBasedConfig {
    pub ontology: Vec<OntologyTerm>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    pub max_per_concept: usize,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self { max_per_concept: 25 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooccurrenceConfig {
    /// Shared sentences needed before two concepts get an edge
    pub min_count: usize,
}

impl Default for CooccurrenceConfig {
    fn default() -> Self {
        Self { min_count: 1 }
    }
}

/// Tunable parameters for one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cosine similarity at which candidate groups merge
    pub similarity_threshold: f64,
    /// Concepts scoring below this are flagged low-confidence
    pub confidence_floor: f64,
    /// Importance-ranking damping factor
    pub damping: f64,
    /// Importance-ranking iteration count
    pub iterations: usize,
    /// Generators to run
    pub strategies: Vec<Strategy>,
    /// Relationship kinds that carry importance rank
    pub rank_edge_kinds: Vec<RelationshipKind>,
    /// Merge similarity at which embedding clusters nest concepts
    pub nesting_threshold: f64,
    /// Extra factor applied when demoting ungrounded concepts
    pub ungrounded_decay: f64,
    /// Domain tag for papers that carry none
    pub domain: Option<String>,
    pub statistical: StatisticalConfig,
    pub embedding: EmbeddingConfig,
    pub rule_based: RuleBasedConfig,
    pub evidence: EvidenceConfig,
    pub cooccurrence: CooccurrenceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            confidence_floor: 0.3,
            damping: 0.85,
            iterations: 100,
            strategies: Strategy::ALL.to_vec(),
            rank_edge_kinds: RelationshipKind::ALL.to_vec(),
            nesting_threshold: 0.6,
            ungrounded_decay: 0.5,
            domain: None,
            statistical: StatisticalConfig::default(),
            embedding: EmbeddingConfig::default(),
            rule_based: RuleBasedConfig::default(),
            evidence: EvidenceConfig::default(),
            cooccurrence: CooccurrenceConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&yaml)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded engine config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = [
            ("similarity_threshold", self.similarity_threshold),
            ("confidence_floor", self.confidence_floor),
            ("damping", self.damping),
            ("nesting_threshold", self.nesting_threshold),
            ("ungrounded_decay", self.ungrounded_decay),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        if self.iterations == 0 {
            return Err(ConfigError::Invalid("iterations must be positive".into()));
        }
        if self.strategies.is_empty() {
            return Err(ConfigError::Invalid("at least one strategy must be enabled".into()));
        }
        Ok(())
    }

    pub fn uses(&self, strategy: Strategy) -> bool {
        self.strategies.contains(&strategy)
    }

    /// Importance ranking with the configured damping, iterations and edge kinds
    pub fn rank_query(&self) -> RankQuery {
        RankQuery::new()
            .damping(self.damping)
            .iterations(self.iterations)
            .with_kinds(self.rank_edge_kinds.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.similarity_threshold, 0.85);
        assert_eq!(config.confidence_floor, 0.3);
        assert_eq!(config.iterations, 100);
        assert_eq!(config.strategies.len(), 3);
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = r#"
similarity_threshold: 0.9
strategies: [rule_based, statistical]
rank_edge_kinds: [parent-of]
statistical:
  top_k: 5
rule_based:
  ontology:
    - { term: "transformer", category: "model" }
"#;
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.similarity_threshold, 0.9);
        assert_eq!(config.damping, 0.85);
        assert!(!config.uses(Strategy::Embedding));
        assert_eq!(config.rank_edge_kinds, vec![RelationshipKind::ParentOf]);
        assert_eq!(config.rank_query().kinds, Some(vec![RelationshipKind::ParentOf]));
        assert_eq!(config.statistical.top_k, 5);
        assert_eq!(config.statistical.window, 4);
        assert_eq!(config.rule_based.ontology, vec![OntologyTerm::new("transformer", "model")]);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(
            EngineConfig::from_yaml_str("damping: 1.5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_yaml_str("iterations: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_yaml_str("strategies: [guessing]"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strategy.yaml");
        std::fs::write(&path, "confidence_floor: 0.5\ndomain: vision\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.confidence_floor, 0.5);
        assert_eq!(config.domain.as_deref(), Some("vision"));
    }
}
