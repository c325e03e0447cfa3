//! Candidates and the generator capability interface

use crate::corpus::PaperId;
use crate::graph::{Concept, Strategy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An unconsolidated, strategy-specific surface mention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateConcept {
    /// Surface text exactly as it appeared
    pub surface: String,
    /// Category guess
    pub category: String,
    pub strategy: Strategy,
    /// Raw relevance weight; not a probability
    pub score: f64,
    pub paper_id: PaperId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Surface of a parent concept, from an "is-a" cue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_hint: Option<String>,
}

impl CandidateConcept {
    pub fn new(
        surface: impl Into<String>,
        category: impl Into<String>,
        strategy: Strategy,
        score: f64,
        paper_id: PaperId,
    ) -> Self {
        Self {
            surface: surface.into(),
            category: category.into(),
            strategy,
            score,
            paper_id,
            domain: None,
            embedding: None,
            parent_hint: None,
        }
    }

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_parent_hint(mut self, parent: impl Into<String>) -> Self {
        self.parent_hint = Some(parent.into());
        self
    }
}

/// An "X is-a Y" cue, by surface text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IsAHint {
    pub child: String,
    pub parent: String,
}

impl IsAHint {
    pub fn new(child: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
        }
    }

    /// Collect the hints carried by candidates, in candidate order
    pub fn from_candidates(candidates: &[CandidateConcept]) -> Vec<IsAHint> {
        candidates
            .iter()
            .filter_map(|c| c.parent_hint.as_ref().map(|p| IsAHint::new(c.surface.clone(), p.clone())))
            .collect()
    }
}

/// Per-call input alongside the paper text
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub paper_id: PaperId,
    pub domain: Option<String>,
}

impl GenerationContext {
    pub fn new(paper_id: impl Into<PaperId>) -> Self {
        Self {
            paper_id: paper_id.into(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }
}

/// Errors a generator can report for one paper
#[derive(Debug, Error)]
pub enum GenerationError {
    /// An external provider is down; the strategy degrades for this paper
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Generation cancelled")]
    Cancelled,
}

/// One candidate-extraction strategy.
///
/// Implementations are pure functions of the paper text plus read-only
/// shared state, so the pipeline runs them concurrently across papers.
#[async_trait]
pub trait CandidateGenerator: Send + Sync {
    fn strategy(&self) -> Strategy;

    async fn generate(
        &self,
        text: &str,
        context: &GenerationContext,
    ) -> Result<Vec<CandidateConcept>, GenerationError>;
}

impl Concept {
    /// Turn a concept back into the candidates it could have come from.
    ///
    /// The canonical surface goes first; each surface is repeated as often
    /// as it was seen, cycling through its strategies, and keeps its mean
    /// embedding. Consolidating the result reproduces the same clustering.
    pub fn to_candidates(&self) -> Vec<CandidateConcept> {
        let paper_id = self
            .evidence
            .first()
            .map(|e| e.paper_id.clone())
            .unwrap_or_else(|| PaperId::new(self.id.to_string()));
        let domain = self.domains.iter().next().cloned();

        let candidate = |surface: &str, strategy: Strategy, embedding: Option<&Vec<f32>>| {
            let score = match strategy {
                Strategy::Statistical => self.statistical_score.unwrap_or(0.0),
                _ => 0.0,
            };
            let mut c = CandidateConcept::new(surface, self.category.clone(), strategy, score, paper_id.clone())
                .with_domain(domain.clone());
            c.embedding = embedding.cloned();
            c
        };

        if self.surfaces.is_empty() {
            let strategies: Vec<Strategy> = self.strategies.iter().copied().collect();
            let strategy = strategies.first().copied().unwrap_or(Strategy::RuleBased);
            return self
                .names()
                .map(|name| candidate(name, strategy, self.embedding.as_ref()))
                .collect();
        }

        let mut surfaces: Vec<_> = self.surfaces.iter().collect();
        if let Some(pos) = surfaces.iter().position(|s| s.text == self.canonical_name) {
            let canonical = surfaces.remove(pos);
            surfaces.insert(0, canonical);
        }

        let mut out = Vec::new();
        for surface in surfaces {
            let strategies: Vec<Strategy> = surface.strategies.iter().copied().collect();
            if strategies.is_empty() {
                continue;
            }
            for i in 0..surface.occurrences.max(1) {
                out.push(candidate(&surface.text, strategies[i % strategies.len()], surface.embedding.as_ref()));
            }
        }
        out
    }
}
