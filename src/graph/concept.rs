//! Concept representation: canonical name, aliases, provenance and evidence

use crate::corpus::{Locator, PaperId};
use crate::text::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// UUID v5 namespace for concept ids
const CONCEPT_NS: Uuid = Uuid::from_bytes([
    0x3f, 0x1c, 0x8a, 0x52, 0x6e, 0x0d, 0x4b, 0x7a, 0x9c, 0x21, 0x5e, 0xd4, 0x08, 0xb3, 0x77, 0x19,
]);

/// Stable identifier for a concept
///
/// Derived from the normalized canonical name, so the same concept gets the
/// same id across runs and batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(Uuid);

impl ConceptId {
    /// Derive the id for a canonical name
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&CONCEPT_NS, normalize(name).as_bytes()))
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse the textual form produced by `Display`
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The extraction strategy that surfaced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Pattern and ontology matching
    RuleBased,
    /// Term salience plus co-occurrence ranking
    Statistical,
    /// Spans tagged with embedding vectors
    Embedding,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::RuleBased, Strategy::Statistical, Strategy::Embedding];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RuleBased => "rule_based",
            Strategy::Statistical => "statistical",
            Strategy::Embedding => "embedding",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exact surface string that was folded into a concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceForm {
    pub text: String,
    /// Number of candidates carrying this exact string
    pub occurrences: usize,
    pub strategies: BTreeSet<Strategy>,
    /// Mean embedding of the candidates carrying this string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// A source sentence supporting a concept
///
/// Immutable. Equality and hashing use only `(paper_id, locator, text)`, so
/// the same sentence surfaced by two strategies is one piece of evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSentence {
    pub paper_id: PaperId,
    pub locator: Locator,
    pub text: String,
    pub strategy: Strategy,
}

impl EvidenceSentence {
    pub fn new(paper_id: PaperId, locator: Locator, text: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            paper_id,
            locator,
            text: text.into(),
            strategy,
        }
    }
}

impl PartialEq for EvidenceSentence {
    fn eq(&self, other: &Self) -> bool {
        self.paper_id == other.paper_id && self.locator == other.locator && self.text == other.text
    }
}

impl Eq for EvidenceSentence {}

impl Hash for EvidenceSentence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.paper_id.hash(state);
        self.locator.hash(state);
        self.text.hash(state);
    }
}

/// Quality flags. Flagged concepts stay in the graph; callers filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptFlags {
    /// Confidence fell below the configured floor
    pub low_confidence: bool,
    /// No evidence sentence could be bound
    pub ungrounded: bool,
}

/// A canonical, deduplicated unit of extracted knowledge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    pub canonical_name: String,
    /// Category label (e.g. "model", "method", "theory")
    pub category: String,
    /// Surface forms other than the canonical name
    pub aliases: BTreeSet<String>,
    /// Consensus confidence in [0, 1]
    pub confidence: f64,
    /// Source-domain tags
    pub domains: BTreeSet<String>,
    /// Strategies that contributed at least one candidate
    pub strategies: BTreeSet<Strategy>,
    /// Highest statistical score among the folded candidates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistical_score: Option<f64>,
    /// Per-surface provenance, in first-seen order
    #[serde(default)]
    pub surfaces: Vec<SurfaceForm>,
    /// Centroid of every candidate embedding folded into the concept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub evidence: Vec<EvidenceSentence>,
    #[serde(default)]
    pub flags: ConceptFlags,
    /// Only `ConceptHierarchy` writes this, through its cycle-guarded `set_parent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) parent: Option<ConceptId>,
}

impl Concept {
    /// Create a concept with an id derived from its canonical name
    pub fn new(canonical_name: impl Into<String>, category: impl Into<String>) -> Self {
        let canonical_name = canonical_name.into();
        Self {
            id: ConceptId::from_name(&canonical_name),
            canonical_name,
            category: category.into(),
            aliases: BTreeSet::new(),
            confidence: 0.0,
            domains: BTreeSet::new(),
            strategies: BTreeSet::new(),
            statistical_score: None,
            surfaces: Vec::new(),
            embedding: None,
            evidence: Vec::new(),
            flags: ConceptFlags::default(),
            parent: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.insert(domain.into());
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.insert(strategy);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Parent concept, if the hierarchy assigned one
    pub fn parent(&self) -> Option<ConceptId> {
        self.parent
    }

    /// Canonical name followed by every alias
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Whether a surface string names this concept (case/whitespace-insensitive)
    pub fn matches_surface(&self, surface: &str) -> bool {
        let key = normalize(surface);
        self.names().any(|n| normalize(n) == key)
    }

    pub fn evidence_count(&self) -> usize {
        self.evidence.len()
    }

    /// Append evidence unless an identical `(paper, locator, text)` is present.
    pub fn add_evidence(&mut self, evidence: EvidenceSentence) -> bool {
        if self.evidence.contains(&evidence) {
            return false;
        }
        self.evidence.push(evidence);
        true
    }

    /// Scale confidence down. The concept is never removed.
    pub fn demote(&mut self, factor: f64) {
        self.confidence = (self.confidence * factor.clamp(0.0, 1.0)).clamp(0.0, 1.0);
    }

    pub fn is_low_confidence(&self) -> bool {
        self.flags.low_confidence
    }

    pub fn is_ungrounded(&self) -> bool {
        self.flags.ungrounded
    }
}
