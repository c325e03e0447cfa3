//! Typed, additive relationships between concepts

use super::concept::ConceptId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of relationship between two concepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    /// Hierarchy edge, directed parent → child
    ParentOf,
    /// Side relationship (including rejected parent assignments)
    RelatedTo,
    /// The two concepts share evidence sentences
    CoOccursWith,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 3] = [
        RelationshipKind::ParentOf,
        RelationshipKind::RelatedTo,
        RelationshipKind::CoOccursWith,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::ParentOf => "parent-of",
            RelationshipKind::RelatedTo => "related-to",
            RelationshipKind::CoOccursWith => "co-occurs-with",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a relationship: one edge per (from, to, kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: ConceptId,
    pub to: ConceptId,
    pub kind: RelationshipKind,
}

/// A typed edge between two concepts
///
/// Relationships are additive: detecting the same (from, to, kind) again
/// raises the evidence count and may raise strength, never lowers either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRelationship {
    pub from: ConceptId,
    pub to: ConceptId,
    pub kind: RelationshipKind,
    /// Strength in [0, 1]
    pub strength: f64,
    pub evidence_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_reinforced: DateTime<Utc>,
}

impl ConceptRelationship {
    pub fn new(from: ConceptId, to: ConceptId, kind: RelationshipKind, strength: f64) -> Self {
        let now = Utc::now();
        Self {
            from,
            to,
            kind,
            strength: strength.clamp(0.0, 1.0),
            evidence_count: 1,
            created_at: now,
            last_reinforced: now,
        }
    }

    pub fn parent_of(parent: ConceptId, child: ConceptId, strength: f64) -> Self {
        Self::new(parent, child, RelationshipKind::ParentOf, strength)
    }

    pub fn related_to(a: ConceptId, b: ConceptId, strength: f64) -> Self {
        Self::new(a, b, RelationshipKind::RelatedTo, strength)
    }

    pub fn with_evidence_count(mut self, count: u32) -> Self {
        self.evidence_count = count;
        self
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            from: self.from,
            to: self.to,
            kind: self.kind,
        }
    }

    /// Fold a repeated detection into this edge.
    pub fn reinforce(&mut self, other: &ConceptRelationship) {
        self.evidence_count = self.evidence_count.saturating_add(other.evidence_count.max(1));
        self.strength = self.strength.max(other.strength).clamp(0.0, 1.0);
        self.last_reinforced = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in RelationshipKind::ALL {
            assert_eq!(RelationshipKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(RelationshipKind::parse("calls"), None);
    }

    #[test]
    fn reinforce_is_additive() {
        let a = ConceptId::from_name("a");
        let b = ConceptId::from_name("b");
        let mut edge = ConceptRelationship::related_to(a, b, 0.6).with_evidence_count(2);
        edge.reinforce(&ConceptRelationship::related_to(a, b, 0.4));
        assert_eq!(edge.evidence_count, 3);
        assert_eq!(edge.strength, 0.6);

        edge.reinforce(&ConceptRelationship::related_to(a, b, 0.9));
        assert_eq!(edge.evidence_count, 4);
        assert_eq!(edge.strength, 0.9);
    }

    #[test]
    fn strength_is_clamped() {
        let a = ConceptId::from_name("a");
        let b = ConceptId::from_name("b");
        assert_eq!(ConceptRelationship::parent_of(a, b, 1.7).strength, 1.0);
        assert_eq!(ConceptRelationship::parent_of(a, b, -0.2).strength, 0.0);
    }
}
