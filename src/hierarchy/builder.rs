//! Builds the parent/child forest from is-a hints and embedding nesting

use super::forest::{ConceptHierarchy, ParentAssignment};
use crate::consolidation::{agglomerate, Linkage, Merge};
use crate::extraction::{cosine_similarity, IsAHint};
use crate::graph::{Concept, ConceptId, ConceptRelationship, ScholiaResult};
use crate::text::normalize;
use std::collections::HashMap;

/// Strength of the `related-to` edge left by contradictory hints
const CONTRADICTION_STRENGTH: f64 = 0.5;

/// Output of a hierarchy build
#[derive(Debug, Clone)]
pub struct HierarchyBuild {
    pub hierarchy: ConceptHierarchy,
    /// `parent-of` edges for committed assignments plus `related-to` edges
    /// for hints that could not become parents
    pub relationships: Vec<ConceptRelationship>,
    /// Parent assignments turned into side relationships
    pub rejected: usize,
}

/// Organizes concepts into a forest
///
/// Explicit is-a hints go first. Concepts the hints leave without a parent
/// are nested by average-linkage clustering over their embeddings.
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    nesting_threshold: f64,
}

impl Default for HierarchyBuilder {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl HierarchyBuilder {
    pub fn new(nesting_threshold: f64) -> Self {
        Self {
            nesting_threshold: nesting_threshold.clamp(0.0, 1.0),
        }
    }

    pub fn build(&self, concepts: Vec<Concept>, hints: &[IsAHint]) -> ScholiaResult<HierarchyBuild> {
        let mut build = HierarchyBuild {
            hierarchy: ConceptHierarchy::new(),
            relationships: Vec::new(),
            rejected: 0,
        };

        let mut names: HashMap<String, ConceptId> = HashMap::new();
        for concept in &concepts {
            for name in concept.names() {
                names.entry(normalize(name)).or_insert(concept.id);
            }
        }
        for concept in concepts {
            build.hierarchy.insert(concept);
        }

        self.apply_hints(&mut build, &names, hints)?;
        self.nest_by_embedding(&mut build)?;

        tracing::info!(
            concepts = build.hierarchy.len(),
            roots = build.hierarchy.roots().len(),
            relationships = build.relationships.len(),
            rejected = build.rejected,
            "hierarchy built"
        );
        Ok(build)
    }

    fn apply_hints(
        &self,
        build: &mut HierarchyBuild,
        names: &HashMap<String, ConceptId>,
        hints: &[IsAHint],
    ) -> ScholiaResult<()> {
        // (child, parent) -> count, in first-seen order
        let mut counted: Vec<((ConceptId, ConceptId), usize)> = Vec::new();
        let mut slots: HashMap<(ConceptId, ConceptId), usize> = HashMap::new();
        for hint in hints {
            let (Some(&child), Some(&parent)) = (names.get(&normalize(&hint.child)), names.get(&normalize(&hint.parent)))
            else {
                continue;
            };
            if child == parent {
                continue;
            }
            let slot = *slots.entry((child, parent)).or_insert_with(|| {
                counted.push(((child, parent), 0));
                counted.len() - 1
            });
            counted[slot].1 += 1;
        }

        let contradicted = |child: ConceptId, parent: ConceptId| slots.contains_key(&(parent, child));
        for &((child, parent), _) in &counted {
            if contradicted(child, parent) && slots[&(child, parent)] < slots[&(parent, child)] {
                tracing::debug!(%child, %parent, "contradictory is-a hints");
                build
                    .relationships
                    .push(ConceptRelationship::related_to(child, parent, CONTRADICTION_STRENGTH));
                build.rejected += 1;
            }
        }

        let mut children: Vec<ConceptId> = Vec::new();
        for &((child, _), _) in &counted {
            if !children.contains(&child) {
                children.push(child);
            }
        }

        for child in children {
            let options: Vec<(ConceptId, usize)> = counted
                .iter()
                .filter(|((c, p), _)| *c == child && !contradicted(*c, *p))
                .map(|((_, p), n)| (*p, *n))
                .collect();
            let Some(&(best, best_count)) = options.iter().fold(None, |best: Option<&(ConceptId, usize)>, option| {
                match best {
                    Some(b) if b.1 >= option.1 => Some(b),
                    _ => Some(option),
                }
            }) else {
                continue;
            };

            for &(other, count) in &options {
                if other != best {
                    build
                        .relationships
                        .push(ConceptRelationship::related_to(child, other, hint_strength(count)));
                }
            }
            self.assign(build, child, best, hint_strength(best_count))?;
        }
        Ok(())
    }

    /// Walk the dendrogram loosest merge first. Each merge keeps the
    /// representative it inherited (or picks its most central member) for
    /// the part containing it; the other part's representative becomes a
    /// child of it, unless that concept already has a parent.
    fn nest_by_embedding(&self, build: &mut HierarchyBuild) -> ScholiaResult<()> {
        let concepts: Vec<Concept> = build.hierarchy.concepts().cloned().collect();
        let vectors: Vec<Option<&[f32]>> = concepts.iter().map(|c| c.embedding.as_deref()).collect();
        let (merges, _) = agglomerate(&vectors, self.nesting_threshold, Linkage::Average);

        let mut representatives: HashMap<Vec<usize>, usize> = HashMap::new();
        for merge in merges.iter().rev() {
            let members = merge.members();
            let Some(rep) = representatives.get(&members).copied().or_else(|| most_central(&concepts, &members))
            else {
                continue;
            };
            let (home, other) = split(merge, rep);
            representatives.insert(home.clone(), rep);

            let Some(sub) = most_central(&concepts, other) else {
                continue;
            };
            representatives.insert(other.clone(), sub);
            if build.hierarchy.parent(&concepts[sub].id).is_none() {
                self.assign(build, concepts[sub].id, concepts[rep].id, merge.similarity)?;
            }
        }
        Ok(())
    }

    fn assign(&self, build: &mut HierarchyBuild, child: ConceptId, parent: ConceptId, strength: f64) -> ScholiaResult<()> {
        match build.hierarchy.set_parent(child, parent)? {
            ParentAssignment::Assigned => {
                tracing::debug!(%child, %parent, strength, "parent assigned");
                build
                    .relationships
                    .push(ConceptRelationship::parent_of(parent, child, strength));
            }
            ParentAssignment::Unchanged => {}
            ParentAssignment::Rejected(reason) => {
                tracing::warn!(%child, %parent, ?reason, "parent rejected, recording related-to");
                build
                    .relationships
                    .push(ConceptRelationship::related_to(child, parent, strength));
                build.rejected += 1;
            }
        }
        Ok(())
    }
}

/// Hint strength grows with repeated sightings
fn hint_strength(count: usize) -> f64 {
    (0.5 + 0.25 * count as f64).min(1.0)
}

/// The part of a merge containing `rep`, then the other part
fn split(merge: &Merge, rep: usize) -> (&Vec<usize>, &Vec<usize>) {
    if merge.left.contains(&rep) {
        (&merge.left, &merge.right)
    } else {
        (&merge.right, &merge.left)
    }
}

/// Member with the highest mean similarity to the other members; ties go to
/// higher confidence, then the shorter name, then the earlier concept.
fn most_central(concepts: &[Concept], members: &[usize]) -> Option<usize> {
    let centrality = |i: usize| -> f64 {
        let Some(own) = concepts[i].embedding.as_deref() else {
            return f64::NEG_INFINITY;
        };
        let others: Vec<f64> = members
            .iter()
            .filter(|&&j| j != i)
            .filter_map(|&j| concepts[j].embedding.as_deref())
            .map(|v| cosine_similarity(own, v) as f64)
            .collect();
        if others.is_empty() {
            return 0.0;
        }
        others.iter().sum::<f64>() / others.len() as f64
    };

    members.iter().copied().min_by(|&a, &b| {
        centrality(b)
            .total_cmp(&centrality(a))
            .then(concepts[b].confidence.total_cmp(&concepts[a].confidence))
            .then(concepts[a].canonical_name.len().cmp(&concepts[b].canonical_name.len()))
            .then(a.cmp(&b))
    })
}
