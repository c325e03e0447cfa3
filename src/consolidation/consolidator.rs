//! Candidates to concepts: exact grouping, then embedding clustering

use super::cluster::{agglomerate, Linkage};
use crate::extraction::{mean_vector, CandidateConcept};
use crate::graph::{Concept, Strategy, SurfaceForm};
use crate::text::normalize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Category guesses that carry no information beyond "this is a term"
const GENERIC_CATEGORIES: &[&str] = &["term", "span"];

/// Fallback category when no candidate guessed anything specific
const DEFAULT_CATEGORY: &str = "concept";

/// Candidates sharing one normalized surface form
#[derive(Debug, Default)]
struct SurfaceGroup {
    surfaces: Vec<SurfaceForm>,
    /// Summed embeddings and counts per surface, same order as `surfaces`
    sums: Vec<Option<(Vec<f32>, usize)>>,
    rule_categories: Vec<String>,
    other_categories: Vec<String>,
    domains: BTreeSet<String>,
    statistical_score: Option<f64>,
}

impl SurfaceGroup {
    fn add(&mut self, candidate: &CandidateConcept) {
        let slot = match self.surfaces.iter().position(|s| s.text == candidate.surface) {
            Some(slot) => slot,
            None => {
                self.surfaces.push(SurfaceForm {
                    text: candidate.surface.clone(),
                    occurrences: 0,
                    strategies: BTreeSet::new(),
                    embedding: None,
                });
                self.sums.push(None);
                self.surfaces.len() - 1
            }
        };
        let surface = &mut self.surfaces[slot];
        surface.occurrences += 1;
        surface.strategies.insert(candidate.strategy);

        if let Some(vector) = &candidate.embedding {
            match &mut self.sums[slot] {
                Some((sum, count)) if sum.len() == vector.len() => {
                    sum.iter_mut().zip(vector).for_each(|(s, x)| *s += x);
                    *count += 1;
                }
                Some(_) => {}
                None => self.sums[slot] = Some((vector.clone(), 1)),
            }
        }

        match candidate.strategy {
            Strategy::RuleBased => self.rule_categories.push(candidate.category.clone()),
            _ => self.other_categories.push(candidate.category.clone()),
        }
        if let Some(domain) = &candidate.domain {
            self.domains.insert(domain.clone());
        }
        if candidate.strategy == Strategy::Statistical {
            self.statistical_score = Some(self.statistical_score.map_or(candidate.score, |s| s.max(candidate.score)));
        }
    }

    /// Fill in per-surface mean embeddings and return the group centroid
    fn finish(&mut self) -> Option<Vec<f32>> {
        for (surface, sum) in self.surfaces.iter_mut().zip(&self.sums) {
            surface.embedding = sum
                .as_ref()
                .map(|(sum, count)| sum.iter().map(|x| x / *count as f32).collect());
        }
        let vectors: Vec<&[f32]> = self.surfaces.iter().filter_map(|s| s.embedding.as_deref()).collect();
        mean_vector(&vectors)
    }
}

/// Merges candidates across strategies and papers into canonical concepts
#[derive(Debug, Clone)]
pub struct Consolidator {
    similarity_threshold: f64,
}

impl Default for Consolidator {
    fn default() -> Self {
        Self::new(0.85)
    }
}

impl Consolidator {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold: similarity_threshold.clamp(0.0, 1.0),
        }
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Fold candidates into concepts.
    ///
    /// Exact matches (case/whitespace-insensitive) merge first; the resulting
    /// groups then cluster by complete-linkage cosine similarity. Every group
    /// ends up in exactly one concept, so single-strategy singletons are kept.
    /// Concepts come out in the order their first candidate appeared.
    pub fn consolidate(&self, candidates: &[CandidateConcept]) -> Vec<Concept> {
        let mut keys: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<SurfaceGroup> = Vec::new();
        for candidate in candidates {
            let key = normalize(&candidate.surface);
            if key.is_empty() {
                continue;
            }
            let slot = *keys.entry(key).or_insert_with(|| {
                groups.push(SurfaceGroup::default());
                groups.len() - 1
            });
            groups[slot].add(candidate);
        }

        let centroids: Vec<Option<Vec<f32>>> = groups.iter_mut().map(SurfaceGroup::finish).collect();
        let vectors: Vec<Option<&[f32]>> = centroids.iter().map(|c| c.as_deref()).collect();
        let (merges, clusters) = agglomerate(&vectors, self.similarity_threshold, Linkage::Complete);

        tracing::debug!(
            candidates = candidates.len(),
            groups = groups.len(),
            merges = merges.len(),
            "consolidated candidates"
        );

        clusters
            .iter()
            .map(|members| {
                let members: Vec<&SurfaceGroup> = members.iter().map(|&i| &groups[i]).collect();
                build_concept(&members)
            })
            .collect()
    }
}

fn build_concept(groups: &[&SurfaceGroup]) -> Concept {
    let surfaces: Vec<SurfaceForm> = groups.iter().flat_map(|g| g.surfaces.iter().cloned()).collect();

    let mut canonical = &surfaces[0];
    for surface in &surfaces[1..] {
        if surface.occurrences > canonical.occurrences {
            canonical = surface;
        }
    }
    let canonical_key = normalize(&canonical.text);

    let rule: Vec<&String> = groups.iter().flat_map(|g| &g.rule_categories).collect();
    let specific: Vec<&String> = groups
        .iter()
        .flat_map(|g| g.rule_categories.iter().chain(&g.other_categories))
        .filter(|c| !GENERIC_CATEGORIES.contains(&c.as_str()))
        .collect();
    let category = majority(&rule)
        .or_else(|| majority(&specific))
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let mut concept = Concept::new(canonical.text.clone(), category);
    for surface in &surfaces {
        if normalize(&surface.text) != canonical_key {
            concept.aliases.insert(surface.text.clone());
        }
        concept.strategies.extend(surface.strategies.iter().copied());
    }
    for group in groups {
        concept.domains.extend(group.domains.iter().cloned());
        if let Some(score) = group.statistical_score {
            concept.statistical_score = Some(concept.statistical_score.map_or(score, |s: f64| s.max(score)));
        }
    }

    let vectors: Vec<&[f32]> = surfaces.iter().filter_map(|s| s.embedding.as_deref()).collect();
    concept.embedding = mean_vector(&vectors);
    concept.surfaces = surfaces;
    concept
}

/// Most frequent value; ties go to the lexicographically smallest
fn majority(values: &[&String]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value.as_str()).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}
