//! Statistical strategy: TF-IDF salience boosted by TextRank centrality
//!
//! Document frequencies come from a `CorpusIndex` built once per batch and
//! shared read-only by every call.

use super::cancel::CancellationToken;
use super::candidate::{CandidateConcept, CandidateGenerator, GenerationContext, GenerationError};
use crate::graph::Strategy;
use crate::query::random_walk;
use crate::text::{is_content_word, split_sentences, words};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const TEXTRANK_DAMPING: f64 = 0.85;
const TEXTRANK_ITERATIONS: usize = 30;

/// A term occurrence: lowercase key plus the surface it was cut from
struct TermOccurrence<'a> {
    key: String,
    surface: &'a str,
}

/// Unigram and bigram terms of a sentence, built from content words only.
/// Bigrams never span punctuation.
fn sentence_terms(sentence: &str) -> (Vec<TermOccurrence<'_>>, Vec<String>) {
    let ws = words(sentence);
    let mut terms = Vec::new();
    let mut tokens = Vec::new();
    let mut previous: Option<usize> = None;

    for (i, w) in ws.iter().enumerate() {
        let lower = w.lower();
        if !is_content_word(&lower) {
            previous = None;
            continue;
        }
        if let Some(p) = previous {
            let gap = &sentence[ws[p].end..w.start];
            if gap.chars().all(char::is_whitespace) {
                terms.push(TermOccurrence {
                    key: format!("{} {}", tokens.last().map(String::as_str).unwrap_or_default(), lower),
                    surface: &sentence[ws[p].start..w.end],
                });
            }
        }
        terms.push(TermOccurrence {
            key: lower.clone(),
            surface: w.text,
        });
        tokens.push(lower);
        previous = Some(i);
    }
    (terms, tokens)
}

/// Frozen document-frequency table over a batch's papers
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    documents: usize,
    document_frequency: HashMap<String, usize>,
}

impl CorpusIndex {
    /// Count, for every term, how many texts contain it.
    pub fn build<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut index = Self::default();
        for text in texts {
            index.documents += 1;
            let mut seen = HashSet::new();
            for (_, sentence) in split_sentences(text) {
                let (terms, _) = sentence_terms(sentence);
                seen.extend(terms.into_iter().map(|t| t.key));
            }
            for key in seen {
                *index.document_frequency.entry(key).or_default() += 1;
            }
        }
        index
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    /// Smoothed inverse document frequency
    pub fn idf(&self, term: &str) -> f64 {
        let n = self.documents as f64;
        let df = self.document_frequency(term) as f64;
        ((1.0 + n) / (1.0 + df)).ln() + 1.0
    }
}

/// Ranks terms by salience and co-occurrence centrality
pub struct StatisticalGenerator {
    index: Arc<CorpusIndex>,
    top_k: usize,
    window: usize,
    min_frequency: usize,
}

impl StatisticalGenerator {
    pub fn new(index: Arc<CorpusIndex>) -> Self {
        Self {
            index,
            top_k: 20,
            window: 4,
            min_frequency: 1,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(2);
        self
    }

    pub fn with_min_frequency(mut self, min_frequency: usize) -> Self {
        self.min_frequency = min_frequency.max(1);
        self
    }

    /// Score every term of the text, best first.
    pub fn rank(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<(String, f64)>, GenerationError> {
        // key -> (first surface, count, first position)
        let mut counts: HashMap<String, (String, usize, usize)> = HashMap::new();
        let mut sentences_tokens = Vec::new();
        let mut position = 0;

        for (_, sentence) in split_sentences(text) {
            let (terms, tokens) = sentence_terms(sentence);
            for term in terms {
                let entry = counts
                    .entry(term.key)
                    .or_insert_with(|| (term.surface.to_string(), 0, position));
                entry.1 += 1;
                position += 1;
            }
            sentences_tokens.push(tokens);
        }
        if counts.is_empty() {
            return Ok(Vec::new());
        }

        let centrality = self.textrank(&sentences_tokens, cancel)?;
        let vocabulary = centrality.len().max(1) as f64;
        let max_count = counts.values().map(|(_, c, _)| *c).max().unwrap_or(1) as f64;

        let mut scored: Vec<(String, f64, usize)> = counts
            .into_iter()
            .filter(|(_, (_, count, _))| *count >= self.min_frequency)
            .map(|(key, (surface, count, first))| {
                let tf = count as f64 / max_count;
                let parts: Vec<f64> = key
                    .split(' ')
                    .map(|token| centrality.get(token).copied().unwrap_or(0.0))
                    .collect();
                let mean_rank = parts.iter().sum::<f64>() / parts.len() as f64;
                let score = tf * self.index.idf(&key) * (1.0 + mean_rank * vocabulary);
                (surface, score, first)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)));
        Ok(scored
            .into_iter()
            .take(self.top_k)
            .map(|(surface, score, _)| (surface, score))
            .collect())
    }

    /// TextRank over a windowed token co-occurrence graph
    fn textrank(&self, sentences: &[Vec<String>], cancel: &CancellationToken) -> Result<HashMap<String, f64>, GenerationError> {
        let mut ids: HashMap<&str, usize> = HashMap::new();
        let mut vocab: Vec<&str> = Vec::new();
        for token in sentences.iter().flatten() {
            ids.entry(token.as_str()).or_insert_with(|| {
                vocab.push(token.as_str());
                vocab.len() - 1
            });
        }

        let mut weights: Vec<HashMap<usize, f64>> = vec![HashMap::new(); vocab.len()];
        for tokens in sentences {
            for (i, a) in tokens.iter().enumerate() {
                for b in tokens.iter().skip(i + 1).take(self.window - 1) {
                    let (a, b) = (ids[a.as_str()], ids[b.as_str()]);
                    if a != b {
                        *weights[a].entry(b).or_default() += 1.0;
                        *weights[b].entry(a).or_default() += 1.0;
                    }
                }
            }
        }
        let adjacency: Vec<Vec<(usize, f64)>> = weights
            .into_iter()
            .map(|w| {
                let mut edges: Vec<(usize, f64)> = w.into_iter().collect();
                edges.sort_by_key(|(j, _)| *j);
                edges
            })
            .collect();

        let scores = random_walk(&adjacency, TEXTRANK_DAMPING, TEXTRANK_ITERATIONS, cancel)
            .map_err(|_| GenerationError::Cancelled)?;
        Ok(vocab
            .into_iter()
            .zip(scores)
            .map(|(token, score)| (token.to_string(), score))
            .collect())
    }
}

#[async_trait]
impl CandidateGenerator for StatisticalGenerator {
    fn strategy(&self) -> Strategy {
        Strategy::Statistical
    }

    async fn generate(
        &self,
        text: &str,
        context: &GenerationContext,
    ) -> Result<Vec<CandidateConcept>, GenerationError> {
        let ranked = self.rank(text, &CancellationToken::new())?;
        Ok(ranked
            .into_iter()
            .map(|(surface, score)| {
                CandidateConcept::new(surface, "term", Strategy::Statistical, score, context.paper_id.clone())
                    .with_domain(context.domain.clone())
            })
            .collect())
    }
}
