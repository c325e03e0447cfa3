//! Common test utilities for Scholia integration tests
//!
//! A deterministic embedder and a small paper corpus about introductory
//! programming and neural networks.

#![allow(dead_code)]

use scholia::extraction::{Embedder, EmbeddingError};
use scholia::text::normalize;
use scholia::{InMemoryCorpus, Paper};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

const DIM: usize = 256;

/// Table-driven embedder with a hashed bag-of-words fallback.
///
/// Texts are looked up by their normalized form; anything not in the table
/// gets a unit vector built from the FNV hashes of its words, so identical
/// texts always embed identically.
#[derive(Default)]
pub struct MockEmbedder {
    table: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(normalize(text), vector);
        self
    }

    /// Number of `embed_batch` calls served
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hashed(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; DIM];
        for word in text.split_whitespace() {
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in word.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            vector[(hash % DIM as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Embedder for MockEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let key = normalize(text);
                self.table.get(&key).cloned().unwrap_or_else(|| Self::hashed(&key))
            })
            .collect())
    }
}

/// Embedder whose provider is always down
pub struct OfflineEmbedder;

impl Embedder for OfflineEmbedder {
    fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("provider offline".into()))
    }
}

/// Three short papers with explicit is-a cues
pub fn lecture_corpus() -> InMemoryCorpus {
    InMemoryCorpus::new()
        .with_paper(
            Paper::from_text(
                "cnn-intro",
                "A convolutional network is a type of neural network. \
                 Convolutional networks apply pooling layers after each convolution.\x0c\
                 Max pooling keeps the strongest activation in each window.",
            )
            .with_title("Convolutional networks")
            .with_domain("vision"),
        )
        .with_paper(
            Paper::from_text(
                "rnn-intro",
                "A recurrent network is a type of neural network. \
                 Recurrent networks carry hidden state between time steps.",
            )
            .with_domain("language"),
        )
        .with_paper(Paper::from_text(
            "programming",
            "Variables hold values. Functions use variables. \
             Loops call functions repeatedly. Algorithms are built from loops.",
        ))
}

/// Paper text for page `locator.page` of `paper_id`
pub fn page_text<'a>(corpus: &'a InMemoryCorpus, paper_id: &str, page: u32) -> Option<&'a str> {
    use scholia::SourceCorpus;
    corpus
        .papers()
        .iter()
        .find(|p| p.id.as_str() == paper_id)
        .and_then(|p| p.pages.iter().find(|pg| pg.number == page))
        .map(|pg| pg.text.as_str())
}
