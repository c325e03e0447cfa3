//! Embedding strategy: tag text spans with vectors from an injected provider
//!
//! The provider is an external collaborator. When it fails, this strategy
//! reports `Unavailable` for the paper and the batch carries on without it.

use super::candidate::{CandidateConcept, CandidateGenerator, GenerationContext, GenerationError};
use crate::graph::Strategy;
use crate::text::{is_content_word, normalize, span, split_sentences, words};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors from an embedding provider
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding model error: {0}")]
    ModelError(String),

    #[error("embedding returned empty result")]
    EmptyResult,

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Text to fixed-length vector.
///
/// fastembed-rs for production, table-driven mocks for tests.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[cfg(feature = "embeddings")]
mod fastembed_impl {
    use super::{Embedder, EmbeddingError};
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Mutex;

    /// Production embedder backed by fastembed (ONNX Runtime).
    ///
    /// `TextEmbedding::embed` needs `&mut self`, hence the `Mutex`.
    pub struct FastEmbedEmbedder {
        model: Mutex<TextEmbedding>,
    }

    impl FastEmbedEmbedder {
        pub fn new(model: EmbeddingModel) -> Result<Self, EmbeddingError> {
            let options = InitOptions::new(model).with_show_download_progress(false);
            let embedding = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            Ok(Self {
                model: Mutex::new(embedding),
            })
        }

        /// nomic-embed-text-v1.5
        pub fn default_model() -> Result<Self, EmbeddingError> {
            Self::new(EmbeddingModel::NomicEmbedTextV15)
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let mut model = self
                .model
                .lock()
                .map_err(|_| EmbeddingError::Unavailable("model lock poisoned".into()))?;
            let embeddings = model
                .embed(texts.to_vec(), None)
                .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            if embeddings.is_empty() {
                return Err(EmbeddingError::EmptyResult);
            }
            Ok(embeddings)
        }
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;

/// Cosine similarity between two vectors; 0 for zero or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Component-wise mean. `None` when empty or the dimensions disagree.
pub fn mean_vector(vectors: &[&[f32]]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dim = first.len();
    if vectors.iter().any(|v| v.len() != dim) {
        return None;
    }
    let mut mean = vec![0.0f32; dim];
    for v in vectors {
        for (m, x) in mean.iter_mut().zip(v.iter()) {
            *m += x;
        }
    }
    let n = vectors.len() as f32;
    mean.iter_mut().for_each(|m| *m /= n);
    Some(mean)
}

/// Embed texts on the blocking pool and check the provider kept its contract.
pub async fn embed_texts(embedder: Arc<dyn Embedder>, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let expected = texts.len();
    let vectors = tokio::task::spawn_blocking(move || {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        embedder.embed_batch(&refs)
    })
    .await
    .map_err(|e| EmbeddingError::Unavailable(e.to_string()))??;

    if vectors.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vectors.len(),
        });
    }
    if let Some(dim) = vectors.first().map(Vec::len) {
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dim,
                actual: bad.len(),
            });
        }
    }
    Ok(vectors)
}

/// Emits content-word spans tagged with their embeddings. Does not rank.
pub struct EmbeddingGenerator {
    embedder: Arc<dyn Embedder>,
    max_spans: usize,
    max_span_words: usize,
}

impl EmbeddingGenerator {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            max_spans: 64,
            max_span_words: 4,
        }
    }

    pub fn with_limits(mut self, max_spans: usize, max_span_words: usize) -> Self {
        self.max_spans = max_spans;
        self.max_span_words = max_span_words.max(1);
        self
    }

    /// Distinct spans, most frequent first, then longer, then first seen.
    fn spans(&self, text: &str) -> Vec<String> {
        // normalized -> (first surface, count, first position, word count)
        let mut seen: HashMap<String, (String, usize, usize, usize)> = HashMap::new();
        let mut position = 0;

        for (_, sentence) in split_sentences(text) {
            let ws = words(sentence);
            for run in ws.split(|w| !is_content_word(&w.lower())) {
                for len in 1..=self.max_span_words.min(run.len()) {
                    for window in run.windows(len) {
                        let Some(surface) = span(sentence, window) else { continue };
                        let entry = seen
                            .entry(normalize(surface))
                            .or_insert_with(|| (surface.to_string(), 0, position, len));
                        entry.1 += 1;
                        position += 1;
                    }
                }
            }
        }

        let mut spans: Vec<_> = seen.into_values().collect();
        spans.sort_by(|a, b| b.1.cmp(&a.1).then(b.3.cmp(&a.3)).then(a.2.cmp(&b.2)));
        spans.into_iter().take(self.max_spans).map(|(s, ..)| s).collect()
    }
}

#[async_trait]
impl CandidateGenerator for EmbeddingGenerator {
    fn strategy(&self) -> Strategy {
        Strategy::Embedding
    }

    async fn generate(
        &self,
        text: &str,
        context: &GenerationContext,
    ) -> Result<Vec<CandidateConcept>, GenerationError> {
        let spans = self.spans(text);
        let vectors = embed_texts(Arc::clone(&self.embedder), spans.clone())
            .await
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;

        Ok(spans
            .into_iter()
            .zip(vectors)
            .map(|(surface, vector)| {
                CandidateConcept::new(surface, "span", Strategy::Embedding, 0.0, context.paper_id.clone())
                    .with_domain(context.domain.clone())
                    .with_embedding(vector)
            })
            .collect())
    }
}
