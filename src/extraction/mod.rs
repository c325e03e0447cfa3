//! Candidate extraction: three independent strategies over paper text
//!
//! - [`RuleBasedGenerator`]: linguistic templates, is-a cues and ontology terms
//! - [`StatisticalGenerator`]: TF-IDF salience weighted by co-occurrence rank
//! - [`EmbeddingGenerator`]: content spans tagged with provider embeddings

mod cancel;
mod candidate;
mod embedding;
mod rule_based;
mod statistical;

pub use cancel::CancellationToken;
pub use candidate::{CandidateConcept, CandidateGenerator, GenerationContext, GenerationError, IsAHint};
pub use embedding::{cosine_similarity, embed_texts, mean_vector, Embedder, EmbeddingError, EmbeddingGenerator};
#[cfg(feature = "embeddings")]
pub use embedding::FastEmbedEmbedder;
pub use rule_based::{OntologyTerm, RuleBasedGenerator};
pub use statistical::{CorpusIndex, StatisticalGenerator};
