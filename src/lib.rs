//! Scholia: Multi-Strategy Concept Extraction Engine
//!
//! Turns a batch of academic papers into a deduplicated, evidence-backed
//! concept hierarchy and a typed knowledge graph over those concepts.
//!
//! # Core Concepts
//!
//! - **Candidates**: raw concept proposals from three independent
//!   strategies (rule-based, statistical, embedding)
//! - **Concepts**: consolidated candidates with a consensus confidence and
//!   sentence-level evidence back into the corpus
//! - **Hierarchy**: a cycle-free forest of parent/child links
//! - **Knowledge graph**: typed relationships supporting path, search,
//!   ranking, ordering and component queries
//! - **Snapshots**: one immutable result per batch, published through the
//!   engine and optionally persisted
//!
//! # Example
//!
//! ```
//! use scholia::{BatchPipeline, CancellationToken, EngineConfig, InMemoryCorpus, Paper};
//!
//! # tokio_test::block_on(async {
//! let corpus = InMemoryCorpus::new().with_paper(Paper::from_text(
//!     "intro",
//!     "A convolutional network is a type of neural network.",
//! ));
//!
//! let pipeline = BatchPipeline::new(EngineConfig::default());
//! let snapshot = pipeline
//!     .run("intro-batch".into(), &corpus, &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert!(snapshot.find_by_name("neural network").is_some());
//! # });
//! ```

pub mod config;
pub mod consolidation;
pub mod corpus;
pub mod export;
pub mod extraction;
mod graph;
pub mod hierarchy;
pub mod pipeline;
pub mod query;
pub mod storage;
pub mod text;

pub use config::{ConfigError, EngineConfig};
pub use corpus::{InMemoryCorpus, Locator, Paper, PaperId, SourceCorpus};
pub use export::VisualizationExport;
pub use extraction::{CancellationToken, CandidateConcept, CandidateGenerator, Embedder};
pub use graph::{
    BatchId, BatchWarning, Concept, ConceptFlags, ConceptId, ConceptRelationship, EdgeKey,
    EvidenceSentence, GraphChange, GraphSnapshot, KnowledgeGraph, ParentRejection, QualityReport,
    RelationshipKind, ScholiaEngine, ScholiaError, ScholiaResult, Strategy, SurfaceForm,
};
pub use hierarchy::{ConceptHierarchy, HierarchyMetrics, ParentAssignment};
pub use pipeline::BatchPipeline;
pub use query::{
    ComponentsQuery, CostModel, Direction, Heuristic, OrderQuery, PathQuery, RankQuery, RankResult,
    SearchQuery, SearchResult,
};
pub use storage::{OpenStore, SnapshotStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
