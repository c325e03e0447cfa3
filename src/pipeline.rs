//! Batch pipeline: papers in, immutable graph snapshot out
//!
//! Generators run concurrently across papers; everything after candidate
//! generation is sequential. A cancelled or failed batch returns an error and
//! nothing it built escapes.

use crate::config::EngineConfig;
use crate::consolidation::{cooccurrence, ConfidenceScorer, Consolidator, EvidenceBinder};
use crate::corpus::{Paper, SourceCorpus};
use crate::extraction::{
    embed_texts, CancellationToken, CandidateConcept, CandidateGenerator, CorpusIndex, Embedder, EmbeddingGenerator,
    GenerationContext, GenerationError, IsAHint, RuleBasedGenerator, StatisticalGenerator,
};
use crate::graph::{
    BatchId, BatchWarning, GraphChange, GraphSnapshot, KnowledgeGraph, QualityReport, ScholiaError, ScholiaResult,
    Strategy,
};
use crate::hierarchy::HierarchyBuilder;
use crate::text::normalize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// Default number of generator calls in flight
const DEFAULT_CONCURRENCY: usize = 8;

type Generated = (usize, usize, Result<Vec<CandidateConcept>, GenerationError>);

/// Runs Generators → Consolidator → Scorer → Binder → Hierarchy Builder → graph
pub struct BatchPipeline {
    config: EngineConfig,
    embedder: Option<Arc<dyn Embedder>>,
    changes: Option<mpsc::UnboundedSender<GraphChange>>,
    concurrency: usize,
}

impl BatchPipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            embedder: None,
            changes: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Forward the committed change log over a channel once a batch finishes
    pub fn with_change_sender(mut self, sender: mpsc::UnboundedSender<GraphChange>) -> Self {
        self.changes = Some(sender);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build one batch.
    ///
    /// Fails with `EmptyCorpus` when no paper has readable text and with
    /// `Cancelled` when the token fires; recoverable problems end up as
    /// warnings on the snapshot's quality report.
    pub async fn run(
        &self,
        batch_id: BatchId,
        corpus: &dyn SourceCorpus,
        cancel: &CancellationToken,
    ) -> ScholiaResult<GraphSnapshot> {
        cancel.check()?;
        let mut report = QualityReport::default();

        let mut papers: Vec<&Paper> = Vec::new();
        for paper in corpus.papers() {
            if paper.is_blank() {
                tracing::warn!(paper = %paper.id, "skipping blank paper");
                report.warnings.push(BatchWarning::BlankPaper {
                    paper_id: paper.id.clone(),
                });
            } else {
                papers.push(paper);
            }
        }
        if papers.is_empty() {
            tracing::error!(batch = %batch_id, "no readable papers in batch");
            return Err(ScholiaError::EmptyCorpus(batch_id));
        }
        report.paper_count = papers.len();
        tracing::info!(batch = %batch_id, papers = papers.len(), "batch started");

        let texts: Vec<String> = papers.iter().map(|p| p.full_text()).collect();
        let index = Arc::new(CorpusIndex::build(texts.iter().map(String::as_str)));

        let mut candidates = self.generate(&papers, &texts, index, cancel, &mut report).await?;
        cancel.check()?;
        self.embed_candidates(&mut candidates, &mut report).await;
        cancel.check()?;

        let hints = IsAHint::from_candidates(&candidates);
        let mut concepts = Consolidator::new(self.config.similarity_threshold).consolidate(&candidates);
        tracing::info!(candidates = candidates.len(), concepts = concepts.len(), "consolidated");

        ConfidenceScorer::new(self.config.confidence_floor, &candidates).apply(&mut concepts);
        cancel.check()?;

        let binding = EvidenceBinder::new(self.config.confidence_floor, self.config.ungrounded_decay)
            .with_max_per_concept(self.config.evidence.max_per_concept)
            .bind(&mut concepts, corpus);
        for id in &binding.ungrounded {
            if let Some(concept) = concepts.iter().find(|c| c.id == *id) {
                report.warnings.push(BatchWarning::UngroundedConcept {
                    concept_id: *id,
                    name: concept.canonical_name.clone(),
                });
            }
        }
        let cooccurs = cooccurrence(&concepts, self.config.cooccurrence.min_count);
        cancel.check()?;

        let build = HierarchyBuilder::new(self.config.nesting_threshold).build(concepts, &hints)?;
        let mut hierarchy = build.hierarchy;

        let mut graph = KnowledgeGraph::new();
        for concept in hierarchy.concepts() {
            graph.add_concept(concept.id);
        }
        for relationship in build.relationships.into_iter().chain(cooccurs) {
            graph.add_relationship(relationship)?;
        }
        cancel.check()?;

        report.concept_count = hierarchy.len();
        report.low_confidence = hierarchy.concepts().filter(|c| c.is_low_confidence()).count();
        report.ungrounded = binding.ungrounded;
        report.evidence_count = binding.bound;
        report.relationship_count = graph.relationship_count();
        report.rejected_parents = build.rejected;
        report.hierarchy = hierarchy.metrics();

        let mut changes = hierarchy.drain_changes();
        changes.extend(graph.drain_changes());
        self.forward(changes);

        tracing::info!(
            batch = %batch_id,
            concepts = report.concept_count,
            relationships = report.relationship_count,
            low_confidence = report.low_confidence,
            ungrounded = report.ungrounded.len(),
            degraded = report.is_degraded(),
            "batch complete"
        );
        Ok(GraphSnapshot::new(batch_id, hierarchy, graph, report))
    }

    fn generators(&self, index: Arc<CorpusIndex>) -> Vec<Arc<dyn CandidateGenerator>> {
        let mut generators: Vec<Arc<dyn CandidateGenerator>> = Vec::new();
        for strategy in &self.config.strategies {
            match strategy {
                Strategy::RuleBased => generators.push(Arc::new(
                    RuleBasedGenerator::new().with_ontology(self.config.rule_based.ontology.iter().cloned()),
                )),
                Strategy::Statistical => {
                    let stats = &self.config.statistical;
                    generators.push(Arc::new(
                        StatisticalGenerator::new(Arc::clone(&index))
                            .with_top_k(stats.top_k)
                            .with_window(stats.window)
                            .with_min_frequency(stats.min_frequency),
                    ))
                }
                Strategy::Embedding => match &self.embedder {
                    Some(embedder) => generators.push(Arc::new(
                        EmbeddingGenerator::new(Arc::clone(embedder))
                            .with_limits(self.config.embedding.max_spans, self.config.embedding.max_span_words),
                    )),
                    None => tracing::warn!("embedding strategy enabled but no embedder configured"),
                },
            }
        }
        generators
    }

    async fn generate(
        &self,
        papers: &[&Paper],
        texts: &[String],
        index: Arc<CorpusIndex>,
        cancel: &CancellationToken,
        report: &mut QualityReport,
    ) -> ScholiaResult<Vec<CandidateConcept>> {
        let generators = self.generators(index);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set: JoinSet<Generated> = JoinSet::new();

        for (pi, (paper, text)) in papers.iter().zip(texts).enumerate() {
            cancel.check()?;
            let context = GenerationContext::new(paper.id.clone())
                .with_domain(paper.domain.clone().or_else(|| self.config.domain.clone()));
            let text = Arc::new(text.clone());

            for (gi, generator) in generators.iter().enumerate() {
                let generator = Arc::clone(generator);
                let semaphore = Arc::clone(&semaphore);
                let cancel = cancel.clone();
                let context = context.clone();
                let text = Arc::clone(&text);
                join_set.spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return (pi, gi, Err(GenerationError::Cancelled));
                    };
                    if cancel.is_cancelled() {
                        return (pi, gi, Err(GenerationError::Cancelled));
                    }
                    (pi, gi, generator.generate(&text, &context).await)
                });
            }
        }

        let mut results: Vec<Generated> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let result = joined.map_err(|e| ScholiaError::Generation(e.to_string()))?;
            if matches!(result.2, Err(GenerationError::Cancelled)) || cancel.is_cancelled() {
                join_set.abort_all();
                return Err(ScholiaError::Cancelled);
            }
            results.push(result);
        }
        results.sort_by_key(|(pi, gi, _)| (*pi, *gi));

        let mut candidates = Vec::new();
        for (pi, gi, result) in results {
            let strategy = generators[gi].strategy();
            match result {
                Ok(found) => {
                    *report.candidate_counts.entry(strategy).or_default() += found.len();
                    candidates.extend(found);
                }
                Err(e) => {
                    tracing::warn!(paper = %papers[pi].id, %strategy, error = %e, "generator degraded");
                    report.warnings.push(BatchWarning::StrategyUnavailable {
                        strategy,
                        paper_id: papers[pi].id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        tracing::info!(candidates = candidates.len(), "candidates generated");
        Ok(candidates)
    }

    /// Give every candidate without a vector the embedding of its surface.
    async fn embed_candidates(&self, candidates: &mut [CandidateConcept], report: &mut QualityReport) {
        let Some(embedder) = &self.embedder else {
            return;
        };

        let mut surfaces: Vec<String> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();
        for candidate in candidates.iter().filter(|c| c.embedding.is_none()) {
            let key = normalize(&candidate.surface);
            if !slots.contains_key(&key) {
                slots.insert(key, surfaces.len());
                surfaces.push(candidate.surface.clone());
            }
        }
        if surfaces.is_empty() {
            return;
        }

        match embed_texts(Arc::clone(embedder), surfaces).await {
            Ok(vectors) => {
                for candidate in candidates.iter_mut().filter(|c| c.embedding.is_none()) {
                    if let Some(&slot) = slots.get(&normalize(&candidate.surface)) {
                        candidate.embedding = Some(vectors[slot].clone());
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "candidate embedding unavailable, clustering on exact matches only");
                report.warnings.push(BatchWarning::EmbeddingUnavailable { message: e.to_string() });
            }
        }
    }

    fn forward(&self, changes: Vec<GraphChange>) {
        let Some(sender) = &self.changes else {
            return;
        };
        let count = changes.len();
        for change in changes {
            if sender.send(change).is_err() {
                tracing::debug!("change receiver dropped");
                return;
            }
        }
        tracing::debug!(count, "forwarded graph changes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::InMemoryCorpus;
    use crate::extraction::EmbeddingError;

    struct DownEmbedder;

    impl Embedder for DownEmbedder {
        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Unavailable("offline".into()))
        }
    }

    fn corpus() -> InMemoryCorpus {
        InMemoryCorpus::new()
            .with_paper(Paper::from_text(
                "p1",
                "A convolutional network is a type of neural network. \
                 Convolutional networks use pooling layers such as max pooling and average pooling.",
            ))
            .with_paper(Paper::from_text("p2", "A recurrent network is a type of neural network."))
    }

    #[tokio::test]
    async fn builds_a_grounded_hierarchy_without_embeddings() {
        let pipeline = BatchPipeline::new(EngineConfig::default());
        let snapshot = pipeline
            .run(BatchId::from("b1"), &corpus(), &CancellationToken::new())
            .await
            .unwrap();

        let nn = snapshot.find_by_name("neural network").unwrap();
        let conv = snapshot.find_by_name("convolutional network").unwrap();
        assert_eq!(snapshot.hierarchy().parent(&conv.id), Some(nn.id));
        assert!(!snapshot.evidence(&nn.id).unwrap().is_empty());
        assert!(snapshot.graph().is_consistent());
        assert_eq!(snapshot.report().paper_count, 2);
        assert!(!snapshot.report().is_degraded());
    }

    #[tokio::test]
    async fn blank_corpus_fails_the_batch() {
        let corpus = InMemoryCorpus::new().with_paper(Paper::from_text("blank", "  \n\n ... "));
        let err = BatchPipeline::new(EngineConfig::default())
            .run(BatchId::from("b2"), &corpus, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScholiaError::EmptyCorpus(id) if id.as_str() == "b2"));
    }

    #[tokio::test]
    async fn cancelled_batch_publishes_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = BatchPipeline::new(EngineConfig::default())
            .run(BatchId::from("b3"), &corpus(), &cancel)
            .await;
        assert!(matches!(result, Err(ScholiaError::Cancelled)));
    }

    #[tokio::test]
    async fn embedder_outage_degrades_instead_of_failing() {
        let pipeline = BatchPipeline::new(EngineConfig::default()).with_embedder(Arc::new(DownEmbedder));
        let snapshot = pipeline
            .run(BatchId::from("b4"), &corpus(), &CancellationToken::new())
            .await
            .unwrap();

        let report = snapshot.report();
        assert!(report.is_degraded());
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, BatchWarning::StrategyUnavailable { strategy: Strategy::Embedding, .. })));
        assert!(report.candidate_counts.get(&Strategy::RuleBased).copied().unwrap_or(0) > 0);
        assert!(snapshot.find_by_name("neural network").is_some());
    }

    #[tokio::test]
    async fn change_log_is_forwarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        BatchPipeline::new(EngineConfig::default())
            .with_change_sender(tx)
            .run(BatchId::from("b5"), &corpus(), &CancellationToken::new())
            .await
            .unwrap();

        let mut changes = Vec::new();
        while let Ok(change) = rx.try_recv() {
            changes.push(change);
        }
        assert!(changes.iter().any(|c| matches!(c, GraphChange::ConceptAdded { .. })));
        assert!(changes.iter().any(|c| matches!(c, GraphChange::ParentAssigned { .. })));
    }
}
