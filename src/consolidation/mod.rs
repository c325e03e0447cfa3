//! Consolidation stage: candidates become scored, evidence-grounded concepts

mod cluster;
mod confidence;
mod consolidator;
mod evidence;

pub(crate) use cluster::{agglomerate, Linkage, Merge};
pub use confidence::{coherence, ConfidenceScorer};
pub use consolidator::Consolidator;
pub use evidence::{cooccurrence, BindingReport, EvidenceBinder};
