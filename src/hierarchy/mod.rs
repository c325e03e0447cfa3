//! Concept hierarchy: the cycle-free parent/child forest and its builder

mod builder;
mod forest;

pub use builder::{HierarchyBuild, HierarchyBuilder};
pub(crate) use forest::mean_pairwise_similarity;
pub use forest::{ConceptHierarchy, HierarchyMetrics, ParentAssignment};
