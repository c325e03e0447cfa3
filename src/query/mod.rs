//! Query system for Scholia knowledge graphs
//!
//! Traversal, search, ranking, ordering and component analysis. Every query
//! reads a `KnowledgeGraph` and never mutates it.

mod components;
mod order;
mod path;
mod rank;
mod search;
mod types;

pub use components::{ComponentsQuery, UnionFind};
pub use order::OrderQuery;
pub use path::PathQuery;
pub(crate) use rank::random_walk;
pub use rank::RankQuery;
pub use search::{Heuristic, SearchQuery};
pub use types::{CostModel, Direction, RankResult, SearchResult};
