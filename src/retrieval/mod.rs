//! Multi-query retrieval with Reciprocal Rank Fusion
//!
//! This module implements the vector-store boundary, the fusion engine and
//! the adaptive multi-phase controller on top of it.

mod adapter;
mod controller;
pub mod fusion;
mod memory;
mod passage;
mod registry;

pub use adapter::{
    AdapterError, AdapterHandle, CollectionStats, HybridSearch, PassageRef, RetrievalAdapter,
    SearchHit,
};
pub use controller::{AdaptiveController, SearchRequest};
pub use fusion::{
    search_k_for, FusionAccumulator, FusionConfig, FusionResult, FusionStatistics,
    RrfFusionEngine, SearchMode,
};
pub use memory::InMemoryAdapter;
pub use passage::{passage_id, ScoredPassage, CHUNK_INDEX_KEY, SOURCE_FILE_KEY, UNKNOWN_SOURCE};
pub use registry::AdapterRegistry;

use serde::{Deserialize, Serialize};

/// Query string with its RRF weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedQuery {
    pub text: String,
    pub weight: f64,
}

impl WeightedQuery {
    pub fn new(text: impl Into<String>, weight: f64) -> Self {
        Self {
            text: text.into(),
            weight: weight.max(0.0),
        }
    }
}
