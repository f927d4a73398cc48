//! Vector-store boundary
//!
//! Backends implement [`RetrievalAdapter`] (dense search plus collection
//! stats). Hybrid-capable backends also implement [`HybridSearch`] and expose
//! it through [`RetrievalAdapter::hybrid`]; [`AdapterHandle`] asks once, at
//! construction, and remembers the answer.

use crate::sparse::SparseVector;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AdapterError {
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),
}

/// Passage as returned by a backend
///
/// Only the `sourceFile` and `chunkIndex` metadata keys are interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl PassageRef {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// One ranked hit; backends return hits best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub passage: PassageRef,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_documents: usize,
}

/// Vector-store backend
#[async_trait]
pub trait RetrievalAdapter: Send + Sync {
    /// At most `k` hits, best first; an empty list is a valid answer
    async fn dense_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, AdapterError>;

    async fn stats(&self, collection_id: &str) -> Result<CollectionStats, AdapterError>;

    /// Hybrid capability, if this backend has one
    fn hybrid(self: Arc<Self>) -> Option<Arc<dyn HybridSearch>> {
        None
    }

    fn name(&self) -> &str;
}

/// Combined dense + sparse search
#[async_trait]
pub trait HybridSearch: Send + Sync {
    async fn hybrid_search(
        &self,
        dense: &[f32],
        sparse: &SparseVector,
        k: usize,
    ) -> Result<Vec<SearchHit>, AdapterError>;
}

/// Adapter plus its capability, resolved once
#[derive(Clone)]
pub struct AdapterHandle {
    adapter: Arc<dyn RetrievalAdapter>,
    hybrid: Option<Arc<dyn HybridSearch>>,
}

impl AdapterHandle {
    pub fn new(adapter: Arc<dyn RetrievalAdapter>) -> Self {
        let hybrid = adapter.clone().hybrid();
        Self { adapter, hybrid }
    }

    pub fn adapter(&self) -> &Arc<dyn RetrievalAdapter> {
        &self.adapter
    }

    pub fn hybrid(&self) -> Option<&Arc<dyn HybridSearch>> {
        self.hybrid.as_ref()
    }

    pub fn supports_hybrid(&self) -> bool {
        self.hybrid.is_some()
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }
}

impl std::fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("adapter", &self.adapter.name())
            .field("hybrid", &self.supports_hybrid())
            .finish()
    }
}
