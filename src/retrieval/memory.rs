//! Dense-only in-memory adapter over an HNSW index

use crate::config::IndexingConfig;
use crate::embedding::{self, EmbeddingProvider, VectorIndex, VectorIndexError};
use crate::retrieval::{AdapterError, CollectionStats, PassageRef, RetrievalAdapter, SearchHit};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Reference adapter for one collection
///
/// Passages are embedded with the configured provider and stored in
/// insertion order; the index id of a vector is its passage position.
pub struct InMemoryAdapter {
    collection_id: String,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    passages: RwLock<Vec<PassageRef>>,
    batch_size: usize,
}

impl InMemoryAdapter {
    pub fn new(
        collection_id: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: VectorIndex,
        batch_size: usize,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            embedder,
            index: Arc::new(index),
            passages: RwLock::new(Vec::new()),
            batch_size: batch_size.max(1),
        }
    }

    /// Adapter with an empty index sized for `embedder`
    pub fn with_config(
        collection_id: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        indexing: &IndexingConfig,
        batch_size: usize,
    ) -> Result<Self, VectorIndexError> {
        let index = embedding::index_for(embedder.as_ref(), indexing)?;
        Ok(Self::new(collection_id, embedder, index, batch_size))
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub async fn len(&self) -> usize {
        self.passages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Embed and index passages; blank passages are skipped
    ///
    /// Returns the number of passages added.
    pub async fn add_passages(&self, passages: Vec<PassageRef>) -> Result<usize, AdapterError> {
        let (passages, blank): (Vec<PassageRef>, Vec<PassageRef>) = passages
            .into_iter()
            .partition(|p| !p.text.trim().is_empty());
        if !blank.is_empty() {
            debug!("Skipping {} blank passages", blank.len());
        }

        // Held for the whole insert so index ids and positions stay aligned
        let mut stored = self.passages.write().await;
        let mut added = 0;

        for batch in passages.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let embedder = self.embedder.clone();
            let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
                .await
                .map_err(|e| AdapterError::Backend(format!("Embedding task failed: {}", e)))?
                .map_err(|e| AdapterError::Backend(e.to_string()))?;

            for (passage, vector) in batch.iter().zip(vectors) {
                let id = self
                    .index
                    .insert(&vector)
                    .map_err(|e| AdapterError::Backend(e.to_string()))?;
                debug_assert_eq!(id, stored.len());
                stored.push(passage.clone());
                added += 1;
            }
        }

        info!(
            "Indexed {} passages into '{}' ({} total)",
            added,
            self.collection_id,
            stored.len()
        );
        Ok(added)
    }
}

#[async_trait]
impl RetrievalAdapter for InMemoryAdapter {
    async fn dense_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, AdapterError> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedder = self.embedder.clone();
        let owned = query.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&owned))
            .await
            .map_err(|e| AdapterError::Backend(format!("Embedding task failed: {}", e)))?
            .map_err(|e| AdapterError::Backend(e.to_string()))?;

        let results = self
            .index
            .search(&vector, k)
            .map_err(|e| AdapterError::Backend(e.to_string()))?;

        let stored = self.passages.read().await;
        Ok(results
            .into_iter()
            .filter_map(|r| {
                stored.get(r.id).map(|passage| SearchHit {
                    passage: passage.clone(),
                    score: r.score,
                })
            })
            .collect())
    }

    async fn stats(&self, collection_id: &str) -> Result<CollectionStats, AdapterError> {
        if collection_id != self.collection_id {
            return Err(AdapterError::UnknownCollection(collection_id.to_string()));
        }
        Ok(CollectionStats {
            total_documents: self.passages.read().await.len(),
        })
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
