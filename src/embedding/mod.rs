//! Dense embeddings and the HNSW vector index behind the in-memory adapter
//!
//! - `EmbeddingProvider` trait for abstraction
//! - `FastEmbedProvider` for local model inference
//! - `HashEmbeddingProvider` for offline, model-free embedding
//! - `VectorIndex` (HNSW, cosine) for nearest-neighbour search
mod provider;
mod vector_index;

pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider, HashEmbeddingProvider};
pub use vector_index::{SearchResult, VectorIndex, VectorIndexError};

use crate::config::{EmbeddingConfig, IndexingConfig};
use std::sync::Arc;

/// Build the provider named in configuration
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match config.provider.as_str() {
        "hash" => Ok(Arc::new(HashEmbeddingProvider::new(config.dimension)?)),
        "fastembed" => {
            let provider = FastEmbedProvider::new(&config.model)?;
            if provider.dimension() != config.dimension {
                tracing::warn!(
                    "Configured dimension {} differs from model dimension {}, using the model's",
                    config.dimension,
                    provider.dimension()
                );
            }
            Ok(Arc::new(provider))
        }
        other => Err(EmbeddingError::InitializationError(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

/// Empty index sized for `provider`
pub fn index_for(
    provider: &dyn EmbeddingProvider,
    config: &IndexingConfig,
) -> Result<VectorIndex, VectorIndexError> {
    VectorIndex::new(
        provider.dimension(),
        config.hnsw_m,
        config.hnsw_ef_construction,
        config.hnsw_ef_search,
        config.max_elements,
    )
}
