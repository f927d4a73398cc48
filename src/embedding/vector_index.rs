/// HNSW vector index for similarity search
use hnsw_rs::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use thiserror::Error;

/// hnsw_rs caps the layer count at 16
const MAX_LAYERS: usize = 16;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Insert failed: {0}")]
    InsertError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Index full: capacity {capacity}")]
    CapacityExceeded { capacity: usize },
}

/// Search result with ID and similarity score
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Position of the vector in insertion order
    pub id: usize,
    /// Cosine similarity, higher is more similar
    pub score: f32,
}

/// HNSW vector index wrapper
///
/// Approximate nearest neighbour search with cosine distance.
pub struct VectorIndex {
    index: RwLock<Hnsw<'static, f32, DistCosine>>,
    dimension: usize,
    capacity: usize,
    ef_search: usize,
    count: AtomicUsize,
}

impl VectorIndex {
    /// Create an empty index
    ///
    /// # Arguments
    /// * `dimension` - Vector dimension (must match embedding dimension)
    /// * `m` - Connections per layer
    /// * `ef_construction` - Build-time candidate list size
    /// * `ef_search` - Query-time candidate list size
    /// * `capacity` - Expected maximum number of vectors
    pub fn new(
        dimension: usize,
        m: usize,
        ef_construction: usize,
        ef_search: usize,
        capacity: usize,
    ) -> Result<Self, VectorIndexError> {
        if dimension == 0 || m == 0 || capacity == 0 {
            return Err(VectorIndexError::InitializationError(format!(
                "dimension, m and capacity must be positive (got {}, {}, {})",
                dimension, m, capacity
            )));
        }

        let index = Hnsw::<f32, DistCosine>::new(m, capacity, MAX_LAYERS, ef_construction, DistCosine);

        Ok(Self {
            index: RwLock::new(index),
            dimension,
            capacity,
            ef_search,
            count: AtomicUsize::new(0),
        })
    }

    /// Insert a vector; returns its id
    pub fn insert(&self, vector: &[f32]) -> Result<usize, VectorIndexError> {
        self.check_dimension(vector)?;

        let index = self
            .index
            .write()
            .map_err(|e| VectorIndexError::InsertError(e.to_string()))?;

        let id = self.count.load(Ordering::SeqCst);
        if id >= self.capacity {
            return Err(VectorIndexError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let data = vector.to_vec();
        index.insert((&data, id));
        self.count.store(id + 1, Ordering::SeqCst);

        Ok(id)
    }

    /// Insert several vectors; returns their ids in order
    pub fn insert_batch(&self, vectors: &[Vec<f32>]) -> Result<Vec<usize>, VectorIndexError> {
        vectors.iter().map(|v| self.insert(v)).collect()
    }

    /// Search for the k nearest neighbours, most similar first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorIndexError> {
        self.check_dimension(query)?;

        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let index = self
            .index
            .read()
            .map_err(|e| VectorIndexError::SearchError(e.to_string()))?;

        let ef = self.ef_search.max(k);
        let mut results: Vec<SearchResult> = index
            .search(query, k, ef)
            .into_iter()
            .map(|neighbour| SearchResult {
                id: neighbour.d_id,
                score: 1.0 - neighbour.distance,
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        results.truncate(k);
        Ok(results)
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
