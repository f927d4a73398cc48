//! Scripted vector-store backends shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use stakefuse::retrieval::{
    AdapterError, AdapterHandle, CollectionStats, HybridSearch, PassageRef, RetrievalAdapter,
    SearchHit, WeightedQuery,
};
use stakefuse::sparse::SparseVector;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn passage(id: &str) -> PassageRef {
    PassageRef::new(format!("passage {}", id)).with_id(id)
}

pub fn hits(ids: &[&str]) -> Vec<SearchHit> {
    ids.iter()
        .enumerate()
        .map(|(rank, id)| SearchHit {
            passage: passage(id),
            score: 1.0 - rank as f32 * 0.01,
        })
        .collect()
}

pub fn queries(items: &[(&str, f64)]) -> Vec<WeightedQuery> {
    items
        .iter()
        .map(|(text, weight)| WeightedQuery::new(*text, *weight))
        .collect()
}

/// How the hybrid path of a [`ScriptedAdapter`] behaves
#[derive(Debug, Clone)]
pub enum HybridScript {
    Fail,
    Return(Vec<SearchHit>),
    /// Fail for these query embeddings, return the hits otherwise
    FailFor(Vec<Vec<f32>>, Vec<SearchHit>),
}

/// Backend answering from fixed per-query rankings
#[derive(Default)]
pub struct ScriptedAdapter {
    rankings: HashMap<String, Vec<SearchHit>>,
    fallback: Vec<SearchHit>,
    failing: HashMap<String, AdapterError>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    default_error: Option<AdapterError>,
    hybrid: Option<HybridScript>,
    total_documents: usize,
    dense_calls: AtomicUsize,
    hybrid_calls: AtomicUsize,
    dense_calls_by_query: Mutex<HashMap<String, usize>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranking(mut self, query: &str, ids: &[&str]) -> Self {
        self.rankings.insert(query.to_string(), hits(ids));
        self
    }

    pub fn raw_ranking(mut self, query: &str, ranking: Vec<SearchHit>) -> Self {
        self.rankings.insert(query.to_string(), ranking);
        self
    }

    /// Ranking for queries without their own
    pub fn fallback(mut self, ids: &[&str]) -> Self {
        self.fallback = hits(ids);
        self
    }

    pub fn failing(mut self, query: &str, error: AdapterError) -> Self {
        self.failing.insert(query.to_string(), error);
        self
    }

    pub fn always_failing(mut self, error: AdapterError) -> Self {
        self.default_error = Some(error);
        self
    }

    pub fn delayed(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn always_delayed(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn with_hybrid(mut self, script: HybridScript) -> Self {
        self.hybrid = Some(script);
        self
    }

    pub fn documents(mut self, total: usize) -> Self {
        self.total_documents = total;
        self
    }

    pub fn dense_calls(&self) -> usize {
        self.dense_calls.load(Ordering::SeqCst)
    }

    pub fn hybrid_calls(&self) -> usize {
        self.hybrid_calls.load(Ordering::SeqCst)
    }

    pub fn dense_calls_for(&self, query: &str) -> usize {
        let calls = self.dense_calls_by_query.lock().unwrap();
        calls.get(query).copied().unwrap_or(0)
    }
}

pub fn handle(adapter: Arc<ScriptedAdapter>) -> AdapterHandle {
    AdapterHandle::new(adapter)
}

#[async_trait]
impl RetrievalAdapter for ScriptedAdapter {
    async fn dense_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, AdapterError> {
        self.dense_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .dense_calls_by_query
            .lock()
            .unwrap()
            .entry(query.to_string())
            .or_insert(0) += 1;

        if let Some(delay) = self.delays.get(query).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.failing.get(query).or(self.default_error.as_ref()) {
            return Err(error.clone());
        }

        let mut ranking = self
            .rankings
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        ranking.truncate(k);
        Ok(ranking)
    }

    async fn stats(&self, _collection_id: &str) -> Result<CollectionStats, AdapterError> {
        Ok(CollectionStats {
            total_documents: self.total_documents,
        })
    }

    fn hybrid(self: Arc<Self>) -> Option<Arc<dyn HybridSearch>> {
        if self.hybrid.is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[async_trait]
impl HybridSearch for ScriptedAdapter {
    async fn hybrid_search(
        &self,
        dense: &[f32],
        _sparse: &SparseVector,
        k: usize,
    ) -> Result<Vec<SearchHit>, AdapterError> {
        self.hybrid_calls.fetch_add(1, Ordering::SeqCst);

        match &self.hybrid {
            Some(HybridScript::FailFor(failing, ranking))
                if !failing.iter().any(|v| v.as_slice() == dense) =>
            {
                let mut ranking = ranking.clone();
                ranking.truncate(k);
                Ok(ranking)
            }
            Some(HybridScript::Return(ranking)) => {
                let mut ranking = ranking.clone();
                ranking.truncate(k);
                Ok(ranking)
            }
            Some(HybridScript::Fail) | Some(HybridScript::FailFor(..)) | None => {
                Err(AdapterError::Backend("sparse index offline".to_string()))
            }
        }
    }
}
