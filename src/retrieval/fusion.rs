//! Reciprocal Rank Fusion across reformulated queries
//!
//! Each query runs as its own task (bounded by a semaphore). Per-query hit
//! lists are merged into a [`FusionAccumulator`] in query order once all
//! tasks are done, so fused scores do not depend on completion order.
//!
//! RRF: a hit at 0-based rank `r` for a query of weight `w` contributes
//! `w / (rrf_constant + r + 1)`.

use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::retrieval::passage::{passage_id, source_file};
use crate::retrieval::{
    AdapterError, AdapterHandle, HybridSearch, RetrievalAdapter, ScoredPassage, SearchHit,
    WeightedQuery,
};
use crate::sparse::SparseVectorEncoder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Fusion engine settings
#[derive(Debug, Clone)]
pub struct FusionConfig {
    pub rrf_constant: f64,
    pub min_search_k: usize,
    pub search_k_multiplier: f64,
    pub max_concurrent_queries: usize,
    pub query_timeout: Duration,
    /// Overall budget for one `fuse` call
    pub deadline: Option<Duration>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for FusionConfig {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            rrf_constant: config.rrf_constant as f64,
            min_search_k: config.min_search_k,
            search_k_multiplier: config.search_k_multiplier,
            max_concurrent_queries: config.max_concurrent_queries,
            query_timeout: config.query_timeout(),
            deadline: Some(config.deadline()),
        }
    }
}

impl FusionConfig {
    /// Per-query candidate window for a target of `k`
    pub fn search_k(&self, k: usize) -> usize {
        let scaled = (k as f64 * self.search_k_multiplier).ceil() as usize;
        scaled.max(self.min_search_k)
    }
}

/// `max(20, ceil(k × 1.5))`
pub fn search_k_for(k: usize) -> usize {
    FusionConfig::default().search_k(k)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Hybrid,
    Dense,
}

/// Outcome of one query within a pass
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub hits: Result<Vec<SearchHit>, AdapterError>,
    /// Hybrid was attempted but dense answered
    pub hybrid_fallback: bool,
    pub encoding_degraded: bool,
}

/// All queries of one retrieval pass, in query order
#[derive(Debug, Clone)]
pub struct PassResult {
    pub mode: SearchMode,
    pub search_k: usize,
    /// `None` where the overall deadline cut the query off
    pub outcomes: Vec<Option<QueryOutcome>>,
    pub timed_out: bool,
}

impl PassResult {
    pub fn queries_failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o, Some(QueryOutcome { hits: Ok(_), .. })))
            .count()
    }

    pub fn hybrid_fallbacks(&self) -> usize {
        self.outcomes
            .iter()
            .flatten()
            .filter(|o| o.hybrid_fallback)
            .count()
    }

    pub fn encoding_degraded(&self) -> bool {
        self.outcomes.iter().flatten().any(|o| o.encoding_degraded)
    }

    /// Some query filled its whole candidate window
    pub fn saturated(&self) -> bool {
        self.outcomes.iter().flatten().any(|o| match &o.hits {
            Ok(hits) => hits.len() >= self.search_k,
            Err(_) => false,
        })
    }

    /// Queries of this pass that returned hits, in query order
    ///
    /// `queries` must be the slice the pass was run with.
    pub fn succeeded(&self, queries: &[WeightedQuery]) -> Vec<WeightedQuery> {
        self.select(queries, |o| o.hits.is_ok())
    }

    /// Queries answered by the hybrid backend itself, not by dense fallback
    pub fn hybrid_answered(&self, queries: &[WeightedQuery]) -> Vec<WeightedQuery> {
        if self.mode != SearchMode::Hybrid {
            return Vec::new();
        }
        self.select(queries, |o| o.hits.is_ok() && !o.hybrid_fallback)
    }

    fn select(
        &self,
        queries: &[WeightedQuery],
        keep: impl Fn(&QueryOutcome) -> bool,
    ) -> Vec<WeightedQuery> {
        queries
            .iter()
            .zip(&self.outcomes)
            .filter(|(_, outcome)| match outcome {
                Some(outcome) => keep(outcome),
                None => false,
            })
            .map(|(query, _)| query.clone())
            .collect()
    }
}

/// Fusion statistics reported with every result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionStatistics {
    pub average_score: f64,
    pub average_coverage: f64,
    /// Returned passages per `sourceFile`
    pub source_counts: BTreeMap<String, usize>,
    /// Unique passages seen before truncation
    pub total_unique: usize,
    pub queries_issued: usize,
    pub queries_failed: usize,
    pub hybrid_fallbacks: usize,
    pub encoding_degraded: bool,
    pub all_queries_failed: bool,
    pub no_results: bool,
    pub timed_out: bool,
    pub phases_run: usize,
    pub target_k: usize,
    pub achievement_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusionResult {
    pub queries: Vec<WeightedQuery>,
    pub passages: Vec<ScoredPassage>,
    pub statistics: FusionStatistics,
}

#[derive(Debug, Clone)]
struct Candidate {
    id: String,
    text: String,
    metadata: serde_json::Map<String, serde_json::Value>,
    score: f64,
    per_query_rank: BTreeMap<String, usize>,
    per_query_score: BTreeMap<String, f32>,
}

/// Running RRF totals across one or more passes
#[derive(Debug, Clone)]
pub struct FusionAccumulator {
    rrf_constant: f64,
    candidates: HashMap<String, Candidate>,
    queries_issued: usize,
    queries_failed: usize,
    hybrid_fallbacks: usize,
    encoding_degraded: bool,
    timed_out: bool,
}

impl FusionAccumulator {
    pub fn new(rrf_constant: f64) -> Self {
        Self {
            rrf_constant,
            candidates: HashMap::new(),
            queries_issued: 0,
            queries_failed: 0,
            hybrid_fallbacks: 0,
            encoding_degraded: false,
            timed_out: false,
        }
    }

    pub fn unique_count(&self) -> usize {
        self.candidates.len()
    }

    /// Count a pass and fuse its hits
    pub fn absorb(&mut self, queries: &[WeightedQuery], pass: &PassResult) {
        self.record(pass);
        self.merge_hits(queries, pass);
    }

    /// Count a pass without fusing its hits
    pub fn record(&mut self, pass: &PassResult) {
        self.queries_issued += pass.outcomes.len();
        self.queries_failed += pass.queries_failed();
        self.hybrid_fallbacks += pass.hybrid_fallbacks();
        self.encoding_degraded |= pass.encoding_degraded();
        self.timed_out |= pass.timed_out;
    }

    /// Fuse the successful hit lists of a pass, in query order
    pub fn merge_hits(&mut self, queries: &[WeightedQuery], pass: &PassResult) {
        for (query, outcome) in queries.iter().zip(&pass.outcomes) {
            if let Some(QueryOutcome { hits: Ok(hits), .. }) = outcome {
                self.add_ranking(query, hits);
            }
        }
    }

    /// Fuse one ranked list
    pub fn add_ranking(&mut self, query: &WeightedQuery, hits: &[SearchHit]) {
        let mut seen = HashSet::new();

        for (rank, hit) in hits.iter().enumerate() {
            let id = passage_id(&hit.passage);
            // A backend repeating a passage only counts its best rank
            if !seen.insert(id.clone()) {
                continue;
            }

            let contribution = query.weight / (self.rrf_constant + rank as f64 + 1.0);
            let candidate = self.candidates.entry(id.clone()).or_insert_with(|| Candidate {
                id,
                text: hit.passage.text.clone(),
                metadata: hit.passage.metadata.clone(),
                score: 0.0,
                per_query_rank: BTreeMap::new(),
                per_query_score: BTreeMap::new(),
            });
            candidate.score += contribution;

            let one_based = rank + 1;
            let improved = candidate
                .per_query_rank
                .get(&query.text)
                .map_or(true, |best| one_based < *best);
            if improved {
                candidate.per_query_rank.insert(query.text.clone(), one_based);
                candidate.per_query_score.insert(query.text.clone(), hit.score);
            }
        }
    }

    /// Replace fused hits with another accumulator's, keeping this one's counters
    pub fn replace_hits(&mut self, other: FusionAccumulator) {
        self.candidates = other.candidates;
    }

    /// Sort, truncate to `k` and compute statistics
    pub fn into_result(self, k: usize, queries: Vec<WeightedQuery>, phases_run: usize) -> FusionResult {
        let total_unique = self.candidates.len();

        let mut passages: Vec<ScoredPassage> = self
            .candidates
            .into_values()
            .map(|c| ScoredPassage {
                query_coverage: c.per_query_rank.len(),
                id: c.id,
                text: c.text,
                metadata: c.metadata,
                rrf_score: c.score,
                per_query_rank: c.per_query_rank,
                per_query_score: c.per_query_score,
            })
            .collect();

        passages.sort_by(|a, b| {
            b.rrf_score
                .total_cmp(&a.rrf_score)
                .then_with(|| a.best_rank().cmp(&b.best_rank()))
                .then_with(|| a.id.cmp(&b.id))
        });
        passages.truncate(k);

        let returned = passages.len();
        let mut source_counts = BTreeMap::new();
        for passage in &passages {
            *source_counts
                .entry(source_file(&passage.metadata).to_string())
                .or_insert(0) += 1;
        }
        let (average_score, average_coverage) = if returned == 0 {
            (0.0, 0.0)
        } else {
            (
                passages.iter().map(|p| p.rrf_score).sum::<f64>() / returned as f64,
                passages.iter().map(|p| p.query_coverage).sum::<usize>() as f64 / returned as f64,
            )
        };

        let statistics = FusionStatistics {
            average_score,
            average_coverage,
            source_counts,
            total_unique,
            queries_issued: self.queries_issued,
            queries_failed: self.queries_failed,
            hybrid_fallbacks: self.hybrid_fallbacks,
            encoding_degraded: self.encoding_degraded,
            all_queries_failed: self.queries_issued > 0
                && self.queries_failed == self.queries_issued,
            no_results: returned == 0,
            timed_out: self.timed_out,
            phases_run,
            target_k: k,
            achievement_rate: if k == 0 {
                1.0
            } else {
                returned as f64 / k as f64
            },
        };

        FusionResult {
            queries,
            passages,
            statistics,
        }
    }
}

/// Encoders needed to turn query text into hybrid search input
#[derive(Clone)]
struct HybridEncoders {
    sparse: Arc<SparseVectorEncoder>,
    embedder: Arc<dyn EmbeddingProvider>,
}

/// Concurrent multi-query retrieval with RRF fusion
#[derive(Clone)]
pub struct RrfFusionEngine {
    config: FusionConfig,
    hybrid: Option<HybridEncoders>,
}

impl RrfFusionEngine {
    /// Dense-only engine
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            hybrid: None,
        }
    }

    /// Enable hybrid search against hybrid-capable adapters
    pub fn with_hybrid(
        mut self,
        sparse: Arc<SparseVectorEncoder>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        self.hybrid = Some(HybridEncoders { sparse, embedder });
        self
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Mode a pass against `adapter` would use
    pub fn preferred_mode(&self, adapter: &AdapterHandle) -> SearchMode {
        if self.hybrid.is_some() && adapter.supports_hybrid() {
            SearchMode::Hybrid
        } else {
            SearchMode::Dense
        }
    }

    /// Single-pass fusion, truncated to `k`
    pub async fn fuse(
        &self,
        queries: &[WeightedQuery],
        k: usize,
        search_k: usize,
        adapter: &AdapterHandle,
    ) -> FusionResult {
        let deadline = self.config.deadline.map(|d| Instant::now() + d);
        let pass = self
            .run_pass(queries, search_k, self.preferred_mode(adapter), adapter, deadline)
            .await;

        let mut accumulator = FusionAccumulator::new(self.config.rrf_constant);
        accumulator.absorb(queries, &pass);
        accumulator.into_result(k, queries.to_vec(), 1)
    }

    /// Run every query once, concurrently, and collect outcomes in query order
    pub async fn run_pass(
        &self,
        queries: &[WeightedQuery],
        search_k: usize,
        mode: SearchMode,
        adapter: &AdapterHandle,
        deadline: Option<Instant>,
    ) -> PassResult {
        let mut outcomes: Vec<Option<QueryOutcome>> = vec![None; queries.len()];
        let mut timed_out = false;

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_queries.max(1)));
        let mut tasks = JoinSet::new();

        for (index, query) in queries.iter().enumerate() {
            let semaphore = semaphore.clone();
            let text = query.text.clone();
            let dense = adapter.adapter().clone();
            let hybrid = match mode {
                SearchMode::Hybrid => adapter.hybrid().cloned().zip(self.hybrid.clone()),
                SearchMode::Dense => None,
            };
            let query_timeout = self.config.query_timeout;

            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        match tokio::time::timeout(
                            query_timeout,
                            search_one(&text, search_k, dense, hybrid),
                        )
                        .await
                        {
                            Ok(outcome) => outcome,
                            Err(_) => QueryOutcome {
                                hits: Err(AdapterError::Timeout(query_timeout)),
                                hybrid_fallback: false,
                                encoding_degraded: false,
                            },
                        }
                    }
                    Err(e) => QueryOutcome {
                        hits: Err(AdapterError::Unavailable(e.to_string())),
                        hybrid_fallback: false,
                        encoding_degraded: false,
                    },
                };
                (index, outcome)
            });
        }

        loop {
            let next = match deadline {
                Some(deadline) => {
                    let waited = tokio::time::timeout_at(deadline, tasks.join_next()).await;
                    match waited {
                        Ok(next) => next,
                        Err(_) => {
                            warn!(
                                "Retrieval deadline reached with {} queries outstanding",
                                tasks.len()
                            );
                            tasks.abort_all();
                            timed_out = true;
                            break;
                        }
                    }
                }
                None => tasks.join_next().await,
            };

            match next {
                Some(Ok((index, outcome))) => outcomes[index] = Some(outcome),
                Some(Err(e)) => warn!("Query task failed: {}", e),
                None => break,
            }
        }

        for (query, outcome) in queries.iter().zip(&outcomes) {
            match outcome {
                Some(QueryOutcome { hits: Ok(hits), .. }) => {
                    debug!("Query '{}' returned {} hits", query.text, hits.len())
                }
                Some(QueryOutcome { hits: Err(e), .. }) => {
                    warn!("Query '{}' failed: {}", query.text, e)
                }
                None => debug!("Query '{}' did not finish before the deadline", query.text),
            }
        }

        PassResult {
            mode,
            search_k,
            outcomes,
            timed_out,
        }
    }
}

async fn search_one(
    text: &str,
    search_k: usize,
    dense: Arc<dyn RetrievalAdapter>,
    hybrid: Option<(Arc<dyn HybridSearch>, HybridEncoders)>,
) -> QueryOutcome {
    let mut hybrid_fallback = false;
    let mut encoding_degraded = false;

    if let Some((backend, encoders)) = hybrid {
        let sparse = encoders.sparse.encode(text).await;
        encoding_degraded = sparse.degraded;

        let embedder = encoders.embedder.clone();
        let owned = text.to_string();
        let embedded = tokio::task::spawn_blocking(move || embedder.embed(&owned)).await;

        match embedded {
            Ok(Ok(vector)) => match backend.hybrid_search(&vector, &sparse.vector, search_k).await {
                Ok(mut hits) => {
                    hits.truncate(search_k);
                    return QueryOutcome {
                        hits: Ok(hits),
                        hybrid_fallback,
                        encoding_degraded,
                    };
                }
                Err(e) => warn!("Hybrid search failed for '{}', using dense: {}", text, e),
            },
            Ok(Err(e)) => warn!("Query embedding failed for '{}', using dense: {}", text, e),
            Err(e) => warn!("Query embedding task failed for '{}', using dense: {}", text, e),
        }
        hybrid_fallback = true;
    }

    let hits = dense.dense_search(text, search_k).await.map(|mut hits| {
        hits.truncate(search_k);
        hits
    });

    QueryOutcome {
        hits,
        hybrid_fallback,
        encoding_degraded,
    }
}
