//! Adaptive multi-phase retrieval
//!
//! One search runs up to three phases, stopping as soon as the target K is
//! met:
//! 1. primary pass (hybrid when both engine and adapter support it)
//! 2. widen: larger candidate window, when some query filled its window
//! 3. dense fallback, fused into the same accumulator, after a hybrid primary
//!
//! Queries that failed in the primary pass are not re-issued, and queries
//! whose hybrid call already fell back to dense are left out of phase 3.

use crate::config::{Config, RetrievalConfig};
use crate::embedding::EmbeddingProvider;
use crate::enhancer::{EnhanceOptions, QueryEnhancer};
use crate::profile::StakeholderProfile;
use crate::retrieval::fusion::{FusionAccumulator, FusionConfig, FusionResult, RrfFusionEngine, SearchMode};
use crate::retrieval::{AdapterError, AdapterHandle, AdapterRegistry, WeightedQuery};
use crate::sizing::{BackendKind, DynamicKSizer};
use crate::sparse::SparseVectorEncoder;
use crate::strategy::StrategyTable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// One stakeholder search; optional fields override configured enhancement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub profile: StakeholderProfile,
    pub corpus_size: usize,
    #[serde(default)]
    pub backend_kind: BackendKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_queries: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_alternate_language: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_synonyms: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_role_specific_terms: Option<bool>,
}

impl SearchRequest {
    pub fn new(profile: StakeholderProfile, corpus_size: usize) -> Self {
        Self {
            profile,
            corpus_size,
            backend_kind: BackendKind::default(),
            max_queries: None,
            include_alternate_language: None,
            include_synonyms: None,
            include_role_specific_terms: None,
        }
    }

    pub fn with_backend(mut self, backend_kind: BackendKind) -> Self {
        self.backend_kind = backend_kind;
        self
    }

    fn options(&self, defaults: EnhanceOptions) -> EnhanceOptions {
        EnhanceOptions {
            max_queries: self.max_queries.unwrap_or(defaults.max_queries),
            include_alternate_language: self
                .include_alternate_language
                .unwrap_or(defaults.include_alternate_language),
            include_synonyms: self.include_synonyms.unwrap_or(defaults.include_synonyms),
            include_role_specific_terms: self
                .include_role_specific_terms
                .unwrap_or(defaults.include_role_specific_terms),
        }
    }
}

pub struct AdaptiveController {
    table: Arc<StrategyTable>,
    sizer: DynamicKSizer,
    enhancer: QueryEnhancer,
    engine: RrfFusionEngine,
    config: RetrievalConfig,
}

impl AdaptiveController {
    pub fn new(
        table: Arc<StrategyTable>,
        sizer: DynamicKSizer,
        enhancer: QueryEnhancer,
        engine: RrfFusionEngine,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            table,
            sizer,
            enhancer,
            engine,
            config,
        }
    }

    /// Dense-only controller wired from configuration
    pub fn from_config(config: &Config) -> Self {
        let table = Arc::new(config.strategy_table());
        Self::new(
            table.clone(),
            DynamicKSizer::new(table.clone(), config.sizing.clone()),
            QueryEnhancer::new(table, config.enhancement.clone()),
            RrfFusionEngine::new(FusionConfig::from(&config.retrieval)),
            config.retrieval.clone(),
        )
    }

    /// Enable hybrid passes against hybrid-capable adapters
    pub fn with_hybrid(
        mut self,
        sparse: Arc<SparseVectorEncoder>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        self.engine = self.engine.with_hybrid(sparse, embedder);
        self
    }

    pub fn sizer(&self) -> &DynamicKSizer {
        &self.sizer
    }

    pub fn enhancer(&self) -> &QueryEnhancer {
        &self.enhancer
    }

    pub async fn search(
        &self,
        profile: &StakeholderProfile,
        corpus_size: usize,
        backend_kind: BackendKind,
        adapter: &AdapterHandle,
    ) -> FusionResult {
        let request = SearchRequest::new(profile.clone(), corpus_size).with_backend(backend_kind);
        self.search_request(&request, adapter).await
    }

    /// Search a collection, reading its size from the adapter
    pub async fn search_collection(
        &self,
        profile: &StakeholderProfile,
        collection_id: &str,
        backend_kind: BackendKind,
        adapter: &AdapterHandle,
    ) -> Result<FusionResult, AdapterError> {
        let stats = adapter.adapter().stats(collection_id).await?;
        Ok(self
            .search(profile, stats.total_documents, backend_kind, adapter)
            .await)
    }

    /// Search a collection registered in `registry`
    pub async fn search_registered(
        &self,
        profile: &StakeholderProfile,
        collection_id: &str,
        backend_kind: BackendKind,
        registry: &AdapterRegistry,
    ) -> Result<FusionResult, AdapterError> {
        let adapter = registry
            .get(collection_id)
            .ok_or_else(|| AdapterError::UnknownCollection(collection_id.to_string()))?;
        self.search_collection(profile, collection_id, backend_kind, adapter)
            .await
    }

    pub async fn search_request(
        &self,
        request: &SearchRequest,
        adapter: &AdapterHandle,
    ) -> FusionResult {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "search",
            %request_id,
            stakeholder = %request.profile.id,
            adapter = adapter.name()
        );
        self.run(request, adapter).instrument(span).await
    }

    /// Weighted queries for a request, in enhancer order
    pub fn weighted_queries(&self, request: &SearchRequest) -> Vec<WeightedQuery> {
        let options = request.options(self.enhancer.default_options());
        let queries = self.enhancer.enhance(&request.profile, &options);
        let resolved = self.table.resolve(&request.profile.id, &request.profile.role);

        // Only the enhancer's cross-language tail can push past max_queries
        let alternate_index = (queries.len() > options.max_queries.max(1)).then(|| queries.len() - 1);

        queries
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let weight = resolved
                    .weights
                    .weight_for(i, &text, Some(i) == alternate_index);
                WeightedQuery::new(text, weight)
            })
            .collect()
    }

    async fn run(&self, request: &SearchRequest, adapter: &AdapterHandle) -> FusionResult {
        let plan = self
            .sizer
            .plan(request.corpus_size, &request.profile, request.backend_kind);
        let k = plan.request_k;

        info!(
            "Sizing: corpus={} category={} target={} k={} request_k={}",
            plan.corpus_size,
            plan.category.as_str(),
            plan.target,
            plan.k,
            k
        );

        if k == 0 {
            info!("Empty corpus, skipping retrieval");
            return FusionAccumulator::new(self.engine.config().rrf_constant)
                .into_result(0, Vec::new(), 0);
        }

        let queries = self.weighted_queries(request);
        let search_k = self.engine.config().search_k(k);
        let deadline = Instant::now() + self.config.deadline();
        let mode = if self.config.prefer_hybrid {
            self.engine.preferred_mode(adapter)
        } else {
            SearchMode::Dense
        };
        let max_phases = self.config.max_phases.max(1);

        let mut accumulator = FusionAccumulator::new(self.engine.config().rrf_constant);

        // Phase 1
        info!(
            "Phase 1: {:?} search, {} queries, search_k={}",
            mode,
            queries.len(),
            search_k
        );
        let primary = self
            .engine
            .run_pass(&queries, search_k, mode, adapter, Some(deadline))
            .await;
        accumulator.absorb(&queries, &primary);
        let mut phases_run = 1;
        let mut out_of_time = primary.timed_out;

        // Later phases only re-issue queries that answered; failures are final
        let answered = primary.succeeded(&queries);
        let mut hybrid_answered = primary.hybrid_answered(&queries);
        let mut window = search_k;

        // Phase 2: widen
        if accumulator.unique_count() < k
            && phases_run < max_phases
            && primary.saturated()
            && !out_of_time
            && !answered.is_empty()
        {
            let wide_k = ((search_k as f64 * self.config.widen_factor).ceil() as usize)
                .min(request.corpus_size);
            if wide_k > search_k {
                info!(
                    "Phase 2: widening {} queries to search_k={} ({} of {} found)",
                    answered.len(),
                    wide_k,
                    accumulator.unique_count(),
                    k
                );
                let wide = self
                    .engine
                    .run_pass(&answered, wide_k, mode, adapter, Some(deadline))
                    .await;
                accumulator.record(&wide);
                out_of_time |= wide.timed_out;
                phases_run += 1;

                let mut wider = FusionAccumulator::new(self.engine.config().rrf_constant);
                wider.merge_hits(&answered, &wide);
                if wider.unique_count() > accumulator.unique_count() {
                    accumulator.replace_hits(wider);
                    hybrid_answered = wide.hybrid_answered(&answered);
                    window = wide_k;
                } else {
                    debug!("Widened pass found nothing new, keeping primary results");
                }
            }
        }

        // Phase 3: dense pass for queries the hybrid backend answered itself;
        // fallback queries already contributed a dense ranking
        if accumulator.unique_count() < k
            && phases_run < max_phases
            && mode == SearchMode::Hybrid
            && !out_of_time
        {
            if hybrid_answered.is_empty() {
                debug!("No hybrid answers to complement, skipping dense fallback");
            } else {
                info!(
                    "Phase 3: dense fallback for {} queries ({} of {} found)",
                    hybrid_answered.len(),
                    accumulator.unique_count(),
                    k
                );
                let dense = self
                    .engine
                    .run_pass(
                        &hybrid_answered,
                        window,
                        SearchMode::Dense,
                        adapter,
                        Some(deadline),
                    )
                    .await;
                accumulator.absorb(&hybrid_answered, &dense);
                phases_run += 1;
            }
        }

        let result = accumulator.into_result(k, queries, phases_run);
        let stats = &result.statistics;
        info!(
            "Returned {} of {} passages in {} phase(s) (achievement {:.2}, failed queries {})",
            result.passages.len(),
            k,
            stats.phases_run,
            stats.achievement_rate,
            stats.queries_failed
        );
        result
    }
}
