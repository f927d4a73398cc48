//! Dynamic result-count ("K") sizing
//!
//! K is a fraction of the corpus, clamped per stakeholder. Pure functions,
//! no I/O.

use crate::config::SizingConfig;
use crate::profile::StakeholderProfile;
use crate::strategy::{KSizingConfig, StakeholderCategory, StrategyTable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Guards ceil/floor against representation error (100 × 0.55 = 55.000000000000007)
const ROUNDING_EPSILON: f64 = 1e-9;

/// Vector-store backend class, as far as result sizing is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Standard,
    /// Backend without efficient top-K pruning; max K is scaled down
    MemoryConstrained,
}

/// Breakdown of one sizing decision
#[derive(Debug, Clone, Serialize)]
pub struct SizingPlan {
    pub category: StakeholderCategory,
    pub known_stakeholder: bool,
    pub sizing: KSizingConfig,
    pub corpus_size: usize,
    /// ceil(corpus_size × ratio)
    pub target: usize,
    pub effective_max_k: usize,
    /// Clamped target
    pub k: usize,
    /// K after the caller-side corpus cap; what is actually requested
    pub request_k: usize,
}

/// Computes K from corpus size and stakeholder profile
#[derive(Debug, Clone)]
pub struct DynamicKSizer {
    table: Arc<StrategyTable>,
    config: SizingConfig,
}

impl DynamicKSizer {
    pub fn new(table: Arc<StrategyTable>, config: SizingConfig) -> Self {
        Self { table, config }
    }

    /// Target result count for this profile
    ///
    /// May exceed `corpus_size` when the stakeholder's `min_k` does; use
    /// [`Self::request_k`] before issuing the retrieval.
    pub fn compute_k(
        &self,
        corpus_size: usize,
        profile: &StakeholderProfile,
        backend: BackendKind,
    ) -> usize {
        let resolved = self.table.resolve(&profile.id, &profile.role);
        self.k_for(&resolved.k_sizing, corpus_size, backend)
    }

    /// K for an explicit sizing tuple
    pub fn k_for(&self, sizing: &KSizingConfig, corpus_size: usize, backend: BackendKind) -> usize {
        let target = target_for(sizing.ratio, corpus_size);
        let max_k = self.effective_max_k(sizing, backend);
        target.clamp(sizing.min_k, max_k)
    }

    /// Upper clamp after the backend adjustment, never below `min_k`
    pub fn effective_max_k(&self, sizing: &KSizingConfig, backend: BackendKind) -> usize {
        let max_k = match backend {
            BackendKind::Standard => sizing.max_k,
            BackendKind::MemoryConstrained => {
                (sizing.max_k as f64 * self.config.memory_constrained_factor + ROUNDING_EPSILON)
                    .floor() as usize
            }
        };
        max_k.max(sizing.min_k)
    }

    /// Caller-side clamp: `min(k, floor(corpus_size × cap))`
    ///
    /// Keeps at least one result for a non-empty corpus, where the floor
    /// would otherwise round a single-document corpus down to zero.
    pub fn request_k(&self, k: usize, corpus_size: usize) -> usize {
        if corpus_size == 0 {
            return 0;
        }
        let cap = (corpus_size as f64 * self.config.request_ratio_cap + ROUNDING_EPSILON).floor()
            as usize;
        k.min(cap.max(1))
    }

    /// Full sizing breakdown for a profile
    pub fn plan(
        &self,
        corpus_size: usize,
        profile: &StakeholderProfile,
        backend: BackendKind,
    ) -> SizingPlan {
        let resolved = self.table.resolve(&profile.id, &profile.role);
        let sizing = resolved.k_sizing;
        let k = self.k_for(&sizing, corpus_size, backend);

        SizingPlan {
            category: resolved.category,
            known_stakeholder: resolved.known,
            sizing,
            corpus_size,
            target: target_for(sizing.ratio, corpus_size),
            effective_max_k: self.effective_max_k(&sizing, backend),
            k,
            request_k: self.request_k(k, corpus_size),
        }
    }
}

fn target_for(ratio: f64, corpus_size: usize) -> usize {
    let raw = corpus_size as f64 * ratio.max(0.0);
    (raw - ROUNDING_EPSILON).ceil().max(0.0) as usize
}
