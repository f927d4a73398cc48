//! Stakefuse - Stakeholder-aware multi-query retrieval
//!
//! Sizes the result count for a stakeholder, expands their profile into a
//! small set of weighted bilingual queries, runs them concurrently against a
//! vector store and fuses the rankings with Reciprocal Rank Fusion, widening
//! or falling back to dense search when the target count is not met.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod enhancer;
pub mod error;
pub mod language;
pub mod profile;
pub mod retrieval;
pub mod sizing;
pub mod sparse;
pub mod strategy;

pub use error::{Result, StakefuseError};
pub use profile::StakeholderProfile;
pub use retrieval::{
    AdapterHandle, AdaptiveController, FusionResult, RetrievalAdapter, RrfFusionEngine,
    ScoredPassage, WeightedQuery,
};
pub use sizing::{BackendKind, DynamicKSizer};
