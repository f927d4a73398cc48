//! Configuration management for stakefuse
//!
//! Loads a TOML file, applies `STAKEFUSE_SECTION__KEY` environment overrides
//! and validates the result. Every section has defaults, so a partial file
//! (or none at all) is valid.

use crate::error::{Result, StakefuseError};
use crate::strategy::{StakeholderCategory, StrategyTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta", default)]
    pub meta: MetaConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub enhancement: EnhancementConfig,
    #[serde(default)]
    pub sparse: SparseConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    /// Per-stakeholder overrides of the built-in strategy table
    #[serde(default)]
    pub stakeholders: HashMap<String, StakeholderOverride>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: current_timestamp(),
            last_modified: current_timestamp(),
        }
    }
}

/// Fusion and multi-phase retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// RRF smoothing constant
    pub rrf_constant: u32,
    /// Lower bound for the per-query candidate window
    pub min_search_k: usize,
    /// Per-query candidate window as a multiple of K
    pub search_k_multiplier: f64,
    /// Concurrent adapter calls per retrieval pass
    pub max_concurrent_queries: usize,
    pub query_timeout_ms: u64,
    /// Overall budget for one fusion pass; partial results are kept on expiry
    pub deadline_ms: u64,
    /// 1 = primary only, 2 = + widen, 3 = + dense fallback
    pub max_phases: usize,
    /// Candidate window growth for the widen phase
    pub widen_factor: f64,
    /// Use hybrid search when the backend supports it
    pub prefer_hybrid: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_constant: 60,
            min_search_k: 20,
            search_k_multiplier: 1.5,
            max_concurrent_queries: 4,
            query_timeout_ms: 10_000,
            deadline_ms: 30_000,
            max_phases: 3,
            widen_factor: 2.0,
            prefer_hybrid: true,
        }
    }
}

impl RetrievalConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Result-count sizing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// max_k multiplier for memory-constrained backends
    pub memory_constrained_factor: f64,
    /// Requested K never exceeds this fraction of the corpus
    pub request_ratio_cap: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            memory_constrained_factor: 0.4,
            request_ratio_cap: 0.8,
        }
    }
}

/// Query enhancement defaults (per-request options override these)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    pub max_queries: usize,
    pub include_alternate_language: bool,
    pub include_synonyms: bool,
    pub include_role_specific_terms: bool,
    /// Concerns kept after prioritization
    pub max_concerns: usize,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            max_queries: 5,
            include_alternate_language: true,
            include_synonyms: true,
            include_role_specific_terms: true,
            max_concerns: 3,
        }
    }
}

/// Sparse keyword vector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SparseConfig {
    /// Number of hash buckets; collisions merge term weights
    pub bucket_count: u32,
    /// Raw weight of structured identifier tokens (e.g. "REQ-001")
    pub identifier_weight: f32,
    /// Tokens longer than this are dropped
    pub max_token_chars: usize,
    /// Morpheme dictionary (TSV or mecab-ko-dic CSV); rule-based analysis when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_path: Option<PathBuf>,
}

impl Default for SparseConfig {
    fn default() -> Self {
        Self {
            bucket_count: 1 << 20,
            identifier_weight: 3.0,
            max_token_chars: 40,
            dictionary_path: None,
        }
    }
}

/// Embedding configuration for the reference in-memory adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "hash" (offline feature hashing) or "fastembed" (local ONNX model)
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hash".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            batch_size: 32,
        }
    }
}

/// HNSW index configuration for the reference in-memory adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub hnsw_ef_construction: usize,
    pub hnsw_m: usize,
    pub hnsw_ef_search: usize,
    pub max_elements: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            hnsw_ef_construction: 200,
            hnsw_m: 16,
            hnsw_ef_search: 64,
            max_elements: 100_000,
        }
    }
}

/// Stakeholder-specific overrides of the built-in strategy table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StakeholderOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<StakeholderCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_terms: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_template: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StakefuseError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| StakefuseError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load from `path`, or from the default location if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Ok(default) if default.exists() => Self::load(&default),
            _ => {
                tracing::debug!("No config file found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                ConfigValidator::validate(&config)?;
                Ok(config)
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StakefuseError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| StakefuseError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Strategy table with this configuration's stakeholder overrides applied
    pub fn strategy_table(&self) -> StrategyTable {
        StrategyTable::with_overrides(&self.stakeholders)
    }

    /// Apply environment variable overrides
    /// Environment variables in format: STAKEFUSE_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("STAKEFUSE_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "RETRIEVAL__RRF_CONSTANT" => {
                self.retrieval.rrf_constant = parse_env(path, value)?;
            }
            "RETRIEVAL__MAX_CONCURRENT_QUERIES" => {
                self.retrieval.max_concurrent_queries = parse_env(path, value)?;
            }
            "RETRIEVAL__QUERY_TIMEOUT_MS" => {
                self.retrieval.query_timeout_ms = parse_env(path, value)?;
            }
            "RETRIEVAL__DEADLINE_MS" => {
                self.retrieval.deadline_ms = parse_env(path, value)?;
            }
            "RETRIEVAL__MAX_PHASES" => {
                self.retrieval.max_phases = parse_env(path, value)?;
            }
            "RETRIEVAL__PREFER_HYBRID" => {
                self.retrieval.prefer_hybrid = parse_env(path, value)?;
            }
            "ENHANCEMENT__MAX_QUERIES" => {
                self.enhancement.max_queries = parse_env(path, value)?;
            }
            "ENHANCEMENT__INCLUDE_ALTERNATE_LANGUAGE" => {
                self.enhancement.include_alternate_language = parse_env(path, value)?;
            }
            "SPARSE__DICTIONARY_PATH" => {
                self.sparse.dictionary_path = Some(PathBuf::from(value));
            }
            "EMBEDDING__PROVIDER" => {
                self.embedding.provider = value.to_string();
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            StakefuseError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("stakefuse").join("config.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| StakefuseError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}
