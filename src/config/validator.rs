use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{Result, StakefuseError, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem found
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_sizing(config, &mut errors);
        Self::validate_enhancement(config, &mut errors);
        Self::validate_sparse(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_stakeholders(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(StakefuseError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if retrieval.rrf_constant == 0 {
            errors.push(ValidationError::new(
                "retrieval.rrf_constant",
                "RRF constant must be greater than 0",
            ));
        }

        if retrieval.min_search_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.min_search_k",
                "Minimum search K must be greater than 0",
            ));
        }

        if !(1.0..).contains(&retrieval.search_k_multiplier) {
            errors.push(ValidationError::new(
                "retrieval.search_k_multiplier",
                format!(
                    "Search K multiplier must be at least 1.0, got {}",
                    retrieval.search_k_multiplier
                ),
            ));
        }

        if retrieval.max_concurrent_queries == 0 {
            errors.push(ValidationError::new(
                "retrieval.max_concurrent_queries",
                "Concurrency must be greater than 0",
            ));
        }

        if retrieval.query_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "retrieval.query_timeout_ms",
                "Query timeout must be greater than 0",
            ));
        }

        if retrieval.deadline_ms == 0 {
            errors.push(ValidationError::new(
                "retrieval.deadline_ms",
                "Deadline must be greater than 0",
            ));
        }

        if !(1..=3).contains(&retrieval.max_phases) {
            errors.push(ValidationError::new(
                "retrieval.max_phases",
                format!("Max phases must be 1, 2 or 3, got {}", retrieval.max_phases),
            ));
        }

        if retrieval.widen_factor.is_nan() || retrieval.widen_factor <= 1.0 {
            errors.push(ValidationError::new(
                "retrieval.widen_factor",
                format!(
                    "Widen factor must be greater than 1.0, got {}",
                    retrieval.widen_factor
                ),
            ));
        }
    }

    fn validate_sizing(config: &Config, errors: &mut Vec<ValidationError>) {
        let factor = config.sizing.memory_constrained_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            errors.push(ValidationError::new(
                "sizing.memory_constrained_factor",
                format!("Factor must be in (0, 1], got {}", factor),
            ));
        }

        let cap = config.sizing.request_ratio_cap;
        if !(cap > 0.0 && cap <= 1.0) {
            errors.push(ValidationError::new(
                "sizing.request_ratio_cap",
                format!("Cap must be in (0, 1], got {}", cap),
            ));
        }
    }

    fn validate_enhancement(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.enhancement.max_queries == 0 {
            errors.push(ValidationError::new(
                "enhancement.max_queries",
                "Max queries must be greater than 0",
            ));
        }

        if config.enhancement.max_concerns == 0 {
            errors.push(ValidationError::new(
                "enhancement.max_concerns",
                "Max concerns must be greater than 0",
            ));
        }
    }

    fn validate_sparse(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.sparse.bucket_count == 0 {
            errors.push(ValidationError::new(
                "sparse.bucket_count",
                "Bucket count must be greater than 0",
            ));
        }

        if config.sparse.identifier_weight.is_nan() || config.sparse.identifier_weight <= 0.0 {
            errors.push(ValidationError::new(
                "sparse.identifier_weight",
                "Identifier weight must be positive",
            ));
        }

        if config.sparse.max_token_chars == 0 {
            errors.push(ValidationError::new(
                "sparse.max_token_chars",
                "Max token length must be greater than 0",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.embedding.provider;
        let valid_providers = ["hash", "fastembed"];
        if !valid_providers.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    valid_providers, provider
                ),
            ));
        }

        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Dimension must be greater than 0",
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.indexing.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.indexing.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if config.indexing.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }

        if config.indexing.max_elements == 0 {
            errors.push(ValidationError::new(
                "indexing.max_elements",
                "Max elements must be greater than 0",
            ));
        }
    }

    fn validate_stakeholders(config: &Config, errors: &mut Vec<ValidationError>) {
        let mut ids: Vec<&String> = config.stakeholders.keys().collect();
        ids.sort();

        for id in ids {
            let ov = &config.stakeholders[id];

            if let Some(ratio) = ov.ratio {
                if !(ratio > 0.0 && ratio <= 1.0) {
                    errors.push(ValidationError::new(
                        format!("stakeholders.{}.ratio", id),
                        format!("Ratio must be in (0, 1], got {}", ratio),
                    ));
                }
            }

            if ov.max_k == Some(0) {
                errors.push(ValidationError::new(
                    format!("stakeholders.{}.max_k", id),
                    "max_k must be greater than 0",
                ));
            }

            if let (Some(min_k), Some(max_k)) = (ov.min_k, ov.max_k) {
                if min_k > max_k {
                    errors.push(ValidationError::new(
                        format!("stakeholders.{}.min_k", id),
                        format!("min_k ({}) exceeds max_k ({})", min_k, max_k),
                    ));
                }
            }
        }
    }
}
