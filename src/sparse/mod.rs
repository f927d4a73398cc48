//! Sparse term-weight encoding for hybrid search
//!
//! Three token sources feed one vector:
//! - identifier grammar (`REQ-001`, `ISO27001`, `A1`) at a fixed high weight
//! - space-delimited words via the tantivy simple tokenizer, weighted by the
//!   domain-keyword importance table
//! - Hangul content morphemes from the shared [`AnalyzerHandle`]
//!
//! Tokens are hashed into stable buckets (BLAKE3, first 4 bytes) and the
//! vector is normalized by its largest value.

pub mod analyzer;
mod dictionary;
mod keywords;

pub use analyzer::{
    AnalyzerBuilder, AnalyzerError, AnalyzerHandle, AnalyzerStatus, Morpheme,
    MorphologicalAnalyzer, PartOfSpeech, RuleBasedAnalyzer,
};
pub use dictionary::DictionaryAnalyzer;

use crate::config::SparseConfig;
use crate::language::contains_hangul;
use ahash::AHashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenStream};
use thiserror::Error;
use tracing::debug;

/// `LETTERS-DIGITS` requirement/ticket ids and short uppercase codes.
/// ASCII word boundaries so a trailing Hangul particle ("REQ-001의") still matches.
const IDENTIFIER_PATTERNS: &[&str] = &[
    r"(?-u:\b)[A-Za-z]+-[0-9]+(?-u:\b)",
    r"(?-u:\b)[A-Z]{1,6}[0-9]{1,6}[A-Z]?(?-u:\b)",
];

#[derive(Error, Debug)]
pub enum SparseError {
    #[error("Invalid identifier pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Sparse vector; `indices` strictly ascending, `values` in (0, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn get(&self, index: u32) -> Option<f32> {
        self.indices
            .binary_search(&index)
            .ok()
            .map(|pos| self.values[pos])
    }
}

/// Result of one encoding call
#[derive(Debug, Clone, Default)]
pub struct EncodeOutcome {
    pub vector: SparseVector,
    /// Hangul text was present but the morphological analyzer was unavailable
    pub degraded: bool,
}

/// Stable bucket for a token
pub fn bucket_of(token: &str, bucket_count: u32) -> u32 {
    let hash = blake3::hash(token.as_bytes());
    let bytes = hash.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) % bucket_count.max(1)
}

pub struct SparseVectorEncoder {
    config: SparseConfig,
    identifier_patterns: Vec<Regex>,
    text_analyzer: TextAnalyzer,
    importance: AHashMap<&'static str, f32>,
    analyzer: Arc<AnalyzerHandle>,
}

impl SparseVectorEncoder {
    pub fn new(config: SparseConfig, analyzer: Arc<AnalyzerHandle>) -> Result<Self, SparseError> {
        let identifier_patterns = IDENTIFIER_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        let stopwords: Vec<String> = keywords::STOPWORDS.iter().map(|w| w.to_string()).collect();
        let text_analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(StopWordFilter::remove(stopwords))
            .build();

        Ok(Self {
            config,
            identifier_patterns,
            text_analyzer,
            importance: keywords::importance_table(),
            analyzer,
        })
    }

    pub fn analyzer(&self) -> &Arc<AnalyzerHandle> {
        &self.analyzer
    }

    /// Encode text into a sparse vector
    ///
    /// Never fails: an unavailable analyzer only sets `degraded`.
    pub async fn encode(&self, text: &str) -> EncodeOutcome {
        // BTreeMap keeps bucket merging order-independent of hashing seeds
        let mut token_weights: BTreeMap<String, f32> = BTreeMap::new();
        let mut degraded = false;

        for pattern in &self.identifier_patterns {
            for m in pattern.find_iter(text) {
                *token_weights.entry(m.as_str().to_lowercase()).or_insert(0.0) +=
                    self.config.identifier_weight;
            }
        }

        self.add_word_tokens(text, &mut token_weights);

        if contains_hangul(text) {
            match self.analyzer.get().await {
                AnalyzerStatus::Ready(analyzer) => {
                    for morpheme in analyzer.analyze(text) {
                        if !morpheme.pos.is_content() || self.too_long(&morpheme.surface) {
                            continue;
                        }
                        let weight = self.weight_of(&morpheme.surface);
                        *token_weights.entry(morpheme.surface).or_insert(0.0) += weight;
                    }
                }
                AnalyzerStatus::Degraded => {
                    debug!("Sparse encoding without morphological tokens");
                    degraded = true;
                }
            }
        }

        EncodeOutcome {
            vector: self.to_vector(token_weights),
            degraded,
        }
    }

    fn add_word_tokens(&self, text: &str, token_weights: &mut BTreeMap<String, f32>) {
        // token_stream needs &mut; the analyzer is cheap to clone
        let mut analyzer = self.text_analyzer.clone();
        let mut stream = analyzer.token_stream(text);

        while stream.advance() {
            let token = &stream.token().text;
            if self.too_long(token) || (token.len() == 1 && token.is_ascii()) {
                continue;
            }
            let weight = self.weight_of(token);
            *token_weights.entry(token.clone()).or_insert(0.0) += weight;
        }
    }

    fn weight_of(&self, token: &str) -> f32 {
        self.importance.get(token).copied().unwrap_or(1.0)
    }

    fn too_long(&self, token: &str) -> bool {
        token.chars().count() > self.config.max_token_chars
    }

    fn to_vector(&self, token_weights: BTreeMap<String, f32>) -> SparseVector {
        let mut buckets: BTreeMap<u32, f32> = BTreeMap::new();
        for (token, weight) in token_weights {
            *buckets
                .entry(bucket_of(&token, self.config.bucket_count))
                .or_insert(0.0) += weight;
        }

        let max = buckets.values().copied().fold(0.0f32, f32::max);
        if max <= 0.0 {
            return SparseVector::default();
        }

        let (indices, values) = buckets
            .into_iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(i, w)| (i, w / max))
            .unzip();
        SparseVector { indices, values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder(handle: AnalyzerHandle) -> SparseVectorEncoder {
        SparseVectorEncoder::new(SparseConfig::default(), Arc::new(handle)).unwrap()
    }

    fn bucket(token: &str) -> u32 {
        bucket_of(token, SparseConfig::default().bucket_count)
    }

    #[tokio::test]
    async fn test_empty_text() {
        let outcome = encoder(AnalyzerHandle::rule_based()).encode("").await;
        assert!(outcome.vector.is_empty());
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn test_vector_is_sorted_and_normalized() {
        let outcome = encoder(AnalyzerHandle::rule_based())
            .encode("REQ-001 보안 요구사항과 system latency ISO27001")
            .await;
        let vector = outcome.vector;

        assert!(!vector.is_empty());
        assert_eq!(vector.indices.len(), vector.values.len());
        assert!(vector.indices.windows(2).all(|w| w[0] < w[1]));
        assert!(vector.values.iter().all(|v| *v > 0.0 && *v <= 1.0));
        assert!(vector.values.iter().any(|v| (*v - 1.0).abs() < f32::EPSILON));
        assert!(vector.get(bucket("req-001")).is_some());
        assert!(vector.get(bucket("iso27001")).is_some());
    }

    #[tokio::test]
    async fn test_identifier_followed_by_particle() {
        let outcome = encoder(AnalyzerHandle::rule_based())
            .encode("REQ-017의 검토")
            .await;
        assert!(outcome.vector.get(bucket("req-017")).is_some());
    }

    #[tokio::test]
    async fn test_identifier_outweighs_plain_word() {
        let outcome = encoder(AnalyzerHandle::rule_based())
            .encode("ticket BUG-42 mentioned")
            .await;
        let vector = outcome.vector;

        let id_weight = vector.get(bucket("bug-42")).unwrap();
        let word_weight = vector.get(bucket("ticket")).unwrap();
        assert_eq!(id_weight, 1.0);
        assert!(word_weight < id_weight);
    }

    #[tokio::test]
    async fn test_stopwords_removed() {
        let outcome = encoder(AnalyzerHandle::rule_based())
            .encode("the security of the system")
            .await;
        let vector = outcome.vector;

        assert!(vector.get(bucket("the")).is_none());
        assert!(vector.get(bucket("security")).is_some());
    }

    #[tokio::test]
    async fn test_morphemes_add_hangul_stems() {
        let outcome = encoder(AnalyzerHandle::rule_based())
            .encode("시스템의 성능을 개선하는 방안")
            .await;
        let vector = outcome.vector;

        assert!(!outcome.degraded);
        assert!(vector.get(bucket("성능")).is_some());
        assert!(vector.get(bucket("개선")).is_some());
    }

    #[tokio::test]
    async fn test_degraded_analyzer_still_encodes() {
        let encoder = encoder(AnalyzerHandle::unavailable("dictionary missing"));

        let korean = encoder.encode("REQ-001 성능을 개선").await;
        assert!(korean.degraded);
        assert!(korean.vector.get(bucket("req-001")).is_some());
        assert!(korean.vector.get(bucket("성능")).is_none());

        let english = encoder.encode("latency budget").await;
        assert!(!english.degraded);
        assert_eq!(english.vector.len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_dictionary_degrades_encoding() {
        let config = SparseConfig {
            dictionary_path: Some("/nonexistent/stakefuse/ko.dic".into()),
            ..SparseConfig::default()
        };
        let handle = Arc::new(AnalyzerHandle::from_config(&config));
        let encoder = SparseVectorEncoder::new(config, handle).unwrap();

        let outcome = encoder.encode("API-7 보안 점검").await;
        assert!(outcome.degraded);
        assert!(outcome.vector.get(bucket("api-7")).is_some());
    }

    #[tokio::test]
    async fn test_encoding_is_deterministic() {
        let encoder = encoder(AnalyzerHandle::rule_based());
        let text = "CTO 아키텍처 보안 검토 API-12";
        let a = encoder.encode(text).await.vector;
        let b = encoder.encode(text).await.vector;
        assert_eq!(a, b);
    }

    #[test]
    fn test_bucket_within_range() {
        for token in ["a", "보안", "req-001", ""] {
            assert!(bucket_of(token, 97) < 97);
        }
        assert_eq!(bucket_of("anything", 0), 0);
    }
}
