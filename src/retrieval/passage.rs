//! Fused passage and its identity

use crate::retrieval::PassageRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SOURCE_FILE_KEY: &str = "sourceFile";
pub const CHUNK_INDEX_KEY: &str = "chunkIndex";
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Characters of text hashed when a passage has neither id nor source metadata
const CONTENT_PREFIX_CHARS: usize = 100;

/// Passage after fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub rrf_score: f64,
    /// Query → best 1-based rank at which that query returned this passage
    pub per_query_rank: BTreeMap<String, usize>,
    /// Query → raw backend score at that best rank
    pub per_query_score: BTreeMap<String, f32>,
    /// Distinct queries that retrieved this passage
    pub query_coverage: usize,
}

impl ScoredPassage {
    /// Best rank over all queries
    pub fn best_rank(&self) -> usize {
        self.per_query_rank
            .values()
            .copied()
            .min()
            .unwrap_or(usize::MAX)
    }

    pub fn source_file(&self) -> &str {
        source_file(&self.metadata)
    }
}

pub(crate) fn source_file(metadata: &serde_json::Map<String, serde_json::Value>) -> &str {
    metadata
        .get(SOURCE_FILE_KEY)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_SOURCE)
}

/// Dedup key of a backend passage
///
/// Backend id if present, else `sourceFile#chunkIndex`, else a content hash.
pub fn passage_id(passage: &PassageRef) -> String {
    if let Some(id) = passage.id.as_deref().filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    let source = passage.metadata.get(SOURCE_FILE_KEY).and_then(|v| v.as_str());
    let chunk = passage.metadata.get(CHUNK_INDEX_KEY).and_then(|v| match v {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    });
    if let (Some(source), Some(chunk)) = (source, chunk) {
        return format!("{}#{}", source, chunk);
    }

    let prefix: String = passage.text.chars().take(CONTENT_PREFIX_CHARS).collect();
    let hash = blake3::hash(prefix.as_bytes());
    format!("content:{}", &hash.to_hex()[..16])
}
