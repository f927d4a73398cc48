//! Morphological analysis for Hangul text
//!
//! The analyzer is a shared, lazily-built resource. [`AnalyzerHandle`] builds
//! it at most once; a failed build is recorded and reported as
//! [`AnalyzerStatus::Degraded`] on every later call instead of being retried.

use super::dictionary::DictionaryAnalyzer;
use crate::config::SparseConfig;
use crate::language::is_hangul;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Analyzer initialization failed: {0}")]
    InitializationError(String),
}

/// Coarse part-of-speech tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Particle,
    Ending,
    Other,
}

impl PartOfSpeech {
    /// Content-bearing parts of speech kept for keyword vectors
    pub fn is_content(self) -> bool {
        matches!(
            self,
            PartOfSpeech::Noun | PartOfSpeech::Verb | PartOfSpeech::Adjective
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morpheme {
    pub surface: String,
    pub pos: PartOfSpeech,
}

impl Morpheme {
    fn new(surface: &str, pos: PartOfSpeech) -> Self {
        Self {
            surface: surface.to_string(),
            pos,
        }
    }
}

/// Splits text into tagged morphemes
pub trait MorphologicalAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Vec<Morpheme>;

    fn name(&self) -> &str;
}

/// Builds an analyzer; may block (dictionary loading)
pub type AnalyzerBuilder =
    Arc<dyn Fn() -> Result<Arc<dyn MorphologicalAnalyzer>, AnalyzerError> + Send + Sync>;

/// Outcome of asking the handle for its analyzer
#[derive(Clone)]
pub enum AnalyzerStatus {
    Ready(Arc<dyn MorphologicalAnalyzer>),
    /// Build failed once; callers continue without morphological tokens
    Degraded,
}

/// Lazily-built, build-once analyzer handle
///
/// Share one handle (behind an `Arc`) between encoders. Concurrent first
/// callers wait on the same build; the result, success or failure, is final
/// for the lifetime of the handle.
pub struct AnalyzerHandle {
    builder: AnalyzerBuilder,
    cell: OnceCell<Option<Arc<dyn MorphologicalAnalyzer>>>,
}

impl AnalyzerHandle {
    pub fn new(builder: AnalyzerBuilder) -> Self {
        Self {
            builder,
            cell: OnceCell::new(),
        }
    }

    /// Handle over the built-in rule-based Hangul analyzer
    pub fn rule_based() -> Self {
        Self::new(Arc::new(|| {
            Ok(Arc::new(RuleBasedAnalyzer::new()) as Arc<dyn MorphologicalAnalyzer>)
        }))
    }

    /// Dictionary-backed analyzer when `dictionary_path` is set, else rule-based
    ///
    /// The dictionary is read on first use; a missing or malformed file
    /// leaves the handle degraded.
    pub fn from_config(config: &SparseConfig) -> Self {
        match config.dictionary_path.clone() {
            Some(path) => Self::new(Arc::new(move || {
                let analyzer = DictionaryAnalyzer::load(&path)?;
                Ok(Arc::new(analyzer) as Arc<dyn MorphologicalAnalyzer>)
            })),
            None => Self::rule_based(),
        }
    }

    /// Handle whose build always fails; every caller gets `Degraded`
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(Arc::new(move || {
            Err(AnalyzerError::InitializationError(reason.clone()))
        }))
    }

    /// Get the analyzer, building it on first use
    pub async fn get(&self) -> AnalyzerStatus {
        let slot = self
            .cell
            .get_or_init(|| async {
                let builder = self.builder.clone();
                match tokio::task::spawn_blocking(move || builder()).await {
                    Ok(Ok(analyzer)) => {
                        info!("Morphological analyzer ready: {}", analyzer.name());
                        Some(analyzer)
                    }
                    Ok(Err(e)) => {
                        warn!("Morphological analyzer unavailable, encoding degraded: {}", e);
                        None
                    }
                    Err(e) => {
                        warn!("Morphological analyzer build task failed: {}", e);
                        None
                    }
                }
            })
            .await;

        match slot {
            Some(analyzer) => AnalyzerStatus::Ready(analyzer.clone()),
            None => AnalyzerStatus::Degraded,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

/// Suffix-stripping analyzer for Korean eojeol (space-delimited words)
///
/// Predicate endings mark the stem as verb or adjective; otherwise a trailing
/// particle is split off and the remainder tagged as noun. Non-Hangul words
/// are skipped.
pub struct RuleBasedAnalyzer {
    /// (suffix, tag of the stem before it), longest suffix first
    predicate_endings: Vec<(&'static str, PartOfSpeech)>,
    /// Longest first
    particles: Vec<&'static str>,
}

impl RuleBasedAnalyzer {
    pub fn new() -> Self {
        use PartOfSpeech::{Adjective, Verb};

        let mut predicate_endings = vec![
            ("되었습니다", Verb),
            ("하였습니다", Verb),
            ("했습니다", Verb),
            ("합니다", Verb),
            ("됩니다", Verb),
            ("해야", Verb),
            ("하는", Verb),
            ("되는", Verb),
            ("하고", Verb),
            ("하여", Verb),
            ("한다", Verb),
            ("된다", Verb),
            ("하다", Verb),
            ("되다", Verb),
            ("했다", Verb),
            ("적으로", Adjective),
            ("스러운", Adjective),
            ("스럽다", Adjective),
            ("적인", Adjective),
            ("로운", Adjective),
            ("롭다", Adjective),
        ];
        predicate_endings.sort_by_key(|(suffix, _)| std::cmp::Reverse(suffix.chars().count()));

        let mut particles = vec![
            "에서는", "으로는", "에게서", "으로서", "으로써", "에서", "에게", "까지", "부터",
            "보다", "처럼", "으로", "와", "과", "은", "는", "이", "가", "을", "를", "의", "에",
            "로", "도", "만",
        ];
        particles.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));

        Self {
            predicate_endings,
            particles,
        }
    }

    fn analyze_word(&self, word: &str, out: &mut Vec<Morpheme>) {
        let word_len = word.chars().count();

        for (suffix, pos) in &self.predicate_endings {
            if let Some(stem) = word.strip_suffix(suffix) {
                if !stem.is_empty() {
                    out.push(Morpheme::new(stem, *pos));
                    out.push(Morpheme::new(suffix, PartOfSpeech::Ending));
                    return;
                }
            }
        }

        for particle in &self.particles {
            if let Some(stem) = word.strip_suffix(particle) {
                let stem_len = word_len - particle.chars().count();
                // Single-syllable particles need a 2+ syllable stem ("차이" stays whole)
                let min_stem = if particle.chars().count() == 1 { 2 } else { 1 };
                if stem_len >= min_stem {
                    out.push(Morpheme::new(stem, PartOfSpeech::Noun));
                    out.push(Morpheme::new(particle, PartOfSpeech::Particle));
                    return;
                }
            }
        }

        out.push(Morpheme::new(word, PartOfSpeech::Noun));
    }
}

impl Default for RuleBasedAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MorphologicalAnalyzer for RuleBasedAnalyzer {
    fn analyze(&self, text: &str) -> Vec<Morpheme> {
        let mut morphemes = Vec::new();

        for raw in text.split_whitespace() {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
            if word.is_empty() {
                continue;
            }
            if !word.chars().all(is_hangul) {
                if word.chars().any(is_hangul) {
                    // Mixed token such as "API를": analyze the Hangul tail only
                    let split = word
                        .char_indices()
                        .find(|(_, c)| is_hangul(*c))
                        .map(|(i, _)| i)
                        .unwrap_or(word.len());
                    morphemes.push(Morpheme::new(&word[..split], PartOfSpeech::Other));
                    let tail = &word[split..];
                    if tail.chars().all(is_hangul) && tail.chars().count() > 1 {
                        self.analyze_word(tail, &mut morphemes);
                    } else {
                        morphemes.push(Morpheme::new(tail, PartOfSpeech::Particle));
                    }
                }
                continue;
            }
            self.analyze_word(word, &mut morphemes);
        }

        morphemes
    }

    fn name(&self) -> &str {
        "rule-based-hangul"
    }
}
