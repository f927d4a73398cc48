//! Stakeholder strategy table
//!
//! One table-driven lookup (stakeholder id → strategy) with a single keyword
//! classifier as fallback. The sizer, the query enhancer and the controller's
//! weight assignment all resolve profiles through [`StrategyTable::resolve`].

mod defaults;

use crate::config::StakeholderOverride;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse stakeholder classification used when an id has no table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeholderCategory {
    Technical,
    Executive,
    RiskQuality,
    Default,
}

impl StakeholderCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StakeholderCategory::Technical => "technical",
            StakeholderCategory::Executive => "executive",
            StakeholderCategory::RiskQuality => "risk_quality",
            StakeholderCategory::Default => "default",
        }
    }
}

/// Result-count sizing tuple: fraction of corpus to retrieve, clamped to [min_k, max_k]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KSizingConfig {
    pub ratio: f64,
    pub min_k: usize,
    pub max_k: usize,
}

impl KSizingConfig {
    pub const fn new(ratio: f64, min_k: usize, max_k: usize) -> Self {
        Self {
            ratio,
            min_k,
            max_k,
        }
    }
}

/// Per-query RRF weight policy
///
/// These numbers are tunable policy, not correctness invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightPolicy {
    /// Multiplier for the first (most literal) query
    pub first_query_boost: f64,
    /// Multiplier for queries with at most `simple_query_max_terms` terms
    pub simple_query_boost: f64,
    pub simple_query_max_terms: usize,
    /// Multiplier for queries mentioning any focus term
    pub focus_boost: f64,
    pub focus_terms: Vec<String>,
    /// Linear decay per query position, floored at `min_position_factor`
    pub position_decay: f64,
    pub min_position_factor: f64,
    /// Multiplier for the appended cross-language query
    pub alternate_language_weight: f64,
}

impl WeightPolicy {
    /// Weight of the query at `index`
    pub fn weight_for(&self, index: usize, query: &str, is_alternate: bool) -> f64 {
        let mut weight = 1.0;

        if index == 0 {
            weight *= self.first_query_boost;
        }

        if query.split_whitespace().count() <= self.simple_query_max_terms {
            weight *= self.simple_query_boost;
        }

        let lowered = query.to_lowercase();
        if self
            .focus_terms
            .iter()
            .any(|term| lowered.contains(term.as_str()))
        {
            weight *= self.focus_boost;
        }

        let position = (1.0 - self.position_decay * index as f64).max(self.min_position_factor);
        weight *= position;

        if is_alternate {
            weight *= self.alternate_language_weight;
        }

        weight.max(0.0)
    }
}

/// Defaults shared by all stakeholders of a category
#[derive(Debug, Clone)]
pub struct CategoryPreset {
    pub k_sizing: KSizingConfig,
    pub weights: WeightPolicy,
    /// Korean template appended for English-dominant profiles
    pub alternate_template: String,
    pub role_terms: Vec<String>,
}

/// Table entry for a known stakeholder id
#[derive(Debug, Clone, PartialEq)]
pub struct StakeholderStrategy {
    pub id: String,
    pub category: StakeholderCategory,
    pub k_sizing: KSizingConfig,
    /// Role-specific vocabulary, most important first
    pub role_terms: Vec<String>,
    /// Fixed domain query for the technical subset
    pub domain_query: Option<String>,
    pub alternate_template: Option<String>,
}

/// Strategy resolved for one profile
#[derive(Debug, Clone, Copy)]
pub struct ResolvedStrategy<'a> {
    pub category: StakeholderCategory,
    pub k_sizing: KSizingConfig,
    pub weights: &'a WeightPolicy,
    pub role_terms: &'a [String],
    pub domain_query: Option<&'a str>,
    pub alternate_template: &'a str,
    /// Whether the id was found in the table (false = classifier fallback)
    pub known: bool,
}

/// Keyword classifier for unknown stakeholder ids
#[derive(Debug, Clone)]
pub struct RoleClassifier {
    /// Checked in order; first category with a match wins
    rules: Vec<(StakeholderCategory, Vec<String>)>,
}

impl RoleClassifier {
    pub fn new(rules: Vec<(StakeholderCategory, Vec<String>)>) -> Self {
        Self { rules }
    }

    /// Classify a free-text role by keyword matching
    ///
    /// ASCII keywords match whole words (or word prefixes for keywords of five
    /// or more letters, so "engineer" matches "engineering"); Hangul keywords
    /// match as substrings.
    pub fn classify(&self, role: &str) -> StakeholderCategory {
        let lowered = role.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        for (category, keywords) in &self.rules {
            let hit = keywords.iter().any(|kw| {
                if kw.is_ascii() {
                    words
                        .iter()
                        .any(|w| *w == kw.as_str() || (kw.len() >= 5 && w.starts_with(kw.as_str())))
                } else {
                    lowered.contains(kw.as_str())
                }
            });
            if hit {
                return *category;
            }
        }

        StakeholderCategory::Default
    }
}

/// Stakeholder id → strategy lookup with category fallback
#[derive(Debug, Clone)]
pub struct StrategyTable {
    strategies: HashMap<String, StakeholderStrategy>,
    presets: HashMap<StakeholderCategory, CategoryPreset>,
    classifier: RoleClassifier,
}

impl StrategyTable {
    pub fn new(
        strategies: Vec<StakeholderStrategy>,
        presets: HashMap<StakeholderCategory, CategoryPreset>,
        classifier: RoleClassifier,
    ) -> Self {
        let strategies = strategies
            .into_iter()
            .map(|s| (normalize_id(&s.id), s))
            .collect();
        let mut presets = presets;
        for (category, preset) in defaults::builtin_presets() {
            presets.entry(category).or_insert(preset);
        }
        Self {
            strategies,
            presets,
            classifier,
        }
    }

    /// Built-in table
    pub fn builtin() -> Self {
        Self::new(
            defaults::builtin_strategies(),
            defaults::builtin_presets(),
            defaults::builtin_classifier(),
        )
    }

    /// Built-in table patched with configuration overrides
    pub fn with_overrides(overrides: &HashMap<String, StakeholderOverride>) -> Self {
        let mut table = Self::builtin();
        let mut ids: Vec<&String> = overrides.keys().collect();
        ids.sort();
        for id in ids {
            table.apply_override(id, &overrides[id]);
        }
        table
    }

    /// Apply one override, creating the entry from its category preset if needed
    pub fn apply_override(&mut self, id: &str, ov: &StakeholderOverride) {
        let key = normalize_id(id);
        let category = ov
            .category
            .or_else(|| self.strategies.get(&key).map(|s| s.category))
            .unwrap_or(StakeholderCategory::Default);
        let preset_sizing = self.preset(category).k_sizing;

        let entry = self
            .strategies
            .entry(key.clone())
            .or_insert_with(|| StakeholderStrategy {
                id: key,
                category,
                k_sizing: preset_sizing,
                role_terms: Vec::new(),
                domain_query: None,
                alternate_template: None,
            });

        entry.category = category;
        if let Some(ratio) = ov.ratio {
            entry.k_sizing.ratio = ratio;
        }
        if let Some(min_k) = ov.min_k {
            entry.k_sizing.min_k = min_k;
        }
        if let Some(max_k) = ov.max_k {
            entry.k_sizing.max_k = max_k;
        }
        if let Some(terms) = &ov.role_terms {
            entry.role_terms = terms.clone();
        }
        if let Some(query) = &ov.domain_query {
            entry.domain_query = Some(query.clone());
        }
        if let Some(template) = &ov.alternate_template {
            entry.alternate_template = Some(template.clone());
        }
    }

    pub fn get(&self, id: &str) -> Option<&StakeholderStrategy> {
        self.strategies.get(&normalize_id(id))
    }

    pub fn preset(&self, category: StakeholderCategory) -> &CategoryPreset {
        // `new` backfills every category
        &self.presets[&category]
    }

    pub fn classify(&self, role: &str) -> StakeholderCategory {
        self.classifier.classify(role)
    }

    /// Resolve the strategy for a stakeholder id and role
    pub fn resolve(&self, id: &str, role: &str) -> ResolvedStrategy<'_> {
        match self.get(id) {
            Some(strategy) => {
                let preset = self.preset(strategy.category);
                ResolvedStrategy {
                    category: strategy.category,
                    k_sizing: strategy.k_sizing,
                    weights: &preset.weights,
                    role_terms: if strategy.role_terms.is_empty() {
                        &preset.role_terms
                    } else {
                        &strategy.role_terms
                    },
                    domain_query: strategy.domain_query.as_deref(),
                    alternate_template: strategy
                        .alternate_template
                        .as_deref()
                        .unwrap_or(&preset.alternate_template),
                    known: true,
                }
            }
            None => {
                let category = self.classify(role);
                let preset = self.preset(category);
                ResolvedStrategy {
                    category,
                    k_sizing: preset.k_sizing,
                    weights: &preset.weights,
                    role_terms: &preset.role_terms,
                    domain_query: None,
                    alternate_template: &preset.alternate_template,
                    known: false,
                }
            }
        }
    }

    /// Known stakeholder ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.strategies.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_id_resolves_table_entry() {
        let table = StrategyTable::builtin();
        let resolved = table.resolve("cto", "whatever");
        assert!(resolved.known);
        assert_eq!(resolved.category, StakeholderCategory::Technical);
        assert_eq!(resolved.k_sizing, KSizingConfig::new(0.55, 22, 120));
        assert!(resolved.domain_query.is_some());
    }

    #[test]
    fn test_id_lookup_is_case_insensitive() {
        let table = StrategyTable::builtin();
        assert!(table.get(" CTO ").is_some());
    }

    #[test]
    fn test_unknown_id_falls_back_to_classifier() {
        let table = StrategyTable::builtin();

        let resolved = table.resolve("x-1", "Senior Software Engineer");
        assert!(!resolved.known);
        assert_eq!(resolved.category, StakeholderCategory::Technical);

        assert_eq!(
            table.resolve("x-2", "재무 담당 임원").category,
            StakeholderCategory::Executive
        );
        assert_eq!(
            table.resolve("x-3", "QA lead").category,
            StakeholderCategory::RiskQuality
        );
        assert_eq!(
            table.resolve("x-4", "Marketing").category,
            StakeholderCategory::Default
        );
    }

    #[test]
    fn test_classifier_matches_whole_words() {
        let table = StrategyTable::builtin();
        // "director" contains "cto" but must not be classified as technical
        assert_eq!(table.classify("Sales Director"), StakeholderCategory::Executive);
    }

    #[test]
    fn test_override_patches_existing_entry() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "cto".to_string(),
            StakeholderOverride {
                max_k: Some(64),
                ..Default::default()
            },
        );

        let table = StrategyTable::with_overrides(&overrides);
        let cto = table.get("cto").unwrap();
        assert_eq!(cto.k_sizing, KSizingConfig::new(0.55, 22, 64));
        assert_eq!(cto.category, StakeholderCategory::Technical);
    }

    #[test]
    fn test_override_creates_new_entry_from_preset() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "auditor".to_string(),
            StakeholderOverride {
                category: Some(StakeholderCategory::RiskQuality),
                role_terms: Some(vec!["감사 증적".to_string()]),
                ..Default::default()
            },
        );

        let table = StrategyTable::with_overrides(&overrides);
        let resolved = table.resolve("auditor", "");
        assert!(resolved.known);
        assert_eq!(resolved.category, StakeholderCategory::RiskQuality);
        assert_eq!(
            resolved.k_sizing,
            table.preset(StakeholderCategory::RiskQuality).k_sizing
        );
        assert_eq!(resolved.role_terms, &["감사 증적".to_string()]);
    }

    #[test]
    fn test_weight_policy() {
        let table = StrategyTable::builtin();

        let technical = &table.preset(StakeholderCategory::Technical).weights;
        let first = technical.weight_for(0, "CTO 시스템 성능 보안", false);
        let second = technical.weight_for(1, "CTO 시스템 성능 보안", false);
        assert!(first > second);

        let executive = &table.preset(StakeholderCategory::Executive).weights;
        let simple = executive.weight_for(1, "비용 일정", false);
        let long = executive.weight_for(1, "대표 비용 일정 투자 효과 분석", false);
        assert!(simple > long);

        let alternate = executive.weight_for(1, "비용 일정", true);
        assert!(alternate < simple);
        assert!(alternate > 0.0);
    }
}
