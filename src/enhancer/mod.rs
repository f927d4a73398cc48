//! Stakeholder-aware query expansion
//!
//! Turns a profile (role plus concerns) into a short ordered list of search
//! queries. Korean is the primary language; English-dominant profiles get
//! one extra Korean query appended past the `max_queries` limit.

pub mod tables;

use crate::config::EnhancementConfig;
use crate::language::{detect_language, Language};
use crate::profile::StakeholderProfile;
use crate::strategy::StrategyTable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Per-call enhancement switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceOptions {
    pub max_queries: usize,
    pub include_alternate_language: bool,
    pub include_synonyms: bool,
    pub include_role_specific_terms: bool,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self::from(&EnhancementConfig::default())
    }
}

impl From<&EnhancementConfig> for EnhanceOptions {
    fn from(config: &EnhancementConfig) -> Self {
        Self {
            max_queries: config.max_queries,
            include_alternate_language: config.include_alternate_language,
            include_synonyms: config.include_synonyms,
            include_role_specific_terms: config.include_role_specific_terms,
        }
    }
}

pub struct QueryEnhancer {
    table: Arc<StrategyTable>,
    config: EnhancementConfig,
}

impl QueryEnhancer {
    pub fn new(table: Arc<StrategyTable>, config: EnhancementConfig) -> Self {
        Self { table, config }
    }

    /// Options taken from configuration
    pub fn default_options(&self) -> EnhanceOptions {
        EnhanceOptions::from(&self.config)
    }

    /// Expand a profile into ordered, unique, non-empty queries
    ///
    /// At most `options.max_queries` items, plus one Korean template when the
    /// profile is English-dominant and alternate language is enabled.
    pub fn enhance(&self, profile: &StakeholderProfile, options: &EnhanceOptions) -> Vec<String> {
        let max_queries = options.max_queries.max(1);
        let concerns_language = profile.concerns_language();
        let role = normalize_role(&profile.role, concerns_language);

        let concerns: Vec<String> = profile
            .concerns
            .iter()
            .map(|c| tables::concretize(c))
            .filter(|c| !c.is_empty())
            .collect();

        if role.is_empty() && concerns.is_empty() {
            debug!("Empty profile '{}', using fallback query", profile.id);
            return vec![tables::FALLBACK_QUERY.to_string()];
        }

        let concerns = prioritize(concerns, self.config.max_concerns.max(1));
        let dominant = profile.dominant_language();
        let mut queries = Vec::new();

        for query in base_queries(&role, &concerns) {
            push_unique(&mut queries, &query);
        }

        // Cross-language variants, rendered in the dominant language
        if detect_language(&role).is_some_and(|l| l != dominant) {
            if let Some(translated) = tables::translate_role(&role, dominant) {
                let first = concerns.first().map(String::as_str).unwrap_or_default();
                push_unique(&mut queries, &format!("{} {}", translated, first));
            }
        }
        for concern in &concerns {
            if detect_language(concern).is_some_and(|l| l != dominant) {
                let translated = tables::translate(concern, dominant);
                if translated != *concern {
                    push_unique(&mut queries, &format!("{} {}", role, translated));
                }
            }
        }

        if options.include_synonyms {
            let first = concerns.first().map(String::as_str).unwrap_or_default();
            if let Some(synonym) = tables::substitute_synonym(&role) {
                push_unique(&mut queries, &format!("{} {}", synonym, first));
            }
            for concern in &concerns {
                if let Some(synonym) = tables::substitute_synonym(concern) {
                    push_unique(&mut queries, &format!("{} {}", role, synonym));
                }
            }
        }

        let resolved = self.table.resolve(&profile.id, &profile.role);
        if options.include_role_specific_terms {
            if let Some(term) = resolved.role_terms.first() {
                let first = concerns.first().map(String::as_str).unwrap_or_default();
                push_unique(&mut queries, &format!("{} {}", term, first));
            }
            if let Some(domain_query) = resolved.domain_query {
                push_unique(&mut queries, domain_query);
            }
        }

        queries.truncate(max_queries);

        if options.include_alternate_language && !dominant.is_default() {
            push_unique(&mut queries, resolved.alternate_template);
        }

        debug!(
            "Expanded profile '{}' into {} queries ({:?}-dominant)",
            profile.id,
            queries.len(),
            dominant
        );
        queries
    }
}

/// Pick one role alternative and align its language with the concerns
fn normalize_role(role: &str, concerns_language: Option<Language>) -> String {
    let alternatives: Vec<&str> = role
        .split('/')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect();

    let matching = concerns_language.and_then(|lang| {
        alternatives
            .iter()
            .find(|a| detect_language(a) == Some(lang))
            .copied()
    });
    let chosen = matching
        .or_else(|| {
            // Longest alternative, first on ties
            alternatives
                .iter()
                .copied()
                .rev()
                .max_by_key(|a| a.chars().count())
        })
        .unwrap_or_default();

    match (concerns_language, detect_language(chosen)) {
        (Some(target), Some(current)) if target != current => {
            tables::translate_role(chosen, target).unwrap_or_else(|| chosen.to_string())
        }
        _ => chosen.to_string(),
    }
}

/// Korean keyword hits count double; stable sort, keep the top `limit`
fn prioritize(concerns: Vec<String>, limit: usize) -> Vec<String> {
    let mut scored: Vec<(usize, String)> = concerns
        .into_iter()
        .map(|concern| (priority_score(&concern), concern))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, c)| c).collect()
}

fn priority_score(concern: &str) -> usize {
    let lowered = concern.to_lowercase();
    let korean = tables::KOREAN_KEYWORDS
        .iter()
        .filter(|k| concern.contains(*k))
        .count();
    let english = tables::ENGLISH_KEYWORDS
        .iter()
        .filter(|k| lowered.contains(*k))
        .count();
    korean * 2 + english
}

fn base_queries(role: &str, concerns: &[String]) -> Vec<String> {
    match concerns {
        [] => {
            let language = detect_language(role).unwrap_or(Language::DEFAULT);
            vec![
                role.to_string(),
                format!("{} {}", role, tables::requirements_phrase(language)),
            ]
        }
        [c1] => vec![format!("{} {}", role, c1), c1.clone()],
        [c1, c2] => vec![
            format!("{} {} {}", role, c1, c2),
            format!("{} {}", role, c1),
            c2.clone(),
        ],
        [c1, c2, c3, ..] => vec![
            format!("{} {} {} {}", role, c1, c2, c3),
            format!("{} {}", role, c1),
            format!("{} {}", c1, c2),
        ],
    }
}

/// Append after collapsing whitespace; skips empty and already-present queries
fn push_unique(queries: &mut Vec<String>, candidate: &str) {
    let normalized = candidate.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized.is_empty() && !queries.contains(&normalized) {
        queries.push(normalized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn enhancer() -> QueryEnhancer {
        QueryEnhancer::new(
            Arc::new(StrategyTable::builtin()),
            EnhancementConfig::default(),
        )
    }

    fn profile(id: &str, role: &str, concerns: &[&str]) -> StakeholderProfile {
        StakeholderProfile::new(id, role, concerns.iter().map(|c| c.to_string()).collect())
    }

    fn bare() -> EnhanceOptions {
        EnhanceOptions {
            max_queries: 5,
            include_alternate_language: false,
            include_synonyms: false,
            include_role_specific_terms: false,
        }
    }

    #[test]
    fn test_korean_technical_profile() {
        let queries = enhancer().enhance(
            &profile("cto", "최고기술책임자", &["일정", "성능", "보안"]),
            &EnhanceOptions::default(),
        );

        assert_eq!(queries.len(), 5);
        // Concretized, then keyword-prioritized: 일정 scores lower than 성능/보안
        assert_eq!(
            queries[0],
            "최고기술책임자 성능 요구사항 보안 요구사항 개발 일정"
        );
        assert_eq!(queries[1], "최고기술책임자 성능 요구사항");
        assert_eq!(queries[2], "성능 요구사항 보안 요구사항");
    }

    #[test]
    fn test_english_profile_gets_korean_tail() {
        let queries = enhancer().enhance(
            &profile("cfo", "CFO", &["cost", "schedule"]),
            &EnhanceOptions::default(),
        );

        assert_eq!(queries.len(), 6);
        assert_eq!(queries[0], "CFO cost estimate project schedule");
        assert_eq!(queries[1], "CFO cost estimate");
        assert_eq!(queries[2], "project schedule");
        assert_eq!(queries[5], "예산 비용 투자 대비 효과");
    }

    #[test]
    fn test_alternate_disabled() {
        let mut options = EnhanceOptions::default();
        options.include_alternate_language = false;
        let queries = enhancer().enhance(&profile("cfo", "CFO", &["cost"]), &options);
        assert!(queries.len() <= 5);
        assert!(!queries.iter().any(|q| q == "예산 비용 투자 대비 효과"));
    }

    #[test]
    fn test_slash_role_matches_concern_script() {
        let queries = enhancer().enhance(
            &profile("someone", "CTO/최고기술책임자", &["보안"]),
            &bare(),
        );
        assert_eq!(queries, vec!["최고기술책임자 보안 요구사항", "보안 요구사항"]);
    }

    #[test]
    fn test_role_translated_to_concern_language() {
        let queries = enhancer().enhance(
            &profile("developer", "Developer", &["성능", "확장성"]),
            &bare(),
        );
        assert_eq!(queries[0], "개발자 성능 요구사항 확장성 설계");
    }

    #[test]
    fn test_zero_concerns() {
        let english = enhancer().enhance(&profile("ceo", "CEO", &[]), &bare());
        assert_eq!(english, vec!["CEO", "CEO key requirements"]);

        let korean = enhancer().enhance(&profile("ceo", "대표이사", &[]), &bare());
        assert_eq!(korean, vec!["대표이사", "대표이사 주요 요구사항"]);
    }

    #[test]
    fn test_degenerate_profile() {
        let queries = enhancer().enhance(&profile("", "  ", &[]), &EnhanceOptions::default());
        assert_eq!(queries, vec![tables::FALLBACK_QUERY]);
    }

    #[test]
    fn test_cross_language_variant() {
        let queries = enhancer().enhance(
            &profile("qa_manager", "QA Manager", &["test coverage", "보안"]),
            &bare(),
        );
        assert!(queries.contains(&"QA Manager security requirements".to_string()));
    }

    #[test]
    fn test_role_specific_and_domain_queries() {
        let options = EnhanceOptions {
            max_queries: 10,
            include_alternate_language: false,
            include_synonyms: false,
            include_role_specific_terms: true,
        };
        let queries = enhancer().enhance(&profile("cto", "최고기술책임자", &["보안"]), &options);

        assert!(queries.contains(&"시스템 아키텍처 보안 요구사항".to_string()));
        assert!(queries.contains(&"시스템 아키텍처 설계 기술 스택 성능 확장성".to_string()));
    }

    #[test]
    fn test_synonym_queries() {
        let options = EnhanceOptions {
            max_queries: 10,
            include_synonyms: true,
            ..bare()
        };
        let queries = enhancer().enhance(&profile("cfo", "CFO", &["cost"]), &options);
        assert!(queries.contains(&"Chief Financial Officer cost estimate".to_string()));
        assert!(queries.contains(&"CFO expense estimate".to_string()));
    }

    const ROLES: &[&str] = &["CTO", "최고기술책임자", "QA Manager", "", "대표/CEO", "Gardener"];
    const CONCERNS: &[&str] = &["보안", "cost", "일정", "  ", "performance", "사용자 경험", "보안"];

    #[quickcheck]
    fn prop_queries_unique_non_empty_bounded(
        role: u8,
        picks: Vec<u8>,
        max_queries: u8,
        alternate: bool,
        synonyms: bool,
        role_terms: bool,
    ) -> bool {
        let concerns: Vec<&str> = picks
            .iter()
            .take(5)
            .map(|p| CONCERNS[*p as usize % CONCERNS.len()])
            .collect();
        let p = profile("cto", ROLES[role as usize % ROLES.len()], &concerns);
        let options = EnhanceOptions {
            max_queries: (max_queries % 8) as usize + 1,
            include_alternate_language: alternate,
            include_synonyms: synonyms,
            include_role_specific_terms: role_terms,
        };
        let queries = enhancer().enhance(&p, &options);

        let mut seen = std::collections::HashSet::new();
        !queries.is_empty()
            && queries.iter().all(|q| !q.trim().is_empty() && seen.insert(q.clone()))
            && queries.len() <= options.max_queries + 1
            && (queries.len() <= options.max_queries || p.dominant_language() == Language::English)
    }

    #[quickcheck]
    fn prop_unknown_concern_round_trip_is_identity(concern: String) -> TestResult {
        let concern = concern.trim().to_string();
        if concern.is_empty() || tables::is_known(&concern) {
            return TestResult::discard();
        }
        let concretized = tables::concretize(&concern);
        TestResult::from_bool(
            tables::translate(&concretized, Language::Korean) == concern
                && tables::translate(&concretized, Language::English) == concern,
        )
    }
}
