// Static vocabulary for query enhancement
//
// Korean side first in every pair. Lookups are exact after trimming; ASCII
// is matched case-insensitively.
use crate::language::Language;

/// Role names across languages
const ROLE_TRANSLATIONS: &[(&str, &str)] = &[
    ("최고기술책임자", "CTO"),
    ("최고경영자", "CEO"),
    ("최고재무책임자", "CFO"),
    ("개발자", "Developer"),
    ("아키텍트", "Architect"),
    ("운영 엔지니어", "DevOps Engineer"),
    ("품질 관리자", "QA Manager"),
    ("보안 책임자", "Security Officer"),
    ("규정 준수 담당자", "Compliance Officer"),
    ("제품 관리자", "Product Manager"),
    ("투자자", "Investor"),
    ("최종 사용자", "End User"),
];

/// Vague concern → concrete phrase
const CONCRETIZATIONS: &[(&str, &str)] = &[
    ("보안", "보안 요구사항"),
    ("성능", "성능 요구사항"),
    ("비용", "비용 산정"),
    ("일정", "개발 일정"),
    ("품질", "품질 관리"),
    ("확장성", "확장성 설계"),
    ("security", "security requirements"),
    ("performance", "performance requirements"),
    ("cost", "cost estimate"),
    ("schedule", "project schedule"),
    ("quality", "quality assurance"),
    ("scalability", "scalability design"),
];

/// Concern vocabulary across languages, including concretized phrases
const TERM_TRANSLATIONS: &[(&str, &str)] = &[
    ("보안", "security"),
    ("성능", "performance"),
    ("비용", "cost"),
    ("일정", "schedule"),
    ("품질", "quality"),
    ("위험", "risk"),
    ("확장성", "scalability"),
    ("아키텍처", "architecture"),
    ("요구사항", "requirements"),
    ("테스트", "testing"),
    ("배포", "deployment"),
    ("예산", "budget"),
    ("가용성", "availability"),
    ("개인정보", "privacy"),
    ("유지보수", "maintenance"),
    ("사용자 경험", "user experience"),
    ("보안 요구사항", "security requirements"),
    ("성능 요구사항", "performance requirements"),
    ("비용 산정", "cost estimate"),
    ("개발 일정", "project schedule"),
    ("품질 관리", "quality assurance"),
    ("확장성 설계", "scalability design"),
];

/// First synonym per term; roles and single words
const SYNONYMS: &[(&str, &str)] = &[
    ("최고기술책임자", "기술 총괄"),
    ("최고경영자", "대표이사"),
    ("개발자", "엔지니어"),
    ("CTO", "Chief Technology Officer"),
    ("CEO", "Chief Executive Officer"),
    ("CFO", "Chief Financial Officer"),
    ("보안", "정보보호"),
    ("성능", "처리 속도"),
    ("비용", "지출"),
    ("일정", "마일스톤"),
    ("품질", "신뢰성"),
    ("위험", "리스크"),
    ("요구사항", "요건"),
    ("security", "cybersecurity"),
    ("performance", "throughput"),
    ("cost", "expense"),
    ("schedule", "timeline"),
    ("quality", "reliability"),
    ("risk", "threat"),
];

/// Korean priority keywords (count double)
pub(super) const KOREAN_KEYWORDS: &[&str] = &[
    "보안", "성능", "비용", "일정", "품질", "위험", "리스크", "확장성", "아키텍처", "요구사항",
    "예산", "규정", "개인정보", "가용성", "장애",
];

pub(super) const ENGLISH_KEYWORDS: &[&str] = &[
    "security", "performance", "cost", "schedule", "quality", "risk", "scalability",
    "architecture", "requirement", "budget", "compliance", "privacy", "availability", "roi",
    "latency",
];

pub(super) const FALLBACK_QUERY: &str = "프로젝트 개요 주요 요구사항";

pub(super) fn requirements_phrase(language: Language) -> &'static str {
    match language {
        Language::Korean => "주요 요구사항",
        Language::English => "key requirements",
    }
}

fn same_term(a: &str, b: &str) -> bool {
    a == b || (a.is_ascii() && a.eq_ignore_ascii_case(b))
}

fn lookup<'a>(table: &'a [(&'a str, &'a str)], term: &str) -> Option<&'a str> {
    let term = term.trim();
    table
        .iter()
        .find(|(from, _)| same_term(from, term))
        .map(|(_, to)| *to)
}

fn translate_pair(table: &[(&str, &str)], term: &str, target: Language) -> Option<String> {
    let term = term.trim();
    table.iter().find_map(|(korean, english)| match target {
        Language::Korean if same_term(english, term) => Some(korean.to_string()),
        Language::English if same_term(korean, term) => Some(english.to_string()),
        _ => None,
    })
}

/// Concrete phrase for a vague concern; unknown concerns pass through
pub fn concretize(concern: &str) -> String {
    lookup(CONCRETIZATIONS, concern)
        .map(str::to_string)
        .unwrap_or_else(|| concern.trim().to_string())
}

/// Translate a concern into `target`; unknown terms pass through
pub fn translate(term: &str, target: Language) -> String {
    translate_pair(TERM_TRANSLATIONS, term, target).unwrap_or_else(|| term.trim().to_string())
}

pub fn translate_role(role: &str, target: Language) -> Option<String> {
    translate_pair(ROLE_TRANSLATIONS, role, target)
}

/// Term with its first synonym substituted, if the term or one of its words has one
pub fn substitute_synonym(term: &str) -> Option<String> {
    let term = term.trim();
    if let Some(synonym) = lookup(SYNONYMS, term) {
        return Some(synonym.to_string());
    }

    let words: Vec<&str> = term.split_whitespace().collect();
    let pos = words.iter().position(|w| lookup(SYNONYMS, w).is_some())?;
    let synonym = lookup(SYNONYMS, words[pos])?;
    let mut replaced: Vec<&str> = words.clone();
    replaced[pos] = synonym;
    Some(replaced.join(" "))
}

/// Whether any table knows this term
pub fn is_known(term: &str) -> bool {
    let term = term.trim();
    [CONCRETIZATIONS, TERM_TRANSLATIONS, ROLE_TRANSLATIONS]
        .iter()
        .any(|table| {
            table
                .iter()
                .any(|(a, b)| same_term(a, term) || same_term(b, term))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concretize_and_translate() {
        assert_eq!(concretize("보안"), "보안 요구사항");
        assert_eq!(concretize("Security"), "security requirements");
        assert_eq!(translate("보안 요구사항", Language::English), "security requirements");
        assert_eq!(translate("cost estimate", Language::Korean), "비용 산정");
    }

    #[test]
    fn test_unknown_terms_pass_through() {
        assert_eq!(concretize(" 온보딩 절차 "), "온보딩 절차");
        assert_eq!(translate("onboarding", Language::Korean), "onboarding");
        assert_eq!(translate_role("Gardener", Language::Korean), None);
    }

    #[test]
    fn test_role_translation() {
        assert_eq!(
            translate_role("developer", Language::Korean),
            Some("개발자".to_string())
        );
        assert_eq!(
            translate_role("최고기술책임자", Language::English),
            Some("CTO".to_string())
        );
    }

    #[test]
    fn test_substitute_synonym() {
        assert_eq!(substitute_synonym("CFO"), Some("Chief Financial Officer".to_string()));
        assert_eq!(
            substitute_synonym("성능 요구사항"),
            Some("처리 속도 요구사항".to_string())
        );
        assert_eq!(substitute_synonym("온보딩"), None);
    }
}
