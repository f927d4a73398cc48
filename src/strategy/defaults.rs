// Built-in stakeholder strategies, category presets and classifier keywords
use super::{
    CategoryPreset, KSizingConfig, RoleClassifier, StakeholderCategory, StakeholderStrategy,
    WeightPolicy,
};
use std::collections::HashMap;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn entry(
    id: &str,
    category: StakeholderCategory,
    k_sizing: KSizingConfig,
    role_terms: &[&str],
    domain_query: Option<&str>,
    alternate_template: Option<&str>,
) -> StakeholderStrategy {
    StakeholderStrategy {
        id: id.to_string(),
        category,
        k_sizing,
        role_terms: strings(role_terms),
        domain_query: domain_query.map(str::to_string),
        alternate_template: alternate_template.map(str::to_string),
    }
}

pub(super) fn builtin_strategies() -> Vec<StakeholderStrategy> {
    use StakeholderCategory::*;

    vec![
        // Technical: the subset with a fixed domain query
        entry(
            "cto",
            Technical,
            KSizingConfig::new(0.55, 22, 120),
            &["시스템 아키텍처", "기술 스택", "확장성"],
            Some("시스템 아키텍처 설계 기술 스택 성능 확장성"),
            Some("기술 전략 시스템 아키텍처 요약"),
        ),
        entry(
            "developer",
            Technical,
            KSizingConfig::new(0.6, 25, 130),
            &["API 명세", "데이터 모델", "구현 방식"],
            Some("API 인터페이스 데이터베이스 구현 상세"),
            Some("구현 상세 API 데이터 구조"),
        ),
        entry(
            "architect",
            Technical,
            KSizingConfig::new(0.55, 22, 120),
            &["아키텍처", "인터페이스", "시스템 연동"],
            Some("시스템 구성도 모듈 인터페이스 연동 방식"),
            None,
        ),
        entry(
            "devops",
            Technical,
            KSizingConfig::new(0.5, 20, 110),
            &["배포", "모니터링", "인프라"],
            Some("배포 파이프라인 인프라 모니터링 장애 대응"),
            None,
        ),
        // Executive
        entry(
            "ceo",
            Executive,
            KSizingConfig::new(0.25, 10, 50),
            &["사업 목표", "투자 대비 효과", "일정"],
            None,
            Some("사업 목표 핵심 성과 일정 요약"),
        ),
        entry(
            "cfo",
            Executive,
            KSizingConfig::new(0.25, 10, 50),
            &["예산", "비용", "ROI"],
            None,
            Some("예산 비용 투자 대비 효과"),
        ),
        entry(
            "investor",
            Executive,
            KSizingConfig::new(0.2, 8, 40),
            &["시장성", "수익 모델", "성장 전략"],
            None,
            None,
        ),
        // Risk and quality
        entry(
            "qa_manager",
            RiskQuality,
            KSizingConfig::new(0.45, 18, 100),
            &["품질 기준", "테스트 계획", "결함 관리"],
            None,
            Some("품질 기준 테스트 계획 결함 관리"),
        ),
        entry(
            "security_officer",
            RiskQuality,
            KSizingConfig::new(0.5, 20, 110),
            &["보안 취약점", "접근 제어", "개인정보 보호"],
            None,
            Some("보안 취약점 접근 제어 개인정보 보호 대책"),
        ),
        entry(
            "compliance_officer",
            RiskQuality,
            KSizingConfig::new(0.45, 18, 100),
            &["규정 준수", "감사 대응", "인증"],
            None,
            None,
        ),
        // Default
        entry(
            "product_manager",
            Default,
            KSizingConfig::new(0.4, 16, 90),
            &["요구사항", "사용자 경험", "로드맵"],
            None,
            Some("제품 요구사항 사용자 경험 로드맵"),
        ),
        entry(
            "end_user",
            Default,
            KSizingConfig::new(0.3, 12, 60),
            &["사용 방법", "주요 기능", "편의성"],
            None,
            None,
        ),
    ]
}

fn weights(
    first_query_boost: f64,
    simple_query_boost: f64,
    focus_boost: f64,
    focus_terms: &[&str],
) -> WeightPolicy {
    WeightPolicy {
        first_query_boost,
        simple_query_boost,
        simple_query_max_terms: 3,
        focus_boost,
        focus_terms: strings(focus_terms),
        position_decay: 0.05,
        min_position_factor: 0.6,
        alternate_language_weight: 0.8,
    }
}

pub(super) fn builtin_presets() -> HashMap<StakeholderCategory, CategoryPreset> {
    let mut presets = HashMap::new();

    presets.insert(
        StakeholderCategory::Technical,
        CategoryPreset {
            k_sizing: KSizingConfig::new(0.55, 22, 120),
            weights: weights(1.5, 1.0, 1.0, &[]),
            alternate_template: "기술 아키텍처 구현 방안 시스템 성능".to_string(),
            role_terms: strings(&["기술 요구사항", "시스템 구조"]),
        },
    );
    presets.insert(
        StakeholderCategory::Executive,
        CategoryPreset {
            k_sizing: KSizingConfig::new(0.25, 10, 50),
            weights: weights(1.0, 1.3, 1.0, &[]),
            alternate_template: "사업 목표 비용 일정 투자 효과".to_string(),
            role_terms: strings(&["사업 성과", "비용 효과"]),
        },
    );
    presets.insert(
        StakeholderCategory::RiskQuality,
        CategoryPreset {
            k_sizing: KSizingConfig::new(0.45, 18, 100),
            weights: weights(
                1.2,
                1.0,
                1.2,
                &["위험", "리스크", "보안", "품질", "risk", "security", "quality"],
            ),
            alternate_template: "품질 보증 위험 관리 보안 대책".to_string(),
            role_terms: strings(&["위험 관리", "품질 보증"]),
        },
    );
    presets.insert(
        StakeholderCategory::Default,
        CategoryPreset {
            k_sizing: KSizingConfig::new(0.35, 15, 80),
            weights: weights(1.2, 1.0, 1.0, &[]),
            alternate_template: "프로젝트 개요 주요 요구사항".to_string(),
            role_terms: strings(&["주요 요구사항", "프로젝트 개요"]),
        },
    );

    presets
}

pub(super) fn builtin_classifier() -> RoleClassifier {
    RoleClassifier::new(vec![
        (
            StakeholderCategory::RiskQuality,
            strings(&[
                "품질", "보안", "리스크", "위험", "감사", "규정", "qa", "quality", "security",
                "risk", "compliance", "audit",
            ]),
        ),
        (
            StakeholderCategory::Technical,
            strings(&[
                "개발", "엔지니어", "기술", "아키텍트", "설계", "운영", "developer", "engineer",
                "technical", "technology", "architect", "cto", "devops",
            ]),
        ),
        (
            StakeholderCategory::Executive,
            strings(&[
                "대표", "경영", "임원", "사장", "투자", "재무", "ceo", "cfo", "coo", "executive",
                "director", "investor", "board", "finance",
            ]),
        ),
    ])
}
