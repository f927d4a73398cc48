//! End-to-end retrieval through the adaptive controller

mod common;

use async_trait::async_trait;
use common::{hits, HybridScript, ScriptedAdapter};
use stakefuse::config::{Config, IndexingConfig};
use stakefuse::embedding::{EmbeddingProvider, HashEmbeddingProvider};
use stakefuse::retrieval::{
    AdapterError, AdapterHandle, AdapterRegistry, CollectionStats, InMemoryAdapter, PassageRef,
    RetrievalAdapter, SearchHit, SearchRequest, CHUNK_INDEX_KEY, SOURCE_FILE_KEY,
};
use stakefuse::sparse::{AnalyzerHandle, SparseVectorEncoder};
use stakefuse::{AdaptiveController, BackendKind, StakeholderProfile};
use std::sync::Arc;

const DOCS: &[(&str, &str)] = &[
    ("architecture.md", "시스템 아키텍처는 마이크로서비스 구조로 설계되었다"),
    ("architecture.md", "API 게이트웨이가 인증과 라우팅을 담당한다"),
    ("architecture.md", "데이터베이스는 PostgreSQL 클러스터로 구성된다"),
    ("architecture.md", "확장성을 위해 서비스별 자동 확장을 지원한다"),
    ("security.md", "보안 취약점 점검은 분기마다 수행한다"),
    ("security.md", "접근 제어는 역할 기반으로 관리한다"),
    ("security.md", "개인정보는 암호화하여 저장한다"),
    ("security.md", "Security audits cover authentication and session handling"),
    ("budget.md", "전체 예산은 12억 원으로 책정되었다"),
    ("budget.md", "운영 비용은 클라우드 사용량에 비례한다"),
    ("budget.md", "투자 대비 효과는 2년 내 회수를 목표로 한다"),
    ("schedule.md", "프로젝트 일정은 3단계로 나뉜다"),
    ("schedule.md", "1단계는 요구사항 분석과 설계를 포함한다"),
    ("schedule.md", "2단계에서 핵심 기능을 구현한다"),
    ("schedule.md", "3단계에서 통합 테스트와 배포를 진행한다"),
    ("quality.md", "품질 기준은 결함 밀도와 테스트 커버리지로 측정한다"),
    ("quality.md", "테스트 계획은 단위 통합 인수 테스트로 구성된다"),
    ("quality.md", "결함 관리는 이슈 트래커로 추적한다"),
    ("performance.md", "성능 목표는 응답 시간 200ms 이하이다"),
    ("performance.md", "Performance testing uses a load of 1000 concurrent users"),
    ("performance.md", "캐시 계층으로 데이터베이스 부하를 줄인다"),
    ("overview.md", "프로젝트 개요와 주요 요구사항을 정리한다"),
    ("overview.md", "The system provides document search for project teams"),
    ("overview.md", "사용자 경험 개선이 주요 목표 중 하나이다"),
    ("infra.md", "배포 파이프라인은 컨테이너 기반으로 자동화한다"),
    ("infra.md", "모니터링은 지표와 로그를 함께 수집한다"),
    ("infra.md", "장애 대응 절차는 온콜 순번으로 운영한다"),
    ("api.md", "API 명세는 OpenAPI 형식으로 관리한다"),
    ("api.md", "REQ-101 요구사항은 인증 토큰 만료를 정의한다"),
    ("api.md", "데이터 모델은 정규화된 스키마를 따른다"),
];

fn corpus() -> Vec<PassageRef> {
    DOCS.iter()
        .enumerate()
        .map(|(i, (source, text))| {
            PassageRef::new(*text)
                .with_metadata(SOURCE_FILE_KEY, *source)
                .with_metadata(CHUNK_INDEX_KEY, i)
        })
        .collect()
}

fn embedder() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashEmbeddingProvider::new(64).unwrap())
}

async fn memory_handle(collection: &str) -> AdapterHandle {
    let adapter =
        InMemoryAdapter::with_config(collection, embedder(), &IndexingConfig::default(), 8)
            .unwrap();
    let added = adapter.add_passages(corpus()).await.unwrap();
    assert_eq!(added, DOCS.len());
    AdapterHandle::new(Arc::new(adapter))
}

fn cto() -> StakeholderProfile {
    StakeholderProfile::new(
        "cto",
        "CTO",
        vec!["시스템 아키텍처".to_string(), "성능".to_string(), "보안".to_string()],
    )
}

fn numbered(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}-{:03}", prefix, i)).collect()
}

#[tokio::test]
async fn test_search_in_memory_collection() {
    let handle = memory_handle("docs").await;
    let controller = AdaptiveController::from_config(&Config::default());

    let result = controller
        .search_collection(&cto(), "docs", BackendKind::Standard, &handle)
        .await
        .unwrap();

    // 30 documents: cto wants max(22, ceil(30 × 0.55)) = 22, capped at floor(30 × 0.8) = 24
    assert_eq!(result.statistics.target_k, 22);
    assert_eq!(result.passages.len(), 22);
    assert!(!result.queries.is_empty());
    assert_eq!(result.statistics.queries_failed, 0);
    assert!(result.statistics.phases_run >= 1);

    let sourced: usize = result.statistics.source_counts.values().sum();
    assert_eq!(sourced, result.passages.len());
    assert!(!result.statistics.source_counts.contains_key("unknown"));

    for pair in result.passages.windows(2) {
        assert!(pair[0].rrf_score >= pair[1].rrf_score);
    }
    for passage in &result.passages {
        assert!(passage.id.contains('#'), "unexpected id {}", passage.id);
        assert!(passage.query_coverage >= 1);
    }
}

#[tokio::test]
async fn test_unknown_collection() {
    let handle = memory_handle("docs").await;
    let controller = AdaptiveController::from_config(&Config::default());

    let err = controller
        .search_collection(&cto(), "missing", BackendKind::Standard, &handle)
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::UnknownCollection(_)));

    let registry = AdapterRegistry::new();
    let err = controller
        .search_registered(&cto(), "docs", BackendKind::Standard, &registry)
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::UnknownCollection(_)));
}

#[tokio::test]
async fn test_search_registered_collection() {
    let mut registry = AdapterRegistry::new();
    registry.register("docs", memory_handle("docs").await);
    let controller = AdaptiveController::from_config(&Config::default());

    let cfo = StakeholderProfile::new("cfo", "CFO", vec!["예산".to_string(), "비용".to_string()]);
    let result = controller
        .search_registered(&cfo, "docs", BackendKind::Standard, &registry)
        .await
        .unwrap();

    // 30 documents: cfo wants max(10, ceil(30 × 0.25)) = 10
    assert_eq!(result.passages.len(), 10);
}

#[tokio::test]
async fn test_empty_corpus_skips_retrieval() {
    let adapter = Arc::new(ScriptedAdapter::new().fallback(&["A"]));
    let handle = AdapterHandle::new(adapter.clone());
    let controller = AdaptiveController::from_config(&Config::default());

    let result = controller
        .search(&cto(), 0, BackendKind::Standard, &handle)
        .await;

    assert!(result.passages.is_empty());
    assert_eq!(result.statistics.target_k, 0);
    assert_eq!(result.statistics.phases_run, 0);
    assert_eq!(result.statistics.achievement_rate, 1.0);
    assert_eq!(adapter.dense_calls(), 0);
}

#[tokio::test]
async fn test_small_corpus_request_is_capped() {
    let ids = numbered("doc", 10);
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    let handle = AdapterHandle::new(Arc::new(ScriptedAdapter::new().fallback(&ids)));
    let controller = AdaptiveController::from_config(&Config::default());

    let result = controller
        .search(&cto(), 10, BackendKind::Standard, &handle)
        .await;

    assert_eq!(result.statistics.target_k, 8);
    assert_eq!(result.passages.len(), 8);
}

#[tokio::test]
async fn test_all_failures_reported_not_raised() {
    let adapter = ScriptedAdapter::new()
        .always_failing(AdapterError::Timeout(std::time::Duration::from_secs(10)));
    let handle = AdapterHandle::new(Arc::new(adapter));
    let controller = AdaptiveController::from_config(&Config::default());

    let result = controller
        .search(&cto(), 100, BackendKind::Standard, &handle)
        .await;

    assert!(result.passages.is_empty());
    assert!(result.statistics.all_queries_failed);
    assert!(result.statistics.no_results);
    assert_eq!(result.statistics.phases_run, 1);
}

/// Fills every window with `window / 3` distinct passages, padded with repeats
struct SaturatingAdapter;

#[async_trait]
impl RetrievalAdapter for SaturatingAdapter {
    async fn dense_search(&self, _query: &str, k: usize) -> Result<Vec<SearchHit>, AdapterError> {
        let distinct = (k / 3).max(1);
        let ids: Vec<String> = (0..k).map(|i| format!("doc-{:04}", i % distinct)).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        Ok(hits(&ids))
    }

    async fn stats(&self, _collection_id: &str) -> Result<CollectionStats, AdapterError> {
        Ok(CollectionStats {
            total_documents: 1000,
        })
    }

    fn name(&self) -> &str {
        "saturating"
    }
}

#[tokio::test]
async fn test_widen_phase_when_window_saturated() {
    let handle = AdapterHandle::new(Arc::new(SaturatingAdapter));
    let controller = AdaptiveController::from_config(&Config::default());

    // cto over 1000 documents: K = 120, search_k = 180 → 60 distinct
    // Widened to 360 → 120 distinct
    let result = controller
        .search_collection(&cto(), "docs", BackendKind::Standard, &handle)
        .await
        .unwrap();

    assert_eq!(result.statistics.target_k, 120);
    assert_eq!(result.statistics.phases_run, 2);
    assert_eq!(result.passages.len(), 120);
    assert_eq!(result.statistics.achievement_rate, 1.0);
}

#[tokio::test]
async fn test_max_phases_limits_search() {
    let mut config = Config::default();
    config.retrieval.max_phases = 1;
    let controller = AdaptiveController::from_config(&config);
    let handle = AdapterHandle::new(Arc::new(SaturatingAdapter));

    let result = controller
        .search(&cto(), 1000, BackendKind::Standard, &handle)
        .await;

    assert_eq!(result.statistics.phases_run, 1);
    assert_eq!(result.passages.len(), 60);
    assert!((result.statistics.achievement_rate - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_dense_fallback_phase_after_hybrid() {
    let dense_ids = numbered("dense", 100);
    let dense_ids: Vec<&str> = dense_ids.iter().map(String::as_str).collect();
    let adapter = Arc::new(
        ScriptedAdapter::new()
            .fallback(&dense_ids)
            .with_hybrid(HybridScript::Return(hits(&["H1", "H2", "H3", "H4", "H5"])))
            .documents(100),
    );
    let handle = AdapterHandle::new(adapter.clone());

    let sparse = SparseVectorEncoder::new(
        Config::default().sparse,
        Arc::new(AnalyzerHandle::rule_based()),
    )
    .unwrap();
    let controller =
        AdaptiveController::from_config(&Config::default()).with_hybrid(Arc::new(sparse), embedder());

    let result = controller
        .search_collection(&cto(), "docs", BackendKind::Standard, &handle)
        .await
        .unwrap();

    // Hybrid pass finds 5 of 55 without filling its window, dense fills the rest
    assert_eq!(result.statistics.target_k, 55);
    assert_eq!(result.statistics.phases_run, 2);
    assert_eq!(result.passages.len(), 55);
    assert_eq!(result.statistics.hybrid_fallbacks, 0);
    assert!(adapter.hybrid_calls() > 0);
    assert!(adapter.dense_calls() > 0);

    let queries = result.queries.len();
    assert_eq!(result.statistics.queries_issued, queries * 2);
}

#[tokio::test]
async fn test_request_overrides_enhancement() {
    let controller = AdaptiveController::from_config(&Config::default());

    let mut request = SearchRequest::new(cto(), 100);
    request.max_queries = Some(2);
    request.include_alternate_language = Some(false);
    let queries = controller.weighted_queries(&request);
    assert_eq!(queries.len(), 2);

    let default_request = SearchRequest::new(cto(), 100);
    let defaults = controller.weighted_queries(&default_request);
    assert!(defaults.len() > 2);

    // The first query carries the first-query boost
    assert!(defaults[0].weight >= defaults[1].weight);
    assert!(defaults.iter().all(|q| q.weight > 0.0));
}

fn hybrid_controller() -> AdaptiveController {
    let sparse = SparseVectorEncoder::new(
        Config::default().sparse,
        Arc::new(AnalyzerHandle::rule_based()),
    )
    .unwrap();
    AdaptiveController::from_config(&Config::default()).with_hybrid(Arc::new(sparse), embedder())
}

/// Sum of first-rank contributions over `queries`, in query order
fn first_rank_score(queries: &[stakefuse::WeightedQuery]) -> f64 {
    queries.iter().map(|q| q.weight / 61.0).sum()
}

#[tokio::test]
async fn test_failed_query_not_reissued_when_widening() {
    let controller = AdaptiveController::from_config(&Config::default());
    let queries = controller.weighted_queries(&SearchRequest::new(cto(), 1000));
    assert!(queries.len() >= 3);
    let broken = queries[1].text.clone();

    // Three hits per passage: 180 hits hold 60 passages, 360 hold 120
    let padded: Vec<String> = (0..400).map(|i| format!("doc-{:04}", i / 3)).collect();
    let padded: Vec<&str> = padded.iter().map(String::as_str).collect();
    let adapter = Arc::new(
        ScriptedAdapter::new()
            .fallback(&padded)
            .failing(&broken, AdapterError::Backend("shard offline".to_string()))
            .documents(1000),
    );
    let handle = AdapterHandle::new(adapter.clone());

    let result = controller
        .search_collection(&cto(), "docs", BackendKind::Standard, &handle)
        .await
        .unwrap();

    assert_eq!(result.statistics.phases_run, 2);
    assert_eq!(adapter.dense_calls_for(&broken), 1);
    assert_eq!(result.statistics.queries_failed, 1);
    assert_eq!(result.statistics.queries_issued, queries.len() * 2 - 1);
    assert_eq!(result.passages.len(), 120);
    assert!(result
        .passages
        .iter()
        .all(|p| !p.per_query_rank.contains_key(&broken)));
}

#[tokio::test]
async fn test_dense_fallback_skips_queries_that_fell_back() {
    let controller = hybrid_controller();
    let queries = controller.weighted_queries(&SearchRequest::new(cto(), 100));
    let fell_back = queries[0].text.clone();
    let fell_back_vector = embedder().embed(&fell_back).unwrap();

    let adapter = Arc::new(
        ScriptedAdapter::new()
            .fallback(&["D0", "D1", "D2", "D3", "D4", "D5", "D6", "D7", "D8", "D9"])
            .with_hybrid(HybridScript::FailFor(
                vec![fell_back_vector],
                hits(&["H1", "H2", "H3", "H4", "H5"]),
            ))
            .documents(100),
    );
    let handle = AdapterHandle::new(adapter.clone());

    let result = controller
        .search_collection(&cto(), "docs", BackendKind::Standard, &handle)
        .await
        .unwrap();

    // Primary: one dense fallback plus hybrid answers; phase 3 covers the rest once
    assert_eq!(result.statistics.phases_run, 2);
    assert_eq!(result.statistics.hybrid_fallbacks, 1);
    assert_eq!(adapter.dense_calls_for(&fell_back), 1);
    assert_eq!(adapter.dense_calls(), queries.len());

    // Every query ranks D0 first exactly once
    let d0 = result.passages.iter().find(|p| p.id == "D0").unwrap();
    assert_eq!(d0.query_coverage, queries.len());
    assert!((d0.rrf_score - first_rank_score(&queries)).abs() < 1e-12);
}

#[tokio::test]
async fn test_no_dense_phase_when_every_hybrid_call_fell_back() {
    let controller = hybrid_controller();
    let queries = controller.weighted_queries(&SearchRequest::new(cto(), 100));

    let adapter = Arc::new(
        ScriptedAdapter::new()
            .fallback(&["A", "B", "C"])
            .with_hybrid(HybridScript::Fail)
            .documents(100),
    );
    let handle = AdapterHandle::new(adapter.clone());

    let result = controller
        .search_collection(&cto(), "docs", BackendKind::Standard, &handle)
        .await
        .unwrap();

    assert_eq!(result.statistics.phases_run, 1);
    assert_eq!(result.statistics.hybrid_fallbacks, queries.len());
    assert_eq!(adapter.dense_calls(), queries.len());

    let a = &result.passages[0];
    assert_eq!(a.id, "A");
    assert!((a.rrf_score - first_rank_score(&queries)).abs() < 1e-12);
}
