use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::resilience::{BreakerConfig, ResilienceConfig, ResilienceLayer};
use crate::scoring::EntityRanker;
use crate::services::{
    MockMode, MockRerankService, MockSearchService, RerankRequest, RerankResult, RerankService,
    SearchHit, ServiceError,
};

fn resilience() -> Arc<ResilienceLayer> {
    Arc::new(ResilienceLayer::new(
        ResilienceConfig::default()
            .with_breaker(BreakerConfig {
                failure_threshold: 5,
                window: Duration::from_secs(60),
                cooldown: Duration::from_secs(30),
            })
            .with_timeouts(
                Duration::from_millis(200),
                Duration::from_millis(200),
                Duration::from_millis(200),
            )
            .with_retries(1, Duration::from_millis(10)),
    ))
}

fn hits(scores: &[f32]) -> Vec<SearchHit> {
    scores
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            SearchHit::new(format!("c{i}"), format!("Passage {i}."), s)
                .with_reference(format!("REF-{i}"))
        })
        .collect()
}

async fn candidates(scores: &[f32]) -> Vec<crate::evidence::EvidenceChunk> {
    let search = Arc::new(MockSearchService::new(hits(scores)));
    RetrievalOrchestrator::new(search, resilience(), 50)
        .retrieve("q", &[])
        .await
        .unwrap()
}

#[tokio::test]
async fn test_retrieve_builds_indexed_chunks() {
    let search = Arc::new(MockSearchService::new(hits(&[0.9, 0.85, 0.3])));
    let orchestrator = RetrievalOrchestrator::new(search.clone(), resilience(), 50);

    let chunks = orchestrator
        .retrieve("patient identification", &["RUMC".to_string()])
        .await
        .unwrap();

    assert_eq!(chunks.len(), 3);
    assert_eq!(
        chunks.iter().map(|c| c.retrieval_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    let request = search.last_request().unwrap();
    assert_eq!(request.entity_filters, vec!["RUMC"]);
    assert_eq!(request.top_k, 50);
    assert_eq!(search.call_count(), 1);
}

#[tokio::test]
async fn test_retrieve_empty_is_ok() {
    let search = Arc::new(MockSearchService::new(vec![]));
    let chunks = RetrievalOrchestrator::new(search, resilience(), 10)
        .retrieve("q", &[])
        .await
        .unwrap();
    assert!(chunks.is_empty());
}

#[tokio::test]
async fn test_retrieve_dedups_ids_and_sanitizes_scores() {
    let mut raw = hits(&[0.5, f32::NAN]);
    raw.push(SearchHit::new("c0", "duplicate", 0.4));
    let search = Arc::new(MockSearchService::new(raw));

    let chunks = RetrievalOrchestrator::new(search, resilience(), 10)
        .retrieve("q", &[])
        .await
        .unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].retrieval_score, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_retrieve_retries_once_then_fails() {
    let search = Arc::new(MockSearchService::failing("connection reset"));
    let result = RetrievalOrchestrator::new(search.clone(), resilience(), 10)
        .retrieve("q", &[])
        .await;

    assert!(matches!(result, Err(RetrievalFailure::Transport(_))));
    assert_eq!(search.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_retrieve_timeout_maps_to_failure() {
    let search = Arc::new(MockSearchService::hanging());
    let result = RetrievalOrchestrator::new(search, resilience(), 10)
        .retrieve("q", &[])
        .await;

    assert!(matches!(result, Err(RetrievalFailure::Timeout { .. })));
}

#[tokio::test]
async fn test_rerank_applies_threshold_and_top_n() {
    let rerank = Arc::new(MockRerankService::new([
        ("c0", 0.92),
        ("c1", 0.81),
        ("c2", 0.2),
        ("c3", 0.1),
        ("c4", 0.05),
    ]));
    let coordinator = RerankCoordinator::new(rerank, resilience(), 10, 0.25);

    let outcome = coordinator
        .rerank("q", candidates(&[0.9, 0.85, 0.3, 0.2, 0.1]).await, &EntityRanker::default())
        .await;

    assert!(!outcome.degraded);
    assert_eq!(outcome.evidence.len(), 2);
    assert_eq!(outcome.evidence[0].rerank_score, Some(0.92));
}

#[tokio::test]
async fn test_rerank_reorders_by_score() {
    let rerank = Arc::new(MockRerankService::new([("c0", 0.3), ("c1", 0.9), ("c2", 0.6)]));
    let coordinator = RerankCoordinator::new(rerank, resilience(), 2, 0.25);

    let outcome = coordinator
        .rerank("q", candidates(&[0.9, 0.8, 0.7]).await, &EntityRanker::default())
        .await;

    let ids: Vec<_> = outcome.evidence.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["c1", "c2"]);
}

#[tokio::test]
async fn test_rerank_ties_keep_retrieval_order() {
    let rerank = Arc::new(MockRerankService::new([("c0", 0.5), ("c1", 0.5)]));
    let coordinator = RerankCoordinator::new(rerank, resilience(), 10, 0.25);

    let outcome = coordinator.rerank("q", candidates(&[0.9, 0.8]).await, &EntityRanker::default()).await;
    assert_eq!(outcome.evidence[0].id, "c0");
}

async fn tagged_candidates(tags: &[&[&str]]) -> Vec<crate::evidence::EvidenceChunk> {
    let tagged = hits(&vec![0.5; tags.len()])
        .into_iter()
        .zip(tags)
        .map(|(hit, entities)| hit.with_applies_to(entities.to_vec()))
        .collect();
    RetrievalOrchestrator::new(Arc::new(MockSearchService::new(tagged)), resilience(), 50)
        .retrieve("q", &[])
        .await
        .unwrap()
}

#[tokio::test]
async fn test_rerank_tie_at_cutoff_keeps_entity_match() {
    let rerank = Arc::new(MockRerankService::new([("c0", 0.75), ("c1", 0.75)]));
    let coordinator = RerankCoordinator::new(rerank.clone(), resilience(), 1, 0.25);

    let outcome = coordinator
        .rerank(
            "q",
            tagged_candidates(&[&[], &["RUMC"]]).await,
            &EntityRanker::new(["RUMC"]),
        )
        .await;

    let ids: Vec<_> = outcome.evidence.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["c1"]);
    assert_eq!(rerank.last_request().unwrap().top_n, 2);
}

#[tokio::test]
async fn test_rerank_fallback_prefers_entity_match_then_retrieval_order() {
    let rerank = Arc::new(MockRerankService::failing("cross-encoder down"));
    let coordinator = RerankCoordinator::new(rerank, resilience(), 2, 0.25);

    let outcome = coordinator
        .rerank(
            "q",
            tagged_candidates(&[&[], &["RUMC"], &[], &["RUMC"]]).await,
            &EntityRanker::new(["RUMC"]),
        )
        .await;

    assert!(outcome.degraded);
    let ids: Vec<_> = outcome.evidence.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["c1", "c3"]);
}

#[tokio::test]
async fn test_rerank_skips_call_for_empty_input() {
    let rerank = Arc::new(MockRerankService::new([("c0", 0.5)]));
    let coordinator = RerankCoordinator::new(rerank.clone(), resilience(), 10, 0.25);

    let outcome = coordinator.rerank("q", vec![], &EntityRanker::default()).await;
    assert!(outcome.evidence.is_empty());
    assert!(!outcome.degraded);
    assert_eq!(rerank.call_count(), 0);
}

#[tokio::test]
async fn test_rerank_failure_falls_back_to_retrieval_order() {
    let rerank = Arc::new(MockRerankService::failing("cross-encoder down"));
    let coordinator = RerankCoordinator::new(rerank, resilience(), 2, 0.25);

    let outcome = coordinator
        .rerank("q", candidates(&[0.9, 0.8, 0.7]).await, &EntityRanker::default())
        .await;

    assert!(outcome.degraded);
    assert!(matches!(outcome.failure, Some(RerankFailure::Service(_))));
    let ids: Vec<_> = outcome.evidence.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["c0", "c1"]);
    assert!(outcome.evidence.iter().all(|c| c.rerank_score.is_none()));
}

#[tokio::test(start_paused = true)]
async fn test_rerank_timeout_falls_back() {
    let rerank = Arc::new(MockRerankService::hanging());
    let coordinator = RerankCoordinator::new(rerank, resilience(), 10, 0.25);

    let outcome = coordinator.rerank("q", candidates(&[0.9]).await, &EntityRanker::default()).await;
    assert!(outcome.degraded);
    assert!(matches!(outcome.failure, Some(RerankFailure::Timeout { .. })));
    assert_eq!(outcome.evidence.len(), 1);
}

struct FixedRerank(Vec<RerankResult>);

#[async_trait::async_trait]
impl RerankService for FixedRerank {
    async fn rerank(&self, _request: &RerankRequest) -> Result<Vec<RerankResult>, ServiceError> {
        Ok(self.0.clone())
    }
}

fn result(id: &str, relevance_score: f32) -> RerankResult {
    RerankResult {
        id: id.into(),
        relevance_score,
    }
}

#[tokio::test]
async fn test_rerank_unknown_ids_are_ignored() {
    let rerank = Arc::new(FixedRerank(vec![result("ghost", 0.99), result("c0", 0.8)]));
    let coordinator = RerankCoordinator::new(rerank, resilience(), 10, 0.25);

    let outcome = coordinator.rerank("q", candidates(&[0.9, 0.7]).await, &EntityRanker::default()).await;
    assert!(!outcome.degraded);
    let ids: Vec<_> = outcome.evidence.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["c0"]);
}

#[tokio::test]
async fn test_rerank_only_unknown_ids_degrades() {
    let rerank = Arc::new(FixedRerank(vec![result("ghost", 0.99)]));
    let coordinator = RerankCoordinator::new(rerank, resilience(), 10, 0.25);

    let outcome = coordinator.rerank("q", candidates(&[0.9]).await, &EntityRanker::default()).await;
    assert!(outcome.degraded);
    assert!(matches!(
        outcome.failure,
        Some(RerankFailure::UnmatchedResults { candidates: 1 })
    ));
}

#[tokio::test]
async fn test_rerank_mock_scripted_failure_then_success() {
    let rerank = Arc::new(MockRerankService::new([("c0", 0.8)]));
    rerank.push_mode(MockMode::Fail("blip".into()));
    let coordinator = RerankCoordinator::new(rerank, resilience(), 10, 0.25);

    let first = coordinator.rerank("q", candidates(&[0.9]).await, &EntityRanker::default()).await;
    let second = coordinator.rerank("q", candidates(&[0.9]).await, &EntityRanker::default()).await;
    assert!(first.degraded);
    assert!(!second.degraded);
}
