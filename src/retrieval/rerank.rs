use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::evidence::EvidenceChunk;
use crate::resilience::{Dependency, ResilienceLayer};
use crate::scoring::EntityRanker;
use crate::services::{RerankDocument, RerankRequest, RerankService};

use super::error::RerankFailure;

#[derive(Debug, Clone, PartialEq)]
pub struct RerankOutcome {
    /// Top-N evidence, best first.
    pub evidence: Vec<EvidenceChunk>,
    /// `true` when reranking failed and `evidence` is in retrieval order.
    pub degraded: bool,
    /// Why reranking was skipped, when it was.
    pub failure: Option<RerankFailure>,
}

/// Scores retrieval candidates with the cross-encoder and applies the cutoffs.
pub struct RerankCoordinator {
    rerank: Arc<dyn RerankService>,
    resilience: Arc<ResilienceLayer>,
    top_n: usize,
    min_score: f32,
}

impl RerankCoordinator {
    pub fn new(
        rerank: Arc<dyn RerankService>,
        resilience: Arc<ResilienceLayer>,
        top_n: usize,
        min_score: f32,
    ) -> Self {
        Self {
            rerank,
            resilience,
            top_n: top_n.max(1),
            min_score,
        }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// Never fails: any rerank failure degrades to the first `top_n` candidates in retrieval
    /// order with `degraded = true`.
    ///
    /// The cutoff is taken after `ranker` has ordered the survivors, so a chunk matching the
    /// entity filters wins a score tie at the `top_n` boundary.
    #[instrument(skip_all, fields(candidates = candidates.len(), top_n = self.top_n))]
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<EvidenceChunk>,
        ranker: &EntityRanker,
    ) -> RerankOutcome {
        if candidates.is_empty() {
            return RerankOutcome {
                evidence: candidates,
                degraded: false,
                failure: None,
            };
        }

        match self.score(query, &candidates).await {
            Ok(scores) => RerankOutcome {
                evidence: self.apply(candidates, &scores, ranker),
                degraded: false,
                failure: None,
            },
            Err(failure) => {
                warn!(error = %failure, "Rerank failed, falling back to retrieval order");
                RerankOutcome {
                    evidence: self.fallback(candidates, ranker),
                    degraded: true,
                    failure: Some(failure),
                }
            }
        }
    }

    async fn score(
        &self,
        query: &str,
        candidates: &[EvidenceChunk],
    ) -> Result<HashMap<String, f32>, RerankFailure> {
        let request = RerankRequest {
            query: query.to_string(),
            documents: candidates
                .iter()
                .map(|c| RerankDocument {
                    id: c.id.clone(),
                    text: c.snippet.clone(),
                })
                .collect(),
            // Scores for every candidate; the cutoff is applied locally.
            top_n: candidates.len(),
            min_score: self.min_score,
        };

        let rerank = &self.rerank;
        let results = self
            .resilience
            .call(Dependency::Rerank, || rerank.rerank(&request))
            .await?;

        let mut scores = HashMap::with_capacity(results.len());
        let mut unknown = 0usize;
        for result in &results {
            if !candidates.iter().any(|c| c.id == result.id) {
                unknown += 1;
                continue;
            }
            if result.relevance_score.is_finite() {
                scores.entry(result.id.clone()).or_insert(result.relevance_score);
            }
        }

        if unknown > 0 {
            warn!(unknown, "Rerank returned scores for unknown ids");
            if scores.is_empty() {
                return Err(RerankFailure::UnmatchedResults {
                    candidates: candidates.len(),
                });
            }
        }
        Ok(scores)
    }

    fn apply(
        &self,
        candidates: Vec<EvidenceChunk>,
        scores: &HashMap<String, f32>,
        ranker: &EntityRanker,
    ) -> Vec<EvidenceChunk> {
        let total = candidates.len();
        let kept: Vec<EvidenceChunk> = candidates
            .into_iter()
            .filter_map(|mut chunk| {
                let score = *scores.get(&chunk.id)?;
                (score >= self.min_score).then(|| {
                    chunk.rerank_score = Some(score);
                    chunk
                })
            })
            .collect();

        let mut kept = ranker.rank(kept);
        kept.truncate(self.top_n);

        debug!(total, kept = kept.len(), min_score = self.min_score, "Rerank applied");
        kept
    }

    fn fallback(
        &self,
        mut candidates: Vec<EvidenceChunk>,
        ranker: &EntityRanker,
    ) -> Vec<EvidenceChunk> {
        for chunk in &mut candidates {
            chunk.rerank_score = None;
        }
        let mut ordered = ranker.rank(candidates);
        ordered.truncate(self.top_n);
        ordered
    }
}

impl std::fmt::Debug for RerankCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerankCoordinator")
            .field("top_n", &self.top_n)
            .field("min_score", &self.min_score)
            .finish_non_exhaustive()
    }
}
