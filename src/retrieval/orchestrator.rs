use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::evidence::EvidenceChunk;
use crate::resilience::{Dependency, ResilienceLayer};
use crate::services::{SearchRequest, SearchService};

use super::error::RetrievalFailure;

/// Issues the search call for an expanded query.
pub struct RetrievalOrchestrator {
    search: Arc<dyn SearchService>,
    resilience: Arc<ResilienceLayer>,
    top_k: usize,
}

impl RetrievalOrchestrator {
    pub fn new(
        search: Arc<dyn SearchService>,
        resilience: Arc<ResilienceLayer>,
        top_k: usize,
    ) -> Self {
        Self {
            search,
            resilience,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Returns up to `top_k` chunks in index order. An empty list is a normal outcome.
    ///
    /// Retries follow the resilience policy; an open breaker fails fast with
    /// [`RetrievalFailure::Unavailable`].
    #[instrument(skip_all, fields(top_k = self.top_k, filters = entity_filters.len()))]
    pub async fn retrieve(
        &self,
        expanded_query: &str,
        entity_filters: &[String],
    ) -> Result<Vec<EvidenceChunk>, RetrievalFailure> {
        let request = SearchRequest {
            expanded_query: expanded_query.to_string(),
            entity_filters: entity_filters.to_vec(),
            top_k: self.top_k,
        };

        let search = &self.search;
        let retries = self.resilience.config().retrieval_retries;
        let hits = self
            .resilience
            .call_with_retry(Dependency::Search, retries, || search.search(&request))
            .await?;

        let returned = hits.len();
        let mut seen = HashSet::new();
        let chunks: Vec<EvidenceChunk> = hits
            .into_iter()
            .filter(|hit| seen.insert(hit.id.clone()))
            .take(self.top_k)
            .enumerate()
            .map(|(index, mut hit)| {
                if !hit.score.is_finite() {
                    warn!(id = %hit.id, "Search returned a non-finite score");
                    hit.score = 0.0;
                }
                EvidenceChunk::from_hit(hit, index)
            })
            .collect();

        debug!(returned, kept = chunks.len(), "Retrieval complete");
        Ok(chunks)
    }
}

impl std::fmt::Debug for RetrievalOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalOrchestrator")
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}
