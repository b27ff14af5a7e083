use std::cmp::Ordering;

use crate::evidence::EvidenceChunk;

#[derive(Debug, Clone, Default)]
/// Orders evidence by rerank score (desc), entity-filter match, then retrieval index (asc).
///
/// Chunks without a rerank score (degraded lists) sort after scored ones and are ordered by
/// entity match and retrieval index alone; the search score never reorders them.
/// Never drops chunks; hard filtering happens at retrieval time.
pub struct EntityRanker {
    filters: Vec<String>,
}

impl EntityRanker {
    pub fn new<I, S>(filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filters: filters.into_iter().map(Into::into).collect(),
        }
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    pub fn rank(&self, mut evidence: Vec<EvidenceChunk>) -> Vec<EvidenceChunk> {
        evidence.sort_by(|a, b| self.compare(a, b));
        evidence
    }

    fn compare(&self, a: &EvidenceChunk, b: &EvidenceChunk) -> Ordering {
        let by_score = match (a.rerank_score, b.rerank_score) {
            (Some(a_score), Some(b_score)) => b_score.total_cmp(&a_score),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_score
            .then_with(|| {
                let a_match = a.matches_any_entity(&self.filters);
                let b_match = b.matches_any_entity(&self.filters);
                b_match.cmp(&a_match)
            })
            .then_with(|| a.retrieval_index.cmp(&b.retrieval_index))
    }
}
