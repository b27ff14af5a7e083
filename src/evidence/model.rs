use serde::{Deserialize, Serialize};

use crate::services::SearchHit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
/// Citation fields carried by every evidence chunk.
pub struct Citation {
    /// Document title.
    pub title: String,
    /// Policy/reference number (used to deduplicate sources).
    pub reference_number: String,
    /// Section heading within the document.
    pub section: String,
    /// Preformatted citation string from the index, if any.
    pub citation: String,
    /// Entity codes the document applies to.
    pub applies_to: Vec<String>,
    /// Original file name of the document.
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A retrieved passage scored by retrieval and (optionally) by the cross-encoder.
pub struct EvidenceChunk {
    /// Chunk id as returned by the search index.
    pub id: String,
    /// Id of the document the chunk was cut from.
    pub document_id: String,
    /// Passage text.
    pub snippet: String,
    /// Citation metadata.
    pub citation: Citation,
    /// Page or section locator, e.g. `p. 4`.
    pub locator: Option<String>,
    /// Score assigned by the hybrid search index.
    pub retrieval_score: f32,
    /// Score assigned by the cross-encoder; `None` when reranking was skipped or failed.
    pub rerank_score: Option<f32>,
    /// Position in the original retrieval result list.
    pub retrieval_index: usize,
}

impl EvidenceChunk {
    /// Builds a chunk from a search hit at position `retrieval_index`.
    pub fn from_hit(hit: SearchHit, retrieval_index: usize) -> Self {
        let document_id = hit
            .document_id
            .filter(|d| !d.trim().is_empty())
            .or_else(|| Some(hit.source_file.clone()).filter(|f| !f.trim().is_empty()))
            .or_else(|| Some(hit.reference_number.clone()).filter(|r| !r.trim().is_empty()))
            .unwrap_or_else(|| hit.id.clone());

        let locator = match hit.page {
            Some(page) => Some(format!("p. {page}")),
            None if !hit.section.trim().is_empty() => Some(hit.section.clone()),
            None => None,
        };

        Self {
            id: hit.id,
            document_id,
            snippet: hit.content,
            citation: Citation {
                title: hit.title,
                reference_number: hit.reference_number,
                section: hit.section,
                citation: hit.citation,
                applies_to: hit.applies_to,
                source_file: hit.source_file,
            },
            locator,
            retrieval_score: hit.score,
            rerank_score: None,
            retrieval_index,
        }
    }

    /// Score used for ranking and confidence: rerank score when present, else retrieval score.
    #[inline]
    pub fn rank_score(&self) -> f32 {
        self.rerank_score.unwrap_or(self.retrieval_score)
    }

    /// Returns `true` if the chunk applies to any of `filters` (case-insensitive).
    pub fn matches_any_entity<S: AsRef<str>>(&self, filters: &[S]) -> bool {
        filters.iter().any(|filter| {
            self.citation
                .applies_to
                .iter()
                .any(|tag| tag.trim().eq_ignore_ascii_case(filter.as_ref()))
        })
    }

    /// Key used to deduplicate sources: reference number, falling back to document id.
    pub fn source_key(&self) -> &str {
        let reference = self.citation.reference_number.trim();
        if reference.is_empty() {
            &self.document_id
        } else {
            reference
        }
    }
}
