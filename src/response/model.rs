use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceChunk;
use crate::scoring::ConfidenceTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// Evidence found and summarized.
    Answered,
    /// Search succeeded but nothing relevant survived reranking.
    NoEvidence,
    /// Search circuit is open; the call was rejected without contacting the service.
    Unavailable,
    /// Search failed after exhausting retries, or an unexpected internal failure occurred.
    Error,
}

impl AnswerStatus {
    /// Only complete, healthy outcomes are worth caching.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, AnswerStatus::Answered | AnswerStatus::NoEvidence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A cited document, deduplicated by reference number.
pub struct Source {
    pub reference_number: String,
    pub title: String,
    pub source_file: String,
    pub citation: String,
    /// 1-based evidence indices citing this document.
    pub evidence_indices: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Summary with inline `[n]` markers indexing `evidence` (1-based).
    pub summary: String,
    pub evidence: Vec<EvidenceChunk>,
    pub sources: Vec<Source>,
    pub confidence: ConfidenceTier,
    /// `true` iff `evidence` is non-empty.
    pub found: bool,
    pub status: AnswerStatus,
    pub cache_served: bool,
    /// Reranking failed and evidence is in retrieval order.
    pub degraded: bool,
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
}

impl ChatResponse {
    /// Response carrying no evidence.
    pub fn empty(status: AnswerStatus, summary: impl Into<String>, session_id: &str) -> Self {
        Self {
            summary: summary.into(),
            evidence: Vec::new(),
            sources: Vec::new(),
            confidence: ConfidenceTier::Low,
            found: false,
            status,
            cache_served: false,
            degraded: false,
            session_id: session_id.to_string(),
            generated_at: Utc::now(),
        }
    }

    /// Copy re-addressed to `session_id` and marked as served from cache.
    pub fn as_cache_hit(&self, session_id: &str) -> Self {
        Self {
            cache_served: true,
            session_id: session_id.to_string(),
            ..self.clone()
        }
    }
}
