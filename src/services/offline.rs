//! In-process stand-ins for the hosted search index and cross-encoder.
//!
//! Scoring is a stop-word-aware term overlap squashed through a sigmoid, so it is
//! deterministic and lands in `[0, 1]` like a real cross-encoder probability.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use super::error::ServiceError;
use super::types::{RerankRequest, RerankResult, SearchHit, SearchRequest};
use super::{RerankService, SearchService};

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into", "during",
    "before", "after", "between", "under", "then", "here", "there", "when", "where", "why",
    "how", "all", "each", "other", "some", "such", "no", "nor", "not", "only", "so", "than",
    "too", "very", "just", "and", "but", "if", "or", "because", "while", "what", "which", "who",
    "whom", "this", "that", "these", "those", "am", "it", "its", "our", "we", "i", "me", "my",
];

fn content_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Deterministic relevance of `candidate` to `query` in `[0, 1]`.
pub fn lexical_overlap_score(query: &str, candidate: &str) -> f32 {
    let query_words = content_words(query);
    if query_words.is_empty() {
        return 0.0;
    }
    let candidate_words = content_words(candidate);

    let matches = query_words.intersection(&candidate_words).count();
    if matches == 0 {
        return 0.0;
    }
    let recall = matches as f32 / query_words.len() as f32;
    let union = query_words.union(&candidate_words).count();
    let jaccard = matches as f32 / union.max(1) as f32;

    let base_score = 0.6 * recall + 0.4 * jaccard;
    let normalized = 1.0 / (1.0 + (-8.0 * (base_score - 0.5)).exp());
    normalized.clamp(0.0, 1.0)
}

#[derive(Debug, Error)]
/// Errors raised while loading an offline corpus.
pub enum CorpusError {
    #[error("failed to read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse corpus {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default)]
/// A fixed corpus of passages searched lexically.
pub struct OfflineSearchIndex {
    documents: Vec<SearchHit>,
}

impl OfflineSearchIndex {
    pub fn new(documents: Vec<SearchHit>) -> Self {
        Self { documents }
    }

    /// Loads a JSON array of [`SearchHit`]s; their `score` fields are ignored.
    pub fn from_file(path: &Path) -> Result<Self, CorpusError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let documents: Vec<SearchHit> =
            serde_json::from_str(&raw).map_err(|source| CorpusError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), documents = documents.len(), "Loaded offline corpus");
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl SearchService for OfflineSearchIndex {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ServiceError> {
        let mut hits: Vec<SearchHit> = self
            .documents
            .iter()
            .filter(|doc| {
                request.entity_filters.is_empty()
                    || doc.applies_to.iter().any(|tag| {
                        request
                            .entity_filters
                            .iter()
                            .any(|f| f.eq_ignore_ascii_case(tag))
                    })
            })
            .filter_map(|doc| {
                let text = format!("{} {}", doc.title, doc.content);
                let score = lexical_overlap_score(&request.expanded_query, &text);
                (score > 0.0).then(|| SearchHit {
                    score,
                    ..doc.clone()
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(request.top_k);

        debug!(hits = hits.len(), "Offline search complete");
        Ok(hits)
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Cross-encoder stand-in scoring with [`lexical_overlap_score`].
pub struct LexicalReranker;

#[async_trait]
impl RerankService for LexicalReranker {
    async fn rerank(&self, request: &RerankRequest) -> Result<Vec<RerankResult>, ServiceError> {
        let mut results: Vec<RerankResult> = request
            .documents
            .iter()
            .map(|doc| RerankResult {
                id: doc.id.clone(),
                relevance_score: lexical_overlap_score(&request.query, &doc.text),
            })
            .filter(|r| r.relevance_score >= request.min_score)
            .collect();

        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        results.truncate(request.top_n);
        Ok(results)
    }
}
