//! Capability interfaces for the external collaborators (search, rerank, completion).
//!
//! The pipeline only ever sees `Arc<dyn SearchService>` / `Arc<dyn RerankService>` /
//! `Arc<dyn CompletionService>`, bundled into [`Capabilities`]. Concrete adapters:
//!
//! - [`HttpSearchClient`], [`HttpRerankClient`]: JSON-over-HTTP via `reqwest`
//! - [`GenaiCompletion`]: chat completion via `genai`
//! - [`OfflineSearchIndex`], [`LexicalReranker`]: in-process stand-ins for demos and local runs
//! - `mock`: scripted fakes for tests (behind `#[cfg(any(test, feature = "mock"))]`)

pub mod completion;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod offline;
pub mod types;


use std::sync::Arc;

use async_trait::async_trait;

pub use completion::GenaiCompletion;
pub use error::ServiceError;
pub use http::{HttpRerankClient, HttpSearchClient};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockCompletionService, MockMode, MockRerankService, MockSearchService};
pub use offline::{CorpusError, LexicalReranker, OfflineSearchIndex, lexical_overlap_score};
pub use types::{
    CompletionRequest, RerankDocument, RerankRequest, RerankResult, SearchHit, SearchRequest,
};

#[async_trait]
/// Hybrid vector/keyword search over the policy index.
pub trait SearchService: Send + Sync {
    /// Returns hits ordered by descending retrieval score.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ServiceError>;
}

#[async_trait]
/// Cross-encoder relevance scoring.
pub trait RerankService: Send + Sync {
    /// Returns relevance scores keyed by document id (order unspecified).
    async fn rerank(&self, request: &RerankRequest) -> Result<Vec<RerankResult>, ServiceError>;
}

#[async_trait]
/// Chat completion used for summary generation.
pub trait CompletionService: Send + Sync {
    /// Returns generated text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError>;
}

#[derive(Clone)]
/// The `{retrieve, rerank, complete}` capability set injected into the pipeline.
pub struct Capabilities {
    pub search: Arc<dyn SearchService>,
    pub rerank: Arc<dyn RerankService>,
    /// Summary generation is optional; without it summaries are extractive.
    pub completion: Option<Arc<dyn CompletionService>>,
}

impl Capabilities {
    pub fn new(search: Arc<dyn SearchService>, rerank: Arc<dyn RerankService>) -> Self {
        Self {
            search,
            rerank,
            completion: None,
        }
    }

    pub fn with_completion(mut self, completion: Arc<dyn CompletionService>) -> Self {
        self.completion = Some(completion);
        self
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("completion", &self.completion.is_some())
            .finish_non_exhaustive()
    }
}
