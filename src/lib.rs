//! Evidentia library crate (used by the server and integration tests).
//!
//! Answers policy questions with cited, confidence-scored evidence drawn from an external
//! hybrid search index and reranked by an external cross-encoder.
//!
//! # Public API Surface
//!
//! ## Pipeline
//! - [`ChatOrchestrator`] - `process_message` / `resolve_clarification`
//! - [`ChatReply`], [`ChatResponse`], [`ClarificationRequest`] - what callers get back
//! - [`PipelineConfig`], [`Config`] - tuning and environment loading
//!
//! ## Stages
//! - [`QueryValidator`], [`TermExpansionEngine`], [`AmbiguityResolver`] - query intake
//! - [`RetrievalOrchestrator`], [`RerankCoordinator`] - external retrieval and reranking
//! - [`ConfidenceCalculator`], [`EntityRanker`] - scoring and ordering
//! - [`ResponseFormatter`] - summary, sources, evidence
//!
//! ## Resilience
//! - [`ResilienceLayer`] - response cache, per-dependency [`CircuitBreaker`]s, timeouts,
//!   retries and the per-client [`RequestBudget`]
//!
//! ## Capabilities
//! - [`SearchService`], [`RerankService`], [`CompletionService`] bundled as [`Capabilities`]
//! - HTTP, `genai` and offline adapters
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod chat;
pub mod config;
pub mod constants;
pub mod evidence;
pub mod hashing;
pub mod query;
pub mod resilience;
pub mod response;
pub mod retrieval;
pub mod scoring;
pub mod services;

pub use chat::{
    ChatError, ChatOrchestrator, ChatReply, PipelineConfig, PipelineStage, SessionStore,
    StageTrace,
};
pub use config::{Config, ConfigError};
pub use evidence::{Citation, EvidenceChunk};
pub use hashing::{hash_client_id, hash_query_key, hash_to_u64};
pub use query::{
    AmbiguityDecision, AmbiguityRegistry, AmbiguityResolver, ClarificationOption,
    ClarificationRequest, Query, QueryValidator, SynonymTable, TableError, TermExpansionEngine,
    ValidationError,
};
pub use resilience::{
    BreakerConfig, BudgetExceeded, CircuitBreaker, CircuitSnapshot, CircuitState, Dependency,
    RequestBudget, ResilienceConfig, ResilienceError, ResilienceLayer, ResponseCache,
};
pub use response::{
    AnswerStatus, ChatResponse, EVIDENTIA_STATUS_ERROR, EVIDENTIA_STATUS_HEADER,
    EVIDENTIA_STATUS_HEALTHY, EVIDENTIA_STATUS_NOT_READY, EVIDENTIA_STATUS_READY,
    FormattingInvariantViolation, ReplyStatus, ResponseFormatter, Source,
};
pub use retrieval::{
    RerankCoordinator, RerankFailure, RerankOutcome, RetrievalFailure, RetrievalOrchestrator,
};
pub use scoring::{
    ConfidenceCalculator, ConfidenceThresholds, ConfidenceTier, EntityRanker, ScoringError,
};
#[cfg(any(test, feature = "mock"))]
pub use services::{MockCompletionService, MockMode, MockRerankService, MockSearchService};
pub use services::{
    Capabilities, CompletionService, CorpusError, GenaiCompletion, HttpRerankClient, HttpSearchClient,
    LexicalReranker, OfflineSearchIndex, RerankService, SearchHit, SearchService, ServiceError,
};
