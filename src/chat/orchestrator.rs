use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::evidence::EvidenceChunk;
use crate::query::validation::session_id_or_new;
use crate::query::{
    AmbiguityDecision, AmbiguityRegistry, AmbiguityResolver, ClarificationRequest, Query,
    QueryValidator, SynonymTable, TermExpansionEngine, normalize, tokenize,
};
use crate::resilience::{Dependency, ResilienceLayer, ResponseCache};
use crate::response::{ChatResponse, ResponseFormatter};
use crate::retrieval::{RerankCoordinator, RetrievalFailure, RetrievalOrchestrator};
use crate::scoring::{ConfidenceCalculator, EntityRanker};
use crate::services::{Capabilities, CompletionRequest, CompletionService};

use super::config::PipelineConfig;
use super::error::ChatError;
use super::session::{PendingClarification, SessionStore};
use super::state::{PipelineStage, StageTrace};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Outcome of one user message.
pub enum ChatReply {
    Answer(ChatResponse),
    Clarification {
        session_id: String,
        #[serde(flatten)]
        request: ClarificationRequest,
    },
}

impl ChatReply {
    pub fn session_id(&self) -> &str {
        match self {
            ChatReply::Answer(response) => &response.session_id,
            ChatReply::Clarification { session_id, .. } => session_id,
        }
    }

    pub fn as_answer(&self) -> Option<&ChatResponse> {
        match self {
            ChatReply::Answer(response) => Some(response),
            ChatReply::Clarification { .. } => None,
        }
    }
}

/// Composes validation, clarification, retrieval, reranking, ranking and formatting for each
/// message.
///
/// Cheap to share behind an `Arc`; all mutable state lives in the [`ResilienceLayer`] and the
/// session store, both internally synchronized.
pub struct ChatOrchestrator {
    capabilities: Capabilities,
    resilience: Arc<ResilienceLayer>,
    config: PipelineConfig,
    validator: QueryValidator,
    expander: TermExpansionEngine,
    resolver: AmbiguityResolver,
    retrieval: RetrievalOrchestrator,
    reranker: RerankCoordinator,
    calculator: ConfidenceCalculator,
    formatter: ResponseFormatter,
    sessions: SessionStore,
}

impl ChatOrchestrator {
    /// Builds the pipeline with identity expansion and the built-in ambiguity registry.
    pub fn new(
        capabilities: Capabilities,
        resilience: Arc<ResilienceLayer>,
        config: PipelineConfig,
    ) -> Self {
        let mut validator = QueryValidator::new(config.max_query_chars);
        if !config.entity_codes.is_empty() {
            validator = validator.with_catalog(&config.entity_codes);
        }

        Self {
            retrieval: RetrievalOrchestrator::new(
                capabilities.search.clone(),
                resilience.clone(),
                config.top_k,
            ),
            reranker: RerankCoordinator::new(
                capabilities.rerank.clone(),
                resilience.clone(),
                config.rerank_top_n,
                config.rerank_min_score,
            ),
            expander: TermExpansionEngine::identity().with_entity_codes(&config.entity_codes),
            resolver: AmbiguityResolver::default(),
            calculator: ConfidenceCalculator::new(config.thresholds),
            formatter: ResponseFormatter::new(config.display_evidence, config.summary_sentences),
            sessions: SessionStore::new(config.session_ttl, config.session_capacity),
            validator,
            capabilities,
            resilience,
            config,
        }
    }

    pub fn with_synonyms(mut self, synonyms: Arc<SynonymTable>) -> Self {
        self.expander =
            TermExpansionEngine::new(synonyms).with_entity_codes(&self.config.entity_codes);
        self
    }

    pub fn with_registry(mut self, registry: Arc<AmbiguityRegistry>) -> Self {
        self.resolver = AmbiguityResolver::new(registry);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn resilience(&self) -> &Arc<ResilienceLayer> {
        &self.resilience
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Answers `message`, or asks which meaning of an ambiguous term was intended.
    ///
    /// Only validation errors are returned as `Err`; dependency failures become
    /// `unavailable`/`error` responses.
    pub async fn process_message<S: AsRef<str>>(
        &self,
        message: &str,
        session_id: Option<&str>,
        entity_filters: &[S],
    ) -> Result<ChatReply, ChatError> {
        self.process_traced(message, session_id, entity_filters)
            .await
            .map(|(reply, _)| reply)
    }

    /// Generic `error` reply for a request whose pipeline task died before answering.
    ///
    /// Session state is left untouched.
    pub fn failure_response(&self, session_id: Option<&str>) -> ChatResponse {
        self.formatter.failure(&session_id_or_new(session_id))
    }

    /// Applies the chosen option to the pending clarification of `session_id` and answers the
    /// original question.
    ///
    /// An unknown option leaves the clarification pending.
    pub async fn resolve_clarification(
        &self,
        session_id: &str,
        option_id: &str,
    ) -> Result<ChatResponse, ChatError> {
        self.resolve_traced(session_id, option_id)
            .await
            .map(|(response, _)| response)
    }

    #[instrument(skip_all, fields(session_id = session_id.unwrap_or("-"), filters = entity_filters.len()))]
    pub(crate) async fn process_traced<S: AsRef<str>>(
        &self,
        message: &str,
        session_id: Option<&str>,
        entity_filters: &[S],
    ) -> Result<(ChatReply, StageTrace), ChatError> {
        let mut trace = StageTrace::received();
        trace.advance(PipelineStage::Validating);

        let query = match self.validator.validate(message, session_id, entity_filters) {
            Ok(query) => query,
            Err(e) => {
                trace.advance(PipelineStage::Failed);
                info!(error = %e, "Rejected message");
                return Err(e.into());
            }
        };

        // A new message supersedes any outstanding clarification.
        if self.sessions.clear_pending(&query.session_id) {
            debug!(session_id = %query.session_id, "Dropped unanswered clarification");
        }

        let state = self.sessions.get(&query.session_id);
        let tokens = tokenize(&query.normalized);
        let context = state.prior_context(&tokens);

        match self.resolver.resolve(&query.raw, &query.normalized, &context) {
            AmbiguityDecision::Clarify(request) => {
                trace.advance(PipelineStage::Clarifying);
                let session_id = query.session_id.clone();
                self.sessions.set_pending(
                    &session_id,
                    PendingClarification {
                        term_key: normalize(&request.term),
                        request: request.clone(),
                        query,
                    },
                );
                trace.advance(PipelineStage::Done);
                info!(session_id = %session_id, term = %request.term, "Asked for clarification");
                Ok((ChatReply::Clarification { session_id, request }, trace))
            }
            AmbiguityDecision::Proceed => {
                trace.advance(PipelineStage::Expanding);
                let chosen = context.chosen_expansions;
                let response = self.answer(query, &chosen, &mut trace).await;
                Ok((ChatReply::Answer(response), trace))
            }
        }
    }

    #[instrument(skip(self))]
    pub(crate) async fn resolve_traced(
        &self,
        session_id: &str,
        option_id: &str,
    ) -> Result<(ChatResponse, StageTrace), ChatError> {
        let pending =
            self.sessions
                .pending(session_id)
                .ok_or_else(|| ChatError::NoPendingClarification {
                    session_id: session_id.to_string(),
                })?;

        let option = pending
            .request
            .options
            .iter()
            .find(|o| o.id == option_id)
            .cloned()
            .ok_or_else(|| ChatError::UnknownOption {
                option_id: option_id.to_string(),
            })?;

        self.sessions.resolve(session_id, &pending.term_key, &option);
        info!(term = %pending.request.term, option = %option.id, "Clarification resolved");

        let state = self.sessions.get(session_id);
        let chosen = state.expansions_for(&tokenize(&pending.query.normalized));

        let mut trace = StageTrace::resumed();
        let response = self.answer(pending.query, &chosen, &mut trace).await;
        Ok((response, trace))
    }

    /// Runs EXPANDING through DONE (or FAILED). Never fails: dependency errors are folded
    /// into the response.
    async fn answer(
        &self,
        mut query: Query,
        chosen_expansions: &[String],
        trace: &mut StageTrace,
    ) -> ChatResponse {
        query.expanded_terms =
            self.expander
                .expand(&query.raw, &query.entity_filters, chosen_expansions);

        let cache_key = ResponseCache::key(
            &cache_text(&query.normalized, chosen_expansions),
            &query.entity_filters,
        );
        if let Some(cached) = self.resilience.cache().get(&cache_key) {
            trace.advance(PipelineStage::Done);
            debug!(session_id = %query.session_id, "Cache hit");
            return cached.as_cache_hit(&query.session_id);
        }

        trace.advance(PipelineStage::Retrieving);
        let candidates = match self
            .retrieval
            .retrieve(&query.expanded_query(), &query.entity_filters)
            .await
        {
            Ok(candidates) => candidates,
            Err(failure) => {
                trace.advance(PipelineStage::Failed);
                return self.retrieval_failed(&query, &failure);
            }
        };

        trace.advance(PipelineStage::Reranking);
        let ranker = EntityRanker::new(query.entity_filters.iter().cloned());
        let outcome = self.reranker.rerank(&query.raw, candidates, &ranker).await;

        trace.advance(PipelineStage::Ranking);
        let ranked = ranker.rank(outcome.evidence);
        let confidence = self
            .calculator
            .calculate_with_fallback(&ranked, outcome.degraded);

        trace.advance(PipelineStage::Formatting);
        let generated = self.generate_summary(&query, &ranked).await;
        let mut response =
            self.formatter
                .format(&query.session_id, ranked, confidence, generated.as_deref());
        response.degraded = outcome.degraded;

        if response.status.is_cacheable() && !response.degraded {
            self.resilience.cache().insert(cache_key, response.clone());
        }

        trace.advance(PipelineStage::Done);
        info!(
            session_id = %response.session_id,
            evidence = response.evidence.len(),
            confidence = %response.confidence,
            degraded = response.degraded,
            "Answered"
        );
        response
    }

    fn retrieval_failed(&self, query: &Query, failure: &RetrievalFailure) -> ChatResponse {
        match failure {
            RetrievalFailure::Unavailable { retry_after } => {
                warn!(retry_after = ?retry_after, "Search unavailable, circuit open");
                self.formatter.unavailable(&query.session_id)
            }
            other => {
                warn!(error = %other, "Retrieval failed");
                self.formatter.failure(&query.session_id)
            }
        }
    }

    /// Generated summary for the displayed evidence, or `None` to use the extractive one.
    async fn generate_summary(&self, query: &Query, ranked: &[EvidenceChunk]) -> Option<String> {
        let completion: &Arc<dyn CompletionService> = self.capabilities.completion.as_ref()?;
        let displayed = self.formatter.displayed(ranked);
        if displayed.is_empty() {
            return None;
        }

        let request = CompletionRequest {
            prompt: query.raw.clone(),
            context_documents: displayed
                .iter()
                .enumerate()
                .map(|(i, chunk)| render_context(i + 1, chunk))
                .collect(),
        };

        match self
            .resilience
            .call(Dependency::Completion, || completion.complete(&request))
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "Summary generation failed, using extractive summary");
                None
            }
        }
    }
}

impl std::fmt::Debug for ChatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOrchestrator")
            .field("capabilities", &self.capabilities)
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

fn cache_text(normalized: &str, chosen_expansions: &[String]) -> String {
    if chosen_expansions.is_empty() {
        return normalized.to_string();
    }
    normalize(&format!("{normalized} {}", chosen_expansions.join(" ")))
}

fn render_context(marker: usize, chunk: &EvidenceChunk) -> String {
    let citation = &chunk.citation;
    let mut header = format!("[{marker}] {}", citation.title);
    if !citation.reference_number.is_empty() {
        header.push_str(&format!(" ({})", citation.reference_number));
    }
    if let Some(locator) = &chunk.locator {
        header.push_str(&format!(", {locator}"));
    }
    format!("{header}\n{}", chunk.snippet)
}
