use std::sync::Arc;

use tracing::{info, warn};

use evidentia::chat::ChatOrchestrator;
use evidentia::config::Config;
use evidentia::query::{AmbiguityRegistry, SynonymTable};
use evidentia::resilience::ResilienceLayer;
use evidentia::services::{
    Capabilities, CompletionService, CorpusError, GenaiCompletion, HttpRerankClient,
    HttpSearchClient, LexicalReranker, OfflineSearchIndex, RerankService, SearchService,
};

#[derive(Clone)]
pub struct HandlerState {
    pub orchestrator: Arc<ChatOrchestrator>,

    pub resilience: Arc<ResilienceLayer>,
}

impl HandlerState {
    pub fn new(orchestrator: Arc<ChatOrchestrator>) -> Self {
        Self {
            resilience: orchestrator.resilience().clone(),
            orchestrator,
        }
    }

    /// Wires adapters, data tables and the pipeline from `config`.
    pub fn from_config(config: &Config) -> Result<Self, CorpusError> {
        let capabilities = build_capabilities(config)?;
        let resilience = Arc::new(ResilienceLayer::new(config.resilience.clone()));

        let synonyms = Arc::new(SynonymTable::load_or_empty(config.synonyms_path.as_deref()));
        let registry = Arc::new(AmbiguityRegistry::load_or_builtin(
            config.ambiguity_path.as_deref(),
        ));
        info!(
            synonyms = synonyms.len(),
            ambiguous_terms = registry.len(),
            "Loaded query tables"
        );

        let orchestrator = ChatOrchestrator::new(capabilities, resilience, config.pipeline.clone())
            .with_synonyms(synonyms)
            .with_registry(registry);

        Ok(Self::new(Arc::new(orchestrator)))
    }
}

/// Picks HTTP adapters when endpoints are configured, offline ones otherwise.
pub fn build_capabilities(config: &Config) -> Result<Capabilities, CorpusError> {
    let search: Arc<dyn SearchService> = match (&config.search_url, config.mock_services) {
        (Some(url), false) => {
            let client = HttpSearchClient::new(url.clone(), config.search_index.clone())
                .with_api_key(config.search_api_key.clone());
            info!(url = %client.url(), "Using HTTP search");
            Arc::new(client)
        }
        _ => match &config.corpus_path {
            Some(path) => Arc::new(OfflineSearchIndex::from_file(path)?),
            None => {
                warn!("No search endpoint or corpus configured, every answer will be empty");
                Arc::new(OfflineSearchIndex::default())
            }
        },
    };

    let rerank: Arc<dyn RerankService> = match (&config.rerank_url, config.mock_services) {
        (Some(url), false) => {
            let client =
                HttpRerankClient::new(url.clone()).with_api_key(config.rerank_api_key.clone());
            info!(url = %client.url(), "Using HTTP rerank");
            Arc::new(client)
        }
        _ => {
            info!("Using lexical reranker");
            Arc::new(LexicalReranker)
        }
    };

    let mut capabilities = Capabilities::new(search, rerank);
    match (&config.completion_model, config.mock_services) {
        (Some(model), false) => {
            info!(model = %model, "Summaries generated by completion model");
            let completion: Arc<dyn CompletionService> = Arc::new(GenaiCompletion::new(model));
            capabilities = capabilities.with_completion(completion);
        }
        _ => info!("Summaries are extractive"),
    }
    Ok(capabilities)
}
