use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatRequest};
use tracing::debug;

use super::CompletionService;
use super::error::ServiceError;
use super::types::CompletionRequest;

const COMPLETION_SERVICE: &str = "completion";

const SYSTEM_PREAMBLE: &str = "You answer questions about institutional policy using only the \
numbered context documents below. Cite every claim with the bracketed number of the document \
it came from, e.g. [1]. Never cite a number that is not listed. If the documents do not answer \
the question, say so.";

#[derive(Clone)]
/// Summary generation through any `genai`-supported chat model.
pub struct GenaiCompletion {
    client: Client,
    model: String,
}

impl GenaiCompletion {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(request: &CompletionRequest) -> ChatRequest {
        let mut system = String::from(SYSTEM_PREAMBLE);
        system.push_str("\n\n");
        system.push_str(&request.context_documents.join("\n\n"));

        ChatRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(request.prompt.clone()),
        ])
    }
}

impl std::fmt::Debug for GenaiCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiCompletion")
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl CompletionService for GenaiCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        debug!(
            model = %self.model,
            documents = request.context_documents.len(),
            "Requesting summary completion"
        );

        let chat_req = Self::build_request(request);
        let resp = self
            .client
            .exec_chat(&self.model, chat_req, None)
            .await
            .map_err(|e| ServiceError::Transport {
                service: COMPLETION_SERVICE,
                message: e.to_string(),
            })?;

        let text = resp.first_text().unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return Err(ServiceError::InvalidResponse {
                service: COMPLETION_SERVICE,
                reason: "empty completion".to_string(),
            });
        }
        Ok(text)
    }
}
