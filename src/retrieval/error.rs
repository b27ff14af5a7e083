use std::time::Duration;

use thiserror::Error;

use crate::resilience::ResilienceError;
use crate::services::ServiceError;

#[derive(Debug, Clone, PartialEq, Error)]
/// The search boundary could not produce results.
pub enum RetrievalFailure {
    /// The search breaker is open; nothing was sent.
    #[error("search is unavailable (retry in {retry_after:?})")]
    Unavailable { retry_after: Duration },

    #[error("search timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("search failed: {0}")]
    Transport(#[source] ServiceError),
}

impl From<ResilienceError> for RetrievalFailure {
    fn from(err: ResilienceError) -> Self {
        match err {
            ResilienceError::CircuitOpen { retry_after, .. } => Self::Unavailable { retry_after },
            ResilienceError::Timeout { after, .. } => Self::Timeout { after },
            ResilienceError::Service { source, .. } => Self::Transport(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
/// Reranking failed; always absorbed by falling back to retrieval order.
pub enum RerankFailure {
    #[error("rerank is unavailable")]
    Unavailable,

    #[error("rerank timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("rerank failed: {0}")]
    Service(#[source] ServiceError),

    #[error("rerank response matched none of the {candidates} candidates")]
    UnmatchedResults { candidates: usize },
}

impl From<ResilienceError> for RerankFailure {
    fn from(err: ResilienceError) -> Self {
        match err {
            ResilienceError::CircuitOpen { .. } => Self::Unavailable,
            ResilienceError::Timeout { after, .. } => Self::Timeout { after },
            ResilienceError::Service { source, .. } => Self::Service(source),
        }
    }
}
