use thiserror::Error;

use crate::query::ValidationError;

#[derive(Debug, Clone, PartialEq, Error)]
/// Errors surfaced to the caller of the chat pipeline.
///
/// Dependency failures never appear here; they become degraded responses.
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("session '{session_id}' has no pending clarification")]
    NoPendingClarification { session_id: String },

    #[error("unknown clarification option '{option_id}'")]
    UnknownOption { option_id: String },
}

impl ChatError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "invalid_query",
            ChatError::NoPendingClarification { .. } => "no_pending_clarification",
            ChatError::UnknownOption { .. } => "unknown_option",
        }
    }
}
