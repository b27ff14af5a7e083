//! Per-request pipeline stages.
//!
//! ```text
//! RECEIVED -> VALIDATING -> CLARIFYING -> DONE
//!                        -> EXPANDING  -> DONE (cache hit)
//!                                      -> RETRIEVING -> RERANKING -> RANKING -> FORMATTING -> DONE
//! any stage -> FAILED
//! ```
//!
//! A clarification answer resumes at EXPANDING. A failed rerank still moves RERANKING ->
//! RANKING, carrying retrieval order.

use serde::Serialize;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Received,
    Validating,
    Clarifying,
    Expanding,
    Retrieving,
    Reranking,
    Ranking,
    Formatting,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    pub fn can_transition_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;

        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Received, Validating)
                | (Validating, Clarifying)
                | (Validating, Expanding)
                | (Clarifying, Done)
                | (Expanding, Retrieving)
                | (Expanding, Done)
                | (Retrieving, Reranking)
                | (Reranking, Ranking)
                | (Ranking, Formatting)
                | (Formatting, Done)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The stages one request has passed through.
pub struct StageTrace {
    stages: Vec<PipelineStage>,
}

impl StageTrace {
    /// A new message, starting at RECEIVED.
    pub fn received() -> Self {
        Self {
            stages: vec![PipelineStage::Received],
        }
    }

    /// A clarification answer, resuming at EXPANDING.
    pub fn resumed() -> Self {
        Self {
            stages: vec![PipelineStage::Expanding],
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.stages
            .last()
            .copied()
            .unwrap_or(PipelineStage::Received)
    }

    pub fn advance(&mut self, next: PipelineStage) {
        let current = self.current();
        debug_assert!(
            current.can_transition_to(next),
            "illegal pipeline transition {current:?} -> {next:?}"
        );
        trace!(from = ?current, to = ?next, "Pipeline stage");
        self.stages.push(next);
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<PipelineStage> {
        self.stages
    }
}
