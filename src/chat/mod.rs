//! The per-request chat pipeline.
//!
//! [`ChatOrchestrator`] runs each message through the stages in [`state`], stopping early to
//! ask a [`ClarificationRequest`](crate::query::ClarificationRequest) when an ambiguous term
//! needs disambiguation. The answer to a clarification resumes the original query at the
//! expansion stage with the chosen meaning applied.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod state;


pub use config::PipelineConfig;
pub use error::ChatError;
pub use orchestrator::{ChatOrchestrator, ChatReply};
pub use session::{PendingClarification, ResolvedTerm, SessionState, SessionStore};
pub use state::{PipelineStage, StageTrace};
