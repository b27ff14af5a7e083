//! Retrieval and rerank stages.
//!
//! [`RetrievalOrchestrator`] makes the (retried, breaker-guarded) search call;
//! [`RerankCoordinator`] merges cross-encoder scores onto the candidates, applies the
//! `min_score` / `top_n` cutoffs, and falls back to retrieval order when reranking fails.

pub mod error;
pub mod orchestrator;
pub mod rerank;

#[cfg(test)]
mod tests;

pub use error::{RerankFailure, RetrievalFailure};
pub use orchestrator::RetrievalOrchestrator;
pub use rerank::{RerankCoordinator, RerankOutcome};
