//! Confidence tiers and entity-aware evidence ordering.
//!
//! Both stages are pure functions of the final evidence list:
//!
//! - [`ConfidenceCalculator`] maps scores to a [`ConfidenceTier`]
//! - [`EntityRanker`] orders evidence by score, then entity-filter match, then retrieval index
//!
//! A rerank fallback caps the tier at [`ConfidenceTier::Medium`]; the cap is applied with
//! `min`, so it can only lower a tier.

pub mod confidence;
pub mod error;
pub mod ranker;
pub mod types;


pub use confidence::ConfidenceCalculator;
pub use error::ScoringError;
pub use ranker::EntityRanker;
pub use types::{ConfidenceThresholds, ConfidenceTier};
