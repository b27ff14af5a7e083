//! Query intake: validation, term expansion and ambiguity detection.
//!
//! - [`QueryValidator`] rejects empty, over-long or malformed input before the pipeline runs
//! - [`TermExpansionEngine`] appends synonyms from a [`SynonymTable`]
//! - [`AmbiguityResolver`] asks for clarification when a registered term is ambiguous

pub mod ambiguity;
pub mod expansion;
pub mod tables;
pub mod validation;

#[cfg(test)]
mod tests;

pub use ambiguity::{AmbiguityDecision, AmbiguityResolver, ClarificationRequest, PriorContext};
pub use expansion::{TermExpansionEngine, tokenize};
pub use tables::{
    AmbiguityRegistry, AmbiguousTerm, ClarificationOption, SynonymTable, TableError,
};
pub use validation::{Query, QueryValidator, ValidationError, normalize};
