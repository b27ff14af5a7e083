use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::expansion::tokenize;
use super::tables::{AmbiguityRegistry, AmbiguousTerm, ClarificationOption};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Question asking the user which meaning of an ambiguous term they intended.
pub struct ClarificationRequest {
    /// The ambiguous term as displayed (e.g. `IV`).
    pub term: String,
    pub prompt: String,
    /// Candidate meanings in registry order.
    pub options: Vec<ClarificationOption>,
    /// The message that triggered the clarification.
    pub original_query: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// What earlier turns of the session already settled.
pub struct PriorContext {
    /// Keys of terms the user already disambiguated.
    pub resolved_terms: Vec<String>,
    /// Expansions chosen in earlier clarifications.
    pub chosen_expansions: Vec<String>,
}

impl PriorContext {
    pub fn is_empty(&self) -> bool {
        self.resolved_terms.is_empty() && self.chosen_expansions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AmbiguityDecision {
    Proceed,
    Clarify(ClarificationRequest),
}

#[derive(Debug, Clone, Default)]
/// Flags registered ambiguous terms that appear without disambiguating context.
///
/// Pure and deterministic: identical input always yields an identical decision.
pub struct AmbiguityResolver {
    registry: Arc<AmbiguityRegistry>,
}

impl AmbiguityResolver {
    pub fn new(registry: Arc<AmbiguityRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AmbiguityRegistry {
        &self.registry
    }

    /// Checks `normalized` (lower-cased) query text. `raw` is echoed back in the request.
    pub fn resolve(&self, raw: &str, normalized: &str, context: &PriorContext) -> AmbiguityDecision {
        let tokens = tokenize(normalized);

        for token in &tokens {
            let Some(term) = self.registry.get(token) else {
                continue;
            };
            if self.is_disambiguated(term, normalized, &tokens, context) {
                debug!(term = %term.display, "Ambiguous term already disambiguated");
                continue;
            }

            debug!(term = %term.display, options = term.options.len(), "Clarification required");
            return AmbiguityDecision::Clarify(ClarificationRequest {
                term: term.display.clone(),
                prompt: format!(
                    "\"{}\" can mean different things in policy documents. Which did you mean?",
                    term.display
                ),
                options: term.options.clone(),
                original_query: raw.to_string(),
            });
        }

        AmbiguityDecision::Proceed
    }

    fn is_disambiguated(
        &self,
        term: &AmbiguousTerm,
        normalized: &str,
        tokens: &[&str],
        context: &PriorContext,
    ) -> bool {
        if context.resolved_terms.iter().any(|t| t.eq_ignore_ascii_case(&term.key)) {
            return true;
        }
        if tokens.iter().any(|t| term.context_terms.iter().any(|c| c == t)) {
            return true;
        }
        term.options.iter().any(|option| {
            let expansion = option.expansion.to_lowercase();
            contains_phrase(normalized, &expansion)
                || context
                    .chosen_expansions
                    .iter()
                    .any(|chosen| chosen.eq_ignore_ascii_case(&option.expansion))
        })
    }
}

/// Whole-word phrase containment on lower-cased text.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    let phrase_tokens = tokenize(phrase);
    if phrase_tokens.is_empty() {
        return false;
    }
    let text_tokens = tokenize(text);
    text_tokens
        .windows(phrase_tokens.len())
        .any(|window| window == phrase_tokens.as_slice())
}
