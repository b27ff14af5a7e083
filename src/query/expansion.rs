use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::tables::SynonymTable;

/// Splits `text` into words with surrounding punctuation removed.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default)]
/// Expands query terms through a [`SynonymTable`].
///
/// Output order: original terms, then chosen clarification expansions, then synonyms in the
/// order they are found. Duplicates are dropped case-insensitively, keeping the first form.
/// Tokens that are entity codes are kept verbatim and never expanded.
pub struct TermExpansionEngine {
    synonyms: Arc<SynonymTable>,
    entity_codes: HashSet<String>,
}

impl TermExpansionEngine {
    pub fn new(synonyms: Arc<SynonymTable>) -> Self {
        Self {
            synonyms,
            entity_codes: HashSet::new(),
        }
    }

    /// Identity expansion (no synonym table).
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn with_entity_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.entity_codes = codes
            .into_iter()
            .map(|c| c.as_ref().trim().to_uppercase())
            .collect();
        self
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn expand<S: AsRef<str>>(
        &self,
        raw: &str,
        entity_filters: &[S],
        chosen_expansions: &[String],
    ) -> Vec<String> {
        let tokens = tokenize(raw);
        let is_entity = |token: &str| {
            let upper = token.to_uppercase();
            self.entity_codes.contains(&upper)
                || entity_filters
                    .iter()
                    .any(|f| f.as_ref().eq_ignore_ascii_case(&upper))
        };

        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        let mut push = |term: &str| {
            let term = term.trim();
            if !term.is_empty() && seen.insert(term.to_lowercase()) {
                terms.push(term.to_string());
            }
        };

        for token in &tokens {
            push(token);
        }
        for expansion in chosen_expansions {
            push(expansion);
        }

        if !self.synonyms.is_empty() {
            let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
            for start in 0..tokens.len() {
                let longest = SynonymTable::MAX_PHRASE_TOKENS.min(tokens.len() - start);
                for len in (1..=longest).rev() {
                    let window = &tokens[start..start + len];
                    if window.iter().any(|t| is_entity(*t)) {
                        continue;
                    }
                    let phrase = lowered[start..start + len].join(" ");
                    if let Some(synonyms) = self.synonyms.get(&phrase) {
                        for synonym in synonyms {
                            push(synonym);
                        }
                    }
                }
            }
        }

        debug!(
            originals = tokens.len(),
            expanded = terms.len(),
            "Query terms expanded"
        );
        terms
    }
}
