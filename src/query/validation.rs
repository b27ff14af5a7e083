use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::constants::{DEFAULT_MAX_QUERY_CHARS, MAX_ENTITY_CODE_LEN};

/// Longest accepted caller-supplied session id.
const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Rejections raised before the pipeline starts.
pub enum ValidationError {
    #[error("message is empty")]
    Empty,

    #[error("message is {chars} characters long; the limit is {max}")]
    TooLong { chars: usize, max: usize },

    #[error("message is malformed: {reason}")]
    Malformed { reason: String },

    #[error("entity filter '{code}' is not a valid entity code")]
    InvalidEntity { code: String },

    #[error("entity filter '{code}' is not a known entity")]
    UnknownEntity { code: String },

    #[error("session id is invalid")]
    InvalidSessionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A validated user question.
pub struct Query {
    /// Trimmed input as typed.
    pub raw: String,
    /// Whitespace-collapsed, lower-cased text.
    pub normalized: String,
    /// Ordered, case-insensitively deduplicated terms (filled by expansion).
    pub expanded_terms: Vec<String>,
    /// Upper-cased, deduplicated entity codes.
    pub entity_filters: Vec<String>,
    pub session_id: String,
}

impl Query {
    /// Expanded terms joined for the search boundary (falls back to the raw text).
    pub fn expanded_query(&self) -> String {
        if self.expanded_terms.is_empty() {
            self.raw.clone()
        } else {
            self.expanded_terms.join(" ")
        }
    }
}

/// Whitespace-collapsed, lower-cased form of `text`.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct QueryValidator {
    max_chars: usize,
    catalog: Option<HashSet<String>>,
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUERY_CHARS)
    }
}

impl QueryValidator {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            catalog: None,
        }
    }

    /// Restricts filters to a known set of entity codes. An empty catalog allows any
    /// well-formed code.
    pub fn with_catalog<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let catalog: HashSet<String> = codes
            .into_iter()
            .map(|c| c.as_ref().trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        self.catalog = (!catalog.is_empty()).then_some(catalog);
        self
    }

    pub fn catalog(&self) -> Option<&HashSet<String>> {
        self.catalog.as_ref()
    }

    pub fn validate<S: AsRef<str>>(
        &self,
        message: &str,
        session_id: Option<&str>,
        entity_filters: &[S],
    ) -> Result<Query, ValidationError> {
        let raw = message.trim();
        if raw.is_empty() {
            return Err(ValidationError::Empty);
        }

        let chars = raw.chars().count();
        if chars > self.max_chars {
            return Err(ValidationError::TooLong {
                chars,
                max: self.max_chars,
            });
        }

        if let Some(c) = raw.chars().find(|c| c.is_control() && !c.is_whitespace()) {
            return Err(ValidationError::Malformed {
                reason: format!("contains control character U+{:04X}", c as u32),
            });
        }

        let entity_filters = self.validate_filters(entity_filters)?;
        let session_id = resolve_session_id(session_id)?;

        Ok(Query {
            raw: raw.to_string(),
            normalized: normalize(raw),
            expanded_terms: Vec::new(),
            entity_filters,
            session_id,
        })
    }

    /// Trims, upper-cases and deduplicates filters (first occurrence wins).
    pub fn validate_filters<S: AsRef<str>>(
        &self,
        filters: &[S],
    ) -> Result<Vec<String>, ValidationError> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(filters.len());

        for filter in filters {
            let code = filter.as_ref().trim().to_uppercase();
            if !is_entity_code(&code) {
                return Err(ValidationError::InvalidEntity { code });
            }
            if let Some(catalog) = &self.catalog
                && !catalog.contains(&code)
            {
                return Err(ValidationError::UnknownEntity { code });
            }
            if seen.insert(code.clone()) {
                out.push(code);
            }
        }

        Ok(out)
    }
}

/// `[A-Z0-9_-]{1,32}`
fn is_entity_code(code: &str) -> bool {
    (1..=MAX_ENTITY_CODE_LEN).contains(&code.len())
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

/// The caller's session id when it is well formed, else a fresh one.
pub(crate) fn session_id_or_new(session_id: Option<&str>) -> String {
    resolve_session_id(session_id).unwrap_or_else(|_| Uuid::new_v4().to_string())
}

fn resolve_session_id(session_id: Option<&str>) -> Result<String, ValidationError> {
    match session_id.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Uuid::new_v4().to_string()),
        Some(id)
            if id.len() <= MAX_SESSION_ID_LEN
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')) =>
        {
            Ok(id.to_string())
        }
        Some(_) => Err(ValidationError::InvalidSessionId),
    }
}
