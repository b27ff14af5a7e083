//! JSON-backed lookup tables: synonyms and the ambiguity registry.
//!
//! Both are configuration data. A missing or unreadable file never stops the service; the
//! caller gets an empty synonym table or the built-in registry and a warning in the log.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("ambiguous term '{term}' is invalid: {reason}")]
    InvalidTerm { term: String, reason: String },
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, TableError> {
    let raw = std::fs::read_to_string(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| TableError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, Default)]
/// `term -> [synonym, ...]`, keys stored lower-cased and whitespace-collapsed.
pub struct SynonymTable {
    entries: HashMap<String, Vec<String>>,
}

impl SynonymTable {
    /// Longest phrase (in tokens) looked up in the table.
    pub const MAX_PHRASE_TOKENS: usize = 3;

    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| {
                let key = super::validation::normalize(k.as_ref());
                (key, v.into_iter().map(Into::into).collect())
            })
            .filter(|(k, _): &(String, Vec<String>)| !k.is_empty())
            .collect();
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self, TableError> {
        let raw: HashMap<String, Vec<String>> = read_json(path)?;
        let table = Self::new(raw);
        info!(path = %path.display(), terms = table.len(), "Loaded synonym table");
        Ok(table)
    }

    /// Loads `path` if given, otherwise (or on error) returns an empty table.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        match path.map(Self::from_file) {
            Some(Ok(table)) => table,
            Some(Err(e)) => {
                warn!(error = %e, "Synonym table unavailable, expansion disabled");
                Self::empty()
            }
            None => Self::empty(),
        }
    }

    /// Synonyms for a lower-cased term or phrase.
    pub fn get(&self, phrase: &str) -> Option<&[String]> {
        self.entries.get(phrase).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// One candidate meaning of an ambiguous term.
pub struct ClarificationOption {
    pub id: String,
    pub label: String,
    /// Terms added to the query when this option is chosen.
    pub expansion: String,
}

impl ClarificationOption {
    pub fn new(id: &str, label: &str, expansion: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            expansion: expansion.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AmbiguousTermEntry {
    options: Vec<ClarificationOption>,
    #[serde(default)]
    context_terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmbiguousTerm {
    /// Term as displayed to the user (e.g. `IV`).
    pub display: String,
    /// Lower-cased match key.
    pub key: String,
    pub options: Vec<ClarificationOption>,
    /// Lower-cased words whose presence already disambiguates the term.
    pub context_terms: Vec<String>,
}

impl AmbiguousTerm {
    pub fn new(display: &str, options: Vec<ClarificationOption>, context_terms: &[&str]) -> Self {
        Self {
            display: display.to_string(),
            key: display.trim().to_lowercase(),
            options,
            context_terms: context_terms.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    pub fn option(&self, id: &str) -> Option<&ClarificationOption> {
        self.options.iter().find(|o| o.id == id)
    }

    fn validate(&self) -> Result<(), TableError> {
        let invalid = |reason: &str| TableError::InvalidTerm {
            term: self.display.clone(),
            reason: reason.to_string(),
        };
        if self.key.is_empty() || self.key.contains(char::is_whitespace) {
            return Err(invalid("term must be a single word"));
        }
        if self.options.len() < 2 {
            return Err(invalid("at least two options are required"));
        }
        let ids: HashSet<&str> = self.options.iter().map(|o| o.id.as_str()).collect();
        if ids.len() != self.options.len() {
            return Err(invalid("option ids must be unique"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Registered ambiguous terms, ordered by key.
pub struct AmbiguityRegistry {
    terms: Vec<AmbiguousTerm>,
}

impl Default for AmbiguityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AmbiguityRegistry {
    pub fn new(mut terms: Vec<AmbiguousTerm>) -> Result<Self, TableError> {
        for term in &terms {
            term.validate()?;
        }
        terms.sort_by(|a, b| a.key.cmp(&b.key));
        terms.dedup_by(|a, b| a.key == b.key);
        Ok(Self { terms })
    }

    /// Clinical abbreviations with well-known conflicting meanings.
    pub fn builtin() -> Self {
        let terms = vec![
            AmbiguousTerm::new(
                "IV",
                vec![
                    ClarificationOption::new(
                        "iv-intravenous",
                        "Intravenous (IV) therapy or line",
                        "intravenous infusion",
                    ),
                    ClarificationOption::new(
                        "iv-level-four",
                        "Level/stage/grade IV",
                        "level 4",
                    ),
                ],
                &["line", "catheter", "infusion", "fluids", "pump", "level", "stage", "grade"],
            ),
            AmbiguousTerm::new(
                "MS",
                vec![
                    ClarificationOption::new("ms-morphine", "Morphine sulfate", "morphine sulfate"),
                    ClarificationOption::new(
                        "ms-magnesium",
                        "Magnesium sulfate",
                        "magnesium sulfate",
                    ),
                    ClarificationOption::new(
                        "ms-multiple-sclerosis",
                        "Multiple sclerosis",
                        "multiple sclerosis",
                    ),
                ],
                &["morphine", "magnesium", "sclerosis", "opioid"],
            ),
            AmbiguousTerm::new(
                "PT",
                vec![
                    ClarificationOption::new("pt-patient", "Patient", "patient"),
                    ClarificationOption::new(
                        "pt-physical-therapy",
                        "Physical therapy",
                        "physical therapy",
                    ),
                    ClarificationOption::new(
                        "pt-prothrombin",
                        "Prothrombin time (lab test)",
                        "prothrombin time",
                    ),
                ],
                &["therapy", "rehab", "inr", "coagulation", "lab"],
            ),
        ];
        Self { terms }
    }

    pub fn from_file(path: &Path) -> Result<Self, TableError> {
        // BTreeMap keeps the load order deterministic before sorting.
        let raw: BTreeMap<String, AmbiguousTermEntry> = read_json(path)?;
        let terms = raw
            .into_iter()
            .map(|(display, entry)| AmbiguousTerm {
                key: display.trim().to_lowercase(),
                context_terms: entry
                    .context_terms
                    .iter()
                    .map(|t| t.trim().to_lowercase())
                    .collect(),
                options: entry.options,
                display,
            })
            .collect();
        let registry = Self::new(terms)?;
        info!(path = %path.display(), terms = registry.len(), "Loaded ambiguity registry");
        Ok(registry)
    }

    /// Loads `path` if given, otherwise (or on error) returns [`builtin`](Self::builtin).
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        match path.map(Self::from_file) {
            Some(Ok(registry)) => registry,
            Some(Err(e)) => {
                warn!(error = %e, "Ambiguity registry unavailable, using built-in terms");
                Self::builtin()
            }
            None => Self::builtin(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AmbiguousTerm> {
        self.terms
            .binary_search_by(|t| t.key.as_str().cmp(key))
            .ok()
            .map(|i| &self.terms[i])
    }

    pub fn terms(&self) -> &[AmbiguousTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
