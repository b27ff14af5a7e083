use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Search boundary request.
pub struct SearchRequest {
    /// Expanded query terms joined by single spaces.
    pub expanded_query: String,
    /// Entity codes restricting the result set (empty = unrestricted).
    pub entity_filters: Vec<String>,
    pub top_k: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One search hit as returned by the index.
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub score: f32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub reference_number: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub citation: String,
    #[serde(default)]
    pub applies_to: Vec<String>,
    #[serde(default)]
    pub source_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl SearchHit {
    /// Minimal hit, mostly for tests and offline corpora.
    pub fn new(id: impl Into<String>, content: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score,
            title: String::new(),
            reference_number: String::new(),
            section: String::new(),
            citation: String::new(),
            applies_to: Vec::new(),
            source_file: String::new(),
            document_id: None,
            page: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_reference(mut self, reference_number: impl Into<String>) -> Self {
        self.reference_number = reference_number.into();
        self
    }

    pub fn with_applies_to<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.applies_to = entities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = source_file.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankDocument {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Rerank boundary request.
pub struct RerankRequest {
    pub query: String,
    pub documents: Vec<RerankDocument>,
    pub top_n: usize,
    pub min_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    pub id: String,
    pub relevance_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Completion boundary request.
pub struct CompletionRequest {
    pub prompt: String,
    /// Numbered context passages, already rendered as `[n] ...`.
    pub context_documents: Vec<String>,
}
