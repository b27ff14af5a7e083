use std::time::Duration;

use crate::config::{ConfigError, parse_env, secs_env};
use crate::constants::{
    DEFAULT_DISPLAY_EVIDENCE, DEFAULT_MAX_QUERY_CHARS, DEFAULT_RERANK_MIN_SCORE,
    DEFAULT_RERANK_TOP_N, DEFAULT_SESSION_CAPACITY, DEFAULT_SESSION_TTL_SECS,
    DEFAULT_SUMMARY_SENTENCES, DEFAULT_TOP_K, is_unit_interval,
};
use crate::scoring::{ConfidenceThresholds, ScoringError};

#[derive(Debug, Clone, PartialEq)]
/// Tuning of the query pipeline.
pub struct PipelineConfig {
    /// Results requested from search.
    pub top_k: usize,
    /// Results kept after reranking.
    pub rerank_top_n: usize,
    /// Minimum cross-encoder score to keep a chunk.
    pub rerank_min_score: f32,
    pub thresholds: ConfidenceThresholds,
    pub max_query_chars: usize,
    /// Evidence entries shown (and citable) in a response.
    pub display_evidence: usize,
    /// Sentences in an extractive summary.
    pub summary_sentences: usize,
    pub session_ttl: Duration,
    pub session_capacity: u64,
    /// Known entity codes; empty accepts any well-formed code.
    pub entity_codes: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            rerank_top_n: DEFAULT_RERANK_TOP_N,
            rerank_min_score: DEFAULT_RERANK_MIN_SCORE,
            thresholds: ConfidenceThresholds::default(),
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
            display_evidence: DEFAULT_DISPLAY_EVIDENCE,
            summary_sentences: DEFAULT_SUMMARY_SENTENCES,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            session_capacity: DEFAULT_SESSION_CAPACITY,
            entity_codes: Vec::new(),
        }
    }
}

impl PipelineConfig {
    const ENV_TOP_K: &'static str = "EVIDENTIA_TOP_K";
    const ENV_RERANK_TOP_N: &'static str = "EVIDENTIA_RERANK_TOP_N";
    const ENV_RERANK_MIN_SCORE: &'static str = "EVIDENTIA_RERANK_MIN_SCORE";
    const ENV_CONFIDENCE_HIGH: &'static str = "EVIDENTIA_CONFIDENCE_HIGH";
    const ENV_CONFIDENCE_MEDIUM: &'static str = "EVIDENTIA_CONFIDENCE_MEDIUM";
    const ENV_CONFIDENCE_LOW: &'static str = "EVIDENTIA_CONFIDENCE_LOW";
    const ENV_MAX_QUERY_CHARS: &'static str = "EVIDENTIA_MAX_QUERY_CHARS";
    const ENV_DISPLAY_EVIDENCE: &'static str = "EVIDENTIA_DISPLAY_EVIDENCE";
    const ENV_SUMMARY_SENTENCES: &'static str = "EVIDENTIA_SUMMARY_SENTENCES";
    const ENV_SESSION_TTL_SECS: &'static str = "EVIDENTIA_SESSION_TTL_SECS";
    const ENV_ENTITY_CODES: &'static str = "EVIDENTIA_ENTITY_CODES";

    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let thresholds = ConfidenceThresholds {
            high: parse_env(Self::ENV_CONFIDENCE_HIGH, defaults.thresholds.high)?,
            medium: parse_env(Self::ENV_CONFIDENCE_MEDIUM, defaults.thresholds.medium)?,
            low: parse_env(Self::ENV_CONFIDENCE_LOW, defaults.thresholds.low)?,
        };

        let entity_codes = std::env::var(Self::ENV_ENTITY_CODES)
            .map(|raw| {
                raw.split(',')
                    .map(|code| code.trim().to_uppercase())
                    .filter(|code| !code.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            top_k: parse_env(Self::ENV_TOP_K, defaults.top_k)?,
            rerank_top_n: parse_env(Self::ENV_RERANK_TOP_N, defaults.rerank_top_n)?,
            rerank_min_score: parse_env(Self::ENV_RERANK_MIN_SCORE, defaults.rerank_min_score)?,
            thresholds,
            max_query_chars: parse_env(Self::ENV_MAX_QUERY_CHARS, defaults.max_query_chars)?,
            display_evidence: parse_env(Self::ENV_DISPLAY_EVIDENCE, defaults.display_evidence)?,
            summary_sentences: parse_env(Self::ENV_SUMMARY_SENTENCES, defaults.summary_sentences)?,
            session_ttl: secs_env(Self::ENV_SESSION_TTL_SECS, defaults.session_ttl)?,
            session_capacity: defaults.session_capacity,
            entity_codes,
        })
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_rerank(mut self, top_n: usize, min_score: f32) -> Self {
        self.rerank_top_n = top_n;
        self.rerank_min_score = min_score;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ConfidenceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_display(mut self, display_evidence: usize, summary_sentences: usize) -> Self {
        self.display_evidence = display_evidence;
        self.summary_sentences = summary_sentences;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_entity_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            (Self::ENV_TOP_K, self.top_k),
            (Self::ENV_RERANK_TOP_N, self.rerank_top_n),
            (Self::ENV_MAX_QUERY_CHARS, self.max_query_chars),
            (Self::ENV_DISPLAY_EVIDENCE, self.display_evidence),
            (Self::ENV_SUMMARY_SENTENCES, self.summary_sentences),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(name, "0", "must be at least 1"));
            }
        }
        if self.rerank_top_n > self.top_k {
            return Err(ConfigError::invalid(
                Self::ENV_RERANK_TOP_N,
                self.rerank_top_n.to_string(),
                format!("must not exceed top_k ({})", self.top_k),
            ));
        }
        if !is_unit_interval(self.rerank_min_score) {
            return Err(ConfigError::invalid(
                Self::ENV_RERANK_MIN_SCORE,
                self.rerank_min_score.to_string(),
                "must be within [0, 1]",
            ));
        }
        if self.session_ttl.is_zero() {
            return Err(ConfigError::invalid(
                Self::ENV_SESSION_TTL_SECS,
                "0",
                "must be greater than zero",
            ));
        }

        self.thresholds.validate().map_err(|e| match e {
            ScoringError::OutOfRange { name, value } => ConfigError::invalid(
                match name {
                    "high" => Self::ENV_CONFIDENCE_HIGH,
                    "medium" => Self::ENV_CONFIDENCE_MEDIUM,
                    _ => Self::ENV_CONFIDENCE_LOW,
                },
                value.to_string(),
                "must be within [0, 1]",
            ),
            ScoringError::Unordered { low, medium, high } => {
                ConfigError::ThresholdOrder { low, medium, high }
            }
        })
    }
}
