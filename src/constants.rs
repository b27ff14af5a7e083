//! Cross-cutting, shared defaults.
//!
//! Component configs ([`PipelineConfig`](crate::chat::PipelineConfig),
//! [`ResilienceConfig`](crate::resilience::ResilienceConfig)) start from these values;
//! every one of them can be overridden through `EVIDENTIA_*` environment variables.
//!
//! # Threshold Invariants
//!
//! Confidence thresholds must satisfy `low <= medium <= high`, all within `[0.0, 1.0]`.
//! The rerank cutoff is independent of the confidence tiers: observed deployments used
//! both `0.15` and `0.25`, so neither is treated as authoritative beyond being the default.

pub const DEFAULT_PORT: u16 = 8080;

pub const DEFAULT_TOP_K: usize = 50;
pub const DEFAULT_RERANK_TOP_N: usize = 10;
pub const DEFAULT_RERANK_MIN_SCORE: f32 = 0.25;

pub const DEFAULT_CONFIDENCE_HIGH: f32 = 0.70;
pub const DEFAULT_CONFIDENCE_MEDIUM: f32 = 0.40;
pub const DEFAULT_CONFIDENCE_LOW: f32 = 0.20;

pub const DEFAULT_MAX_QUERY_CHARS: usize = 1_000;
pub const DEFAULT_DISPLAY_EVIDENCE: usize = 5;
pub const DEFAULT_SUMMARY_SENTENCES: usize = 3;
pub const SNIPPET_SENTENCE_MAX_CHARS: usize = 280;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_CACHE_CAPACITY: u64 = 1_000;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_SESSION_CAPACITY: u64 = 10_000;

pub const DEFAULT_BREAKER_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_BREAKER_WINDOW_SECS: u64 = 60;
pub const DEFAULT_BREAKER_COOLDOWN_SECS: u64 = 30;

pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RERANK_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_COMPLETION_TIMEOUT_MS: u64 = 20_000;

pub const DEFAULT_RETRIEVAL_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;

pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 30;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Upper bound on entity filter code length.
pub const MAX_ENTITY_CODE_LEN: usize = 32;

/// Returns `true` if `value` lies within `[0.0, 1.0]`.
#[inline]
pub fn is_unit_interval(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}
