use std::time::Duration;

use crate::config::{ConfigError, millis_env, parse_env, secs_env};
use crate::constants::{
    DEFAULT_BREAKER_COOLDOWN_SECS, DEFAULT_BREAKER_FAILURE_THRESHOLD, DEFAULT_BREAKER_WINDOW_SECS,
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECS, DEFAULT_COMPLETION_TIMEOUT_MS,
    DEFAULT_RATE_LIMIT_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_RERANK_TIMEOUT_MS,
    DEFAULT_RETRIEVAL_RETRIES, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_SEARCH_TIMEOUT_MS,
};

use super::breaker::Dependency;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Breaker tuning shared by all dependencies.
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Failures further apart than this restart the count.
    pub window: Duration,
    /// Time spent OPEN before a probe is admitted.
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_BREAKER_FAILURE_THRESHOLD,
            window: Duration::from_secs(DEFAULT_BREAKER_WINDOW_SECS),
            cooldown: Duration::from_secs(DEFAULT_BREAKER_COOLDOWN_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Resilience layer configuration: breakers, timeouts, retries, cache, request budget.
pub struct ResilienceConfig {
    pub breaker: BreakerConfig,
    pub search_timeout: Duration,
    pub rerank_timeout: Duration,
    pub completion_timeout: Duration,
    /// Extra attempts for a failed retrieval while the breaker stays closed.
    pub retrieval_retries: u32,
    pub retry_backoff: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
    /// Requests allowed per client per `rate_limit_window`.
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            breaker: BreakerConfig::default(),
            search_timeout: Duration::from_millis(DEFAULT_SEARCH_TIMEOUT_MS),
            rerank_timeout: Duration::from_millis(DEFAULT_RERANK_TIMEOUT_MS),
            completion_timeout: Duration::from_millis(DEFAULT_COMPLETION_TIMEOUT_MS),
            retrieval_retries: DEFAULT_RETRIEVAL_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            rate_limit_requests: DEFAULT_RATE_LIMIT_REQUESTS,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

impl ResilienceConfig {
    const ENV_BREAKER_FAILURE_THRESHOLD: &'static str = "EVIDENTIA_BREAKER_FAILURE_THRESHOLD";
    const ENV_BREAKER_WINDOW_SECS: &'static str = "EVIDENTIA_BREAKER_WINDOW_SECS";
    const ENV_BREAKER_COOLDOWN_SECS: &'static str = "EVIDENTIA_BREAKER_COOLDOWN_SECS";
    const ENV_SEARCH_TIMEOUT_MS: &'static str = "EVIDENTIA_SEARCH_TIMEOUT_MS";
    const ENV_RERANK_TIMEOUT_MS: &'static str = "EVIDENTIA_RERANK_TIMEOUT_MS";
    const ENV_COMPLETION_TIMEOUT_MS: &'static str = "EVIDENTIA_COMPLETION_TIMEOUT_MS";
    const ENV_RETRIEVAL_RETRIES: &'static str = "EVIDENTIA_RETRIEVAL_RETRIES";
    const ENV_RETRY_BACKOFF_MS: &'static str = "EVIDENTIA_RETRY_BACKOFF_MS";
    const ENV_CACHE_TTL_SECS: &'static str = "EVIDENTIA_CACHE_TTL_SECS";
    const ENV_CACHE_CAPACITY: &'static str = "EVIDENTIA_CACHE_CAPACITY";
    const ENV_RATE_LIMIT_REQUESTS: &'static str = "EVIDENTIA_RATE_LIMIT_REQUESTS";
    const ENV_RATE_LIMIT_WINDOW_SECS: &'static str = "EVIDENTIA_RATE_LIMIT_WINDOW_SECS";

    /// Loads config from environment variables (with defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let breaker = BreakerConfig {
            failure_threshold: parse_env(
                Self::ENV_BREAKER_FAILURE_THRESHOLD,
                defaults.breaker.failure_threshold,
            )?,
            window: secs_env(Self::ENV_BREAKER_WINDOW_SECS, defaults.breaker.window)?,
            cooldown: secs_env(Self::ENV_BREAKER_COOLDOWN_SECS, defaults.breaker.cooldown)?,
        };

        let config = Self {
            breaker,
            search_timeout: millis_env(Self::ENV_SEARCH_TIMEOUT_MS, defaults.search_timeout)?,
            rerank_timeout: millis_env(Self::ENV_RERANK_TIMEOUT_MS, defaults.rerank_timeout)?,
            completion_timeout: millis_env(
                Self::ENV_COMPLETION_TIMEOUT_MS,
                defaults.completion_timeout,
            )?,
            retrieval_retries: parse_env(Self::ENV_RETRIEVAL_RETRIES, defaults.retrieval_retries)?,
            retry_backoff: millis_env(Self::ENV_RETRY_BACKOFF_MS, defaults.retry_backoff)?,
            cache_ttl: secs_env(Self::ENV_CACHE_TTL_SECS, defaults.cache_ttl)?,
            cache_capacity: parse_env(Self::ENV_CACHE_CAPACITY, defaults.cache_capacity)?,
            rate_limit_requests: parse_env(
                Self::ENV_RATE_LIMIT_REQUESTS,
                defaults.rate_limit_requests,
            )?,
            rate_limit_window: secs_env(
                Self::ENV_RATE_LIMIT_WINDOW_SECS,
                defaults.rate_limit_window,
            )?,
        };

        Ok(config)
    }

    /// Timeout applied to each call of `dependency`.
    pub fn timeout_for(&self, dependency: Dependency) -> Duration {
        match dependency {
            Dependency::Search => self.search_timeout,
            Dependency::Rerank => self.rerank_timeout,
            Dependency::Completion => self.completion_timeout,
        }
    }

    pub fn with_breaker(mut self, breaker: BreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_timeouts(mut self, search: Duration, rerank: Duration, completion: Duration) -> Self {
        self.search_timeout = search;
        self.rerank_timeout = rerank;
        self.completion_timeout = completion;
        self
    }

    pub fn with_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.retrieval_retries = retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn with_cache(mut self, ttl: Duration, capacity: u64) -> Self {
        self.cache_ttl = ttl;
        self.cache_capacity = capacity;
        self
    }

    pub fn with_rate_limit(mut self, requests: u32, window: Duration) -> Self {
        self.rate_limit_requests = requests;
        self.rate_limit_window = window;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                Self::ENV_BREAKER_FAILURE_THRESHOLD,
                "0",
                "must be at least 1",
            ));
        }
        for (name, value) in [
            (Self::ENV_BREAKER_COOLDOWN_SECS, self.breaker.cooldown),
            (Self::ENV_SEARCH_TIMEOUT_MS, self.search_timeout),
            (Self::ENV_RERANK_TIMEOUT_MS, self.rerank_timeout),
            (Self::ENV_COMPLETION_TIMEOUT_MS, self.completion_timeout),
            (Self::ENV_CACHE_TTL_SECS, self.cache_ttl),
            (Self::ENV_RATE_LIMIT_WINDOW_SECS, self.rate_limit_window),
        ] {
            if value.is_zero() {
                return Err(ConfigError::invalid(name, "0", "must be greater than zero"));
            }
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::invalid(
                Self::ENV_CACHE_CAPACITY,
                "0",
                "must be greater than zero",
            ));
        }
        if self.rate_limit_requests == 0 {
            return Err(ConfigError::invalid(
                Self::ENV_RATE_LIMIT_REQUESTS,
                "0",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
