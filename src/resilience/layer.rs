use std::future::Future;

use tracing::{debug, warn};

use crate::services::ServiceError;

use super::breaker::{CircuitBreaker, CircuitState, Dependency};
use super::budget::RequestBudget;
use super::cache::ResponseCache;
use super::config::ResilienceConfig;
use super::error::ResilienceError;

/// Process-wide cache, breakers and request budget.
///
/// Internally synchronized; share one instance behind an `Arc`.
pub struct ResilienceLayer {
    config: ResilienceConfig,
    cache: ResponseCache,
    search: CircuitBreaker,
    rerank: CircuitBreaker,
    completion: CircuitBreaker,
    budget: RequestBudget,
}

impl ResilienceLayer {
    pub fn new(config: ResilienceConfig) -> Self {
        Self {
            cache: ResponseCache::new(config.cache_ttl, config.cache_capacity),
            search: CircuitBreaker::new(Dependency::Search, config.breaker.clone()),
            rerank: CircuitBreaker::new(Dependency::Rerank, config.breaker.clone()),
            completion: CircuitBreaker::new(Dependency::Completion, config.breaker.clone()),
            budget: RequestBudget::new(config.rate_limit_requests, config.rate_limit_window),
            config,
        }
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn budget(&self) -> &RequestBudget {
        &self.budget
    }

    pub fn breaker(&self, dependency: Dependency) -> &CircuitBreaker {
        match dependency {
            Dependency::Search => &self.search,
            Dependency::Rerank => &self.rerank,
            Dependency::Completion => &self.completion,
        }
    }

    pub fn circuit_states(&self) -> Vec<(Dependency, CircuitState)> {
        Dependency::ALL
            .iter()
            .map(|&dep| (dep, self.breaker(dep).state()))
            .collect()
    }

    /// Runs one call to `dependency` behind its breaker and timeout.
    ///
    /// A timeout counts as a failure exactly like a transport error. When the breaker is
    /// open, `op` is never invoked.
    pub async fn call<T, F, Fut>(&self, dependency: Dependency, op: F) -> Result<T, ResilienceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let permit = self.breaker(dependency).acquire().map_err(|open| {
            debug!(dependency = %dependency, "Failing fast, circuit open");
            ResilienceError::CircuitOpen {
                dependency,
                retry_after: open.retry_after,
            }
        })?;

        let after = self.config.timeout_for(dependency);
        match tokio::time::timeout(after, op()).await {
            Ok(Ok(value)) => {
                permit.succeed();
                Ok(value)
            }
            Ok(Err(source)) => {
                permit.fail();
                warn!(dependency = %dependency, error = %source, "Dependency call failed");
                Err(ResilienceError::Service { dependency, source })
            }
            Err(_) => {
                permit.fail();
                warn!(
                    dependency = %dependency,
                    timeout_ms = after.as_millis() as u64,
                    "Dependency call timed out"
                );
                Err(ResilienceError::Timeout { dependency, after })
            }
        }
    }

    /// Like [`call`](Self::call), retrying failed attempts up to `retries` times with the
    /// configured backoff. An open breaker ends the loop immediately.
    pub async fn call_with_retry<T, F, Fut>(
        &self,
        dependency: Dependency,
        retries: u32,
        mut op: F,
    ) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempt = 0;
        loop {
            match self.call(dependency, &mut op).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_circuit_open() || attempt >= retries => return Err(err),
                Err(err) => {
                    attempt += 1;
                    debug!(
                        dependency = %dependency,
                        attempt,
                        error = %err,
                        "Retrying dependency call"
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
            }
        }
    }
}

impl std::fmt::Debug for ResilienceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilienceLayer")
            .field("cache", &self.cache)
            .field("search", &self.search)
            .field("rerank", &self.rerank)
            .field("completion", &self.completion)
            .finish()
    }
}
