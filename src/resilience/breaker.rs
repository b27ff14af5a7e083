//! Per-dependency circuit breaker.
//!
//! ```text
//! CLOSED --(threshold consecutive failures within window)--> OPEN
//! OPEN   --(cooldown elapsed, next call becomes the probe)--> HALF_OPEN
//! HALF_OPEN --(probe succeeds)--> CLOSED
//! HALF_OPEN --(probe fails or is abandoned)--> OPEN (cooldown restarts)
//! ```
//!
//! No other transition is ever taken. Time comes from `tokio::time::Instant` so tests can
//! drive cooldowns with a paused clock.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::BreakerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// External dependencies guarded by the resilience layer.
pub enum Dependency {
    Search,
    Rerank,
    Completion,
}

impl Dependency {
    pub const ALL: [Dependency; 3] = [Dependency::Search, Dependency::Rerank, Dependency::Completion];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dependency::Search => "search",
            Dependency::Rerank => "rerank",
            Dependency::Completion => "completion",
        }
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    fn can_transition_to(self, next: CircuitState) -> bool {
        matches!(
            (self, next),
            (CircuitState::Closed, CircuitState::Open)
                | (CircuitState::Open, CircuitState::HalfOpen)
                | (CircuitState::HalfOpen, CircuitState::Closed)
                | (CircuitState::HalfOpen, CircuitState::Open)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Point-in-time view of a breaker.
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Returned when the breaker rejects a call without contacting the dependency.
pub struct BreakerOpen {
    pub dependency: Dependency,
    /// Time left until a probe is allowed (zero while a probe is in flight).
    pub retry_after: Duration,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    first_failure_at: Option<Instant>,
    last_failure_at: Option<Instant>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            first_failure_at: None,
            last_failure_at: None,
            opened_at: None,
            probe_in_flight: false,
        }
    }
}

/// Circuit breaker for one dependency. Internally synchronized; share by reference.
pub struct CircuitBreaker {
    dependency: Dependency,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(dependency: Dependency, config: BreakerConfig) -> Self {
        Self {
            dependency,
            config,
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn dependency(&self) -> Dependency {
        self.dependency
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.inner.lock();
        CircuitSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_failure_at: inner.last_failure_at,
        }
    }

    /// Asks permission to call the dependency.
    ///
    /// While OPEN, the first call after the cooldown moves the breaker to HALF_OPEN and
    /// becomes the single probe; every other call fails fast until the probe settles.
    pub fn acquire(&self) -> Result<CallPermit<'_>, BreakerOpen> {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        match inner.state {
            CircuitState::Closed => Ok(CallPermit::new(self, false)),
            CircuitState::Open => {
                let opened_at = inner.opened_at.unwrap_or(now);
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed >= self.config.cooldown {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.probe_in_flight = true;
                    debug!(dependency = %self.dependency, "Cooldown elapsed, admitting probe");
                    Ok(CallPermit::new(self, true))
                } else {
                    Err(BreakerOpen {
                        dependency: self.dependency,
                        retry_after: self.config.cooldown - elapsed,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(BreakerOpen {
                        dependency: self.dependency,
                        retry_after: Duration::ZERO,
                    })
                } else {
                    inner.probe_in_flight = true;
                    Ok(CallPermit::new(self, true))
                }
            }
        }
    }

    fn on_success(&self, probe: bool) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen if probe => {
                inner.probe_in_flight = false;
                inner.consecutive_failures = 0;
                inner.first_failure_at = None;
                inner.opened_at = None;
                self.transition(&mut inner, CircuitState::Closed);
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                inner.first_failure_at = None;
            }
            // A call admitted before the breaker opened finished late; it proves nothing
            // about the dependency's current health.
            _ => {}
        }
    }

    fn on_failure(&self, probe: bool) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        inner.last_failure_at = Some(now);

        match inner.state {
            CircuitState::HalfOpen if probe => {
                inner.probe_in_flight = false;
                inner.opened_at = Some(now);
                self.transition(&mut inner, CircuitState::Open);
            }
            CircuitState::Closed => {
                let window_expired = inner
                    .first_failure_at
                    .is_some_and(|first| now.saturating_duration_since(first) > self.config.window);
                if window_expired {
                    inner.consecutive_failures = 0;
                    inner.first_failure_at = None;
                }

                inner.consecutive_failures += 1;
                inner.first_failure_at.get_or_insert(now);

                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.opened_at = Some(now);
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            _ => {}
        }
    }

    fn transition(&self, inner: &mut Inner, next: CircuitState) {
        debug_assert!(
            inner.state.can_transition_to(next),
            "illegal breaker transition {:?} -> {:?}",
            inner.state,
            next
        );
        if !inner.state.can_transition_to(next) {
            return;
        }

        let previous = inner.state;
        inner.state = next;
        match next {
            CircuitState::Open => warn!(
                dependency = %self.dependency,
                from = ?previous,
                failures = inner.consecutive_failures,
                cooldown_ms = self.config.cooldown.as_millis() as u64,
                "Circuit opened"
            ),
            CircuitState::Closed => info!(dependency = %self.dependency, "Circuit closed"),
            CircuitState::HalfOpen => info!(dependency = %self.dependency, "Circuit half-open"),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("dependency", &self.dependency)
            .field("state", &self.state())
            .finish()
    }
}

/// Permission to make one call. Settle it with [`succeed`](Self::succeed) or
/// [`fail`](Self::fail); dropping an unsettled probe counts as a failed probe.
#[must_use = "a permit must be settled with succeed() or fail()"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    /// Returns `true` if this call is the HALF_OPEN probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn succeed(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe);
    }

    pub fn fail(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.probe);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.on_failure(true);
        }
    }
}
