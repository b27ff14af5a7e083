use std::time::Duration;

use thiserror::Error;

use crate::services::ServiceError;

use super::breaker::Dependency;

#[derive(Debug, Clone, PartialEq, Error)]
/// Outcome of a guarded call that did not produce a value.
pub enum ResilienceError {
    /// Rejected by the breaker; the dependency was not contacted.
    #[error("{dependency} circuit is open (retry in {retry_after:?})")]
    CircuitOpen {
        dependency: Dependency,
        retry_after: Duration,
    },

    #[error("{dependency} call timed out after {after:?}")]
    Timeout {
        dependency: Dependency,
        after: Duration,
    },

    #[error("{dependency} call failed: {source}")]
    Service {
        dependency: Dependency,
        #[source]
        source: ServiceError,
    },
}

impl ResilienceError {
    pub fn dependency(&self) -> Dependency {
        match self {
            ResilienceError::CircuitOpen { dependency, .. }
            | ResilienceError::Timeout { dependency, .. }
            | ResilienceError::Service { dependency, .. } => *dependency,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }
}
