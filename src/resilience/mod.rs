//! Cache, per-dependency circuit breakers, timeouts and the per-client request budget.
//!
//! Every outbound call goes through [`ResilienceLayer::call`] (or
//! [`ResilienceLayer::call_with_retry`]); the layer is injected into the pipeline rather than
//! held in globals.

pub mod breaker;
pub mod budget;
pub mod cache;
pub mod config;
pub mod error;
pub mod layer;


pub use breaker::{
    BreakerOpen, CallPermit, CircuitBreaker, CircuitSnapshot, CircuitState, Dependency,
};
pub use budget::{BudgetExceeded, RequestBudget};
pub use cache::ResponseCache;
pub use config::{BreakerConfig, ResilienceConfig};
pub use error::ResilienceError;
pub use layer::ResilienceLayer;
