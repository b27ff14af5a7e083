//! HTTP gateway (Axum) for the chat pipeline.
//!
//! This module is primarily used by the `evidentia` server binary.

#![allow(missing_docs)]

pub mod error;
pub mod handler;
pub mod payload;
pub mod state;


use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use handler::{chat_handler, clarify_handler};
pub use state::HandlerState;

use evidentia::resilience::{CircuitState, Dependency};
use evidentia::response::{
    EVIDENTIA_STATUS_HEADER, EVIDENTIA_STATUS_HEALTHY, EVIDENTIA_STATUS_NOT_READY,
    EVIDENTIA_STATUS_READY,
};

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/v1/chat", post(chat_handler))
        .route("/v1/chat/clarify", post(clarify_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub circuits: BTreeMap<&'static str, CircuitState>,
    pub cached_responses: u64,
    pub active_sessions: u64,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        EVIDENTIA_STATUS_HEADER,
        HeaderValue::from_static(EVIDENTIA_STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

/// Not ready while the search circuit is open; rerank and completion only degrade answers.
#[tracing::instrument(skip(state))]
pub async fn ready_handler(State(state): State<HandlerState>) -> Response {
    let circuits: BTreeMap<&'static str, CircuitState> = state
        .resilience
        .circuit_states()
        .into_iter()
        .map(|(dep, circuit)| (dep.as_str(), circuit))
        .collect();

    let is_ready = state.resilience.breaker(Dependency::Search).state() != CircuitState::Open;

    let (status_code, status_msg) = if is_ready {
        (StatusCode::OK, EVIDENTIA_STATUS_READY)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, EVIDENTIA_STATUS_NOT_READY)
    };

    let mut headers = HeaderMap::new();
    headers.insert(EVIDENTIA_STATUS_HEADER, HeaderValue::from_static(status_msg));

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            circuits,
            cached_responses: state.resilience.cache().len(),
            active_sessions: state.orchestrator.sessions().len(),
        }),
    )
        .into_response()
}
