use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::task::JoinError;
use tracing::{debug, error, instrument};

use evidentia::chat::ChatReply;
use evidentia::hashing::hash_client_id;
use evidentia::response::{EVIDENTIA_STATUS_HEADER, ReplyStatus};

use crate::gateway::error::GatewayError;
use crate::gateway::payload::{ChatRequestBody, ClarifyRequestBody};
use crate::gateway::state::HandlerState;

pub const CLIENT_ID_HEADER: &str = "X-Client-Id";
const ANONYMOUS_CLIENT: &str = "anonymous";

#[instrument(skip(state, headers, body), fields(session_id = tracing::field::Empty))]
pub async fn chat_handler(
    State(state): State<HandlerState>,
    headers: HeaderMap,
    Json(body): Json<ChatRequestBody>,
) -> Result<Response, GatewayError> {
    check_budget(&state, &headers)?;
    if let Some(session_id) = &body.session_id {
        tracing::Span::current().record("session_id", tracing::field::display(session_id));
    }

    let session_id = body.session_id.clone();
    let orchestrator = state.orchestrator.clone();
    let joined = tokio::spawn(async move {
        orchestrator
            .process_message(&body.message, body.session_id.as_deref(), &body.entity_filters)
            .await
    })
    .await;
    let reply = match joined {
        Ok(result) => result?,
        Err(e) => return Ok(task_failed(&state, session_id.as_deref(), &e)),
    };

    let status = match &reply {
        ChatReply::Answer(response) => ReplyStatus::for_response(response),
        ChatReply::Clarification { .. } => ReplyStatus::Clarify,
    };
    debug!(status = %status, session_id = reply.session_id(), "Chat reply ready");
    Ok(make_response(&reply, status))
}

#[instrument(skip(state, headers, body), fields(session_id = %body.session_id, option_id = %body.option_id))]
pub async fn clarify_handler(
    State(state): State<HandlerState>,
    headers: HeaderMap,
    Json(body): Json<ClarifyRequestBody>,
) -> Result<Response, GatewayError> {
    check_budget(&state, &headers)?;
    if body.session_id.trim().is_empty() || body.option_id.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "session_id and option_id are required".to_string(),
        ));
    }

    let session_id = body.session_id.clone();
    let orchestrator = state.orchestrator.clone();
    let joined = tokio::spawn(async move {
        orchestrator
            .resolve_clarification(&body.session_id, &body.option_id)
            .await
    })
    .await;
    let response = match joined {
        Ok(result) => result?,
        Err(e) => return Ok(task_failed(&state, Some(&session_id), &e)),
    };

    let status = ReplyStatus::for_response(&response);
    Ok(make_response(&ChatReply::Answer(response), status))
}

/// A pipeline task that panicked or was cancelled still gets the generic `error` reply.
pub(crate) fn task_failed(
    state: &HandlerState,
    session_id: Option<&str>,
    e: &JoinError,
) -> Response {
    error!(error = %e, "Chat task failed");
    let response = state.orchestrator.failure_response(session_id);
    make_response(&ChatReply::Answer(response), ReplyStatus::Error)
}

/// Charges one request to the caller's budget.
pub(crate) fn check_budget(state: &HandlerState, headers: &HeaderMap) -> Result<(), GatewayError> {
    let client = client_identity(headers);
    state
        .resilience
        .budget()
        .check(hash_client_id(&client))
        .map_err(|exceeded| {
            debug!(retry_after_ms = exceeded.retry_after.as_millis() as u64, "Rate limited");
            GatewayError::RateLimited {
                retry_after: exceeded.retry_after,
            }
        })
}

/// `X-Client-Id`, else the bearer token, else a shared anonymous bucket.
pub(crate) fn client_identity(headers: &HeaderMap) -> String {
    let explicit = headers
        .get(CLIENT_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(id) = explicit {
        return id.to_string();
    }

    headers
        .get("Authorization")
        .and_then(|val| val.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string()
}

pub(crate) fn make_response(reply: &ChatReply, status: ReplyStatus) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        EVIDENTIA_STATUS_HEADER,
        HeaderValue::from_static(status.as_header_value()),
    );
    (StatusCode::OK, headers, Json(reply)).into_response()
}
