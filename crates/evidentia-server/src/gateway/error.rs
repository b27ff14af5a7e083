use std::time::Duration;

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use evidentia::chat::ChatError;
use evidentia::response::EVIDENTIA_STATUS_HEADER;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("request budget exhausted, retry in {}s", retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            GatewayError::Chat(ChatError::Validation(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_query")
            }
            GatewayError::Chat(err @ ChatError::NoPendingClarification { .. }) => {
                (StatusCode::CONFLICT, err.code())
            }
            GatewayError::Chat(err @ ChatError::UnknownOption { .. }) => {
                (StatusCode::BAD_REQUEST, err.code())
            }
            GatewayError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
        };

        let error = self.to_string();

        let mut headers = HeaderMap::new();
        headers.insert(EVIDENTIA_STATUS_HEADER, HeaderValue::from_static(code));
        if let GatewayError::RateLimited { retry_after } = &self {
            headers.insert(RETRY_AFTER, HeaderValue::from(retry_after.as_secs().max(1)));
        }

        (status, headers, Json(ErrorResponse { error, code })).into_response()
    }
}
