use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
/// Errors returned by external service adapters.
pub enum ServiceError {
    /// Connection, DNS, TLS or body-read failure.
    #[error("{service} transport error: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// Non-success HTTP status.
    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Response could not be decoded or violated the boundary contract.
    #[error("{service} returned an invalid response: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },

    /// The adapter has no endpoint/model configured.
    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },
}

impl ServiceError {
    /// Name of the service that produced the error.
    pub fn service(&self) -> &'static str {
        match self {
            ServiceError::Transport { service, .. }
            | ServiceError::Status { service, .. }
            | ServiceError::InvalidResponse { service, .. }
            | ServiceError::NotConfigured { service } => service,
        }
    }

    pub(crate) fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::InvalidResponse {
                service,
                reason: err.to_string(),
            }
        } else {
            ServiceError::Transport {
                service,
                message: err.to_string(),
            }
        }
    }
}
