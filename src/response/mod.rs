//! Answer assembly: inline-cited summary, deduplicated sources, display-capped evidence.

pub mod error;
pub mod formatter;
pub mod model;
pub mod status;

#[cfg(test)]
mod tests;

pub use error::FormattingInvariantViolation;
pub use formatter::{
    ERROR_MESSAGE, NO_EVIDENCE_MESSAGE, ResponseFormatter, UNAVAILABLE_MESSAGE, citation_markers,
    sanitize_markers,
};
pub use model::{AnswerStatus, ChatResponse, Source};
pub use status::{
    EVIDENTIA_STATUS_ERROR, EVIDENTIA_STATUS_HEADER, EVIDENTIA_STATUS_HEALTHY,
    EVIDENTIA_STATUS_NOT_READY, EVIDENTIA_STATUS_READY, ReplyStatus,
};
