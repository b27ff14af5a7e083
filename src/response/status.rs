use super::model::{AnswerStatus, ChatResponse};

pub const EVIDENTIA_STATUS_HEADER: &str = "X-Evidentia-Status";
pub const EVIDENTIA_STATUS_HEALTHY: &str = "healthy";
pub const EVIDENTIA_STATUS_READY: &str = "ready";
pub const EVIDENTIA_STATUS_NOT_READY: &str = "not_ready";
pub const EVIDENTIA_STATUS_ERROR: &str = "error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// How a chat reply was produced, reported in [`EVIDENTIA_STATUS_HEADER`].
pub enum ReplyStatus {
    CacheHit,
    Answered,
    Degraded,
    NoEvidence,
    Unavailable,
    Error,
    Clarify,
}

impl ReplyStatus {
    pub fn for_response(response: &ChatResponse) -> Self {
        if response.cache_served {
            return ReplyStatus::CacheHit;
        }
        match response.status {
            AnswerStatus::Answered if response.degraded => ReplyStatus::Degraded,
            AnswerStatus::Answered => ReplyStatus::Answered,
            AnswerStatus::NoEvidence => ReplyStatus::NoEvidence,
            AnswerStatus::Unavailable => ReplyStatus::Unavailable,
            AnswerStatus::Error => ReplyStatus::Error,
        }
    }

    #[inline]
    pub fn as_header_value(&self) -> &'static str {
        match self {
            ReplyStatus::CacheHit => "CACHE_HIT",
            ReplyStatus::Answered => "ANSWERED",
            ReplyStatus::Degraded => "DEGRADED",
            ReplyStatus::NoEvidence => "NO_EVIDENCE",
            ReplyStatus::Unavailable => "UNAVAILABLE",
            ReplyStatus::Error => "ERROR",
            ReplyStatus::Clarify => "CLARIFY",
        }
    }
}

impl std::fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_header_value())
    }
}
