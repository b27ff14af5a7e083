use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// A formatting bug caught before it reached the caller.
pub enum FormattingInvariantViolation {
    #[error("citation marker [{marker}] does not index any of {evidence_len} evidence entries")]
    CitationOutOfRange { marker: String, evidence_len: usize },
}
