use chrono::Utc;
use tracing::error;

use crate::constants::{DEFAULT_DISPLAY_EVIDENCE, DEFAULT_SUMMARY_SENTENCES, SNIPPET_SENTENCE_MAX_CHARS};
use crate::evidence::EvidenceChunk;
use crate::scoring::ConfidenceTier;

use super::error::FormattingInvariantViolation;
use super::model::{AnswerStatus, ChatResponse, Source};

pub const NO_EVIDENCE_MESSAGE: &str = "I could not find policy evidence for that question. \
Try rephrasing it or widening the entity filters.";
pub const UNAVAILABLE_MESSAGE: &str = "The policy search service is temporarily unavailable. \
Please try again in a moment.";
pub const ERROR_MESSAGE: &str = "Something went wrong while answering that question. \
Please try again.";

#[derive(Debug, Clone, Copy)]
/// Builds [`ChatResponse`]s from ranked evidence.
pub struct ResponseFormatter {
    display_limit: usize,
    summary_sentences: usize,
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_EVIDENCE, DEFAULT_SUMMARY_SENTENCES)
    }
}

impl ResponseFormatter {
    pub fn new(display_limit: usize, summary_sentences: usize) -> Self {
        Self {
            display_limit: display_limit.max(1),
            summary_sentences: summary_sentences.max(1),
        }
    }

    pub fn display_limit(&self) -> usize {
        self.display_limit
    }

    /// Evidence that will be displayed (and is therefore citable) from a ranked list.
    pub fn displayed<'a>(&self, evidence: &'a [EvidenceChunk]) -> &'a [EvidenceChunk] {
        &evidence[..evidence.len().min(self.display_limit)]
    }

    /// Assembles the answer.
    ///
    /// `generated_summary` is used when present, after stripping markers that do not index the
    /// displayed evidence; otherwise an extractive summary is built. Empty evidence always
    /// yields a `no_evidence` response.
    pub fn format(
        &self,
        session_id: &str,
        mut evidence: Vec<EvidenceChunk>,
        confidence: ConfidenceTier,
        generated_summary: Option<&str>,
    ) -> ChatResponse {
        if evidence.is_empty() {
            return self.no_evidence(session_id);
        }

        evidence.truncate(self.display_limit);

        let summary = match generated_summary.map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => {
                let (clean, violations) = sanitize_markers(text, evidence.len());
                for violation in &violations {
                    error!(error = %violation, "Dropped citation marker from generated summary");
                }
                if has_marker(&clean) {
                    clean
                } else {
                    // Nothing citable survived; keep the answer grounded.
                    self.extractive_summary(&evidence)
                }
            }
            None => self.extractive_summary(&evidence),
        };

        let sources = collect_sources(&evidence);

        ChatResponse {
            summary,
            sources,
            found: true,
            confidence,
            evidence,
            status: AnswerStatus::Answered,
            cache_served: false,
            degraded: false,
            session_id: session_id.to_string(),
            generated_at: Utc::now(),
        }
    }

    pub fn no_evidence(&self, session_id: &str) -> ChatResponse {
        ChatResponse::empty(AnswerStatus::NoEvidence, NO_EVIDENCE_MESSAGE, session_id)
    }

    pub fn unavailable(&self, session_id: &str) -> ChatResponse {
        ChatResponse::empty(AnswerStatus::Unavailable, UNAVAILABLE_MESSAGE, session_id)
    }

    pub fn failure(&self, session_id: &str) -> ChatResponse {
        ChatResponse::empty(AnswerStatus::Error, ERROR_MESSAGE, session_id)
    }

    /// First sentence of each of the top evidence entries, each followed by its marker.
    pub fn extractive_summary(&self, evidence: &[EvidenceChunk]) -> String {
        evidence
            .iter()
            .take(self.summary_sentences)
            .enumerate()
            .filter_map(|(i, chunk)| {
                let sentence = first_sentence(&chunk.snippet);
                (!sentence.is_empty()).then(|| format!("{sentence} [{}]", i + 1))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Removes `[n]` markers with `n` outside `1..=evidence_len`.
///
/// Returns the cleaned text and one violation per removed marker.
pub fn sanitize_markers(
    text: &str,
    evidence_len: usize,
) -> (String, Vec<FormattingInvariantViolation>) {
    let mut out = String::with_capacity(text.len());
    let mut violations = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let digits = tail.bytes().take_while(u8::is_ascii_digit).count();

        if digits > 0 && tail[digits..].starts_with(']') {
            let marker = &tail[..digits];
            let in_range = marker
                .parse::<usize>()
                .is_ok_and(|n| (1..=evidence_len).contains(&n));
            if in_range {
                out.push('[');
                out.push_str(marker);
                out.push(']');
            } else {
                let trimmed = out.trim_end().len();
                out.truncate(trimmed);
                violations.push(FormattingInvariantViolation::CitationOutOfRange {
                    marker: marker.to_string(),
                    evidence_len,
                });
            }
            rest = &tail[digits + 1..];
        } else {
            out.push('[');
            rest = tail;
        }
    }
    out.push_str(rest);

    (out, violations)
}

/// All `[n]` marker values in `text`, in order of appearance.
pub fn citation_markers(text: &str) -> Vec<usize> {
    let mut markers = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let tail = &rest[open + 1..];
        let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && tail[digits..].starts_with(']') {
            if let Ok(n) = tail[..digits].parse() {
                markers.push(n);
            }
            rest = &tail[digits + 1..];
        } else {
            rest = tail;
        }
    }
    markers
}

fn has_marker(text: &str) -> bool {
    !citation_markers(text).is_empty()
}

fn collect_sources(evidence: &[EvidenceChunk]) -> Vec<Source> {
    let mut sources: Vec<Source> = Vec::new();
    for (i, chunk) in evidence.iter().enumerate() {
        let key = chunk.source_key();
        match sources.iter_mut().find(|s| s.reference_number == key) {
            Some(source) => source.evidence_indices.push(i + 1),
            None => sources.push(Source {
                reference_number: key.to_string(),
                title: chunk.citation.title.clone(),
                source_file: chunk.citation.source_file.clone(),
                citation: chunk.citation.citation.clone(),
                evidence_indices: vec![i + 1],
            }),
        }
    }
    sources
}

fn first_sentence(snippet: &str) -> String {
    let text = snippet.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut end = text.len();
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
            if at_boundary {
                end = i + c.len_utf8();
                break;
            }
        }
    }
    let sentence = &text[..end];

    if sentence.chars().count() <= SNIPPET_SENTENCE_MAX_CHARS {
        return sentence.to_string();
    }
    let mut clipped: String = sentence.chars().take(SNIPPET_SENTENCE_MAX_CHARS).collect();
    if let Some(space) = clipped.rfind(' ') {
        clipped.truncate(space);
    }
    clipped.push_str("...");
    clipped
}
