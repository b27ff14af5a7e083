use super::*;
use crate::evidence::EvidenceChunk;
use crate::scoring::ConfidenceTier;
use crate::services::SearchHit;

fn chunk(id: &str, reference: &str, snippet: &str) -> EvidenceChunk {
    let hit = SearchHit::new(id, snippet, 0.5)
        .with_title(format!("Title {reference}"))
        .with_reference(reference);
    EvidenceChunk::from_hit(hit, 0)
}

fn evidence(n: usize) -> Vec<EvidenceChunk> {
    (0..n)
        .map(|i| {
            chunk(
                &format!("c{i}"),
                &format!("REF-{i}"),
                &format!("Sentence number {i} applies. Second sentence."),
            )
        })
        .collect()
}

#[test]
fn test_empty_evidence_is_not_found() {
    let formatter = ResponseFormatter::default();
    let response = formatter.format("s1", vec![], ConfidenceTier::High, Some("text [1]"));

    assert!(!response.found);
    assert_eq!(response.status, AnswerStatus::NoEvidence);
    assert_eq!(response.confidence, ConfidenceTier::Low);
    assert!(response.evidence.is_empty());
    assert!(citation_markers(&response.summary).is_empty());
}

#[test]
fn test_extractive_summary_cites_top_entries() {
    let formatter = ResponseFormatter::new(5, 2);
    let response = formatter.format("s1", evidence(3), ConfidenceTier::Medium, None);

    assert!(response.found);
    assert_eq!(response.status, AnswerStatus::Answered);
    assert_eq!(
        response.summary,
        "Sentence number 0 applies. [1] Sentence number 1 applies. [2]"
    );
}

#[test]
fn test_evidence_is_display_capped() {
    let formatter = ResponseFormatter::new(2, 5);
    let response = formatter.format("s1", evidence(4), ConfidenceTier::Medium, None);

    assert_eq!(response.evidence.len(), 2);
    assert!(
        citation_markers(&response.summary)
            .iter()
            .all(|&m| (1..=2).contains(&m))
    );
}

#[test]
fn test_generated_summary_out_of_range_markers_stripped() {
    let formatter = ResponseFormatter::new(2, 3);
    let response = formatter.format(
        "s1",
        evidence(3),
        ConfidenceTier::Medium,
        Some("Use two identifiers [1]. Wristbands are checked [3]. See also [0]."),
    );

    assert_eq!(
        response.summary,
        "Use two identifiers [1]. Wristbands are checked. See also."
    );
}

#[test]
fn test_generated_summary_without_valid_markers_falls_back() {
    let formatter = ResponseFormatter::new(5, 1);
    let response = formatter.format(
        "s1",
        evidence(1),
        ConfidenceTier::Medium,
        Some("Unsupported claim [7]."),
    );

    assert_eq!(response.summary, "Sentence number 0 applies. [1]");
}

#[test]
fn test_sanitize_markers_reports_violations() {
    let (clean, violations) = sanitize_markers("a [1] b [2] c [99999999999999999999999]", 1);
    assert_eq!(clean, "a [1] b c");
    assert_eq!(violations.len(), 2);
    assert!(matches!(
        &violations[0],
        FormattingInvariantViolation::CitationOutOfRange { marker, evidence_len: 1 } if marker == "2"
    ));
}

#[test]
fn test_sanitize_markers_leaves_other_brackets() {
    let (clean, violations) = sanitize_markers("see [note] and [1", 3);
    assert_eq!(clean, "see [note] and [1");
    assert!(violations.is_empty());
}

#[test]
fn test_sources_deduplicated_by_reference() {
    let formatter = ResponseFormatter::default();
    let evidence = vec![
        chunk("a", "NUR-101", "First. More."),
        chunk("b", "IC-200", "Second."),
        chunk("c", "NUR-101", "Third."),
    ];
    let response = formatter.format("s1", evidence, ConfidenceTier::High, None);

    assert_eq!(response.sources.len(), 2);
    assert_eq!(response.sources[0].reference_number, "NUR-101");
    assert_eq!(response.sources[0].evidence_indices, vec![1, 3]);
    assert_eq!(response.sources[1].reference_number, "IC-200");
}

#[test]
fn test_long_first_sentence_is_clipped() {
    let formatter = ResponseFormatter::default();
    let long = "word ".repeat(200);
    let response = formatter.format("s1", vec![chunk("a", "R", &long)], ConfidenceTier::Low, None);

    assert!(response.summary.ends_with("... [1]"));
    assert!(response.summary.chars().count() < 300);
}

#[test]
fn test_degraded_responses_are_not_cacheable() {
    assert!(AnswerStatus::Answered.is_cacheable());
    assert!(AnswerStatus::NoEvidence.is_cacheable());
    assert!(!AnswerStatus::Unavailable.is_cacheable());
    assert!(!AnswerStatus::Error.is_cacheable());
}

#[test]
fn test_cache_hit_copy_rewrites_session() {
    let formatter = ResponseFormatter::default();
    let original = formatter.format("s1", evidence(2), ConfidenceTier::High, None);
    let hit = original.as_cache_hit("s2");

    assert!(hit.cache_served);
    assert_eq!(hit.session_id, "s2");
    assert_eq!(hit.evidence, original.evidence);
}

#[test]
fn test_unavailable_message() {
    let response = ResponseFormatter::default().unavailable("s1");
    assert_eq!(response.status, AnswerStatus::Unavailable);
    assert!(!response.found);
    assert_eq!(response.summary, UNAVAILABLE_MESSAGE);
}

#[test]
fn test_reply_status_header_values() {
    let formatter = ResponseFormatter::default();
    let mut answered = formatter.format("s1", evidence(1), ConfidenceTier::Medium, None);
    assert_eq!(ReplyStatus::for_response(&answered), ReplyStatus::Answered);

    answered.degraded = true;
    assert_eq!(ReplyStatus::for_response(&answered).as_header_value(), "DEGRADED");

    let hit = formatter
        .format("s1", evidence(1), ConfidenceTier::Medium, None)
        .as_cache_hit("s2");
    assert_eq!(ReplyStatus::for_response(&hit), ReplyStatus::CacheHit);
    assert_eq!(
        ReplyStatus::for_response(&formatter.unavailable("s1")).to_string(),
        "UNAVAILABLE"
    );
}
