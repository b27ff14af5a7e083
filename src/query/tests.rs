use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use super::*;

const NO_FILTERS: [&str; 0] = [];

fn synonyms() -> Arc<SynonymTable> {
    Arc::new(SynonymTable::new([
        ("fall", vec!["falls", "fall risk"]),
        ("hand hygiene", vec!["handwashing", "hand washing"]),
        ("id", vec!["identification"]),
        ("rumc", vec!["university medical center"]),
    ]))
}

#[test]
fn test_normalize_collapses_and_lowercases() {
    assert_eq!(normalize("  What IS\tthe\n Policy? "), "what is the policy?");
}

#[test]
fn test_validate_rejects_empty_and_whitespace() {
    let validator = QueryValidator::default();
    assert_eq!(
        validator.validate("", None, &NO_FILTERS),
        Err(ValidationError::Empty)
    );
    assert_eq!(
        validator.validate("   \n\t", None, &NO_FILTERS),
        Err(ValidationError::Empty)
    );
}

#[test]
fn test_validate_rejects_over_length() {
    let validator = QueryValidator::new(10);
    assert!(validator.validate("0123456789", None, &NO_FILTERS).is_ok());
    assert_eq!(
        validator.validate("01234567890", None, &NO_FILTERS),
        Err(ValidationError::TooLong { chars: 11, max: 10 })
    );
    // Limit counts characters, not bytes.
    assert!(validator.validate("éééééééééé", None, &NO_FILTERS).is_ok());
}

#[test]
fn test_validate_rejects_control_characters() {
    let validator = QueryValidator::default();
    assert!(matches!(
        validator.validate("hand\u{0007} hygiene", None, &NO_FILTERS),
        Err(ValidationError::Malformed { .. })
    ));
    assert!(validator.validate("hand\nhygiene", None, &NO_FILTERS).is_ok());
}

#[test]
fn test_validate_normalizes_filters() {
    let validator = QueryValidator::default();
    let query = validator
        .validate("fall risk", None, &[" rumc", "RMG", "RUMC "])
        .unwrap();
    assert_eq!(query.entity_filters, vec!["RUMC", "RMG"]);
}

#[test]
fn test_validate_rejects_bad_filters() {
    let validator = QueryValidator::default();
    assert!(matches!(
        validator.validate("q", None, &["RU MC"]),
        Err(ValidationError::InvalidEntity { .. })
    ));
    assert!(matches!(
        validator.validate("q", None, &[""]),
        Err(ValidationError::InvalidEntity { .. })
    ));

    let restricted = QueryValidator::default().with_catalog(["RUMC", "RMG"]);
    assert_eq!(
        restricted.validate("q", None, &["RCH"]),
        Err(ValidationError::UnknownEntity {
            code: "RCH".into()
        })
    );
    assert!(restricted.validate("q", None, &["rmg"]).is_ok());
}

#[test]
fn test_session_id_generated_or_kept() {
    let validator = QueryValidator::default();

    let generated = validator.validate("q", None, &NO_FILTERS).unwrap();
    assert!(uuid::Uuid::parse_str(&generated.session_id).is_ok());

    let kept = validator
        .validate("q", Some("session-42"), &NO_FILTERS)
        .unwrap();
    assert_eq!(kept.session_id, "session-42");

    assert_eq!(
        validator.validate("q", Some("bad id!"), &NO_FILTERS),
        Err(ValidationError::InvalidSessionId)
    );
}

#[test]
fn test_tokenize_strips_punctuation() {
    assert_eq!(
        tokenize("What's the (IV) policy?"),
        vec!["What's", "the", "IV", "policy"]
    );
}

#[test]
fn test_expansion_originals_first_then_synonyms() {
    let engine = TermExpansionEngine::new(synonyms());
    let terms = engine.expand("Fall ID policy", &NO_FILTERS, &[]);
    assert_eq!(
        terms,
        vec!["Fall", "ID", "policy", "falls", "fall risk", "identification"]
    );
}

#[test]
fn test_expansion_matches_phrases() {
    let engine = TermExpansionEngine::new(synonyms());
    let terms = engine.expand("hand hygiene audit", &NO_FILTERS, &[]);
    assert!(terms.contains(&"handwashing".to_string()));
    assert!(terms.contains(&"hand washing".to_string()));
}

#[test]
fn test_expansion_dedups_case_insensitively() {
    let engine = TermExpansionEngine::new(synonyms());
    let terms = engine.expand("fall FALLS", &NO_FILTERS, &[]);
    assert_eq!(terms, vec!["fall", "FALLS", "fall risk"]);
}

#[test]
fn test_expansion_preserves_entity_codes() {
    let engine = TermExpansionEngine::new(synonyms()).with_entity_codes(["RUMC"]);
    let terms = engine.expand("RUMC fall", &NO_FILTERS, &[]);
    assert_eq!(terms[0], "RUMC");
    assert!(!terms.contains(&"university medical center".to_string()));

    // Filters protect codes even without a catalog.
    let engine = TermExpansionEngine::new(synonyms());
    let terms = engine.expand("rumc", &["RUMC"], &[]);
    assert_eq!(terms, vec!["rumc"]);
}

#[test]
fn test_expansion_includes_chosen_expansions_before_synonyms() {
    let engine = TermExpansionEngine::new(synonyms());
    let terms = engine.expand("IV fall", &NO_FILTERS, &["intravenous infusion".to_string()]);
    assert_eq!(
        terms,
        vec!["IV", "fall", "intravenous infusion", "falls", "fall risk"]
    );
}

#[test]
fn test_identity_expansion_without_table() {
    let engine = TermExpansionEngine::identity();
    assert_eq!(
        engine.expand("fall risk", &NO_FILTERS, &[]),
        vec!["fall", "risk"]
    );
}

#[test]
fn test_synonym_table_missing_file_is_non_fatal() {
    let table = SynonymTable::load_or_empty(Some(std::path::Path::new("/nonexistent/syn.json")));
    assert!(table.is_empty());
}

#[test]
fn test_synonym_table_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(br#"{"Fall  Risk": ["falls"], "id": ["identification"]}"#)
        .unwrap();

    let table = SynonymTable::from_file(file.path()).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.get("fall risk"), Some(&["falls".to_string()][..]));
}

#[test]
fn test_builtin_registry_has_multi_option_terms() {
    let registry = AmbiguityRegistry::builtin();
    for key in ["iv", "pt", "ms"] {
        let term = registry.get(key).unwrap();
        assert!(term.options.len() >= 2, "{key}");
    }
}

#[test]
fn test_registry_from_file_and_validation() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        br#"{"CA": {"options": [
            {"id": "ca-cancer", "label": "Cancer", "expansion": "cancer"},
            {"id": "ca-calcium", "label": "Calcium", "expansion": "calcium"}
        ], "context_terms": ["Oncology"]}}"#,
    )
    .unwrap();
    let registry = AmbiguityRegistry::from_file(file.path()).unwrap();
    let term = registry.get("ca").unwrap();
    assert_eq!(term.display, "CA");
    assert_eq!(term.context_terms, vec!["oncology"]);

    let mut single = NamedTempFile::new().unwrap();
    single
        .write_all(br#"{"CA": {"options": [{"id": "a", "label": "A", "expansion": "a"}]}}"#)
        .unwrap();
    assert!(matches!(
        AmbiguityRegistry::from_file(single.path()),
        Err(TableError::InvalidTerm { .. })
    ));
    assert_eq!(
        AmbiguityRegistry::load_or_builtin(Some(single.path())),
        AmbiguityRegistry::builtin()
    );
}

#[test]
fn test_ambiguous_term_triggers_clarification() {
    let resolver = AmbiguityResolver::default();
    let decision = resolver.resolve("IV", "iv", &PriorContext::default());

    let AmbiguityDecision::Clarify(request) = decision else {
        panic!("expected clarification");
    };
    assert_eq!(request.term, "IV");
    assert!(request.options.len() >= 2);
    assert_eq!(request.original_query, "IV");
}

#[test]
fn test_resolver_is_idempotent() {
    let resolver = AmbiguityResolver::default();
    let first = resolver.resolve("PT policy", "pt policy", &PriorContext::default());
    let second = resolver.resolve("PT policy", "pt policy", &PriorContext::default());
    assert_eq!(first, second);
}

#[test]
fn test_context_terms_disambiguate() {
    let resolver = AmbiguityResolver::default();
    assert_eq!(
        resolver.resolve("IV line care", "iv line care", &PriorContext::default()),
        AmbiguityDecision::Proceed
    );
    assert_eq!(
        resolver.resolve(
            "MS morphine sulfate dosing",
            "ms morphine sulfate dosing",
            &PriorContext::default()
        ),
        AmbiguityDecision::Proceed
    );
}

#[test]
fn test_prior_choice_does_not_retrigger() {
    let resolver = AmbiguityResolver::default();

    let resolved = PriorContext {
        resolved_terms: vec!["iv".into()],
        chosen_expansions: vec![],
    };
    assert_eq!(
        resolver.resolve("IV", "iv", &resolved),
        AmbiguityDecision::Proceed
    );

    let chosen = PriorContext {
        resolved_terms: vec![],
        chosen_expansions: vec!["intravenous infusion".into()],
    };
    assert_eq!(
        resolver.resolve("IV", "iv", &chosen),
        AmbiguityDecision::Proceed
    );
}

#[test]
fn test_unregistered_terms_proceed() {
    let resolver = AmbiguityResolver::default();
    assert_eq!(
        resolver.resolve(
            "What is the policy for patient identification?",
            "what is the policy for patient identification?",
            &PriorContext::default()
        ),
        AmbiguityDecision::Proceed
    );
}

#[test]
fn test_substring_does_not_trigger() {
    let resolver = AmbiguityResolver::default();
    // "ivory" and "optimal" contain registered terms only as substrings.
    assert_eq!(
        resolver.resolve("ivory optimal", "ivory optimal", &PriorContext::default()),
        AmbiguityDecision::Proceed
    );
}
