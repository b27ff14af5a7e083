use super::*;
use serial_test::serial;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_evidentia_env() {
    let vars: Vec<String> = env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with("EVIDENTIA_"))
        .collect();
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for key in vars {
        unsafe { env::remove_var(key) };
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.port, 8080);
    assert_eq!(
        config.bind_addr,
        IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1))
    );
    assert!(config.search_url.is_none());
    assert!(config.rerank_url.is_none());
    assert!(config.completion_model.is_none());
    assert_eq!(config.search_index, "policies");
    assert!(!config.mock_services);
}

#[test]
fn test_socket_addr() {
    let config = Config::default();
    assert_eq!(config.socket_addr(), "127.0.0.1:8080");

    let config = Config {
        port: 3000,
        bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        ..Default::default()
    };
    assert_eq!(config.socket_addr(), "0.0.0.0:3000");
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_evidentia_env();

    let config = Config::from_env().expect("should parse with defaults");

    assert_eq!(config.port, 8080);
    assert_eq!(config.pipeline, PipelineConfig::default());
    assert_eq!(config.resilience, ResilienceConfig::default());
}

#[test]
#[serial]
fn test_from_env_ipv6_bind_addr() {
    clear_evidentia_env();

    with_env_vars(&[("EVIDENTIA_BIND_ADDR", "::1")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(
            config.bind_addr,
            IpAddr::V6(std::net::Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
    });
}

#[test]
#[serial]
fn test_from_env_service_endpoints() {
    clear_evidentia_env();

    with_env_vars(
        &[
            ("EVIDENTIA_SEARCH_URL", "https://search.internal"),
            ("EVIDENTIA_SEARCH_API_KEY", "s3cret"),
            ("EVIDENTIA_SEARCH_INDEX", "hospital-policies"),
            ("EVIDENTIA_RERANK_URL", "https://rerank.internal"),
            ("EVIDENTIA_COMPLETION_MODEL", "gpt-4o-mini"),
            ("EVIDENTIA_MOCK_SERVICES", "yes"),
        ],
        || {
            let config = Config::from_env().expect("should parse");

            assert_eq!(config.search_url.as_deref(), Some("https://search.internal"));
            assert_eq!(config.search_api_key.as_deref(), Some("s3cret"));
            assert_eq!(config.search_index, "hospital-policies");
            assert_eq!(config.rerank_url.as_deref(), Some("https://rerank.internal"));
            assert!(config.rerank_api_key.is_none());
            assert_eq!(config.completion_model.as_deref(), Some("gpt-4o-mini"));
            assert!(config.mock_services);
        },
    );
}

#[test]
#[serial]
fn test_from_env_blank_values_are_unset() {
    clear_evidentia_env();

    with_env_vars(
        &[("EVIDENTIA_SEARCH_URL", "   "), ("EVIDENTIA_TOP_K", "")],
        || {
            let config = Config::from_env().expect("should parse");
            assert!(config.search_url.is_none());
            assert_eq!(config.pipeline.top_k, PipelineConfig::default().top_k);
        },
    );
}

#[test]
#[serial]
fn test_from_env_pipeline_overrides() {
    clear_evidentia_env();

    with_env_vars(
        &[
            ("EVIDENTIA_TOP_K", "20"),
            ("EVIDENTIA_RERANK_MIN_SCORE", "0.15"),
            ("EVIDENTIA_CONFIDENCE_HIGH", "0.8"),
            ("EVIDENTIA_SESSION_TTL_SECS", "120"),
            ("EVIDENTIA_ENTITY_CODES", "rumc, mhs ,"),
            ("EVIDENTIA_SEARCH_TIMEOUT_MS", "750"),
        ],
        || {
            let config = Config::from_env().expect("should parse");

            assert_eq!(config.pipeline.top_k, 20);
            assert_eq!(config.pipeline.rerank_min_score, 0.15);
            assert_eq!(config.pipeline.thresholds.high, 0.8);
            assert_eq!(config.pipeline.session_ttl, Duration::from_secs(120));
            assert_eq!(config.pipeline.entity_codes, vec!["RUMC", "MHS"]);
            assert_eq!(config.resilience.search_timeout, Duration::from_millis(750));
        },
    );
}

#[test]
#[serial]
fn test_invalid_port_zero() {
    clear_evidentia_env();

    with_env_vars(&[("EVIDENTIA_PORT", "0")], || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
        assert!(err.to_string().contains("invalid port"));
    });
}

#[test]
#[serial]
fn test_invalid_port_not_number() {
    clear_evidentia_env();

    with_env_vars(&[("EVIDENTIA_PORT", "not_a_port")], || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::PortParseError { .. }));
        assert!(err.to_string().contains("failed to parse port"));
    });
}

#[test]
#[serial]
fn test_invalid_bind_addr() {
    clear_evidentia_env();

    with_env_vars(&[("EVIDENTIA_BIND_ADDR", "not.an.ip.address")], || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    });
}

#[test]
#[serial]
fn test_invalid_numeric_value_is_an_error() {
    clear_evidentia_env();

    with_env_vars(&[("EVIDENTIA_RERANK_TOP_N", "ten")], || {
        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue { name, value, .. } => {
                assert_eq!(name, "EVIDENTIA_RERANK_TOP_N");
                assert_eq!(value, "ten");
            }
            other => panic!("unexpected error: {other}"),
        }
    });
}

#[test]
#[serial]
fn test_invalid_boolean_is_an_error() {
    clear_evidentia_env();

    with_env_vars(&[("EVIDENTIA_MOCK_SERVICES", "maybe")], || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue { .. })
        ));
    });
}

#[test]
fn test_validate_success_with_defaults() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_validate_nonexistent_corpus_path() {
    let config = Config {
        corpus_path: Some(PathBuf::from("/nonexistent/corpus.json")),
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::PathNotFound { .. })
    ));
}

#[test]
fn test_validate_synonyms_path_is_directory() {
    let config = Config {
        synonyms_path: Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src")),
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotAFile { .. })
    ));
}

#[test]
fn test_validate_existing_files() {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    let config = Config {
        ambiguity_path: Some(manifest),
        ..Default::default()
    };

    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_unordered_thresholds() {
    let mut config = Config::default();
    config.pipeline.thresholds.medium = 0.9;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ThresholdOrder { .. })
    ));
}

#[test]
fn test_validate_rejects_top_n_above_top_k() {
    let config = Config {
        pipeline: PipelineConfig::default().with_top_k(5).with_rerank(10, 0.25),
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue {
            name: "EVIDENTIA_RERANK_TOP_N",
            ..
        })
    ));
}

#[test]
fn test_validate_rejects_out_of_range_min_score() {
    let config = Config {
        pipeline: PipelineConfig::default().with_rerank(10, 1.5),
        ..Default::default()
    };

    assert!(config.validate().is_err());
}

#[test]
fn test_error_messages_are_descriptive() {
    let err = ConfigError::InvalidPort {
        value: "0".to_string(),
    };
    assert!(err.to_string().contains("1 and 65535"));

    let err = ConfigError::PathNotFound {
        path: PathBuf::from("/some/path"),
    };
    assert!(err.to_string().contains("/some/path"));

    let err = ConfigError::invalid("EVIDENTIA_TOP_K", "-1", "invalid digit");
    assert!(err.to_string().contains("EVIDENTIA_TOP_K"));
}
