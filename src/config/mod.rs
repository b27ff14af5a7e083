//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `EVIDENTIA_*` environment variables.
//! Pipeline and resilience tuning live in their own component configs
//! ([`PipelineConfig`], [`ResilienceConfig`]) and are loaded alongside.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::fmt::Display;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::chat::PipelineConfig;
use crate::resilience::ResilienceConfig;

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `EVIDENTIA_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Base URL of the hybrid search service. Unset selects the offline index.
    pub search_url: Option<String>,
    pub search_api_key: Option<String>,
    /// Index name sent with every search. Default: `policies`.
    pub search_index: String,

    /// Base URL of the cross-encoder service. Unset selects the lexical reranker.
    pub rerank_url: Option<String>,
    pub rerank_api_key: Option<String>,

    /// Model used for summary generation. Unset keeps summaries extractive.
    pub completion_model: Option<String>,

    /// JSON corpus for the offline search index.
    pub corpus_path: Option<PathBuf>,
    /// JSON synonym table.
    pub synonyms_path: Option<PathBuf>,
    /// JSON ambiguity registry. Unset uses the built-in registry.
    pub ambiguity_path: Option<PathBuf>,

    /// Wire in-process adapters regardless of configured URLs.
    pub mock_services: bool,

    pub pipeline: PipelineConfig,
    pub resilience: ResilienceConfig,
}

/// Default index name used when `EVIDENTIA_SEARCH_INDEX` is not set.
pub const DEFAULT_SEARCH_INDEX: &str = "policies";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: crate::constants::DEFAULT_PORT,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            search_url: None,
            search_api_key: None,
            search_index: DEFAULT_SEARCH_INDEX.to_string(),
            rerank_url: None,
            rerank_api_key: None,
            completion_model: None,
            corpus_path: None,
            synonyms_path: None,
            ambiguity_path: None,
            mock_services: false,
            pipeline: PipelineConfig::default(),
            resilience: ResilienceConfig::default(),
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "EVIDENTIA_PORT";
    const ENV_BIND_ADDR: &'static str = "EVIDENTIA_BIND_ADDR";
    const ENV_SEARCH_URL: &'static str = "EVIDENTIA_SEARCH_URL";
    const ENV_SEARCH_API_KEY: &'static str = "EVIDENTIA_SEARCH_API_KEY";
    const ENV_SEARCH_INDEX: &'static str = "EVIDENTIA_SEARCH_INDEX";
    const ENV_RERANK_URL: &'static str = "EVIDENTIA_RERANK_URL";
    const ENV_RERANK_API_KEY: &'static str = "EVIDENTIA_RERANK_API_KEY";
    const ENV_COMPLETION_MODEL: &'static str = "EVIDENTIA_COMPLETION_MODEL";
    const ENV_CORPUS_PATH: &'static str = "EVIDENTIA_CORPUS_PATH";
    const ENV_SYNONYMS_PATH: &'static str = "EVIDENTIA_SYNONYMS_PATH";
    const ENV_AMBIGUITY_PATH: &'static str = "EVIDENTIA_AMBIGUITY_PATH";
    const ENV_MOCK_SERVICES: &'static str = "EVIDENTIA_MOCK_SERVICES";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;

        Ok(Self {
            port,
            bind_addr,
            search_url: optional_string_env(Self::ENV_SEARCH_URL),
            search_api_key: optional_string_env(Self::ENV_SEARCH_API_KEY),
            search_index: optional_string_env(Self::ENV_SEARCH_INDEX)
                .unwrap_or(defaults.search_index),
            rerank_url: optional_string_env(Self::ENV_RERANK_URL),
            rerank_api_key: optional_string_env(Self::ENV_RERANK_API_KEY),
            completion_model: optional_string_env(Self::ENV_COMPLETION_MODEL),
            corpus_path: optional_string_env(Self::ENV_CORPUS_PATH).map(PathBuf::from),
            synonyms_path: optional_string_env(Self::ENV_SYNONYMS_PATH).map(PathBuf::from),
            ambiguity_path: optional_string_env(Self::ENV_AMBIGUITY_PATH).map(PathBuf::from),
            mock_services: bool_env(Self::ENV_MOCK_SERVICES, defaults.mock_services)?,
            pipeline: PipelineConfig::from_env()?,
            resilience: ResilienceConfig::from_env()?,
        })
    }

    /// Validates data files and component invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [&self.corpus_path, &self.synonyms_path, &self.ambiguity_path]
            .into_iter()
            .flatten()
        {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        self.pipeline.validate()?;
        self.resilience.validate()?;
        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.trim().parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }
}

fn optional_string_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn bool_env(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional_string_env(name) {
        None => Ok(default),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(name, value, "expected a boolean")),
        },
    }
}

/// Parses `name` when set and non-empty, otherwise returns `default`.
pub(crate) fn parse_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match optional_string_env(name) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(name, value.clone(), e.to_string())),
    }
}

/// Whole seconds.
pub(crate) fn secs_env(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_env(name, default.as_secs()).map(Duration::from_secs)
}

/// Milliseconds.
pub(crate) fn millis_env(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_env(name, default_ms).map(Duration::from_millis)
}
