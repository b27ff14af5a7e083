//! JSON-over-HTTP adapters for the hosted search index and the rerank service.
//!
//! Neither adapter sets a request timeout of its own: every call is bounded by the
//! resilience layer, which also feeds the per-dependency circuit breaker.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::debug;

use super::error::ServiceError;
use super::types::{RerankRequest, RerankResult, SearchHit, SearchRequest};
use super::{RerankService, SearchService};

const SEARCH_SERVICE: &str = "search";
const RERANK_SERVICE: &str = "rerank";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Deserialize)]
struct SearchResponseBody {
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct RerankResponseBody {
    results: Vec<RerankResult>,
}

fn build_http_client() -> HttpClient {
    HttpClient::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

async fn read_error_body(service: &'static str, resp: reqwest::Response) -> ServiceError {
    let status = resp.status().as_u16();
    let body: String = resp
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect();
    ServiceError::Status {
        service,
        status,
        body,
    }
}

#[derive(Clone)]
/// Client for the hosted hybrid search index.
///
/// `POST {base_url}/indexes/{index}/search` with a [`SearchRequest`] body, expecting
/// `{"results": [SearchHit, ...]}`.
pub struct HttpSearchClient {
    http: HttpClient,
    base_url: String,
    index: String,
    api_key: Option<String>,
}

impl HttpSearchClient {
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            base_url: base_url.into(),
            index: index.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn url(&self) -> String {
        endpoint(&self.base_url, &format!("indexes/{}/search", self.index))
    }
}

impl std::fmt::Debug for HttpSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSearchClient")
            .field("base_url", &self.base_url)
            .field("index", &self.index)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
impl SearchService for HttpSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ServiceError> {
        let mut builder = self.http.post(self.url()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(SEARCH_SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(read_error_body(SEARCH_SERVICE, resp).await);
        }

        let body: SearchResponseBody = resp
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest(SEARCH_SERVICE, e))?;

        debug!(hits = body.results.len(), "Search index responded");
        Ok(body.results)
    }
}

#[derive(Clone)]
/// Client for the hosted cross-encoder.
///
/// `POST {base_url}/rerank` with a [`RerankRequest`] body, expecting
/// `{"results": [{"id", "relevance_score"}, ...]}`.
pub struct HttpRerankClient {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRerankClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            base_url: base_url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn url(&self) -> String {
        endpoint(&self.base_url, "rerank")
    }
}

impl std::fmt::Debug for HttpRerankClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRerankClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
impl RerankService for HttpRerankClient {
    async fn rerank(&self, request: &RerankRequest) -> Result<Vec<RerankResult>, ServiceError> {
        let mut builder = self.http.post(self.url()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(RERANK_SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(read_error_body(RERANK_SERVICE, resp).await);
        }

        let body: RerankResponseBody = resp
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest(RERANK_SERVICE, e))?;

        if body
            .results
            .iter()
            .any(|r| !r.relevance_score.is_finite())
        {
            return Err(ServiceError::InvalidResponse {
                service: RERANK_SERVICE,
                reason: "non-finite relevance score".to_string(),
            });
        }

        Ok(body.results)
    }
}
