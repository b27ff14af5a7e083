//! HTTP client helpers for tests.

use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
}

/// A reply plus its `X-Evidentia-Status` header.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub evidentia_status: String,
    pub body: Value,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            client_id: None,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("Content-Type", "application/json");
        match &self.client_id {
            Some(id) => builder.header("X-Client-Id", id),
            None => builder,
        }
    }

    async fn into_reply(resp: reqwest::Response) -> Result<Reply, TestClientError> {
        let status = resp.status().as_u16();
        let evidentia_status = resp
            .headers()
            .get("x-evidentia-status")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(Reply {
            status,
            evidentia_status,
            body,
        })
    }

    pub async fn chat(
        &self,
        message: &str,
        session_id: Option<&str>,
        entity_filters: &[&str],
    ) -> Result<Reply, TestClientError> {
        let builder = self.add_headers(self.client.post(self.url("/v1/chat")));
        let resp = builder
            .json(&json!({
                "message": message,
                "session_id": session_id,
                "entity_filters": entity_filters,
            }))
            .send()
            .await?;
        Self::into_reply(resp).await
    }

    pub async fn clarify(&self, session_id: &str, option_id: &str) -> Result<Reply, TestClientError> {
        let builder = self.add_headers(self.client.post(self.url("/v1/chat/clarify")));
        let resp = builder
            .json(&json!({"session_id": session_id, "option_id": option_id}))
            .send()
            .await?;
        Self::into_reply(resp).await
    }

    pub async fn health(&self) -> Result<HealthResponse, TestClientError> {
        let resp = self.client.get(self.url("/healthz")).send().await?;

        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(TestClientError::UnexpectedStatus(status, body))
        }
    }

    pub async fn ready(&self) -> Result<Reply, TestClientError> {
        let resp = self.client.get(self.url("/ready")).send().await?;
        Self::into_reply(resp).await
    }
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TestClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status {0}: {1}")]
    UnexpectedStatus(u16, String),
}
