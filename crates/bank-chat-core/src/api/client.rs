use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use super::models::{ChatRequest, ChatResponse, EndSessionResponse, SessionHistory};
use super::ChatBackend;
use crate::error::BackendError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Bank Support AI backend.
///
/// Stateless apart from the connection pool; cloning is cheap and shares it.
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(BackendError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-request timeout the underlying HTTP client was built with
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Post one user message and return the assistant's answer.
    pub async fn send_message(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse, BackendError> {
        let url = format!("{}/chat/", self.base_url);

        let request = ChatRequest {
            message,
            session_id,
            context: serde_json::Map::new(),
        };

        tracing::debug!(%url, has_session = session_id.is_some(), "sending chat message");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(BackendError::Transport)?;

        decode(response).await
    }

    pub async fn get_health(&self) -> Result<serde_json::Value, BackendError> {
        self.get_json(&format!("{}/health/", self.base_url)).await
    }

    pub async fn get_detailed_health(&self) -> Result<serde_json::Value, BackendError> {
        self.get_json(&format!("{}/health/detailed", self.base_url)).await
    }

    /// Fetch the backend's stored transcript for a session.
    pub async fn get_history(&self, session_id: &str) -> Result<SessionHistory, BackendError> {
        self.get_json(&format!("{}/chat/history/{}", self.base_url, session_id))
            .await
    }

    /// Ask the backend to forget a session. Returns the backend's confirmation text.
    pub async fn end_session(&self, session_id: &str) -> Result<String, BackendError> {
        let url = format!("{}/chat/session/{}", self.base_url, session_id);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(BackendError::Transport)?;

        let confirmation: EndSessionResponse = decode(response).await?;
        Ok(confirmation
            .message
            .unwrap_or_else(|| format!("Session {} cleared", session_id)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BackendError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(BackendError::Transport)?;

        decode(response).await
    }
}

#[async_trait]
impl ChatBackend for BackendClient {
    async fn send_message(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse, BackendError> {
        BackendClient::send_message(self, message, session_id).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, %body, "backend returned an error status");
        return Err(BackendError::Status { status, body });
    }

    response.json::<T>().await.map_err(BackendError::Decode)
}
