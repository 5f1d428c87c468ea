//! HTTP transport for the assistant.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::CallError;

/// Default bound on one assistant call.
pub const DEFAULT_ASSISTANT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Base URL; endpoint paths are appended to it.
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl AssistantConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: DEFAULT_ASSISTANT_TIMEOUT,
        }
    }
}

/// A JSON-over-HTTP collaborator.
///
/// `call` returns the parsed response body of a 2xx reply; every other
/// outcome is a [`CallError`].
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Full URL for `path`, as recorded in the interaction log.
    fn endpoint(&self, path: &str) -> String;

    async fn call(&self, path: &str, payload: &Value) -> Result<Value, CallError>;
}

/// [`Assistant`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpAssistant {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpAssistant {
    pub fn new(config: &AssistantConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build assistant HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Assistant for HttpAssistant {
    fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn call(&self, path: &str, payload: &Value) -> Result<Value, CallError> {
        let url = self.endpoint(path);
        let mut request = self.client.post(&url).json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CallError::InvalidBody(e.to_string()))
    }
}

/// Join a base URL and a relative path with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
