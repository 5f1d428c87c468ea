//! Outbound workflow webhook.
//!
//! One `POST` per plan event with a 5 second default timeout. The result is
//! only ever a boolean: failures are logged and recorded, never returned.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::Value;
use sha2::Sha256;
use sqlx::PgPool;

use aura_db::models::InteractionKind;
use aura_db::queries::interaction_logs::NewInteractionLog;

use crate::workflow::{PlanEvent, PlanNotifier};

use super::{Attempt, CallError, Caller, append_detached, failure_entry};

type HmacSha256 = Hmac<Sha256>;

/// Default bound on one webhook call.
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Header carrying `sha256=<hex>` of the request body.
pub const SIGNATURE_HEADER: &str = "X-Aura-Signature";

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// No URL disables the webhook.
    pub url: Option<String>,
    pub secret: Option<String>,
    pub timeout: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            secret: None,
            timeout: DEFAULT_WEBHOOK_TIMEOUT,
        }
    }
}

/// Posts [`PlanEvent`]s to the configured URL.
#[derive(Clone)]
pub struct WebhookClient {
    pool: PgPool,
    client: Client,
    url: Option<String>,
    signer: Option<HmacSha256>,
}

impl WebhookClient {
    pub fn new(pool: PgPool, config: &WebhookConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build webhook HTTP client")?;
        let signer = match config.secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Some(
                HmacSha256::new_from_slice(secret.as_bytes())
                    .context("invalid webhook secret")?,
            ),
            None => None,
        };

        Ok(Self {
            pool,
            client,
            url: config.url.clone().filter(|u| !u.trim().is_empty()),
            signer,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// `sha256=<hex>` over `body`, when a secret is configured.
    pub fn signature(&self, body: &[u8]) -> Option<String> {
        self.signer.as_ref().map(|signer| {
            let mut mac = signer.clone();
            mac.update(body);
            format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
        })
    }

    async fn post(&self, url: &str, body: Vec<u8>) -> Result<Value, CallError> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(signature) = self.signature(&body) {
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        let text = response.text().await.map_err(CallError::Transport)?;
        if !status.is_success() {
            return Err(CallError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        // Receivers often answer with plain text; keep it as a JSON string.
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[async_trait]
impl PlanNotifier for WebhookClient {
    async fn notify(&self, event: &PlanEvent) -> bool {
        let Some(url) = self.url.as_deref() else {
            tracing::debug!(event = event.event, plan_id = %event.plan_id, "no webhook configured");
            return false;
        };

        let request = match serde_json::to_value(event) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(event = event.event, error = %e, "failed to encode webhook event");
                return false;
            }
        };
        let body = request.to_string().into_bytes();
        let caller = Caller {
            school_id: event.school_id,
            actor_id: event.actor_id,
        };

        let attempt = Attempt::start();
        let result = self.post(url, body).await;
        let latency_ms = attempt.elapsed_ms();

        match result {
            Ok(response) => {
                tracing::info!(event = event.event, plan_id = %event.plan_id, latency_ms, "webhook delivered");
                let entry = NewInteractionLog {
                    school_id: Some(caller.school_id),
                    actor_id: Some(caller.actor_id),
                    kind: InteractionKind::Webhook,
                    endpoint: url.to_owned(),
                    request,
                    response: Some(response),
                    success: true,
                    latency_ms,
                    token_cost: None,
                    error_message: None,
                };
                append_detached(&self.pool, &entry).await;
                true
            }
            Err(e) => {
                tracing::warn!(
                    event = event.event,
                    plan_id = %event.plan_id,
                    latency_ms,
                    error = %e,
                    "webhook failed"
                );
                let entry = failure_entry(
                    Some(caller),
                    InteractionKind::Webhook,
                    url,
                    &request,
                    e.response(),
                    latency_ms,
                    &e.to_string(),
                );
                append_detached(&self.pool, &entry).await;
                false
            }
        }
    }
}
