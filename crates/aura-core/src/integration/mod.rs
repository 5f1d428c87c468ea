//! Outbound HTTP integrations.
//!
//! Both the assistant and the workflow webhook follow the same pattern: one
//! synchronous JSON `POST` with a bounded timeout, and exactly one
//! interaction log row per attempt. They differ in how failures surface:
//! assistant failures are returned to the caller, webhook failures are
//! logged and reported as `false`.

pub mod assistant;
pub mod client;
pub mod webhook;

use std::time::Instant;

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use aura_db::models::InteractionKind;
use aura_db::queries::interaction_logs::{self, NewInteractionLog};

pub use assistant::{AnalysisRequest, AssistantService, SuggestionRequest};
pub use client::{Assistant, AssistantConfig, HttpAssistant};
pub use webhook::{WebhookClient, WebhookConfig};

/// Why one outbound call failed.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl CallError {
    /// The payload stored as the log row's response, if any.
    fn response(&self) -> Option<Value> {
        match self {
            Self::Status { body, .. } => Some(serde_json::json!({ "error": body })),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("plan {0} not found")]
    PlanNotFound(Uuid),

    #[error("assistant call failed: {0}")]
    Call(#[from] CallError),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Who made a call and on behalf of which school.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub school_id: Uuid,
    pub actor_id: Uuid,
}

/// Wall-clock timer for one attempt.
pub(crate) struct Attempt {
    started: Instant,
}

impl Attempt {
    pub(crate) fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub(crate) fn elapsed_ms(&self) -> i64 {
        i64::try_from(self.started.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}

/// Build a failure row for an attempt.
pub(crate) fn failure_entry(
    caller: Option<Caller>,
    kind: InteractionKind,
    endpoint: &str,
    request: &Value,
    response: Option<Value>,
    latency_ms: i64,
    error: &str,
) -> NewInteractionLog {
    NewInteractionLog {
        school_id: caller.map(|c| c.school_id),
        actor_id: caller.map(|c| c.actor_id),
        kind,
        endpoint: endpoint.to_owned(),
        request: request.clone(),
        response,
        success: false,
        latency_ms,
        token_cost: None,
        error_message: Some(error.to_owned()),
    }
}

/// Append a log row outside any transaction. A failure to write is logged,
/// never returned: the caller already has an outcome to report.
pub(crate) async fn append_detached(pool: &PgPool, entry: &NewInteractionLog) {
    if let Err(e) = interaction_logs::append_interaction_log(pool, entry).await {
        tracing::error!(
            kind = %entry.kind,
            endpoint = %entry.endpoint,
            error = %format!("{e:#}"),
            "failed to write interaction log"
        );
    }
}
