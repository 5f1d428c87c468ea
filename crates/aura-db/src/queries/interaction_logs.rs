//! Database query functions for the append-only `interaction_logs` table.
//!
//! No update or delete functions exist; the table's triggers reject both.

use anyhow::{Context, Result};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{InteractionKind, InteractionLog};
use crate::queries::listing::Listing;

/// One outbound call attempt, as written to the log.
#[derive(Debug, Clone)]
pub struct NewInteractionLog {
    pub school_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub kind: InteractionKind,
    pub endpoint: String,
    pub request: serde_json::Value,
    pub response: Option<serde_json::Value>,
    pub success: bool,
    pub latency_ms: i64,
    pub token_cost: Option<i32>,
    pub error_message: Option<String>,
}

list_filter! {
    InteractionLogFilter {
        kind: InteractionKind,
        success: bool,
        actor_id: Uuid,
    }
}

/// Append one row. Takes any executor so it can share a transaction with the
/// record the call produced.
pub async fn append_interaction_log<'e, E>(executor: E, entry: &NewInteractionLog) -> Result<i64>
where
    E: PgExecutor<'e>,
{
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO interaction_logs \
             (school_id, actor_id, kind, endpoint, request, response, success, latency_ms, token_cost, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING id",
    )
    .bind(entry.school_id)
    .bind(entry.actor_id)
    .bind(entry.kind)
    .bind(&entry.endpoint)
    .bind(&entry.request)
    .bind(&entry.response)
    .bind(entry.success)
    .bind(entry.latency_ms.max(0))
    .bind(entry.token_cost)
    .bind(&entry.error_message)
    .fetch_one(executor)
    .await
    .context("failed to append interaction log")?;

    Ok(id)
}

pub async fn get_interaction_log(
    pool: &PgPool,
    school_id: Uuid,
    id: i64,
) -> Result<Option<InteractionLog>> {
    let log = sqlx::query_as::<_, InteractionLog>(
        "SELECT * FROM interaction_logs WHERE id = $1 AND school_id = $2",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch interaction log")?;

    Ok(log)
}

pub async fn list_interaction_logs(
    pool: &PgPool,
    school_id: Uuid,
    filter: &InteractionLogFilter,
) -> Result<Vec<InteractionLog>> {
    Listing::from_table("interaction_logs")
        .eq("school_id", Some(school_id))
        .eq("kind", filter.kind)
        .eq("success", filter.success)
        .eq("actor_id", filter.actor_id)
        .finish(filter.page(), &[], &["created_at", "latency_ms"], "-created_at")
        .fetch_all(pool)
        .await
}

/// Count rows by kind and outcome for a school.
pub async fn count_interaction_logs(
    pool: &PgPool,
    school_id: Uuid,
    kind: InteractionKind,
    success: Option<bool>,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM interaction_logs \
         WHERE school_id = $1 AND kind = $2 AND ($3::boolean IS NULL OR success = $3)",
    )
    .bind(school_id)
    .bind(kind)
    .bind(success)
    .fetch_one(pool)
    .await
    .context("failed to count interaction logs")?;

    Ok(count)
}
