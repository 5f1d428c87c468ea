//! Database query functions for the `audit_logs` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AuditAction, AuditLog};
use crate::queries::listing::Listing;

list_filter! {
    AuditLogFilter {
        action: AuditAction,
        model_name: String,
        object_id: Uuid,
        user_id: Uuid,
    }
}

pub async fn insert_audit_log(
    pool: &PgPool,
    school_id: Uuid,
    user_id: Option<Uuid>,
    action: AuditAction,
    model_name: &str,
    object_id: Uuid,
    changes: &serde_json::Value,
) -> Result<AuditLog> {
    let log = sqlx::query_as::<_, AuditLog>(
        "INSERT INTO audit_logs (school_id, user_id, action, model_name, object_id, changes) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(user_id)
    .bind(action)
    .bind(model_name)
    .bind(object_id)
    .bind(changes)
    .fetch_one(pool)
    .await
    .context("failed to insert audit log")?;

    Ok(log)
}

pub async fn list_audit_logs(
    pool: &PgPool,
    school_id: Uuid,
    filter: &AuditLogFilter,
) -> Result<Vec<AuditLog>> {
    Listing::from_table("audit_logs")
        .eq("school_id", Some(school_id))
        .eq("action", filter.action)
        .eq("model_name", filter.model_name.clone())
        .eq("object_id", filter.object_id)
        .eq("user_id", filter.user_id)
        .finish(filter.page(), &[], &["created_at"], "-created_at")
        .fetch_all(pool)
        .await
}
