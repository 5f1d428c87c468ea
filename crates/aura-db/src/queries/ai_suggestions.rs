//! Database query functions for the `ai_suggestions` table.
//!
//! Rows are only ever created from a successful assistant call; the API
//! exposes read and delete.

use anyhow::{Context, Result};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{AiSuggestion, SuggestionKind};
use crate::queries::listing::Listing;

#[derive(Debug, Clone)]
pub struct NewAiSuggestion {
    pub plan_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub kind: SuggestionKind,
    pub skill_focus: String,
    pub prior_context: String,
    pub title: String,
    pub body: String,
    pub suggested_skills: Vec<String>,
    pub model: String,
    pub token_cost: i32,
    pub processing_ms: i64,
    pub raw_response: serde_json::Value,
}

list_filter! {
    AiSuggestionFilter {
        kind: SuggestionKind,
        plan_id: Uuid,
    }
}

pub async fn insert_ai_suggestion<'e, E>(
    executor: E,
    school_id: Uuid,
    new: &NewAiSuggestion,
) -> Result<AiSuggestion>
where
    E: PgExecutor<'e>,
{
    let suggestion = sqlx::query_as::<_, AiSuggestion>(
        "INSERT INTO ai_suggestions \
             (school_id, plan_id, teacher_id, kind, skill_focus, prior_context, title, body, \
              suggested_skills, model, token_cost, processing_ms, raw_response) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.plan_id)
    .bind(new.teacher_id)
    .bind(new.kind)
    .bind(&new.skill_focus)
    .bind(&new.prior_context)
    .bind(&new.title)
    .bind(&new.body)
    .bind(Json(&new.suggested_skills))
    .bind(&new.model)
    .bind(new.token_cost)
    .bind(new.processing_ms)
    .bind(&new.raw_response)
    .fetch_one(executor)
    .await
    .context("failed to insert ai suggestion")?;

    Ok(suggestion)
}

pub async fn get_ai_suggestion(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
) -> Result<Option<AiSuggestion>> {
    let suggestion = sqlx::query_as::<_, AiSuggestion>(
        "SELECT * FROM ai_suggestions WHERE id = $1 AND school_id = $2",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch ai suggestion")?;

    Ok(suggestion)
}

pub async fn list_ai_suggestions(
    pool: &PgPool,
    school_id: Uuid,
    filter: &AiSuggestionFilter,
) -> Result<Vec<AiSuggestion>> {
    Listing::from_table("ai_suggestions")
        .eq("school_id", Some(school_id))
        .eq("kind", filter.kind)
        .eq("plan_id", filter.plan_id)
        .finish(filter.page(), &["title"], &["created_at"], "-created_at")
        .fetch_all(pool)
        .await
}

pub async fn delete_ai_suggestion(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM ai_suggestions WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete ai suggestion")?;

    Ok(result.rows_affected() > 0)
}
