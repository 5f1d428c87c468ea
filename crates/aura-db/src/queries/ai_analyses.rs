//! Database query functions for the `ai_analyses` table.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::AiAnalysis;
use crate::queries::listing::Listing;

#[derive(Debug, Clone)]
pub struct NewAiAnalysis {
    pub plan_id: Uuid,
    pub requested_by: Option<Uuid>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub recommendations: Vec<String>,
    pub adherence_score: Option<Decimal>,
    pub token_cost: i32,
    pub raw_response: serde_json::Value,
}

list_filter! {
    AiAnalysisFilter {
        plan_id: Uuid,
    }
}

pub async fn insert_ai_analysis<'e, E>(
    executor: E,
    school_id: Uuid,
    new: &NewAiAnalysis,
) -> Result<AiAnalysis>
where
    E: PgExecutor<'e>,
{
    let analysis = sqlx::query_as::<_, AiAnalysis>(
        "INSERT INTO ai_analyses \
             (school_id, plan_id, requested_by, strengths, improvements, recommendations, \
              adherence_score, token_cost, raw_response) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.plan_id)
    .bind(new.requested_by)
    .bind(Json(&new.strengths))
    .bind(Json(&new.improvements))
    .bind(Json(&new.recommendations))
    .bind(new.adherence_score)
    .bind(new.token_cost)
    .bind(&new.raw_response)
    .fetch_one(executor)
    .await
    .context("failed to insert ai analysis")?;

    Ok(analysis)
}

pub async fn get_ai_analysis(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<AiAnalysis>> {
    let analysis = sqlx::query_as::<_, AiAnalysis>(
        "SELECT * FROM ai_analyses WHERE id = $1 AND school_id = $2",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch ai analysis")?;

    Ok(analysis)
}

pub async fn list_ai_analyses(
    pool: &PgPool,
    school_id: Uuid,
    filter: &AiAnalysisFilter,
) -> Result<Vec<AiAnalysis>> {
    Listing::from_table("ai_analyses")
        .eq("school_id", Some(school_id))
        .eq("plan_id", filter.plan_id)
        .finish(filter.page(), &[], &["created_at"], "-created_at")
        .fetch_all(pool)
        .await
}

pub async fn delete_ai_analysis(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM ai_analyses WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete ai analysis")?;

    Ok(result.rows_affected() > 0)
}
