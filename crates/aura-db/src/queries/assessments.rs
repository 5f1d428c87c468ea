//! Database query functions for the `assessments` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Assessment, AssessmentKind};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssessment {
    pub class_id: Uuid,
    pub title: String,
    pub kind: Option<AssessmentKind>,
    pub held_on: NaiveDate,
    /// Defaults to 10.
    pub max_score: Option<Decimal>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentChanges {
    pub title: Option<String>,
    pub kind: Option<AssessmentKind>,
    pub held_on: Option<NaiveDate>,
    pub max_score: Option<Decimal>,
    pub description: Option<String>,
}

list_filter! {
    AssessmentFilter {
        class_id: Uuid,
        kind: AssessmentKind,
    }
}

pub async fn insert_assessment(
    pool: &PgPool,
    school_id: Uuid,
    new: &NewAssessment,
) -> Result<Assessment> {
    let assessment = sqlx::query_as::<_, Assessment>(
        "INSERT INTO assessments (school_id, class_id, title, kind, held_on, max_score, description) \
         VALUES ($1, $2, $3, COALESCE($4, 'summative'), $5, COALESCE($6, 10), $7) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.class_id)
    .bind(&new.title)
    .bind(new.kind)
    .bind(new.held_on)
    .bind(new.max_score)
    .bind(&new.description)
    .fetch_one(pool)
    .await
    .context("failed to insert assessment")?;

    Ok(assessment)
}

pub async fn get_assessment(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<Assessment>> {
    let assessment = sqlx::query_as::<_, Assessment>(
        "SELECT * FROM assessments WHERE id = $1 AND school_id = $2",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch assessment")?;

    Ok(assessment)
}

pub async fn list_assessments(
    pool: &PgPool,
    school_id: Uuid,
    filter: &AssessmentFilter,
) -> Result<Vec<Assessment>> {
    Listing::from_table("assessments")
        .eq("school_id", Some(school_id))
        .eq("class_id", filter.class_id)
        .eq("kind", filter.kind)
        .finish(filter.page(), &["title"], &["held_on", "created_at"], "-held_on")
        .fetch_all(pool)
        .await
}

pub async fn update_assessment(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &AssessmentChanges,
) -> Result<Option<Assessment>> {
    let assessment = sqlx::query_as::<_, Assessment>(
        "UPDATE assessments SET \
             title = COALESCE($3, title), \
             kind = COALESCE($4, kind), \
             held_on = COALESCE($5, held_on), \
             max_score = COALESCE($6, max_score), \
             description = COALESCE($7, description), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(&changes.title)
    .bind(changes.kind)
    .bind(changes.held_on)
    .bind(changes.max_score)
    .bind(&changes.description)
    .fetch_optional(pool)
    .await
    .context("failed to update assessment")?;

    Ok(assessment)
}

pub async fn delete_assessment(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM assessments WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete assessment")?;

    Ok(result.rows_affected() > 0)
}
