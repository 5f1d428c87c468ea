//! Database query functions for the `grades` table.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Grade;
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGrade {
    pub student_id: Uuid,
    pub assessment_id: Uuid,
    pub score: Decimal,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradeChanges {
    pub score: Option<Decimal>,
    pub feedback: Option<String>,
}

list_filter! {
    GradeFilter {
        student_id: Uuid,
        assessment_id: Uuid,
    }
}

/// Insert a grade. Returns `None` when the score exceeds the assessment's
/// `max_score` (or the assessment is not in this school).
pub async fn insert_grade(pool: &PgPool, school_id: Uuid, new: &NewGrade) -> Result<Option<Grade>> {
    let grade = sqlx::query_as::<_, Grade>(
        "INSERT INTO grades (school_id, student_id, assessment_id, score, feedback) \
         SELECT $1, $2, a.id, $4, $5 \
         FROM assessments a \
         WHERE a.id = $3 AND a.school_id = $1 AND $4 <= a.max_score \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.student_id)
    .bind(new.assessment_id)
    .bind(new.score)
    .bind(&new.feedback)
    .fetch_optional(pool)
    .await
    .context("failed to insert grade")?;

    Ok(grade)
}

pub async fn get_grade(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<Grade>> {
    let grade = sqlx::query_as::<_, Grade>("SELECT * FROM grades WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch grade")?;

    Ok(grade)
}

pub async fn list_grades(pool: &PgPool, school_id: Uuid, filter: &GradeFilter) -> Result<Vec<Grade>> {
    Listing::from_table("grades")
        .eq("school_id", Some(school_id))
        .eq("student_id", filter.student_id)
        .eq("assessment_id", filter.assessment_id)
        .finish(filter.page(), &[], &["created_at", "score"], "-created_at")
        .fetch_all(pool)
        .await
}

/// Partial update, with the same `max_score` bound as [`insert_grade`].
/// `None` covers both "missing" and "score out of range".
pub async fn update_grade(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &GradeChanges,
) -> Result<Option<Grade>> {
    let grade = sqlx::query_as::<_, Grade>(
        "UPDATE grades g SET \
             score = COALESCE($3, g.score), \
             feedback = COALESCE($4, g.feedback), \
             updated_at = now() \
         FROM assessments a \
         WHERE g.id = $1 AND g.school_id = $2 \
           AND a.id = g.assessment_id \
           AND COALESCE($3, g.score) <= a.max_score \
         RETURNING g.*",
    )
    .bind(id)
    .bind(school_id)
    .bind(changes.score)
    .bind(&changes.feedback)
    .fetch_optional(pool)
    .await
    .context("failed to update grade")?;

    Ok(grade)
}

pub async fn delete_grade(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM grades WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete grade")?;

    Ok(result.rows_affected() > 0)
}
