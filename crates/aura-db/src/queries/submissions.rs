//! Database query functions for the `submissions` table.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Submission, SubmissionStatus};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubmission {
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    #[serde(default)]
    pub content: String,
    pub attachment_url: Option<String>,
    /// Defaults to `submitted`; `pending` keeps a draft.
    pub status: Option<SubmissionStatus>,
}

/// Student-side edits. Grading goes through [`grade_submission`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionChanges {
    pub content: Option<String>,
    pub attachment_url: Option<String>,
    pub status: Option<SubmissionStatus>,
}

list_filter! {
    SubmissionFilter {
        assignment_id: Uuid,
        student_id: Uuid,
        status: SubmissionStatus,
    }
}

pub async fn insert_submission(
    pool: &PgPool,
    school_id: Uuid,
    new: &NewSubmission,
) -> Result<Submission> {
    let submission = sqlx::query_as::<_, Submission>(
        "INSERT INTO submissions (school_id, assignment_id, student_id, content, attachment_url, status, submitted_at) \
         VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'submitted'), \
                 CASE WHEN COALESCE($6, 'submitted') = 'submitted' THEN now() END) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.assignment_id)
    .bind(new.student_id)
    .bind(&new.content)
    .bind(&new.attachment_url)
    .bind(new.status)
    .fetch_one(pool)
    .await
    .context("failed to insert submission")?;

    Ok(submission)
}

pub async fn get_submission(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<Submission>> {
    let submission = sqlx::query_as::<_, Submission>(
        "SELECT * FROM submissions WHERE id = $1 AND school_id = $2",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch submission")?;

    Ok(submission)
}

pub async fn list_submissions(
    pool: &PgPool,
    school_id: Uuid,
    filter: &SubmissionFilter,
) -> Result<Vec<Submission>> {
    Listing::from_table("submissions")
        .eq("school_id", Some(school_id))
        .eq("assignment_id", filter.assignment_id)
        .eq("student_id", filter.student_id)
        .eq("status", filter.status)
        .finish(
            filter.page(),
            &[],
            &["submitted_at", "created_at"],
            "-created_at",
        )
        .fetch_all(pool)
        .await
}

/// Partial update. Moving to `submitted` stamps `submitted_at` once.
pub async fn update_submission(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &SubmissionChanges,
) -> Result<Option<Submission>> {
    let submission = sqlx::query_as::<_, Submission>(
        "UPDATE submissions SET \
             content = COALESCE($3, content), \
             attachment_url = COALESCE($4, attachment_url), \
             status = COALESCE($5, status), \
             submitted_at = CASE \
                 WHEN $5 = 'submitted' THEN COALESCE(submitted_at, now()) \
                 ELSE submitted_at \
             END, \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(&changes.content)
    .bind(&changes.attachment_url)
    .bind(changes.status)
    .fetch_optional(pool)
    .await
    .context("failed to update submission")?;

    Ok(submission)
}

/// Record a score and feedback, marking the submission `graded`. Regrading
/// overwrites the previous score and refreshes `graded_at`.
pub async fn grade_submission(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    score: Decimal,
    feedback: Option<&str>,
) -> Result<Option<Submission>> {
    let submission = sqlx::query_as::<_, Submission>(
        "UPDATE submissions SET \
             score = $3, \
             feedback = COALESCE($4, feedback), \
             status = 'graded', \
             graded_at = now(), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(score)
    .bind(feedback)
    .fetch_optional(pool)
    .await
    .context("failed to grade submission")?;

    Ok(submission)
}

pub async fn delete_submission(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM submissions WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete submission")?;

    Ok(result.rows_affected() > 0)
}
