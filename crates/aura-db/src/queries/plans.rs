//! Database query functions for the `annual_plans` table.
//!
//! Generic updates never touch `status` or the review columns. Status only
//! moves through the guarded transition functions at the bottom, each a single
//! `UPDATE ... WHERE status = <from>` so concurrent callers serialize on the
//! row lock and at most one of them sees a row come back.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AnnualPlan, PlanStatus};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlan {
    /// Defaults to the creating user.
    pub teacher_id: Option<Uuid>,
    pub class_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub introduction: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanChanges {
    pub title: Option<String>,
    pub introduction: Option<String>,
}

list_filter! {
    PlanFilter {
        status: PlanStatus,
        class_id: Uuid,
        teacher_id: Uuid,
    }
}

pub async fn insert_plan(
    pool: &PgPool,
    school_id: Uuid,
    teacher_id: Uuid,
    new: &NewPlan,
) -> Result<AnnualPlan> {
    let plan = sqlx::query_as::<_, AnnualPlan>(
        "INSERT INTO annual_plans (school_id, teacher_id, class_id, title, introduction) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(teacher_id)
    .bind(new.class_id)
    .bind(&new.title)
    .bind(&new.introduction)
    .fetch_one(pool)
    .await
    .context("failed to insert plan")?;

    Ok(plan)
}

pub async fn get_plan(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<AnnualPlan>> {
    let plan = sqlx::query_as::<_, AnnualPlan>(
        "SELECT * FROM annual_plans WHERE id = $1 AND school_id = $2",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch plan")?;

    Ok(plan)
}

pub async fn list_plans(pool: &PgPool, school_id: Uuid, filter: &PlanFilter) -> Result<Vec<AnnualPlan>> {
    Listing::from_table("annual_plans")
        .eq("school_id", Some(school_id))
        .eq("status", filter.status)
        .eq("class_id", filter.class_id)
        .eq("teacher_id", filter.teacher_id)
        .finish(
            filter.page(),
            &["title"],
            &["created_at", "title"],
            "-created_at",
        )
        .fetch_all(pool)
        .await
}

pub async fn update_plan(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &PlanChanges,
) -> Result<Option<AnnualPlan>> {
    let plan = sqlx::query_as::<_, AnnualPlan>(
        "UPDATE annual_plans SET \
             title = COALESCE($3, title), \
             introduction = COALESCE($4, introduction), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(&changes.title)
    .bind(&changes.introduction)
    .fetch_optional(pool)
    .await
    .context("failed to update plan")?;

    Ok(plan)
}

pub async fn delete_plan(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM annual_plans WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete plan")?;

    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Guarded transitions. `None` means the plan is missing or not in the source
// status; callers re-read the row to tell the two apart.
// ---------------------------------------------------------------------------

/// `draft -> pending`, stamping `submitted_at`.
pub async fn mark_submitted(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<AnnualPlan>> {
    let plan = sqlx::query_as::<_, AnnualPlan>(
        "UPDATE annual_plans \
         SET status = 'pending', submitted_at = now(), updated_at = now() \
         WHERE id = $1 AND school_id = $2 AND status = 'draft' \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
    .context("failed to submit plan")?;

    Ok(plan)
}

/// `pending -> approved`, recording the reviewer. An optional comment is kept.
pub async fn mark_approved(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    reviewer_id: Uuid,
    comment: Option<&str>,
) -> Result<Option<AnnualPlan>> {
    let plan = sqlx::query_as::<_, AnnualPlan>(
        "UPDATE annual_plans \
         SET status = 'approved', reviewed_at = now(), reviewed_by = $3, \
             reviewer_comment = COALESCE($4, reviewer_comment), updated_at = now() \
         WHERE id = $1 AND school_id = $2 AND status = 'pending' \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(reviewer_id)
    .bind(comment)
    .fetch_optional(pool)
    .await
    .context("failed to approve plan")?;

    Ok(plan)
}

/// `pending -> rejected`. The caller guarantees `comment` is not blank.
pub async fn mark_rejected(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    reviewer_id: Uuid,
    comment: &str,
) -> Result<Option<AnnualPlan>> {
    let plan = sqlx::query_as::<_, AnnualPlan>(
        "UPDATE annual_plans \
         SET status = 'rejected', reviewed_at = now(), reviewed_by = $3, \
             reviewer_comment = $4, updated_at = now() \
         WHERE id = $1 AND school_id = $2 AND status = 'pending' \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(reviewer_id)
    .bind(comment)
    .fetch_optional(pool)
    .await
    .context("failed to reject plan")?;

    Ok(plan)
}
