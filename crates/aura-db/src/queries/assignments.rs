//! Database query functions for the `assignments` table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Assignment, AssignmentStatus};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssignment {
    pub class_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_at: DateTime<Utc>,
    pub status: Option<AssignmentStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub status: Option<AssignmentStatus>,
}

list_filter! {
    AssignmentFilter {
        class_id: Uuid,
        status: AssignmentStatus,
    }
}

pub async fn insert_assignment(
    pool: &PgPool,
    school_id: Uuid,
    new: &NewAssignment,
) -> Result<Assignment> {
    let assignment = sqlx::query_as::<_, Assignment>(
        "INSERT INTO assignments (school_id, class_id, title, description, due_at, status) \
         VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'draft')) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.class_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.due_at)
    .bind(new.status)
    .fetch_one(pool)
    .await
    .context("failed to insert assignment")?;

    Ok(assignment)
}

pub async fn get_assignment(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<Assignment>> {
    let assignment = sqlx::query_as::<_, Assignment>(
        "SELECT * FROM assignments WHERE id = $1 AND school_id = $2",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch assignment")?;

    Ok(assignment)
}

pub async fn list_assignments(
    pool: &PgPool,
    school_id: Uuid,
    filter: &AssignmentFilter,
) -> Result<Vec<Assignment>> {
    Listing::from_table("assignments")
        .eq("school_id", Some(school_id))
        .eq("class_id", filter.class_id)
        .eq("status", filter.status)
        .finish(filter.page(), &["title"], &["due_at", "created_at"], "due_at")
        .fetch_all(pool)
        .await
}

pub async fn update_assignment(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &AssignmentChanges,
) -> Result<Option<Assignment>> {
    let assignment = sqlx::query_as::<_, Assignment>(
        "UPDATE assignments SET \
             title = COALESCE($3, title), \
             description = COALESCE($4, description), \
             due_at = COALESCE($5, due_at), \
             status = COALESCE($6, status), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.due_at)
    .bind(changes.status)
    .fetch_optional(pool)
    .await
    .context("failed to update assignment")?;

    Ok(assignment)
}

pub async fn delete_assignment(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM assignments WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete assignment")?;

    Ok(result.rows_affected() > 0)
}
