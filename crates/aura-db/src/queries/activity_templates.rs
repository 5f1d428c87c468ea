//! Database query functions for the `activity_templates` table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{ActivityKind, ActivityTemplate, Difficulty, GradeLevel};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivityTemplate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub kind: ActivityKind,
    pub grade_level: GradeLevel,
    pub difficulty: Option<Difficulty>,
    pub estimated_minutes: Option<i32>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub bncc_skills: Vec<String>,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityTemplateChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<ActivityKind>,
    pub grade_level: Option<GradeLevel>,
    pub difficulty: Option<Difficulty>,
    pub estimated_minutes: Option<i32>,
    pub instructions: Option<String>,
    pub bncc_skills: Option<Vec<String>>,
    pub public: Option<bool>,
}

list_filter! {
    ActivityTemplateFilter {
        kind: ActivityKind,
        grade_level: GradeLevel,
        difficulty: Difficulty,
        public: bool,
    }
}

pub async fn insert_activity_template(
    pool: &PgPool,
    author_id: Uuid,
    new: &NewActivityTemplate,
) -> Result<ActivityTemplate> {
    let template = sqlx::query_as::<_, ActivityTemplate>(
        "INSERT INTO activity_templates \
             (author_id, title, description, kind, grade_level, difficulty, estimated_minutes, instructions, bncc_skills, public) \
         VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'medium'), COALESCE($7, 30), $8, $9, $10) \
         RETURNING *",
    )
    .bind(author_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.kind)
    .bind(new.grade_level)
    .bind(new.difficulty)
    .bind(new.estimated_minutes)
    .bind(&new.instructions)
    .bind(Json(&new.bncc_skills))
    .bind(new.public)
    .fetch_one(pool)
    .await
    .context("failed to insert activity template")?;

    Ok(template)
}

pub async fn get_activity_template(
    pool: &PgPool,
    viewer_id: Uuid,
    id: Uuid,
) -> Result<Option<ActivityTemplate>> {
    let template = sqlx::query_as::<_, ActivityTemplate>(
        "SELECT * FROM activity_templates WHERE id = $1 AND (public OR author_id = $2)",
    )
    .bind(id)
    .bind(viewer_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch activity template")?;

    Ok(template)
}

pub async fn list_activity_templates(
    pool: &PgPool,
    viewer_id: Uuid,
    filter: &ActivityTemplateFilter,
) -> Result<Vec<ActivityTemplate>> {
    Listing::from_table("activity_templates")
        .public_or_authored_by(viewer_id)
        .eq("kind", filter.kind)
        .eq("grade_level", filter.grade_level)
        .eq("difficulty", filter.difficulty)
        .eq("public", filter.public)
        .finish(
            filter.page(),
            &["title", "description"],
            &["created_at", "estimated_minutes", "title"],
            "-created_at",
        )
        .fetch_all(pool)
        .await
}

pub async fn update_activity_template(
    pool: &PgPool,
    author_id: Uuid,
    id: Uuid,
    changes: &ActivityTemplateChanges,
) -> Result<Option<ActivityTemplate>> {
    let template = sqlx::query_as::<_, ActivityTemplate>(
        "UPDATE activity_templates SET \
             title = COALESCE($3, title), \
             description = COALESCE($4, description), \
             kind = COALESCE($5, kind), \
             grade_level = COALESCE($6, grade_level), \
             difficulty = COALESCE($7, difficulty), \
             estimated_minutes = COALESCE($8, estimated_minutes), \
             instructions = COALESCE($9, instructions), \
             bncc_skills = COALESCE($10, bncc_skills), \
             public = COALESCE($11, public), \
             updated_at = now() \
         WHERE id = $1 AND author_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(author_id)
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.kind)
    .bind(changes.grade_level)
    .bind(changes.difficulty)
    .bind(changes.estimated_minutes)
    .bind(&changes.instructions)
    .bind(changes.bncc_skills.as_ref().map(Json))
    .bind(changes.public)
    .fetch_optional(pool)
    .await
    .context("failed to update activity template")?;

    Ok(template)
}

pub async fn delete_activity_template(pool: &PgPool, author_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM activity_templates WHERE id = $1 AND author_id = $2")
        .bind(id)
        .bind(author_id)
        .execute(pool)
        .await
        .context("failed to delete activity template")?;

    Ok(result.rows_affected() > 0)
}
