//! Database query functions for the `lesson_templates` table.
//!
//! Reads see rows that are `public` or authored by the viewer. Writes are
//! limited to the author.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{GradeLevel, LessonTemplate};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLessonTemplate {
    pub title: String,
    pub grade_level: GradeLevel,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub learning_objectives: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub bncc_skills: Vec<String>,
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonTemplateChanges {
    pub title: Option<String>,
    pub grade_level: Option<GradeLevel>,
    pub theme: Option<String>,
    pub learning_objectives: Option<String>,
    pub content: Option<String>,
    pub bncc_skills: Option<Vec<String>>,
    pub duration_minutes: Option<i32>,
    pub public: Option<bool>,
    pub editable: Option<bool>,
}

list_filter! {
    LessonTemplateFilter {
        grade_level: GradeLevel,
        public: bool,
        theme: String,
    }
}

pub async fn insert_lesson_template(
    pool: &PgPool,
    author_id: Uuid,
    new: &NewLessonTemplate,
) -> Result<LessonTemplate> {
    let template = sqlx::query_as::<_, LessonTemplate>(
        "INSERT INTO lesson_templates \
             (author_id, title, grade_level, theme, learning_objectives, content, bncc_skills, duration_minutes, public) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 50), $9) \
         RETURNING *",
    )
    .bind(author_id)
    .bind(&new.title)
    .bind(new.grade_level)
    .bind(&new.theme)
    .bind(&new.learning_objectives)
    .bind(&new.content)
    .bind(Json(&new.bncc_skills))
    .bind(new.duration_minutes)
    .bind(new.public)
    .fetch_one(pool)
    .await
    .context("failed to insert lesson template")?;

    Ok(template)
}

pub async fn get_lesson_template(
    pool: &PgPool,
    viewer_id: Uuid,
    id: Uuid,
) -> Result<Option<LessonTemplate>> {
    let template = sqlx::query_as::<_, LessonTemplate>(
        "SELECT * FROM lesson_templates WHERE id = $1 AND (public OR author_id = $2)",
    )
    .bind(id)
    .bind(viewer_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch lesson template")?;

    Ok(template)
}

pub async fn list_lesson_templates(
    pool: &PgPool,
    viewer_id: Uuid,
    filter: &LessonTemplateFilter,
) -> Result<Vec<LessonTemplate>> {
    Listing::from_table("lesson_templates")
        .public_or_authored_by(viewer_id)
        .eq("grade_level", filter.grade_level)
        .eq("public", filter.public)
        .eq("theme", filter.theme.clone())
        .finish(
            filter.page(),
            &["title", "learning_objectives"],
            &["created_at", "title"],
            "-created_at",
        )
        .fetch_all(pool)
        .await
}

/// Update a template the caller authored. Locked (`editable = false`)
/// templates only accept a change to `editable` itself.
pub async fn update_lesson_template(
    pool: &PgPool,
    author_id: Uuid,
    id: Uuid,
    changes: &LessonTemplateChanges,
) -> Result<Option<LessonTemplate>> {
    let template = sqlx::query_as::<_, LessonTemplate>(
        "UPDATE lesson_templates SET \
             title = CASE WHEN editable THEN COALESCE($3, title) ELSE title END, \
             grade_level = CASE WHEN editable THEN COALESCE($4, grade_level) ELSE grade_level END, \
             theme = CASE WHEN editable THEN COALESCE($5, theme) ELSE theme END, \
             learning_objectives = CASE WHEN editable THEN COALESCE($6, learning_objectives) ELSE learning_objectives END, \
             content = CASE WHEN editable THEN COALESCE($7, content) ELSE content END, \
             bncc_skills = CASE WHEN editable THEN COALESCE($8, bncc_skills) ELSE bncc_skills END, \
             duration_minutes = CASE WHEN editable THEN COALESCE($9, duration_minutes) ELSE duration_minutes END, \
             public = CASE WHEN editable THEN COALESCE($10, public) ELSE public END, \
             editable = COALESCE($11, editable), \
             updated_at = now() \
         WHERE id = $1 AND author_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(author_id)
    .bind(&changes.title)
    .bind(changes.grade_level)
    .bind(&changes.theme)
    .bind(&changes.learning_objectives)
    .bind(&changes.content)
    .bind(changes.bncc_skills.as_ref().map(Json))
    .bind(changes.duration_minutes)
    .bind(changes.public)
    .bind(changes.editable)
    .fetch_optional(pool)
    .await
    .context("failed to update lesson template")?;

    Ok(template)
}

pub async fn delete_lesson_template(pool: &PgPool, author_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM lesson_templates WHERE id = $1 AND author_id = $2")
        .bind(id)
        .bind(author_id)
        .execute(pool)
        .await
        .context("failed to delete lesson template")?;

    Ok(result.rows_affected() > 0)
}

/// Copy a template visible to `viewer_id` into a new private, editable
/// template authored by the viewer, titled `"<title> (copy)"`.
pub async fn duplicate_lesson_template(
    pool: &PgPool,
    viewer_id: Uuid,
    id: Uuid,
) -> Result<Option<LessonTemplate>> {
    let template = sqlx::query_as::<_, LessonTemplate>(
        "INSERT INTO lesson_templates \
             (author_id, title, grade_level, theme, learning_objectives, content, bncc_skills, duration_minutes, public, editable) \
         SELECT $2, title || ' (copy)', grade_level, theme, learning_objectives, content, bncc_skills, \
                duration_minutes, FALSE, TRUE \
         FROM lesson_templates \
         WHERE id = $1 AND (public OR author_id = $2) \
         RETURNING *",
    )
    .bind(id)
    .bind(viewer_id)
    .fetch_optional(pool)
    .await
    .context("failed to duplicate lesson template")?;

    Ok(template)
}
