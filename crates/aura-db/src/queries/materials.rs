//! Database query functions for the `teaching_materials` table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{GradeLevel, MaterialKind, TeachingMaterial};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMaterial {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub kind: MaterialKind,
    pub grade_level: GradeLevel,
    #[serde(default)]
    pub theme: String,
    pub file_url: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<MaterialKind>,
    pub grade_level: Option<GradeLevel>,
    pub theme: Option<String>,
    pub file_url: Option<String>,
    pub public: Option<bool>,
}

list_filter! {
    MaterialFilter {
        kind: MaterialKind,
        grade_level: GradeLevel,
        theme: String,
        public: bool,
    }
}

pub async fn insert_material(
    pool: &PgPool,
    author_id: Uuid,
    new: &NewMaterial,
) -> Result<TeachingMaterial> {
    let material = sqlx::query_as::<_, TeachingMaterial>(
        "INSERT INTO teaching_materials \
             (author_id, title, description, kind, grade_level, theme, file_url, public) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING *",
    )
    .bind(author_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.kind)
    .bind(new.grade_level)
    .bind(&new.theme)
    .bind(&new.file_url)
    .bind(new.public)
    .fetch_one(pool)
    .await
    .context("failed to insert teaching material")?;

    Ok(material)
}

pub async fn get_material(
    pool: &PgPool,
    viewer_id: Uuid,
    id: Uuid,
) -> Result<Option<TeachingMaterial>> {
    let material = sqlx::query_as::<_, TeachingMaterial>(
        "SELECT * FROM teaching_materials WHERE id = $1 AND (public OR author_id = $2)",
    )
    .bind(id)
    .bind(viewer_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch teaching material")?;

    Ok(material)
}

pub async fn list_materials(
    pool: &PgPool,
    viewer_id: Uuid,
    filter: &MaterialFilter,
) -> Result<Vec<TeachingMaterial>> {
    Listing::from_table("teaching_materials")
        .public_or_authored_by(viewer_id)
        .eq("kind", filter.kind)
        .eq("grade_level", filter.grade_level)
        .eq("theme", filter.theme.clone())
        .eq("public", filter.public)
        .finish(
            filter.page(),
            &["title", "description"],
            &["created_at", "title"],
            "-created_at",
        )
        .fetch_all(pool)
        .await
}

pub async fn update_material(
    pool: &PgPool,
    author_id: Uuid,
    id: Uuid,
    changes: &MaterialChanges,
) -> Result<Option<TeachingMaterial>> {
    let material = sqlx::query_as::<_, TeachingMaterial>(
        "UPDATE teaching_materials SET \
             title = COALESCE($3, title), \
             description = COALESCE($4, description), \
             kind = COALESCE($5, kind), \
             grade_level = COALESCE($6, grade_level), \
             theme = COALESCE($7, theme), \
             file_url = COALESCE($8, file_url), \
             public = COALESCE($9, public), \
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
    .bind(&changes.theme)
    .bind(&changes.file_url)
    .bind(changes.public)
    .fetch_optional(pool)
    .await
    .context("failed to update teaching material")?;

    Ok(material)
}

pub async fn delete_material(pool: &PgPool, author_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM teaching_materials WHERE id = $1 AND author_id = $2")
        .bind(id)
        .bind(author_id)
        .execute(pool)
        .await
        .context("failed to delete teaching material")?;

    Ok(result.rows_affected() > 0)
}
