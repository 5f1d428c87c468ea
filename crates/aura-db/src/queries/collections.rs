//! Database query functions for `template_collections` and their
//! `collection_templates` membership.
//!
//! Members are lesson templates visible to the collection's author; ids the
//! author cannot see are dropped when the membership is written.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{GradeLevel, TemplateCollection};
use crate::queries::listing::Listing;

const SELECT_COLLECTION: &str = "SELECT c.*, \
     ARRAY(SELECT ct.template_id FROM collection_templates ct \
           WHERE ct.collection_id = c.id ORDER BY ct.position) AS template_ids \
     FROM template_collections c";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCollection {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub grade_level: Option<GradeLevel>,
    #[serde(default)]
    pub public: bool,
    /// Ordered lesson template ids.
    #[serde(default)]
    pub template_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub grade_level: Option<GradeLevel>,
    pub public: Option<bool>,
    /// Replaces the whole membership when present.
    pub template_ids: Option<Vec<Uuid>>,
}

list_filter! {
    CollectionFilter {
        grade_level: GradeLevel,
        public: bool,
    }
}

async fn fetch_collection(conn: &mut PgConnection, id: Uuid) -> Result<TemplateCollection> {
    let collection =
        sqlx::query_as::<_, TemplateCollection>(&format!("{SELECT_COLLECTION} WHERE c.id = $1"))
            .bind(id)
            .fetch_one(conn)
            .await
            .context("failed to reload collection")?;

    Ok(collection)
}

async fn replace_members(
    conn: &mut PgConnection,
    collection_id: Uuid,
    author_id: Uuid,
    template_ids: &[Uuid],
) -> Result<()> {
    sqlx::query("DELETE FROM collection_templates WHERE collection_id = $1")
        .bind(collection_id)
        .execute(&mut *conn)
        .await
        .context("failed to clear collection members")?;

    sqlx::query(
        "INSERT INTO collection_templates (collection_id, template_id, position) \
         SELECT $1, t.id, MIN(u.ord)::int \
         FROM UNNEST($2::uuid[]) WITH ORDINALITY AS u(template_id, ord) \
         JOIN lesson_templates t ON t.id = u.template_id \
         WHERE t.public OR t.author_id = $3 \
         GROUP BY t.id",
    )
    .bind(collection_id)
    .bind(template_ids)
    .bind(author_id)
    .execute(&mut *conn)
    .await
    .context("failed to write collection members")?;

    Ok(())
}

pub async fn insert_collection(
    pool: &PgPool,
    author_id: Uuid,
    new: &NewCollection,
) -> Result<TemplateCollection> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO template_collections (author_id, title, description, grade_level, public) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id",
    )
    .bind(author_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.grade_level)
    .bind(new.public)
    .fetch_one(&mut *tx)
    .await
    .context("failed to insert collection")?;

    replace_members(&mut tx, id, author_id, &new.template_ids).await?;
    let collection = fetch_collection(&mut tx, id).await?;

    tx.commit().await.context("failed to commit collection")?;
    Ok(collection)
}

pub async fn get_collection(
    pool: &PgPool,
    viewer_id: Uuid,
    id: Uuid,
) -> Result<Option<TemplateCollection>> {
    let collection = sqlx::query_as::<_, TemplateCollection>(&format!(
        "{SELECT_COLLECTION} WHERE c.id = $1 AND (c.public OR c.author_id = $2)"
    ))
    .bind(id)
    .bind(viewer_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch collection")?;

    Ok(collection)
}

pub async fn list_collections(
    pool: &PgPool,
    viewer_id: Uuid,
    filter: &CollectionFilter,
) -> Result<Vec<TemplateCollection>> {
    Listing::from_select(SELECT_COLLECTION)
        .public_or_authored_by(viewer_id)
        .eq("grade_level", filter.grade_level)
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

pub async fn update_collection(
    pool: &PgPool,
    author_id: Uuid,
    id: Uuid,
    changes: &CollectionChanges,
) -> Result<Option<TemplateCollection>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let updated: Option<Uuid> = sqlx::query_scalar(
        "UPDATE template_collections SET \
             title = COALESCE($3, title), \
             description = COALESCE($4, description), \
             grade_level = COALESCE($5, grade_level), \
             public = COALESCE($6, public), \
             updated_at = now() \
         WHERE id = $1 AND author_id = $2 \
         RETURNING id",
    )
    .bind(id)
    .bind(author_id)
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.grade_level)
    .bind(changes.public)
    .fetch_optional(&mut *tx)
    .await
    .context("failed to update collection")?;

    let Some(id) = updated else {
        return Ok(None);
    };

    if let Some(template_ids) = &changes.template_ids {
        replace_members(&mut tx, id, author_id, template_ids).await?;
    }
    let collection = fetch_collection(&mut tx, id).await?;

    tx.commit().await.context("failed to commit collection")?;
    Ok(Some(collection))
}

pub async fn delete_collection(pool: &PgPool, author_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM template_collections WHERE id = $1 AND author_id = $2")
        .bind(id)
        .bind(author_id)
        .execute(pool)
        .await
        .context("failed to delete collection")?;

    Ok(result.rows_affected() > 0)
}
