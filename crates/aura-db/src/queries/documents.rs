//! Database query functions for the `documents` table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Document, DocumentKind};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub user_id: Uuid,
    pub kind: DocumentKind,
    #[serde(default)]
    pub number: String,
    pub file_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentChanges {
    pub kind: Option<DocumentKind>,
    pub number: Option<String>,
    pub file_url: Option<String>,
}

list_filter! {
    DocumentFilter {
        kind: DocumentKind,
        user_id: Uuid,
    }
}

pub async fn insert_document(pool: &PgPool, school_id: Uuid, new: &NewDocument) -> Result<Document> {
    let document = sqlx::query_as::<_, Document>(
        "INSERT INTO documents (school_id, user_id, kind, number, file_url) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.user_id)
    .bind(new.kind)
    .bind(&new.number)
    .bind(&new.file_url)
    .fetch_one(pool)
    .await
    .context("failed to insert document")?;

    Ok(document)
}

pub async fn get_document(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<Document>> {
    let document =
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1 AND school_id = $2")
            .bind(id)
            .bind(school_id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch document")?;

    Ok(document)
}

pub async fn list_documents(
    pool: &PgPool,
    school_id: Uuid,
    filter: &DocumentFilter,
) -> Result<Vec<Document>> {
    Listing::from_table("documents")
        .eq("school_id", Some(school_id))
        .eq("kind", filter.kind)
        .eq("user_id", filter.user_id)
        .finish(filter.page(), &["number"], &["created_at"], "-created_at")
        .fetch_all(pool)
        .await
}

pub async fn update_document(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &DocumentChanges,
) -> Result<Option<Document>> {
    let document = sqlx::query_as::<_, Document>(
        "UPDATE documents SET \
             kind = COALESCE($3, kind), \
             number = COALESCE($4, number), \
             file_url = COALESCE($5, file_url), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(changes.kind)
    .bind(&changes.number)
    .bind(&changes.file_url)
    .fetch_optional(pool)
    .await
    .context("failed to update document")?;

    Ok(document)
}

pub async fn delete_document(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete document")?;

    Ok(result.rows_affected() > 0)
}
