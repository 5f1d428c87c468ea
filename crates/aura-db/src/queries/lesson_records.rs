//! Database query functions for the `lesson_records` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::LessonRecord;
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLessonRecord {
    pub class_id: Uuid,
    /// Defaults to the creating user.
    pub teacher_id: Option<Uuid>,
    pub taught_on: NaiveDate,
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Student id to presence, e.g. `{"<uuid>": true}`.
    pub attendance: Option<serde_json::Value>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonRecordChanges {
    pub taught_on: Option<NaiveDate>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub attendance: Option<serde_json::Value>,
    pub notes: Option<String>,
}

list_filter! {
    LessonRecordFilter {
        class_id: Uuid,
        teacher_id: Uuid,
        taught_on: NaiveDate,
    }
}

pub async fn insert_lesson_record(
    pool: &PgPool,
    school_id: Uuid,
    teacher_id: Uuid,
    new: &NewLessonRecord,
) -> Result<LessonRecord> {
    let record = sqlx::query_as::<_, LessonRecord>(
        "INSERT INTO lesson_records (school_id, class_id, teacher_id, taught_on, title, content, attendance, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, '{}'::jsonb), $8) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.class_id)
    .bind(teacher_id)
    .bind(new.taught_on)
    .bind(&new.title)
    .bind(&new.content)
    .bind(&new.attendance)
    .bind(&new.notes)
    .fetch_one(pool)
    .await
    .context("failed to insert lesson record")?;

    Ok(record)
}

pub async fn get_lesson_record(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
) -> Result<Option<LessonRecord>> {
    let record = sqlx::query_as::<_, LessonRecord>(
        "SELECT * FROM lesson_records WHERE id = $1 AND school_id = $2",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch lesson record")?;

    Ok(record)
}

pub async fn list_lesson_records(
    pool: &PgPool,
    school_id: Uuid,
    filter: &LessonRecordFilter,
) -> Result<Vec<LessonRecord>> {
    Listing::from_table("lesson_records")
        .eq("school_id", Some(school_id))
        .eq("class_id", filter.class_id)
        .eq("teacher_id", filter.teacher_id)
        .eq("taught_on", filter.taught_on)
        .finish(filter.page(), &["title"], &["taught_on", "created_at"], "-taught_on")
        .fetch_all(pool)
        .await
}

pub async fn update_lesson_record(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &LessonRecordChanges,
) -> Result<Option<LessonRecord>> {
    let record = sqlx::query_as::<_, LessonRecord>(
        "UPDATE lesson_records SET \
             taught_on = COALESCE($3, taught_on), \
             title = COALESCE($4, title), \
             content = COALESCE($5, content), \
             attendance = COALESCE($6, attendance), \
             notes = COALESCE($7, notes), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(changes.taught_on)
    .bind(&changes.title)
    .bind(&changes.content)
    .bind(&changes.attendance)
    .bind(&changes.notes)
    .fetch_optional(pool)
    .await
    .context("failed to update lesson record")?;

    Ok(record)
}

pub async fn delete_lesson_record(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM lesson_records WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete lesson record")?;

    Ok(result.rows_affected() > 0)
}
