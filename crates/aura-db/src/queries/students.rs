//! Database query functions for the `students` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Student;
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
    pub user_id: Uuid,
    pub registration_number: String,
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub guardian_name: String,
    #[serde(default)]
    pub guardian_phone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentChanges {
    pub registration_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
}

list_filter! {
    StudentFilter {
        user_id: Uuid,
    }
}

pub async fn insert_student(pool: &PgPool, school_id: Uuid, new: &NewStudent) -> Result<Student> {
    let student = sqlx::query_as::<_, Student>(
        "INSERT INTO students (school_id, user_id, registration_number, birth_date, guardian_name, guardian_phone) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.user_id)
    .bind(&new.registration_number)
    .bind(new.birth_date)
    .bind(&new.guardian_name)
    .bind(&new.guardian_phone)
    .fetch_one(pool)
    .await
    .context("failed to insert student")?;

    Ok(student)
}

pub async fn get_student(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<Student>> {
    let student =
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1 AND school_id = $2")
            .bind(id)
            .bind(school_id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch student")?;

    Ok(student)
}

pub async fn list_students(
    pool: &PgPool,
    school_id: Uuid,
    filter: &StudentFilter,
) -> Result<Vec<Student>> {
    Listing::from_table("students")
        .eq("school_id", Some(school_id))
        .eq("user_id", filter.user_id)
        .finish(
            filter.page(),
            &["registration_number", "guardian_name"],
            &["registration_number", "created_at"],
            "-created_at",
        )
        .fetch_all(pool)
        .await
}

pub async fn update_student(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &StudentChanges,
) -> Result<Option<Student>> {
    let student = sqlx::query_as::<_, Student>(
        "UPDATE students SET \
             registration_number = COALESCE($3, registration_number), \
             birth_date = COALESCE($4, birth_date), \
             guardian_name = COALESCE($5, guardian_name), \
             guardian_phone = COALESCE($6, guardian_phone), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(&changes.registration_number)
    .bind(changes.birth_date)
    .bind(&changes.guardian_name)
    .bind(&changes.guardian_phone)
    .fetch_optional(pool)
    .await
    .context("failed to update student")?;

    Ok(student)
}

pub async fn delete_student(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM students WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete student")?;

    Ok(result.rows_affected() > 0)
}
