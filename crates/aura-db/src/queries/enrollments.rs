//! Database query functions for the `enrollments` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Enrollment, EnrollmentStatus};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrollment {
    pub student_id: Uuid,
    pub number: String,
    pub academic_year: i32,
    pub status: Option<EnrollmentStatus>,
    /// Defaults to today.
    pub enrolled_on: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentChanges {
    pub number: Option<String>,
    pub academic_year: Option<i32>,
    pub status: Option<EnrollmentStatus>,
    pub enrolled_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

list_filter! {
    EnrollmentFilter {
        status: EnrollmentStatus,
        academic_year: i32,
        student_id: Uuid,
    }
}

pub async fn insert_enrollment(
    pool: &PgPool,
    school_id: Uuid,
    new: &NewEnrollment,
) -> Result<Enrollment> {
    let enrollment = sqlx::query_as::<_, Enrollment>(
        "INSERT INTO enrollments (school_id, student_id, number, academic_year, status, enrolled_on, notes) \
         VALUES ($1, $2, $3, $4, COALESCE($5, 'active'), COALESCE($6, CURRENT_DATE), $7) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.student_id)
    .bind(&new.number)
    .bind(new.academic_year)
    .bind(new.status)
    .bind(new.enrolled_on)
    .bind(&new.notes)
    .fetch_one(pool)
    .await
    .context("failed to insert enrollment")?;

    Ok(enrollment)
}

pub async fn get_enrollment(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<Enrollment>> {
    let enrollment = sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE id = $1 AND school_id = $2",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch enrollment")?;

    Ok(enrollment)
}

pub async fn list_enrollments(
    pool: &PgPool,
    school_id: Uuid,
    filter: &EnrollmentFilter,
) -> Result<Vec<Enrollment>> {
    Listing::from_table("enrollments")
        .eq("school_id", Some(school_id))
        .eq("status", filter.status)
        .eq("academic_year", filter.academic_year)
        .eq("student_id", filter.student_id)
        .finish(
            filter.page(),
            &["number"],
            &["enrolled_on", "created_at"],
            "-enrolled_on",
        )
        .fetch_all(pool)
        .await
}

pub async fn update_enrollment(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &EnrollmentChanges,
) -> Result<Option<Enrollment>> {
    let enrollment = sqlx::query_as::<_, Enrollment>(
        "UPDATE enrollments SET \
             number = COALESCE($3, number), \
             academic_year = COALESCE($4, academic_year), \
             status = COALESCE($5, status), \
             enrolled_on = COALESCE($6, enrolled_on), \
             notes = COALESCE($7, notes), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(&changes.number)
    .bind(changes.academic_year)
    .bind(changes.status)
    .bind(changes.enrolled_on)
    .bind(&changes.notes)
    .fetch_optional(pool)
    .await
    .context("failed to update enrollment")?;

    Ok(enrollment)
}

pub async fn delete_enrollment(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM enrollments WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete enrollment")?;

    Ok(result.rows_affected() > 0)
}
