//! Database query functions for the `staff` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Staff, StaffPosition};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStaff {
    pub user_id: Uuid,
    pub registration_number: String,
    pub position: StaffPosition,
    #[serde(default)]
    pub department: String,
    pub hired_on: NaiveDate,
    pub salary: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffChanges {
    pub registration_number: Option<String>,
    pub position: Option<StaffPosition>,
    pub department: Option<String>,
    pub hired_on: Option<NaiveDate>,
    pub salary: Option<Decimal>,
    pub active: Option<bool>,
}

list_filter! {
    StaffFilter {
        position: StaffPosition,
        active: bool,
    }
}

pub async fn insert_staff(pool: &PgPool, school_id: Uuid, new: &NewStaff) -> Result<Staff> {
    let staff = sqlx::query_as::<_, Staff>(
        "INSERT INTO staff (school_id, user_id, registration_number, position, department, hired_on, salary) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.user_id)
    .bind(&new.registration_number)
    .bind(new.position)
    .bind(&new.department)
    .bind(new.hired_on)
    .bind(new.salary)
    .fetch_one(pool)
    .await
    .context("failed to insert staff member")?;

    Ok(staff)
}

pub async fn get_staff(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<Staff>> {
    let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch staff member")?;

    Ok(staff)
}

pub async fn list_staff(pool: &PgPool, school_id: Uuid, filter: &StaffFilter) -> Result<Vec<Staff>> {
    Listing::from_table("staff")
        .eq("school_id", Some(school_id))
        .eq("position", filter.position)
        .eq("active", filter.active)
        .finish(
            filter.page(),
            &["registration_number", "department"],
            &["hired_on", "salary", "created_at"],
            "-hired_on",
        )
        .fetch_all(pool)
        .await
}

pub async fn update_staff(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &StaffChanges,
) -> Result<Option<Staff>> {
    let staff = sqlx::query_as::<_, Staff>(
        "UPDATE staff SET \
             registration_number = COALESCE($3, registration_number), \
             position = COALESCE($4, position), \
             department = COALESCE($5, department), \
             hired_on = COALESCE($6, hired_on), \
             salary = COALESCE($7, salary), \
             active = COALESCE($8, active), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(&changes.registration_number)
    .bind(changes.position)
    .bind(&changes.department)
    .bind(changes.hired_on)
    .bind(changes.salary)
    .bind(changes.active)
    .fetch_optional(pool)
    .await
    .context("failed to update staff member")?;

    Ok(staff)
}

pub async fn delete_staff(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM staff WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete staff member")?;

    Ok(result.rows_affected() > 0)
}
