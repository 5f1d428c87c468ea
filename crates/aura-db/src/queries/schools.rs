//! Database query functions for the `schools` table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::School;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSchool {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

pub async fn insert_school(pool: &PgPool, new: &NewSchool) -> Result<School> {
    let school = sqlx::query_as::<_, School>(
        "INSERT INTO schools (name, code, address, phone, email) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.code)
    .bind(&new.address)
    .bind(&new.phone)
    .bind(&new.email)
    .fetch_one(pool)
    .await
    .context("failed to insert school")?;

    Ok(school)
}

pub async fn get_school(pool: &PgPool, id: Uuid) -> Result<Option<School>> {
    let school = sqlx::query_as::<_, School>("SELECT * FROM schools WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch school")?;

    Ok(school)
}

pub async fn get_school_by_code(pool: &PgPool, code: &str) -> Result<Option<School>> {
    let school = sqlx::query_as::<_, School>("SELECT * FROM schools WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
        .context("failed to fetch school by code")?;

    Ok(school)
}

pub async fn list_schools(pool: &PgPool) -> Result<Vec<School>> {
    let schools = sqlx::query_as::<_, School>("SELECT * FROM schools ORDER BY name ASC")
        .fetch_all(pool)
        .await
        .context("failed to list schools")?;

    Ok(schools)
}
