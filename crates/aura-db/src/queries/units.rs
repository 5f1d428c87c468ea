//! Database query functions for the `thematic_units` table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::ThematicUnit;
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUnit {
    pub plan_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub bncc_skills: Vec<String>,
    pub duration_weeks: Option<i32>,
    pub position: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub bncc_skills: Option<Vec<String>>,
    pub duration_weeks: Option<i32>,
    pub position: Option<i32>,
}

list_filter! {
    UnitFilter {
        plan_id: Uuid,
    }
}

pub async fn insert_unit(pool: &PgPool, school_id: Uuid, new: &NewUnit) -> Result<ThematicUnit> {
    let unit = sqlx::query_as::<_, ThematicUnit>(
        "INSERT INTO thematic_units (school_id, plan_id, title, description, bncc_skills, duration_weeks, position) \
         VALUES ($1, $2, $3, $4, $5, COALESCE($6, 1), $7) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.plan_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(Json(&new.bncc_skills))
    .bind(new.duration_weeks)
    .bind(new.position)
    .fetch_one(pool)
    .await
    .context("failed to insert thematic unit")?;

    Ok(unit)
}

pub async fn get_unit(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<ThematicUnit>> {
    let unit = sqlx::query_as::<_, ThematicUnit>(
        "SELECT * FROM thematic_units WHERE id = $1 AND school_id = $2",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch thematic unit")?;

    Ok(unit)
}

pub async fn list_units(pool: &PgPool, school_id: Uuid, filter: &UnitFilter) -> Result<Vec<ThematicUnit>> {
    Listing::from_table("thematic_units")
        .eq("school_id", Some(school_id))
        .eq("plan_id", filter.plan_id)
        .finish(filter.page(), &["title"], &["position", "created_at"], "position")
        .fetch_all(pool)
        .await
}

/// Units of one plan in `position` order.
pub async fn list_units_for_plan(
    pool: &PgPool,
    school_id: Uuid,
    plan_id: Uuid,
) -> Result<Vec<ThematicUnit>> {
    let units = sqlx::query_as::<_, ThematicUnit>(
        "SELECT * FROM thematic_units \
         WHERE plan_id = $1 AND school_id = $2 \
         ORDER BY position ASC",
    )
    .bind(plan_id)
    .bind(school_id)
    .fetch_all(pool)
    .await
    .context("failed to list units for plan")?;

    Ok(units)
}

pub async fn update_unit(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &UnitChanges,
) -> Result<Option<ThematicUnit>> {
    let unit = sqlx::query_as::<_, ThematicUnit>(
        "UPDATE thematic_units SET \
             title = COALESCE($3, title), \
             description = COALESCE($4, description), \
             bncc_skills = COALESCE($5, bncc_skills), \
             duration_weeks = COALESCE($6, duration_weeks), \
             position = COALESCE($7, position), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.bncc_skills.as_ref().map(Json))
    .bind(changes.duration_weeks)
    .bind(changes.position)
    .fetch_optional(pool)
    .await
    .context("failed to update thematic unit")?;

    Ok(unit)
}

pub async fn delete_unit(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM thematic_units WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete thematic unit")?;

    Ok(result.rows_affected() > 0)
}
