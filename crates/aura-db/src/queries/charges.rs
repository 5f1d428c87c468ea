//! Database query functions for the `charges` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Charge, ChargeKind, ChargeStatus};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCharge {
    pub student_id: Uuid,
    pub kind: ChargeKind,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
    pub due_on: NaiveDate,
    pub status: Option<ChargeStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChargeChanges {
    pub kind: Option<ChargeKind>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub due_on: Option<NaiveDate>,
    pub status: Option<ChargeStatus>,
}

list_filter! {
    ChargeFilter {
        kind: ChargeKind,
        status: ChargeStatus,
        student_id: Uuid,
    }
}

pub async fn insert_charge(pool: &PgPool, school_id: Uuid, new: &NewCharge) -> Result<Charge> {
    let charge = sqlx::query_as::<_, Charge>(
        "INSERT INTO charges (school_id, student_id, kind, description, amount, due_on, status, paid_at) \
         VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'pending'), \
                 CASE WHEN $7 = 'paid' THEN now() END) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.student_id)
    .bind(new.kind)
    .bind(&new.description)
    .bind(new.amount)
    .bind(new.due_on)
    .bind(new.status)
    .fetch_one(pool)
    .await
    .context("failed to insert charge")?;

    Ok(charge)
}

pub async fn get_charge(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<Charge>> {
    let charge = sqlx::query_as::<_, Charge>("SELECT * FROM charges WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch charge")?;

    Ok(charge)
}

pub async fn list_charges(pool: &PgPool, school_id: Uuid, filter: &ChargeFilter) -> Result<Vec<Charge>> {
    Listing::from_table("charges")
        .eq("school_id", Some(school_id))
        .eq("kind", filter.kind)
        .eq("status", filter.status)
        .eq("student_id", filter.student_id)
        .finish(
            filter.page(),
            &["description"],
            &["due_on", "amount", "created_at"],
            "due_on",
        )
        .fetch_all(pool)
        .await
}

/// Partial update. Moving to `paid` stamps `paid_at` once; moving to any
/// other status clears it.
pub async fn update_charge(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &ChargeChanges,
) -> Result<Option<Charge>> {
    let charge = sqlx::query_as::<_, Charge>(
        "UPDATE charges SET \
             kind = COALESCE($3, kind), \
             description = COALESCE($4, description), \
             amount = COALESCE($5, amount), \
             due_on = COALESCE($6, due_on), \
             status = COALESCE($7, status), \
             paid_at = CASE \
                 WHEN $7 IS NULL THEN paid_at \
                 WHEN $7 = 'paid' THEN COALESCE(paid_at, now()) \
                 ELSE NULL \
             END, \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(changes.kind)
    .bind(&changes.description)
    .bind(changes.amount)
    .bind(changes.due_on)
    .bind(changes.status)
    .fetch_optional(pool)
    .await
    .context("failed to update charge")?;

    Ok(charge)
}

pub async fn delete_charge(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM charges WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete charge")?;

    Ok(result.rows_affected() > 0)
}
