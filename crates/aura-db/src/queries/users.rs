//! Database query functions for the `users` table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Role, User};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub phone: String,
}

/// Partial update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserChanges {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

list_filter! {
    UserFilter {
        role: Role,
        is_active: bool,
    }
}

pub async fn insert_user(pool: &PgPool, school_id: Uuid, new: &NewUser) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (school_id, username, email, first_name, last_name, role, bio, phone) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(&new.username)
    .bind(&new.email)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(new.role)
    .bind(&new.bio)
    .bind(&new.phone)
    .fetch_one(pool)
    .await
    .context("failed to insert user")?;

    Ok(user)
}

pub async fn get_user(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user")?;

    Ok(user)
}

/// Fetch a user by id without tenant scoping. Only for authentication, where
/// the school is not yet known.
pub async fn find_user_for_auth(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user for authentication")?;

    Ok(user)
}

pub async fn get_user_by_username(pool: &PgPool, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user by username")?;

    Ok(user)
}

pub async fn list_users(pool: &PgPool, school_id: Uuid, filter: &UserFilter) -> Result<Vec<User>> {
    Listing::from_table("users")
        .eq("school_id", Some(school_id))
        .eq("role", filter.role)
        .eq("is_active", filter.is_active)
        .finish(
            filter.page(),
            &["username", "first_name", "last_name"],
            &["username", "created_at"],
            "username",
        )
        .fetch_all(pool)
        .await
}

/// Every user across schools, for the CLI.
pub async fn list_all_users(pool: &PgPool, school_id: Option<Uuid>) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users \
         WHERE ($1::uuid IS NULL OR school_id = $1) \
         ORDER BY username ASC",
    )
    .bind(school_id)
    .fetch_all(pool)
    .await
    .context("failed to list users")?;

    Ok(users)
}

pub async fn update_user(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &UserChanges,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET \
             email = COALESCE($3, email), \
             first_name = COALESCE($4, first_name), \
             last_name = COALESCE($5, last_name), \
             role = COALESCE($6, role), \
             bio = COALESCE($7, bio), \
             phone = COALESCE($8, phone), \
             is_active = COALESCE($9, is_active), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(&changes.email)
    .bind(&changes.first_name)
    .bind(&changes.last_name)
    .bind(changes.role)
    .bind(&changes.bio)
    .bind(&changes.phone)
    .bind(changes.is_active)
    .fetch_optional(pool)
    .await
    .context("failed to update user")?;

    Ok(user)
}

pub async fn delete_user(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete user")?;

    Ok(result.rows_affected() > 0)
}

/// Invalidate every token issued so far for `id`. Returns the new version.
pub async fn bump_token_version(pool: &PgPool, id: Uuid) -> Result<i32> {
    let version: Option<i32> = sqlx::query_scalar(
        "UPDATE users SET token_version = token_version + 1, updated_at = now() \
         WHERE id = $1 \
         RETURNING token_version",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to bump token version")?;

    version.with_context(|| format!("user {id} not found"))
}
