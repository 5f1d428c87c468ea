//! Database query functions for the `notifications` table.
//!
//! Reads and writes other than insert are restricted to the recipient.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Notification, NotificationPriority, NotificationStatus};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub priority: Option<NotificationPriority>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationChanges {
    pub title: Option<String>,
    pub message: Option<String>,
    pub priority: Option<NotificationPriority>,
    pub status: Option<NotificationStatus>,
    pub link: Option<String>,
}

list_filter! {
    NotificationFilter {
        status: NotificationStatus,
        priority: NotificationPriority,
    }
}

pub async fn insert_notification(
    pool: &PgPool,
    school_id: Uuid,
    new: &NewNotification,
) -> Result<Notification> {
    let notification = sqlx::query_as::<_, Notification>(
        "INSERT INTO notifications (school_id, user_id, title, message, priority, link) \
         VALUES ($1, $2, $3, $4, COALESCE($5, 'medium'), $6) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(new.user_id)
    .bind(&new.title)
    .bind(&new.message)
    .bind(new.priority)
    .bind(&new.link)
    .fetch_one(pool)
    .await
    .context("failed to insert notification")?;

    Ok(notification)
}

pub async fn get_notification(
    pool: &PgPool,
    school_id: Uuid,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<Notification>> {
    let notification = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE id = $1 AND school_id = $2 AND user_id = $3",
    )
    .bind(id)
    .bind(school_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch notification")?;

    Ok(notification)
}

pub async fn list_notifications(
    pool: &PgPool,
    school_id: Uuid,
    user_id: Uuid,
    filter: &NotificationFilter,
) -> Result<Vec<Notification>> {
    Listing::from_table("notifications")
        .eq("school_id", Some(school_id))
        .eq("user_id", Some(user_id))
        .eq("status", filter.status)
        .eq("priority", filter.priority)
        .finish(filter.page(), &["title"], &["created_at"], "-created_at")
        .fetch_all(pool)
        .await
}

/// Unread notifications for `user_id`, newest first.
pub async fn list_unread(pool: &PgPool, school_id: Uuid, user_id: Uuid) -> Result<Vec<Notification>> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications \
         WHERE school_id = $1 AND user_id = $2 AND status = 'unread' \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(school_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list unread notifications")?;

    Ok(notifications)
}

pub async fn update_notification(
    pool: &PgPool,
    school_id: Uuid,
    user_id: Uuid,
    id: Uuid,
    changes: &NotificationChanges,
) -> Result<Option<Notification>> {
    let notification = sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET \
             title = COALESCE($4, title), \
             message = COALESCE($5, message), \
             priority = COALESCE($6, priority), \
             status = COALESCE($7, status), \
             link = COALESCE($8, link), \
             read_at = CASE \
                 WHEN $7 = 'read' AND read_at IS NULL THEN now() \
                 WHEN $7 = 'unread' THEN NULL \
                 ELSE read_at \
             END \
         WHERE id = $1 AND school_id = $2 AND user_id = $3 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(user_id)
    .bind(&changes.title)
    .bind(&changes.message)
    .bind(changes.priority)
    .bind(changes.status)
    .bind(&changes.link)
    .fetch_optional(pool)
    .await
    .context("failed to update notification")?;

    Ok(notification)
}

/// Mark one notification read. Already-read notifications keep their
/// original `read_at`.
pub async fn mark_read(
    pool: &PgPool,
    school_id: Uuid,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<Notification>> {
    let notification = sqlx::query_as::<_, Notification>(
        "UPDATE notifications \
         SET status = 'read', read_at = COALESCE(read_at, now()) \
         WHERE id = $1 AND school_id = $2 AND user_id = $3 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("failed to mark notification read")?;

    Ok(notification)
}

/// Mark every unread notification of `user_id` read. Returns how many changed.
pub async fn mark_all_read(pool: &PgPool, school_id: Uuid, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE notifications \
         SET status = 'read', read_at = now() \
         WHERE school_id = $1 AND user_id = $2 AND status = 'unread'",
    )
    .bind(school_id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("failed to mark notifications read")?;

    Ok(result.rows_affected())
}

pub async fn delete_notification(
    pool: &PgPool,
    school_id: Uuid,
    user_id: Uuid,
    id: Uuid,
) -> Result<bool> {
    let result =
        sqlx::query("DELETE FROM notifications WHERE id = $1 AND school_id = $2 AND user_id = $3")
            .bind(id)
            .bind(school_id)
            .bind(user_id)
            .execute(pool)
            .await
            .context("failed to delete notification")?;

    Ok(result.rows_affected() > 0)
}
