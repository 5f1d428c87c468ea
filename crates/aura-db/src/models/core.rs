use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    /// Role of a user within their school.
    Role as "role" {
        Admin => "admin",
        Coordinator => "coordinator",
        Teacher => "teacher",
        Student => "student",
        Guardian => "guardian",
    }
}

text_enum! {
    NotificationPriority as "notification priority" {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

text_enum! {
    NotificationStatus as "notification status" {
        Unread => "unread",
        Read => "read",
        Archived => "archived",
    }
}

text_enum! {
    /// Kind of change recorded in the audit trail.
    AuditAction as "audit action" {
        Create => "create",
        Update => "update",
        Delete => "delete",
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A tenant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person who can authenticate. Belongs to exactly one school.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub school_id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub bio: String,
    pub phone: String,
    pub is_active: bool,
    #[serde(skip_serializing, default)]
    pub token_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let trimmed = name.trim();
        if trimmed.is_empty() {
            self.username.clone()
        } else {
            trimmed.to_owned()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub school_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub status: NotificationStatus,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// One create/update/delete performed through the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub school_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub model_name: String,
    pub object_id: Uuid,
    pub changes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
