//! Users, the caller's school, notifications and the audit trail.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use uuid::Uuid;

use aura_db::models::{AuditAction, AuditLog, Notification, School, User};
use aura_db::queries::audit_logs::{self, AuditLogFilter};
use aura_db::queries::notifications::{
    self, NewNotification, NotificationChanges, NotificationFilter,
};
use aura_db::queries::schools;

use super::{Actor, ApiResult, AppError, AppState, audit};

tenant_crud! {
    pub mod users at "/api/users" => User as "user" {
        new: NewUser,
        changes: UserChanges,
        filter: UserFilter,
        insert: insert_user,
        get: get_user,
        list: list_users,
        update: update_user,
        delete: delete_user,
    }
}

const NOTIFICATION: &str = "notification";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(me))
        .merge(users::routes())
        .route("/api/school", get(my_school))
        .route("/api/audit-logs", get(list_audit_logs))
        .route(
            "/api/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/api/notifications/unread", get(list_unread))
        .route("/api/notifications/read-all", post(read_all))
        .route(
            "/api/notifications/{id}",
            get(get_notification)
                .patch(update_notification)
                .delete(delete_notification),
        )
        .route("/api/notifications/{id}/read", post(read_notification))
}

async fn me(actor: Actor) -> Json<User> {
    Json(actor.0)
}

async fn my_school(State(state): State<AppState>, actor: Actor) -> ApiResult<Json<School>> {
    let school = schools::get_school(&state.pool, actor.school_id())
        .await?
        .ok_or_else(|| AppError::not_found("school", actor.school_id()))?;
    Ok(Json(school))
}

async fn list_audit_logs(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<AuditLogFilter>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    let logs = audit_logs::list_audit_logs(&state.pool, actor.school_id(), &filter).await?;
    Ok(Json(logs))
}

// ---------------------------------------------------------------------------
// Notifications: each user only ever sees their own.
// ---------------------------------------------------------------------------

async fn list_notifications(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<NotificationFilter>,
) -> ApiResult<Json<Vec<Notification>>> {
    let rows =
        notifications::list_notifications(&state.pool, actor.school_id(), actor.id(), &filter)
            .await?;
    Ok(Json(rows))
}

async fn create_notification(
    State(state): State<AppState>,
    actor: Actor,
    Json(new): Json<NewNotification>,
) -> ApiResult<(StatusCode, Json<Notification>)> {
    let row = notifications::insert_notification(&state.pool, actor.school_id(), &new).await?;
    audit(&state, &actor, AuditAction::Create, NOTIFICATION, row.id, &new).await;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn list_unread(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Vec<Notification>>> {
    let rows = notifications::list_unread(&state.pool, actor.school_id(), actor.id()).await?;
    Ok(Json(rows))
}

async fn read_all(State(state): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    let updated =
        notifications::mark_all_read(&state.pool, actor.school_id(), actor.id()).await?;
    Ok(Json(json!({ "updated": updated })))
}

async fn get_notification(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Notification>> {
    let row = notifications::get_notification(&state.pool, actor.school_id(), actor.id(), id)
        .await?
        .ok_or_else(|| AppError::not_found(NOTIFICATION, id))?;
    Ok(Json(row))
}

async fn update_notification(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(changes): Json<NotificationChanges>,
) -> ApiResult<Json<Notification>> {
    let row = notifications::update_notification(
        &state.pool,
        actor.school_id(),
        actor.id(),
        id,
        &changes,
    )
    .await?
    .ok_or_else(|| AppError::not_found(NOTIFICATION, id))?;
    audit(&state, &actor, AuditAction::Update, NOTIFICATION, id, &changes).await;
    Ok(Json(row))
}

async fn delete_notification(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !notifications::delete_notification(&state.pool, actor.school_id(), actor.id(), id).await? {
        return Err(AppError::not_found(NOTIFICATION, id));
    }
    audit(&state, &actor, AuditAction::Delete, NOTIFICATION, id, &json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn read_notification(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Notification>> {
    let row = notifications::mark_read(&state.pool, actor.school_id(), actor.id(), id)
        .await?
        .ok_or_else(|| AppError::not_found(NOTIFICATION, id))?;
    Ok(Json(row))
}
