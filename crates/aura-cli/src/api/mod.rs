//! JSON API served by `aura serve`.
//!
//! Every route except `/health` requires a bearer token; the resolved
//! [`Actor`] scopes tenant queries to its school and library queries to its
//! own authorship. Errors render as `{"error": "..."}`.

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use aura_core::integration::{AssistantService, Caller, IntegrationError};
use aura_core::token::TokenConfig;
use aura_core::token::guard::{self, AuthError};
use aura_core::workflow::{PlanWorkflow, WorkflowError};
use aura_db::models::{AuditAction, User};
use aura_db::queries::audit_logs;

/// Declares a module with list/create/retrieve/update/delete handlers for a
/// tenant table whose query module follows the `(pool, school_id, ..)`
/// convention and shares the API module's name.
macro_rules! tenant_crud {
    (
        $vis:vis mod $module:ident at $path:literal => $row:ident as $model:literal {
            new: $new:ident,
            changes: $changes:ident,
            filter: $filter:ident,
            insert: $insert:ident,
            get: $get:ident,
            list: $list:ident,
            update: $update:ident,
            delete: $delete:ident $(,)?
        }
    ) => {
        $vis mod $module {
            use axum::extract::{Path, Query, State};
            use axum::http::StatusCode;
            use axum::routing::get;
            use axum::{Json, Router};
            use uuid::Uuid;

            use aura_db::models::{AuditAction, $row};
            use aura_db::queries::$module::{self as queries, $changes, $filter, $new};

            use $crate::api::{Actor, ApiResult, AppError, AppState, audit};

            pub const MODEL: &str = $model;

            pub fn routes() -> Router<AppState> {
                Router::new()
                    .route($path, get(list).post(create))
                    .route(
                        concat!($path, "/{id}"),
                        get(retrieve).patch(update).delete(destroy),
                    )
            }

            async fn list(
                State(state): State<AppState>,
                actor: Actor,
                Query(filter): Query<$filter>,
            ) -> ApiResult<Json<Vec<$row>>> {
                let rows = queries::$list(&state.pool, actor.school_id(), &filter).await?;
                Ok(Json(rows))
            }

            async fn create(
                State(state): State<AppState>,
                actor: Actor,
                Json(new): Json<$new>,
            ) -> ApiResult<(StatusCode, Json<$row>)> {
                let row = queries::$insert(&state.pool, actor.school_id(), &new).await?;
                audit(&state, &actor, AuditAction::Create, MODEL, row.id, &new).await;
                Ok((StatusCode::CREATED, Json(row)))
            }

            async fn retrieve(
                State(state): State<AppState>,
                actor: Actor,
                Path(id): Path<Uuid>,
            ) -> ApiResult<Json<$row>> {
                let row = queries::$get(&state.pool, actor.school_id(), id)
                    .await?
                    .ok_or_else(|| AppError::not_found(MODEL, id))?;
                Ok(Json(row))
            }

            async fn update(
                State(state): State<AppState>,
                actor: Actor,
                Path(id): Path<Uuid>,
                Json(changes): Json<$changes>,
            ) -> ApiResult<Json<$row>> {
                let row = queries::$update(&state.pool, actor.school_id(), id, &changes)
                    .await?
                    .ok_or_else(|| AppError::not_found(MODEL, id))?;
                audit(&state, &actor, AuditAction::Update, MODEL, id, &changes).await;
                Ok(Json(row))
            }

            async fn destroy(
                State(state): State<AppState>,
                actor: Actor,
                Path(id): Path<Uuid>,
            ) -> ApiResult<StatusCode> {
                if !queries::$delete(&state.pool, actor.school_id(), id).await? {
                    return Err(AppError::not_found(MODEL, id));
                }
                audit(&state, &actor, AuditAction::Delete, MODEL, id, &serde_json::json!({})).await;
                Ok(StatusCode::NO_CONTENT)
            }
        }
    };
}

/// Like [`tenant_crud!`] for library tables: rows are readable when public
/// or authored by the caller, and writable by their author only.
macro_rules! library_crud {
    (
        $vis:vis mod $module:ident at $path:literal => $row:ident as $model:literal {
            new: $new:ident,
            changes: $changes:ident,
            filter: $filter:ident,
            insert: $insert:ident,
            get: $get:ident,
            list: $list:ident,
            update: $update:ident,
            delete: $delete:ident $(,)?
        }
    ) => {
        $vis mod $module {
            use axum::extract::{Path, Query, State};
            use axum::http::StatusCode;
            use axum::routing::get;
            use axum::{Json, Router};
            use uuid::Uuid;

            use aura_db::models::{AuditAction, $row};
            use aura_db::queries::$module::{self as queries, $changes, $filter, $new};

            use $crate::api::{Actor, ApiResult, AppError, AppState, audit};

            pub const MODEL: &str = $model;

            pub fn routes() -> Router<AppState> {
                Router::new()
                    .route($path, get(list).post(create))
                    .route(
                        concat!($path, "/{id}"),
                        get(retrieve).patch(update).delete(destroy),
                    )
            }

            async fn list(
                State(state): State<AppState>,
                actor: Actor,
                Query(filter): Query<$filter>,
            ) -> ApiResult<Json<Vec<$row>>> {
                let rows = queries::$list(&state.pool, actor.id(), &filter).await?;
                Ok(Json(rows))
            }

            async fn create(
                State(state): State<AppState>,
                actor: Actor,
                Json(new): Json<$new>,
            ) -> ApiResult<(StatusCode, Json<$row>)> {
                let row = queries::$insert(&state.pool, actor.id(), &new).await?;
                audit(&state, &actor, AuditAction::Create, MODEL, row.id, &new).await;
                Ok((StatusCode::CREATED, Json(row)))
            }

            async fn retrieve(
                State(state): State<AppState>,
                actor: Actor,
                Path(id): Path<Uuid>,
            ) -> ApiResult<Json<$row>> {
                let row = queries::$get(&state.pool, actor.id(), id)
                    .await?
                    .ok_or_else(|| AppError::not_found(MODEL, id))?;
                Ok(Json(row))
            }

            async fn update(
                State(state): State<AppState>,
                actor: Actor,
                Path(id): Path<Uuid>,
                Json(changes): Json<$changes>,
            ) -> ApiResult<Json<$row>> {
                match queries::$update(&state.pool, actor.id(), id, &changes).await? {
                    Some(row) => {
                        audit(&state, &actor, AuditAction::Update, MODEL, id, &changes).await;
                        Ok(Json(row))
                    }
                    None => {
                        let visible = queries::$get(&state.pool, actor.id(), id).await?.is_some();
                        Err(AppError::not_author(visible, MODEL, id))
                    }
                }
            }

            async fn destroy(
                State(state): State<AppState>,
                actor: Actor,
                Path(id): Path<Uuid>,
            ) -> ApiResult<StatusCode> {
                if !queries::$delete(&state.pool, actor.id(), id).await? {
                    let visible = queries::$get(&state.pool, actor.id(), id).await?.is_some();
                    return Err(AppError::not_author(visible, MODEL, id));
                }
                audit(&state, &actor, AuditAction::Delete, MODEL, id, &serde_json::json!({})).await;
                Ok(StatusCode::NO_CONTENT)
            }
        }
    };
}

pub mod accounts;
pub mod administration;
pub mod assistant;
pub mod library;
pub mod pedagogy;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tokens: TokenConfig,
    pub workflow: PlanWorkflow,
    pub assistant: AssistantService,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

pub type ApiResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(model: &str, id: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{model} {id} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// A library row the caller did not author: 403 when they can see it,
    /// 404 otherwise.
    pub fn not_author(visible: bool, model: &str, id: Uuid) -> Self {
        if visible {
            Self::new(
                StatusCode::FORBIDDEN,
                format!("only the author may modify {model} {id}"),
            )
        } else {
            Self::not_found(model, id)
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE and message of the first database error in `err`'s chain.
fn database_error(err: &anyhow::Error) -> Option<(String, String)> {
    err.chain()
        .find_map(|e| e.downcast_ref::<sqlx::Error>())
        .and_then(|e| e.as_database_error())
        .and_then(|db| Some((db.code()?.into_owned(), db.message().to_owned())))
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match database_error(&err) {
            Some((code, message)) if code == UNIQUE_VIOLATION => {
                Self::new(StatusCode::CONFLICT, message)
            }
            // Integrity (23xxx) and data (22xxx) errors are the client's.
            Some((code, message)) if code.starts_with("23") || code.starts_with("22") => {
                Self::bad_request(message)
            }
            _ => Self::internal(err),
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NotFound(id) => Self::not_found("plan", id),
            WorkflowError::InvalidTransition { .. } => {
                Self::new(StatusCode::CONFLICT, err.to_string())
            }
            WorkflowError::MissingReviewerComment => Self::bad_request(err.to_string()),
            WorkflowError::Database(e) => e.into(),
        }
    }
}

impl From<IntegrationError> for AppError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::PlanNotFound(id) => Self::not_found("plan", id),
            IntegrationError::Call(_) => Self::new(StatusCode::BAD_GATEWAY, err.to_string()),
            IntegrationError::Database(e) => e.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Database(e) => Self::internal(e),
            other => {
                tracing::debug!(error = %other, "rejected credentials");
                Self::new(StatusCode::UNAUTHORIZED, other.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// The authenticated user behind a request.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl Actor {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn school_id(&self) -> Uuid {
        self.0.school_id
    }

    pub fn caller(&self) -> Caller {
        Caller {
            school_id: self.0.school_id,
            actor_id: self.0.id,
        }
    }
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingToken)?;
        let token = guard::bearer_token(header).ok_or(AuthError::MissingToken)?;
        let user = guard::authenticate(&state.pool, &state.tokens, token).await?;
        Ok(Actor(user))
    }
}

// ---------------------------------------------------------------------------
// Audit trail
// ---------------------------------------------------------------------------

/// Append an audit row for a write the actor just made. A failed write is
/// logged; the request still succeeds.
pub async fn audit<T: Serialize>(
    state: &AppState,
    actor: &Actor,
    action: AuditAction,
    model: &str,
    object_id: Uuid,
    changes: &T,
) {
    let changes = serde_json::to_value(changes).unwrap_or_default();
    if let Err(e) = audit_logs::insert_audit_log(
        &state.pool,
        actor.school_id(),
        Some(actor.id()),
        action,
        model,
        object_id,
        &changes,
    )
    .await
    {
        tracing::error!(
            model,
            %object_id,
            action = action.as_str(),
            error = %format!("{e:#}"),
            "failed to write audit log"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::integration::CallError;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().status
    }

    #[test]
    fn workflow_errors_map_to_statuses() {
        use aura_core::workflow::PlanAction;
        use aura_db::models::PlanStatus;

        let id = Uuid::new_v4();
        assert_eq!(status_of(WorkflowError::NotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(WorkflowError::InvalidTransition {
                from: PlanStatus::Approved,
                action: PlanAction::Reject,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(WorkflowError::MissingReviewerComment),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn assistant_failures_are_bad_gateway() {
        let err = IntegrationError::Call(CallError::Status {
            status: 500,
            body: "down".into(),
        });
        let app = AppError::from(err);
        assert_eq!(app.status, StatusCode::BAD_GATEWAY);
        assert!(app.message.contains("HTTP 500: down"));

        let err = IntegrationError::Call(CallError::InvalidBody("eof".into()));
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn auth_errors_are_unauthorized() {
        assert_eq!(status_of(AuthError::MissingToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::Revoked), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn plain_errors_are_internal() {
        let app = AppError::from(anyhow::anyhow!("boom").context("failed to list things"));
        assert_eq!(app.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app.message, "failed to list things: boom");
    }

    #[test]
    fn not_author_hides_invisible_rows() {
        let id = Uuid::new_v4();
        assert_eq!(AppError::not_author(true, "material", id).status, StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_author(false, "material", id).status, StatusCode::NOT_FOUND);
    }
}
