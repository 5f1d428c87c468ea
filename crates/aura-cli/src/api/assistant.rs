//! Assistant-backed suggestions and analyses, plus the interaction log of
//! every outbound call.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use uuid::Uuid;

use aura_core::integration::{AnalysisRequest, SuggestionRequest};
use aura_db::models::{AiAnalysis, AiSuggestion, AuditAction, InteractionLog};
use aura_db::queries::ai_analyses::{self, AiAnalysisFilter};
use aura_db::queries::ai_suggestions::{self, AiSuggestionFilter};
use aura_db::queries::interaction_logs::{self, InteractionLogFilter};

use super::{Actor, ApiResult, AppError, AppState, audit};

const SUGGESTION: &str = "ai_suggestion";
const ANALYSIS: &str = "ai_analysis";
const INTERACTION_LOG: &str = "interaction_log";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/ai/suggestions",
            get(list_suggestions).post(create_suggestion),
        )
        .route(
            "/api/ai/suggestions/{id}",
            get(get_suggestion).delete(delete_suggestion),
        )
        .route("/api/ai/analyses", get(list_analyses).post(create_analysis))
        .route(
            "/api/ai/analyses/{id}",
            get(get_analysis).delete(delete_analysis),
        )
        .route("/api/interaction-logs", get(list_interaction_logs))
        .route("/api/interaction-logs/{id}", get(get_interaction_log))
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

/// Calls the assistant; nothing is stored when the call fails (502).
async fn create_suggestion(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<SuggestionRequest>,
) -> ApiResult<(StatusCode, Json<AiSuggestion>)> {
    let suggestion = state
        .assistant
        .generate_suggestion(actor.caller(), &request)
        .await?;
    let changes = json!({ "plan_id": request.plan_id, "kind": request.kind });
    audit(&state, &actor, AuditAction::Create, SUGGESTION, suggestion.id, &changes).await;
    Ok((StatusCode::CREATED, Json(suggestion)))
}

async fn list_suggestions(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<AiSuggestionFilter>,
) -> ApiResult<Json<Vec<AiSuggestion>>> {
    let rows = ai_suggestions::list_ai_suggestions(&state.pool, actor.school_id(), &filter).await?;
    Ok(Json(rows))
}

async fn get_suggestion(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AiSuggestion>> {
    let row = ai_suggestions::get_ai_suggestion(&state.pool, actor.school_id(), id)
        .await?
        .ok_or_else(|| AppError::not_found(SUGGESTION, id))?;
    Ok(Json(row))
}

async fn delete_suggestion(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !ai_suggestions::delete_ai_suggestion(&state.pool, actor.school_id(), id).await? {
        return Err(AppError::not_found(SUGGESTION, id));
    }
    audit(&state, &actor, AuditAction::Delete, SUGGESTION, id, &json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Analyses
// ---------------------------------------------------------------------------

async fn create_analysis(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<AnalysisRequest>,
) -> ApiResult<(StatusCode, Json<AiAnalysis>)> {
    let analysis = state.assistant.analyze_plan(actor.caller(), &request).await?;
    let changes = json!({ "plan_id": request.plan_id });
    audit(&state, &actor, AuditAction::Create, ANALYSIS, analysis.id, &changes).await;
    Ok((StatusCode::CREATED, Json(analysis)))
}

async fn list_analyses(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<AiAnalysisFilter>,
) -> ApiResult<Json<Vec<AiAnalysis>>> {
    let rows = ai_analyses::list_ai_analyses(&state.pool, actor.school_id(), &filter).await?;
    Ok(Json(rows))
}

async fn get_analysis(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AiAnalysis>> {
    let row = ai_analyses::get_ai_analysis(&state.pool, actor.school_id(), id)
        .await?
        .ok_or_else(|| AppError::not_found(ANALYSIS, id))?;
    Ok(Json(row))
}

async fn delete_analysis(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !ai_analyses::delete_ai_analysis(&state.pool, actor.school_id(), id).await? {
        return Err(AppError::not_found(ANALYSIS, id));
    }
    audit(&state, &actor, AuditAction::Delete, ANALYSIS, id, &json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Interaction log (read-only)
// ---------------------------------------------------------------------------

async fn list_interaction_logs(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<InteractionLogFilter>,
) -> ApiResult<Json<Vec<InteractionLog>>> {
    let rows =
        interaction_logs::list_interaction_logs(&state.pool, actor.school_id(), &filter).await?;
    Ok(Json(rows))
}

async fn get_interaction_log(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<InteractionLog>> {
    let row = interaction_logs::get_interaction_log(&state.pool, actor.school_id(), id)
        .await?
        .ok_or_else(|| AppError::not_found(INTERACTION_LOG, id))?;
    Ok(Json(row))
}
