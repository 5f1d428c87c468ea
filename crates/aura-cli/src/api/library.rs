//! Shared teaching library. Rows are visible school-wide when public and
//! editable by their author only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use uuid::Uuid;

use aura_db::models::{AuditAction, LessonTemplate};

use super::{Actor, ApiResult, AppError, AppState, audit};

library_crud! {
    pub mod lesson_templates at "/api/lesson-templates" => LessonTemplate as "lesson_template" {
        new: NewLessonTemplate,
        changes: LessonTemplateChanges,
        filter: LessonTemplateFilter,
        insert: insert_lesson_template,
        get: get_lesson_template,
        list: list_lesson_templates,
        update: update_lesson_template,
        delete: delete_lesson_template,
    }
}

library_crud! {
    pub mod activity_templates at "/api/activity-templates" => ActivityTemplate as "activity_template" {
        new: NewActivityTemplate,
        changes: ActivityTemplateChanges,
        filter: ActivityTemplateFilter,
        insert: insert_activity_template,
        get: get_activity_template,
        list: list_activity_templates,
        update: update_activity_template,
        delete: delete_activity_template,
    }
}

library_crud! {
    pub mod materials at "/api/materials" => TeachingMaterial as "teaching_material" {
        new: NewMaterial,
        changes: MaterialChanges,
        filter: MaterialFilter,
        insert: insert_material,
        get: get_material,
        list: list_materials,
        update: update_material,
        delete: delete_material,
    }
}

library_crud! {
    pub mod collections at "/api/collections" => TemplateCollection as "template_collection" {
        new: NewCollection,
        changes: CollectionChanges,
        filter: CollectionFilter,
        insert: insert_collection,
        get: get_collection,
        list: list_collections,
        update: update_collection,
        delete: delete_collection,
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(lesson_templates::routes())
        .route(
            "/api/lesson-templates/{id}/duplicate",
            post(duplicate_lesson_template),
        )
        .merge(activity_templates::routes())
        .merge(materials::routes())
        .merge(collections::routes())
}

/// Copy any visible template into a private one owned by the caller.
async fn duplicate_lesson_template(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<LessonTemplate>)> {
    let copy = aura_db::queries::lesson_templates::duplicate_lesson_template(
        &state.pool,
        actor.id(),
        id,
    )
    .await?
    .ok_or_else(|| AppError::not_found(lesson_templates::MODEL, id))?;
    let changes = json!({ "duplicated_from": id });
    audit(
        &state,
        &actor,
        AuditAction::Create,
        lesson_templates::MODEL,
        copy.id,
        &changes,
    )
    .await;
    Ok((StatusCode::CREATED, Json(copy)))
}
