//! Classes, students, plans and the day-to-day teaching records.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use aura_core::workflow::{PlanAction, TransitionOutcome};
use aura_db::models::{AnnualPlan, AuditAction, Grade, LessonRecord, Student, Submission};
use aura_db::queries::grades::{self, GradeChanges, GradeFilter, NewGrade};
use aura_db::queries::lesson_records::{
    self, LessonRecordChanges, LessonRecordFilter, NewLessonRecord,
};
use aura_db::queries::plans::{self, NewPlan, PlanChanges, PlanFilter};
use aura_db::queries::{
    assessments as assessment_db, classes as class_db, students as student_db,
    submissions as submission_db,
};

use super::{Actor, ApiResult, AppError, AppState, audit};

tenant_crud! {
    pub mod classes at "/api/classes" => Class as "class" {
        new: NewClass,
        changes: ClassChanges,
        filter: ClassFilter,
        insert: insert_class,
        get: get_class,
        list: list_classes,
        update: update_class,
        delete: delete_class,
    }
}

tenant_crud! {
    pub mod students at "/api/students" => Student as "student" {
        new: NewStudent,
        changes: StudentChanges,
        filter: StudentFilter,
        insert: insert_student,
        get: get_student,
        list: list_students,
        update: update_student,
        delete: delete_student,
    }
}

tenant_crud! {
    pub mod units at "/api/units" => ThematicUnit as "thematic_unit" {
        new: NewUnit,
        changes: UnitChanges,
        filter: UnitFilter,
        insert: insert_unit,
        get: get_unit,
        list: list_units,
        update: update_unit,
        delete: delete_unit,
    }
}

tenant_crud! {
    pub mod assessments at "/api/assessments" => Assessment as "assessment" {
        new: NewAssessment,
        changes: AssessmentChanges,
        filter: AssessmentFilter,
        insert: insert_assessment,
        get: get_assessment,
        list: list_assessments,
        update: update_assessment,
        delete: delete_assessment,
    }
}

tenant_crud! {
    pub mod assignments at "/api/assignments" => Assignment as "assignment" {
        new: NewAssignment,
        changes: AssignmentChanges,
        filter: AssignmentFilter,
        insert: insert_assignment,
        get: get_assignment,
        list: list_assignments,
        update: update_assignment,
        delete: delete_assignment,
    }
}

tenant_crud! {
    pub mod submissions at "/api/submissions" => Submission as "submission" {
        new: NewSubmission,
        changes: SubmissionChanges,
        filter: SubmissionFilter,
        insert: insert_submission,
        get: get_submission,
        list: list_submissions,
        update: update_submission,
        delete: delete_submission,
    }
}

const PLAN: &str = "annual_plan";
const LESSON_RECORD: &str = "lesson_record";
const GRADE: &str = "grade";

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(classes::routes())
        .route("/api/classes/{id}/students", get(list_roster))
        .route(
            "/api/classes/{id}/students/{student_id}",
            put(add_to_roster).delete(remove_from_roster),
        )
        .merge(students::routes())
        .route("/api/plans", get(list_plans).post(create_plan))
        .route(
            "/api/plans/{id}",
            get(get_plan).patch(update_plan).delete(delete_plan),
        )
        .route("/api/plans/{id}/submit", post(submit_plan))
        .route("/api/plans/{id}/approve", post(approve_plan))
        .route("/api/plans/{id}/reject", post(reject_plan))
        .merge(units::routes())
        .route(
            "/api/lesson-records",
            get(list_lesson_records).post(create_lesson_record),
        )
        .route(
            "/api/lesson-records/{id}",
            get(get_lesson_record)
                .patch(update_lesson_record)
                .delete(delete_lesson_record),
        )
        .merge(assessments::routes())
        .route("/api/grades", get(list_grades).post(create_grade))
        .route(
            "/api/grades/{id}",
            get(get_grade).patch(update_grade).delete(delete_grade),
        )
        .merge(assignments::routes())
        .merge(submissions::routes())
        .route("/api/submissions/{id}/grade", post(grade_submission))
}

// ---------------------------------------------------------------------------
// Class roster
// ---------------------------------------------------------------------------

async fn require_class(state: &AppState, actor: &Actor, id: Uuid) -> ApiResult<()> {
    class_db::get_class(&state.pool, actor.school_id(), id)
        .await?
        .ok_or_else(|| AppError::not_found(classes::MODEL, id))?;
    Ok(())
}

async fn list_roster(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Student>>> {
    require_class(&state, &actor, id).await?;
    let roster = class_db::list_class_students(&state.pool, actor.school_id(), id).await?;
    Ok(Json(roster))
}

/// Idempotent: 201 when the student joined, 200 when already a member.
async fn add_to_roster(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, student_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    require_class(&state, &actor, id).await?;
    student_db::get_student(&state.pool, actor.school_id(), student_id)
        .await?
        .ok_or_else(|| AppError::not_found(students::MODEL, student_id))?;

    let added = class_db::add_class_student(&state.pool, actor.school_id(), id, student_id).await?;
    if !added {
        return Ok(StatusCode::OK);
    }
    let changes = json!({ "student_added": student_id });
    audit(&state, &actor, AuditAction::Update, classes::MODEL, id, &changes).await;
    Ok(StatusCode::CREATED)
}

async fn remove_from_roster(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, student_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    if !class_db::remove_class_student(&state.pool, actor.school_id(), id, student_id).await? {
        return Err(AppError::new(
            StatusCode::NOT_FOUND,
            format!("student {student_id} is not in class {id}"),
        ));
    }
    let changes = json!({ "student_removed": student_id });
    audit(&state, &actor, AuditAction::Update, classes::MODEL, id, &changes).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

async fn list_plans(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<PlanFilter>,
) -> ApiResult<Json<Vec<AnnualPlan>>> {
    let rows = plans::list_plans(&state.pool, actor.school_id(), &filter).await?;
    Ok(Json(rows))
}

async fn create_plan(
    State(state): State<AppState>,
    actor: Actor,
    Json(new): Json<NewPlan>,
) -> ApiResult<(StatusCode, Json<AnnualPlan>)> {
    let teacher_id = new.teacher_id.unwrap_or(actor.id());
    let plan = plans::insert_plan(&state.pool, actor.school_id(), teacher_id, &new).await?;
    audit(&state, &actor, AuditAction::Create, PLAN, plan.id, &new).await;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn get_plan(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnnualPlan>> {
    let plan = plans::get_plan(&state.pool, actor.school_id(), id)
        .await?
        .ok_or_else(|| AppError::not_found(PLAN, id))?;
    Ok(Json(plan))
}

/// Edits title and introduction only; status moves through the actions.
async fn update_plan(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(changes): Json<PlanChanges>,
) -> ApiResult<Json<AnnualPlan>> {
    let plan = plans::update_plan(&state.pool, actor.school_id(), id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found(PLAN, id))?;
    audit(&state, &actor, AuditAction::Update, PLAN, id, &changes).await;
    Ok(Json(plan))
}

async fn delete_plan(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !plans::delete_plan(&state.pool, actor.school_id(), id).await? {
        return Err(AppError::not_found(PLAN, id));
    }
    audit(&state, &actor, AuditAction::Delete, PLAN, id, &json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
struct ReviewBody {
    #[serde(default)]
    comment: Option<String>,
}

async fn audit_transition(
    state: &AppState,
    actor: &Actor,
    action: PlanAction,
    outcome: &TransitionOutcome,
) {
    if !outcome.changed {
        return;
    }
    let changes = json!({
        "action": action.as_str(),
        "status": outcome.plan.status,
        "reviewer_comment": outcome.plan.reviewer_comment,
        "workflow_triggered": outcome.workflow_triggered,
    });
    audit(state, actor, AuditAction::Update, PLAN, outcome.plan.id, &changes).await;
}

async fn submit_plan(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TransitionOutcome>> {
    let outcome = state.workflow.submit(actor.school_id(), id, actor.id()).await?;
    audit_transition(&state, &actor, PlanAction::Submit, &outcome).await;
    Ok(Json(outcome))
}

async fn approve_plan(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    body: Option<Json<ReviewBody>>,
) -> ApiResult<Json<TransitionOutcome>> {
    let Json(body) = body.unwrap_or_default();
    let outcome = state
        .workflow
        .approve(actor.school_id(), id, actor.id(), body.comment.as_deref())
        .await?;
    audit_transition(&state, &actor, PlanAction::Approve, &outcome).await;
    Ok(Json(outcome))
}

async fn reject_plan(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewBody>,
) -> ApiResult<Json<TransitionOutcome>> {
    let comment = body.comment.unwrap_or_default();
    let outcome = state
        .workflow
        .reject(actor.school_id(), id, actor.id(), &comment)
        .await?;
    audit_transition(&state, &actor, PlanAction::Reject, &outcome).await;
    Ok(Json(outcome))
}

// ---------------------------------------------------------------------------
// Lesson records
// ---------------------------------------------------------------------------

async fn list_lesson_records(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<LessonRecordFilter>,
) -> ApiResult<Json<Vec<LessonRecord>>> {
    let rows = lesson_records::list_lesson_records(&state.pool, actor.school_id(), &filter).await?;
    Ok(Json(rows))
}

async fn create_lesson_record(
    State(state): State<AppState>,
    actor: Actor,
    Json(new): Json<NewLessonRecord>,
) -> ApiResult<(StatusCode, Json<LessonRecord>)> {
    let teacher_id = new.teacher_id.unwrap_or(actor.id());
    let row =
        lesson_records::insert_lesson_record(&state.pool, actor.school_id(), teacher_id, &new)
            .await?;
    audit(&state, &actor, AuditAction::Create, LESSON_RECORD, row.id, &new).await;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn get_lesson_record(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LessonRecord>> {
    let row = lesson_records::get_lesson_record(&state.pool, actor.school_id(), id)
        .await?
        .ok_or_else(|| AppError::not_found(LESSON_RECORD, id))?;
    Ok(Json(row))
}

async fn update_lesson_record(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(changes): Json<LessonRecordChanges>,
) -> ApiResult<Json<LessonRecord>> {
    let row = lesson_records::update_lesson_record(&state.pool, actor.school_id(), id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found(LESSON_RECORD, id))?;
    audit(&state, &actor, AuditAction::Update, LESSON_RECORD, id, &changes).await;
    Ok(Json(row))
}

async fn delete_lesson_record(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !lesson_records::delete_lesson_record(&state.pool, actor.school_id(), id).await? {
        return Err(AppError::not_found(LESSON_RECORD, id));
    }
    audit(&state, &actor, AuditAction::Delete, LESSON_RECORD, id, &json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Grades: scores are bounded by the assessment's `max_score`.
// ---------------------------------------------------------------------------

fn score_out_of_range() -> AppError {
    AppError::bad_request("score exceeds the assessment's max_score")
}

async fn list_grades(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<GradeFilter>,
) -> ApiResult<Json<Vec<Grade>>> {
    let rows = grades::list_grades(&state.pool, actor.school_id(), &filter).await?;
    Ok(Json(rows))
}

async fn create_grade(
    State(state): State<AppState>,
    actor: Actor,
    Json(new): Json<NewGrade>,
) -> ApiResult<(StatusCode, Json<Grade>)> {
    assessment_db::get_assessment(&state.pool, actor.school_id(), new.assessment_id)
        .await?
        .ok_or_else(|| AppError::not_found(assessments::MODEL, new.assessment_id))?;
    let grade = grades::insert_grade(&state.pool, actor.school_id(), &new)
        .await?
        .ok_or_else(score_out_of_range)?;
    audit(&state, &actor, AuditAction::Create, GRADE, grade.id, &new).await;
    Ok((StatusCode::CREATED, Json(grade)))
}

async fn get_grade(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Grade>> {
    let grade = grades::get_grade(&state.pool, actor.school_id(), id)
        .await?
        .ok_or_else(|| AppError::not_found(GRADE, id))?;
    Ok(Json(grade))
}

async fn update_grade(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(changes): Json<GradeChanges>,
) -> ApiResult<Json<Grade>> {
    match grades::update_grade(&state.pool, actor.school_id(), id, &changes).await? {
        Some(grade) => {
            audit(&state, &actor, AuditAction::Update, GRADE, id, &changes).await;
            Ok(Json(grade))
        }
        None if grades::get_grade(&state.pool, actor.school_id(), id).await?.is_some() => {
            Err(score_out_of_range())
        }
        None => Err(AppError::not_found(GRADE, id)),
    }
}

async fn delete_grade(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !grades::delete_grade(&state.pool, actor.school_id(), id).await? {
        return Err(AppError::not_found(GRADE, id));
    }
    audit(&state, &actor, AuditAction::Delete, GRADE, id, &json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Submission grading
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct GradeBody {
    score: Decimal,
    #[serde(default)]
    feedback: Option<String>,
}

async fn grade_submission(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(body): Json<GradeBody>,
) -> ApiResult<Json<Submission>> {
    if body.score.is_sign_negative() {
        return Err(AppError::bad_request("score must not be negative"));
    }
    let submission = submission_db::grade_submission(
        &state.pool,
        actor.school_id(),
        id,
        body.score,
        body.feedback.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found(submissions::MODEL, id))?;
    audit(&state, &actor, AuditAction::Update, submissions::MODEL, id, &body).await;
    Ok(Json(submission))
}
