//! Plan review workflow against a real database and a fake webhook receiver.

use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aura_core::integration::{WebhookClient, WebhookConfig};
use aura_core::workflow::{PlanAction, PlanWorkflow, WorkflowError};
use aura_db::models::{InteractionKind, PlanStatus};
use aura_db::queries::{interaction_logs, plans};
use aura_test_utils::fixtures::{self, Seed};
use aura_test_utils::{create_test_db, drop_test_db};

fn workflow(pool: &PgPool, url: Option<String>) -> PlanWorkflow {
    let webhook = WebhookClient::new(
        pool.clone(),
        &WebhookConfig {
            url,
            secret: Some("hook-secret".into()),
            ..Default::default()
        },
    )
    .unwrap();
    PlanWorkflow::new(pool.clone(), Arc::new(webhook))
}

async fn webhook_rows(pool: &PgPool, seed: &Seed, success: Option<bool>) -> i64 {
    interaction_logs::count_interaction_logs(pool, seed.school.id, InteractionKind::Webhook, success)
        .await
        .unwrap()
}

#[tokio::test]
async fn submit_is_idempotent_and_notifies_once() {
    let (pool, db_name) = create_test_db().await;
    let seed = fixtures::seed(&pool, "W1").await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/plan"))
        .and(header_exists("x-aura-signature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    let wf = workflow(&pool, Some(format!("{}/hooks/plan", server.uri())));

    let first = wf.submit(seed.school.id, seed.plan.id, seed.teacher.id).await.unwrap();
    assert!(first.changed);
    assert!(first.workflow_triggered);
    assert_eq!(first.plan.status, PlanStatus::Pending);
    assert!(first.plan.submitted_at.is_some());

    let second = wf.submit(seed.school.id, seed.plan.id, seed.teacher.id).await.unwrap();
    assert!(!second.changed);
    assert!(!second.workflow_triggered);
    assert_eq!(second.plan.status, PlanStatus::Pending);
    assert_eq!(second.plan.submitted_at, first.plan.submitted_at);

    assert_eq!(webhook_rows(&pool, &seed, Some(true)).await, 1);
    assert_eq!(webhook_rows(&pool, &seed, None).await, 1);

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["event"], "plan.submitted");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["plan_id"], seed.plan.id.to_string());
    assert_eq!(body["actor_id"], seed.teacher.id.to_string());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn concurrent_submits_notify_once() {
    let (pool, db_name) = create_test_db().await;
    let seed = fixtures::seed(&pool, "W2").await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let wf = workflow(&pool, Some(server.uri()));

    let (a, b) = tokio::join!(
        wf.submit(seed.school.id, seed.plan.id, seed.teacher.id),
        wf.submit(seed.school.id, seed.plan.id, seed.teacher.id),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a.changed ^ b.changed, "exactly one submit should win");
    assert_eq!(webhook_rows(&pool, &seed, None).await, 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn review_requires_pending() {
    let (pool, db_name) = create_test_db().await;
    let seed = fixtures::seed(&pool, "W3").await;
    let wf = workflow(&pool, None);
    let (school, plan, reviewer) = (seed.school.id, seed.plan.id, seed.coordinator.id);

    let err = wf.approve(school, plan, reviewer, None).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InvalidTransition {
            from: PlanStatus::Draft,
            action: PlanAction::Approve
        }
    ));
    let err = wf.reject(school, plan, reviewer, "incompleto").await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InvalidTransition {
            from: PlanStatus::Draft,
            action: PlanAction::Reject
        }
    ));

    wf.submit(school, plan, seed.teacher.id).await.unwrap();
    let approved = wf.approve(school, plan, reviewer, Some("  ")).await.unwrap();
    assert!(approved.changed);
    assert_eq!(approved.plan.status, PlanStatus::Approved);
    assert_eq!(approved.plan.reviewed_by, Some(reviewer));
    assert!(approved.plan.reviewer_comment.is_none());

    // approved plans cannot be resubmitted or rejected
    let err = wf.submit(school, plan, seed.teacher.id).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InvalidTransition {
            from: PlanStatus::Approved,
            action: PlanAction::Submit
        }
    ));
    assert!(wf.reject(school, plan, reviewer, "tarde demais").await.is_err());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn reject_requires_comment() {
    let (pool, db_name) = create_test_db().await;
    let seed = fixtures::seed(&pool, "W4").await;
    let wf = workflow(&pool, None);
    let (school, plan, reviewer) = (seed.school.id, seed.plan.id, seed.coordinator.id);

    wf.submit(school, plan, seed.teacher.id).await.unwrap();

    let err = wf.reject(school, plan, reviewer, " \n ").await.unwrap_err();
    assert!(matches!(err, WorkflowError::MissingReviewerComment));
    let unchanged = plans::get_plan(&pool, school, plan).await.unwrap().unwrap();
    assert_eq!(unchanged.status, PlanStatus::Pending);
    assert!(unchanged.reviewed_at.is_none());

    let rejected = wf.reject(school, plan, reviewer, " Faltam objetivos. ").await.unwrap();
    assert_eq!(rejected.plan.status, PlanStatus::Rejected);
    assert_eq!(rejected.plan.reviewer_comment.as_deref(), Some("Faltam objetivos."));
    assert!(rejected.plan.reviewed_at.is_some());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn unknown_plan_is_not_found() {
    let (pool, db_name) = create_test_db().await;
    let seed = fixtures::seed(&pool, "W5").await;
    let other = fixtures::seed(&pool, "W6").await;
    let wf = workflow(&pool, None);

    // another school's plan is indistinguishable from a missing one
    let err = wf
        .submit(seed.school.id, other.plan.id, seed.teacher.id)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound(id) if id == other.plan.id));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn webhook_failure_is_swallowed_and_logged() {
    let (pool, db_name) = create_test_db().await;
    let seed = fixtures::seed(&pool, "W7").await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    let wf = workflow(&pool, Some(server.uri()));

    let outcome = wf.submit(seed.school.id, seed.plan.id, seed.teacher.id).await.unwrap();
    assert!(outcome.changed);
    assert!(!outcome.workflow_triggered);
    assert_eq!(outcome.plan.status, PlanStatus::Pending);

    assert_eq!(webhook_rows(&pool, &seed, Some(false)).await, 1);
    assert_eq!(webhook_rows(&pool, &seed, None).await, 1);

    let rows = interaction_logs::list_interaction_logs(&pool, seed.school.id, &Default::default())
        .await
        .unwrap();
    assert_eq!(rows[0].error_message.as_deref(), Some("HTTP 500: boom"));
    assert_eq!(rows[0].actor_id, Some(seed.teacher.id));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn missing_url_makes_no_attempt() {
    let (pool, db_name) = create_test_db().await;
    let seed = fixtures::seed(&pool, "W8").await;
    let wf = workflow(&pool, None);

    let outcome = wf.submit(seed.school.id, seed.plan.id, seed.teacher.id).await.unwrap();
    assert!(outcome.changed);
    assert!(!outcome.workflow_triggered);
    assert_eq!(webhook_rows(&pool, &seed, None).await, 0);

    pool.close().await;
    drop_test_db(&db_name).await;
}
