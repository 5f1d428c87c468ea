//! The interaction log accepts inserts and nothing else.

use aura_db::models::InteractionKind;
use aura_db::queries::interaction_logs::{self, InteractionLogFilter, NewInteractionLog};
use aura_test_utils::{create_test_db, drop_test_db, fixtures};

fn entry(school_id: uuid::Uuid, success: bool) -> NewInteractionLog {
    NewInteractionLog {
        school_id: Some(school_id),
        actor_id: None,
        kind: InteractionKind::Webhook,
        endpoint: "http://hooks.local/plan".into(),
        request: serde_json::json!({"event": "plan.submitted"}),
        response: success.then(|| serde_json::json!({"ok": true})),
        success,
        latency_ms: 12,
        token_cost: None,
        error_message: (!success).then(|| "HTTP 500".to_owned()),
    }
}

#[tokio::test]
async fn append_and_list() {
    let (pool, db_name) = create_test_db().await;
    let school = fixtures::school(&pool, "A").await;

    let first = interaction_logs::append_interaction_log(&pool, &entry(school.id, true))
        .await
        .unwrap();
    let second = interaction_logs::append_interaction_log(&pool, &entry(school.id, false))
        .await
        .unwrap();
    assert!(second > first);

    let failures = interaction_logs::list_interaction_logs(
        &pool,
        school.id,
        &InteractionLogFilter {
            success: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error_message.as_deref(), Some("HTTP 500"));
    assert!(failures[0].response.is_none());

    let total =
        interaction_logs::count_interaction_logs(&pool, school.id, InteractionKind::Webhook, None)
            .await
            .unwrap();
    assert_eq!(total, 2);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn update_and_delete_are_rejected() {
    let (pool, db_name) = create_test_db().await;
    let school = fixtures::school(&pool, "A").await;
    let id = interaction_logs::append_interaction_log(&pool, &entry(school.id, true))
        .await
        .unwrap();

    let update = sqlx::query("UPDATE interaction_logs SET success = FALSE WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await;
    assert!(update.is_err(), "update should be rejected");

    let delete = sqlx::query("DELETE FROM interaction_logs WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await;
    assert!(delete.is_err(), "delete should be rejected");

    let truncate = sqlx::query("TRUNCATE interaction_logs").execute(&pool).await;
    assert!(truncate.is_err(), "truncate should be rejected");

    let row = interaction_logs::get_interaction_log(&pool, school.id, id)
        .await
        .unwrap()
        .expect("row should survive");
    assert!(row.success);

    pool.close().await;
    drop_test_db(&db_name).await;
}
