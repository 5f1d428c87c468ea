//! Integration tests for embedded migrations and pool helpers.

use aura_db::pool;
use aura_test_utils::{create_test_db, drop_test_db};

const EXPECTED_TABLES: &[&str] = &[
    "activity_templates",
    "ai_analyses",
    "ai_suggestions",
    "annual_plans",
    "assessments",
    "assignments",
    "audit_logs",
    "charges",
    "class_students",
    "classes",
    "collection_templates",
    "documents",
    "enrollments",
    "grades",
    "interaction_logs",
    "lesson_records",
    "lesson_templates",
    "notifications",
    "schools",
    "staff",
    "students",
    "submissions",
    "teaching_materials",
    "template_collections",
    "thematic_units",
    "users",
];

#[tokio::test]
async fn migrations_create_all_tables() {
    let (pool, db_name) = create_test_db().await;

    let counts = pool::table_counts(&pool)
        .await
        .expect("table_counts should succeed");
    let mut names: Vec<&str> = counts.iter().map(|(name, _)| name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, EXPECTED_TABLES);
    assert!(counts.iter().all(|(_, count)| *count == 0));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let (pool, db_name) = create_test_db().await;

    pool::run_migrations(&pool)
        .await
        .expect("second migration run should be a no-op");
    pool::ping(&pool).await.expect("pool should still work");

    pool.close().await;
    drop_test_db(&db_name).await;
}
