//! Rows of one school are invisible to, and unreachable from, another.

use aura_db::models::Role;
use aura_db::queries::classes::{self, ClassFilter};
use aura_db::queries::plans::{self, NewPlan, PlanChanges};
use aura_db::queries::students::{self, NewStudent};
use aura_test_utils::{create_test_db, drop_test_db, fixtures};

fn sqlstate(err: &anyhow::Error) -> Option<String> {
    err.chain()
        .find_map(|e| e.downcast_ref::<sqlx::Error>())
        .and_then(|e| e.as_database_error())
        .and_then(|e| e.code().map(|c| c.into_owned()))
}

#[tokio::test]
async fn reads_and_writes_are_scoped_to_school() {
    let (pool, db_name) = create_test_db().await;
    let a = fixtures::seed(&pool, "A").await;
    let b = fixtures::seed(&pool, "B").await;

    assert!(plans::get_plan(&pool, b.school.id, a.plan.id).await.unwrap().is_none());

    let changed = plans::update_plan(
        &pool,
        b.school.id,
        a.plan.id,
        &PlanChanges {
            title: Some("hijacked".into()),
            introduction: None,
        },
    )
    .await
    .unwrap();
    assert!(changed.is_none());
    assert!(!plans::delete_plan(&pool, b.school.id, a.plan.id).await.unwrap());
    assert!(plans::mark_submitted(&pool, b.school.id, a.plan.id).await.unwrap().is_none());

    let listed = classes::list_classes(&pool, b.school.id, &ClassFilter::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, b.class.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn cross_school_references_are_rejected() {
    let (pool, db_name) = create_test_db().await;
    let a = fixtures::seed(&pool, "A").await;
    let b = fixtures::seed(&pool, "B").await;

    // school B cannot attach a plan to school A's class
    let err = plans::insert_plan(
        &pool,
        b.school.id,
        b.teacher.id,
        &NewPlan {
            teacher_id: None,
            class_id: a.class.id,
            title: "cross".into(),
            introduction: String::new(),
        },
    )
    .await
    .expect_err("composite foreign key should reject");
    assert_eq!(sqlstate(&err).as_deref(), Some("23503"));

    // nor register school A's user as its student
    let pupil = fixtures::user(&pool, a.school.id, "pupil", Role::Student).await;
    let err = students::insert_student(
        &pool,
        b.school.id,
        &NewStudent {
            user_id: pupil.id,
            registration_number: "R-1".into(),
            birth_date: None,
            guardian_name: String::new(),
            guardian_phone: String::new(),
        },
    )
    .await
    .expect_err("composite foreign key should reject");
    assert_eq!(sqlstate(&err).as_deref(), Some("23503"));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn roster_membership_is_idempotent() {
    let (pool, db_name) = create_test_db().await;
    let a = fixtures::seed(&pool, "A").await;
    let pupil = fixtures::user(&pool, a.school.id, "pupil", Role::Student).await;
    let student = students::insert_student(
        &pool,
        a.school.id,
        &NewStudent {
            user_id: pupil.id,
            registration_number: "R-1".into(),
            birth_date: None,
            guardian_name: "Ana".into(),
            guardian_phone: String::new(),
        },
    )
    .await
    .unwrap();

    assert!(classes::add_class_student(&pool, a.school.id, a.class.id, student.id).await.unwrap());
    assert!(!classes::add_class_student(&pool, a.school.id, a.class.id, student.id).await.unwrap());

    let roster = classes::list_class_students(&pool, a.school.id, a.class.id).await.unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].id, student.id);

    assert!(classes::remove_class_student(&pool, a.school.id, a.class.id, student.id).await.unwrap());
    assert!(classes::list_class_students(&pool, a.school.id, a.class.id).await.unwrap().is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}
