//! Library visibility, authorship and collection membership.

use aura_db::models::{GradeLevel, Role};
use aura_db::queries::collections::{self, CollectionChanges, NewCollection};
use aura_db::queries::lesson_templates::{
    self, LessonTemplateChanges, LessonTemplateFilter, NewLessonTemplate,
};
use aura_test_utils::{create_test_db, drop_test_db, fixtures};

fn template(title: &str, public: bool) -> NewLessonTemplate {
    NewLessonTemplate {
        title: title.into(),
        grade_level: GradeLevel::Elementary3,
        theme: "leitura".into(),
        learning_objectives: "Ler com fluência".into(),
        content: String::new(),
        bncc_skills: vec!["EF03LP01".into()],
        duration_minutes: None,
        public,
    }
}

#[tokio::test]
async fn visibility_is_public_or_own() {
    let (pool, db_name) = create_test_db().await;
    let a = fixtures::school(&pool, "A").await;
    let b = fixtures::school(&pool, "B").await;
    let ana = fixtures::user(&pool, a.id, "ana", Role::Teacher).await;
    let bia = fixtures::user(&pool, b.id, "bia", Role::Teacher).await;

    let shared = lesson_templates::insert_lesson_template(&pool, ana.id, &template("Fábulas", true))
        .await
        .unwrap();
    let private =
        lesson_templates::insert_lesson_template(&pool, ana.id, &template("Rascunho", false))
            .await
            .unwrap();
    assert_eq!(shared.duration_minutes, 50);

    let seen_by_bia =
        lesson_templates::list_lesson_templates(&pool, bia.id, &LessonTemplateFilter::default())
            .await
            .unwrap();
    let ids: Vec<_> = seen_by_bia.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![shared.id]);

    assert!(lesson_templates::get_lesson_template(&pool, bia.id, private.id).await.unwrap().is_none());
    assert!(lesson_templates::get_lesson_template(&pool, ana.id, private.id).await.unwrap().is_some());

    // only the author may write
    let changes = LessonTemplateChanges {
        title: Some("Fábulas II".into()),
        ..Default::default()
    };
    assert!(lesson_templates::update_lesson_template(&pool, bia.id, shared.id, &changes).await.unwrap().is_none());
    assert!(!lesson_templates::delete_lesson_template(&pool, bia.id, shared.id).await.unwrap());
    let renamed = lesson_templates::update_lesson_template(&pool, ana.id, shared.id, &changes)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.title, "Fábulas II");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn duplicate_makes_private_editable_copy() {
    let (pool, db_name) = create_test_db().await;
    let a = fixtures::school(&pool, "A").await;
    let ana = fixtures::user(&pool, a.id, "ana", Role::Teacher).await;
    let caio = fixtures::user(&pool, a.id, "caio", Role::Teacher).await;

    let original = lesson_templates::insert_lesson_template(&pool, ana.id, &template("Poemas", true))
        .await
        .unwrap();
    lesson_templates::update_lesson_template(
        &pool,
        ana.id,
        original.id,
        &LessonTemplateChanges {
            editable: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let copy = lesson_templates::duplicate_lesson_template(&pool, caio.id, original.id)
        .await
        .unwrap()
        .expect("public template should duplicate");
    assert_eq!(copy.title, "Poemas (copy)");
    assert_eq!(copy.author_id, Some(caio.id));
    assert!(!copy.public);
    assert!(copy.editable);
    assert_eq!(copy.bncc_skills.0, vec!["EF03LP01".to_owned()]);

    let hidden = lesson_templates::insert_lesson_template(&pool, ana.id, &template("Só meu", false))
        .await
        .unwrap();
    assert!(lesson_templates::duplicate_lesson_template(&pool, caio.id, hidden.id).await.unwrap().is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn locked_template_ignores_content_changes() {
    let (pool, db_name) = create_test_db().await;
    let a = fixtures::school(&pool, "A").await;
    let ana = fixtures::user(&pool, a.id, "ana", Role::Teacher).await;
    let t = lesson_templates::insert_lesson_template(&pool, ana.id, &template("Contos", false))
        .await
        .unwrap();

    let lock = LessonTemplateChanges {
        editable: Some(false),
        ..Default::default()
    };
    lesson_templates::update_lesson_template(&pool, ana.id, t.id, &lock)
        .await
        .unwrap()
        .unwrap();

    let locked = lesson_templates::update_lesson_template(
        &pool,
        ana.id,
        t.id,
        &LessonTemplateChanges {
            title: Some("Contos novos".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(locked.title, "Contos");
    assert!(!locked.editable);

    let unlocked = lesson_templates::update_lesson_template(
        &pool,
        ana.id,
        t.id,
        &LessonTemplateChanges {
            editable: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert!(unlocked.editable);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn collection_keeps_visible_members_in_order() {
    let (pool, db_name) = create_test_db().await;
    let a = fixtures::school(&pool, "A").await;
    let ana = fixtures::user(&pool, a.id, "ana", Role::Teacher).await;
    let bia = fixtures::user(&pool, a.id, "bia", Role::Teacher).await;

    let first = lesson_templates::insert_lesson_template(&pool, ana.id, &template("Um", false))
        .await
        .unwrap();
    let second = lesson_templates::insert_lesson_template(&pool, bia.id, &template("Dois", true))
        .await
        .unwrap();
    let hidden = lesson_templates::insert_lesson_template(&pool, bia.id, &template("Três", false))
        .await
        .unwrap();

    let collection = collections::insert_collection(
        &pool,
        ana.id,
        &NewCollection {
            title: "Leitura".into(),
            description: String::new(),
            grade_level: Some(GradeLevel::Elementary3),
            public: false,
            template_ids: vec![second.id, hidden.id, first.id],
        },
    )
    .await
    .unwrap();
    assert_eq!(collection.template_ids, vec![second.id, first.id]);

    let reordered = collections::update_collection(
        &pool,
        ana.id,
        collection.id,
        &CollectionChanges {
            template_ids: Some(vec![first.id]),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(reordered.template_ids, vec![first.id]);

    assert!(collections::get_collection(&pool, bia.id, collection.id).await.unwrap().is_none());
    assert!(collections::update_collection(&pool, bia.id, collection.id, &CollectionChanges::default())
        .await
        .unwrap()
        .is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}
