//! Seed data for integration tests. Every helper panics on failure.

use sqlx::PgPool;
use uuid::Uuid;

use aura_db::models::{AnnualPlan, Class, GradeLevel, Role, School, User};
use aura_db::queries::classes::{self, NewClass};
use aura_db::queries::plans::{self, NewPlan};
use aura_db::queries::schools::{self, NewSchool};
use aura_db::queries::users::{self, NewUser};

/// A school with a coordinator, a teacher, one class and a draft plan for it.
pub struct Seed {
    pub school: School,
    pub coordinator: User,
    pub teacher: User,
    pub class: Class,
    pub plan: AnnualPlan,
}

pub async fn school(pool: &PgPool, code: &str) -> School {
    schools::insert_school(
        pool,
        &NewSchool {
            name: format!("Escola {code}"),
            code: code.to_owned(),
            ..Default::default()
        },
    )
    .await
    .expect("insert school")
}

/// A user whose username is prefixed with a random suffix so several schools
/// can share a test database.
pub async fn user(pool: &PgPool, school_id: Uuid, name: &str, role: Role) -> User {
    let suffix = Uuid::new_v4().simple().to_string();
    users::insert_user(
        pool,
        school_id,
        &NewUser {
            username: format!("{name}_{}", &suffix[..8]),
            email: format!("{name}@example.com"),
            first_name: name.to_owned(),
            last_name: String::new(),
            role,
            bio: String::new(),
            phone: String::new(),
        },
    )
    .await
    .expect("insert user")
}

pub async fn class(pool: &PgPool, school_id: Uuid, teacher_id: Option<Uuid>, name: &str) -> Class {
    classes::insert_class(
        pool,
        school_id,
        &NewClass {
            name: name.to_owned(),
            grade_level: GradeLevel::Elementary5,
            teacher_id,
            academic_year: 2025,
            semester: Some(1),
        },
    )
    .await
    .expect("insert class")
}

pub async fn plan(pool: &PgPool, school_id: Uuid, teacher_id: Uuid, class_id: Uuid) -> AnnualPlan {
    plans::insert_plan(
        pool,
        school_id,
        teacher_id,
        &NewPlan {
            teacher_id: None,
            class_id,
            title: "Plano anual de Língua Portuguesa".to_owned(),
            introduction: "Leitura e produção de textos narrativos.".to_owned(),
        },
    )
    .await
    .expect("insert plan")
}

/// Seed a complete school. `code` must be unique within the database.
pub async fn seed(pool: &PgPool, code: &str) -> Seed {
    let school = school(pool, code).await;
    let coordinator = user(pool, school.id, "coord", Role::Coordinator).await;
    let teacher = user(pool, school.id, "teacher", Role::Teacher).await;
    let class = class(pool, school.id, Some(teacher.id), "5A").await;
    let plan = plan(pool, school.id, teacher.id, class.id).await;
    Seed {
        school,
        coordinator,
        teacher,
        class,
        plan,
    }
}
