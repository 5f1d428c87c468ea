//! Database query functions for the `classes` and `class_students` tables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Class, GradeLevel, Student};
use crate::queries::listing::Listing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClass {
    pub name: String,
    pub grade_level: GradeLevel,
    pub teacher_id: Option<Uuid>,
    pub academic_year: i32,
    /// 1 or 2; defaults to 1.
    pub semester: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassChanges {
    pub name: Option<String>,
    pub grade_level: Option<GradeLevel>,
    pub teacher_id: Option<Uuid>,
    pub academic_year: Option<i32>,
    pub semester: Option<i32>,
    pub active: Option<bool>,
}

list_filter! {
    ClassFilter {
        grade_level: GradeLevel,
        academic_year: i32,
        semester: i32,
        active: bool,
        teacher_id: Uuid,
    }
}

pub async fn insert_class(pool: &PgPool, school_id: Uuid, new: &NewClass) -> Result<Class> {
    let class = sqlx::query_as::<_, Class>(
        "INSERT INTO classes (school_id, name, grade_level, teacher_id, academic_year, semester) \
         VALUES ($1, $2, $3, $4, $5, COALESCE($6, 1)) \
         RETURNING *",
    )
    .bind(school_id)
    .bind(&new.name)
    .bind(new.grade_level)
    .bind(new.teacher_id)
    .bind(new.academic_year)
    .bind(new.semester)
    .fetch_one(pool)
    .await
    .context("failed to insert class")?;

    Ok(class)
}

pub async fn get_class(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<Option<Class>> {
    let class = sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch class")?;

    Ok(class)
}

pub async fn list_classes(pool: &PgPool, school_id: Uuid, filter: &ClassFilter) -> Result<Vec<Class>> {
    Listing::from_table("classes")
        .eq("school_id", Some(school_id))
        .eq("grade_level", filter.grade_level)
        .eq("academic_year", filter.academic_year)
        .eq("semester", filter.semester)
        .eq("active", filter.active)
        .eq("teacher_id", filter.teacher_id)
        .finish(
            filter.page(),
            &["name"],
            &["name", "academic_year", "created_at"],
            "name",
        )
        .fetch_all(pool)
        .await
}

pub async fn update_class(
    pool: &PgPool,
    school_id: Uuid,
    id: Uuid,
    changes: &ClassChanges,
) -> Result<Option<Class>> {
    let class = sqlx::query_as::<_, Class>(
        "UPDATE classes SET \
             name = COALESCE($3, name), \
             grade_level = COALESCE($4, grade_level), \
             teacher_id = COALESCE($5, teacher_id), \
             academic_year = COALESCE($6, academic_year), \
             semester = COALESCE($7, semester), \
             active = COALESCE($8, active), \
             updated_at = now() \
         WHERE id = $1 AND school_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(school_id)
    .bind(&changes.name)
    .bind(changes.grade_level)
    .bind(changes.teacher_id)
    .bind(changes.academic_year)
    .bind(changes.semester)
    .bind(changes.active)
    .fetch_optional(pool)
    .await
    .context("failed to update class")?;

    Ok(class)
}

pub async fn delete_class(pool: &PgPool, school_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM classes WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(school_id)
        .execute(pool)
        .await
        .context("failed to delete class")?;

    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Students enrolled in a class, ordered by registration number.
pub async fn list_class_students(
    pool: &PgPool,
    school_id: Uuid,
    class_id: Uuid,
) -> Result<Vec<Student>> {
    let students = sqlx::query_as::<_, Student>(
        "SELECT s.* FROM students s \
         JOIN class_students cs ON cs.student_id = s.id \
         WHERE cs.class_id = $1 AND cs.school_id = $2 \
         ORDER BY s.registration_number ASC",
    )
    .bind(class_id)
    .bind(school_id)
    .fetch_all(pool)
    .await
    .context("failed to list class students")?;

    Ok(students)
}

/// Add a student to a class. Returns `false` when already a member.
pub async fn add_class_student(
    pool: &PgPool,
    school_id: Uuid,
    class_id: Uuid,
    student_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO class_students (class_id, student_id, school_id) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (class_id, student_id) DO NOTHING",
    )
    .bind(class_id)
    .bind(student_id)
    .bind(school_id)
    .execute(pool)
    .await
    .context("failed to add student to class")?;

    Ok(result.rows_affected() > 0)
}

pub async fn remove_class_student(
    pool: &PgPool,
    school_id: Uuid,
    class_id: Uuid,
    student_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query(
        "DELETE FROM class_students \
         WHERE class_id = $1 AND student_id = $2 AND school_id = $3",
    )
    .bind(class_id)
    .bind(student_id)
    .bind(school_id)
    .execute(pool)
    .await
    .context("failed to remove student from class")?;

    Ok(result.rows_affected() > 0)
}
