//! Library rows are shared across schools: visibility is `public` or
//! authorship, never `school_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use super::GradeLevel;

text_enum! {
    ActivityKind as "activity kind" {
        Exercise => "exercise",
        Project => "project",
        Quiz => "quiz",
        Discussion => "discussion",
        Creative => "creative",
    }
}

text_enum! {
    Difficulty as "difficulty" {
        Easy => "easy",
        Medium => "medium",
        Hard => "hard",
    }
}

text_enum! {
    MaterialKind as "material kind" {
        ClassroomDecor => "classroom_decor",
        Syllabary => "syllabary",
        ExtraActivity => "extra_activity",
        ThemedKit => "themed_kit",
        VisualAid => "visual_aid",
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonTemplate {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub grade_level: GradeLevel,
    pub theme: String,
    pub learning_objectives: String,
    pub content: String,
    pub bncc_skills: Json<Vec<String>>,
    pub duration_minutes: i32,
    pub public: bool,
    pub editable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityTemplate {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub kind: ActivityKind,
    pub grade_level: GradeLevel,
    pub difficulty: Difficulty,
    pub estimated_minutes: i32,
    pub instructions: String,
    pub bncc_skills: Json<Vec<String>>,
    pub public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeachingMaterial {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub kind: MaterialKind,
    pub grade_level: GradeLevel,
    pub theme: String,
    pub file_url: String,
    pub public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named, ordered bundle of lesson templates.
///
/// `template_ids` is aggregated from `collection_templates` by the queries
/// that load collections.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateCollection {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub grade_level: Option<GradeLevel>,
    pub public: bool,
    pub template_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
