use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

text_enum! {
    /// School year, from nursery through the last year of high school.
    ///
    /// `ef*` codes are the nine elementary years, `em*` the three high-school
    /// years, matching the prefixes used by BNCC skill codes.
    GradeLevel as "grade level" {
        Nursery => "nursery",
        Preschool => "preschool",
        Elementary1 => "ef1",
        Elementary2 => "ef2",
        Elementary3 => "ef3",
        Elementary4 => "ef4",
        Elementary5 => "ef5",
        Elementary6 => "ef6",
        Elementary7 => "ef7",
        Elementary8 => "ef8",
        Elementary9 => "ef9",
        HighSchool1 => "em1",
        HighSchool2 => "em2",
        HighSchool3 => "em3",
    }
}

impl GradeLevel {
    /// The `nivel_ensino` code the assistant service expects (`5ef`, `2em`).
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::Nursery => "maternal",
            Self::Preschool => "pre",
            Self::Elementary1 => "1ef",
            Self::Elementary2 => "2ef",
            Self::Elementary3 => "3ef",
            Self::Elementary4 => "4ef",
            Self::Elementary5 => "5ef",
            Self::Elementary6 => "6ef",
            Self::Elementary7 => "7ef",
            Self::Elementary8 => "8ef",
            Self::Elementary9 => "9ef",
            Self::HighSchool1 => "1em",
            Self::HighSchool2 => "2em",
            Self::HighSchool3 => "3em",
        }
    }
}

text_enum! {
    /// Lifecycle of an annual plan. Only `draft -> pending -> approved|rejected`
    /// is driven by the review workflow.
    PlanStatus as "plan status" {
        Draft => "draft",
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        InProgress => "in_progress",
        Completed => "completed",
    }
}

text_enum! {
    AssessmentKind as "assessment kind" {
        Diagnostic => "diagnostic",
        Formative => "formative",
        Summative => "summative",
    }
}

text_enum! {
    AssignmentStatus as "assignment status" {
        Draft => "draft",
        Published => "published",
        Closed => "closed",
    }
}

text_enum! {
    SubmissionStatus as "submission status" {
        Pending => "pending",
        Submitted => "submitted",
        Graded => "graded",
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Class {
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: String,
    pub grade_level: GradeLevel,
    pub teacher_id: Option<Uuid>,
    pub academic_year: i32,
    pub semester: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Academic profile of a student user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub school_id: Uuid,
    pub user_id: Uuid,
    pub registration_number: String,
    pub birth_date: Option<NaiveDate>,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One teacher's plan for one class over the school year.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnnualPlan {
    pub id: Uuid,
    pub school_id: Uuid,
    pub teacher_id: Uuid,
    pub class_id: Uuid,
    pub title: String,
    pub introduction: String,
    pub status: PlanStatus,
    pub reviewer_comment: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A block of an annual plan. `position` orders units within the plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ThematicUnit {
    pub id: Uuid,
    pub school_id: Uuid,
    pub plan_id: Uuid,
    pub title: String,
    pub description: String,
    pub bncc_skills: Json<Vec<String>>,
    pub duration_weeks: i32,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What was taught on a given day, with per-student attendance.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonRecord {
    pub id: Uuid,
    pub school_id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub taught_on: NaiveDate,
    pub title: String,
    pub content: String,
    pub attendance: serde_json::Value,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assessment {
    pub id: Uuid,
    pub school_id: Uuid,
    pub class_id: Uuid,
    pub title: String,
    pub kind: AssessmentKind,
    pub held_on: NaiveDate,
    pub max_score: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Grade {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub assessment_id: Uuid,
    pub score: Decimal,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub school_id: Uuid,
    pub class_id: Uuid,
    pub title: String,
    pub description: String,
    pub due_at: DateTime<Utc>,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Submission {
    pub id: Uuid,
    pub school_id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub content: String,
    pub attachment_url: Option<String>,
    pub status: SubmissionStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: Option<Decimal>,
    pub feedback: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
