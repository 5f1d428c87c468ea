use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

text_enum! {
    /// What kind of content a suggestion request asks for.
    SuggestionKind as "suggestion kind" {
        Activity => "activity",
        TeachingResource => "teaching_resource",
        AssessmentIdea => "assessment_idea",
    }
}

impl SuggestionKind {
    /// The `formato_desejado` value the assistant service expects.
    pub fn wire_format(&self) -> &'static str {
        match self {
            Self::Activity => "atividade",
            Self::TeachingResource => "recurso_didatico",
            Self::AssessmentIdea => "ideia_avaliacao",
        }
    }
}

text_enum! {
    /// Which outbound call an interaction-log row records.
    InteractionKind as "interaction kind" {
        Suggestion => "suggestion",
        Analysis => "analysis",
        Webhook => "webhook",
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A successful suggestion returned by the assistant. Never written for a
/// failed call.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiSuggestion {
    pub id: Uuid,
    pub school_id: Uuid,
    pub plan_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub kind: SuggestionKind,
    pub skill_focus: String,
    pub prior_context: String,
    pub title: String,
    pub body: String,
    pub suggested_skills: Json<Vec<String>>,
    pub model: String,
    pub token_cost: i32,
    pub processing_ms: i64,
    pub raw_response: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A successful plan analysis returned by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiAnalysis {
    pub id: Uuid,
    pub school_id: Uuid,
    pub plan_id: Uuid,
    pub requested_by: Option<Uuid>,
    pub strengths: Json<Vec<String>>,
    pub improvements: Json<Vec<String>>,
    pub recommendations: Json<Vec<String>>,
    pub adherence_score: Option<Decimal>,
    pub token_cost: i32,
    pub raw_response: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// One outbound call attempt. Rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InteractionLog {
    pub id: i64,
    pub school_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub kind: InteractionKind,
    pub endpoint: String,
    pub request: serde_json::Value,
    pub response: Option<serde_json::Value>,
    pub success: bool,
    pub latency_ms: i64,
    pub token_cost: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}
