//! Plan suggestions and analyses from the assistant.
//!
//! A call either persists its record together with a success log row in one
//! transaction, or writes a single failure log row and returns the error.

use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use aura_db::models::{
    AiAnalysis, AiSuggestion, AnnualPlan, GradeLevel, InteractionKind, SuggestionKind, ThematicUnit,
};
use aura_db::queries::ai_analyses::{self, NewAiAnalysis};
use aura_db::queries::ai_suggestions::{self, NewAiSuggestion};
use aura_db::queries::interaction_logs::{self, NewInteractionLog};
use aura_db::queries::{classes, plans, units};

use super::client::Assistant;
use super::{Attempt, CallError, Caller, IntegrationError, append_detached, failure_entry};

pub const SUGGESTION_PATH: &str = "sugestoes_planejamento/";
pub const ANALYSIS_PATH: &str = "analise_plano/";

/// Model name recorded when the reply does not name one.
pub const DEFAULT_MODEL: &str = "AuraMind-v3";

pub const DEFAULT_ANALYSIS_INSTRUCTION: &str = "Analise a aderência curricular (BNCC) e o nível de \
     profundidade pedagógica. Gere um resumo com 3 pontos fortes e 3 pontos a revisar.";

/// Body of `POST /api/ai/suggestions`.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionRequest {
    pub plan_id: Uuid,
    #[serde(default = "default_kind")]
    pub kind: SuggestionKind,
    #[serde(default)]
    pub skill_focus: String,
    #[serde(default)]
    pub prior_context: String,
    /// Passed through to the assistant untouched.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

fn default_kind() -> SuggestionKind {
    SuggestionKind::Activity
}

/// Body of `POST /api/ai/analyses`. The payload is built from the stored plan.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub plan_id: Uuid,
    #[serde(default)]
    pub instruction: Option<String>,
}

// ---------------------------------------------------------------------------
// Reply shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SuggestionReply {
    #[serde(rename = "dados_sugeridos")]
    data: Option<SuggestedData>,
    metadata: Option<ReplyMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SuggestedData {
    #[serde(rename = "titulo")]
    title: Option<String>,
    #[serde(rename = "sugestao_texto")]
    text: Option<String>,
    #[serde(rename = "habilidades_sugeridas", deserialize_with = "text_list")]
    skills: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyMetadata {
    #[serde(rename = "custo_token")]
    token_cost: Option<i32>,
    #[serde(rename = "tempo_processamento_ms")]
    processing_ms: Option<i64>,
    #[serde(rename = "modelo_ia")]
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisReply {
    #[serde(rename = "analise")]
    analysis: Option<AnalysisBody>,
    #[serde(rename = "custo_token")]
    token_cost: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisBody {
    #[serde(rename = "pontos_fortes", deserialize_with = "text_list")]
    strengths: Vec<String>,
    #[serde(rename = "pontos_a_revisar", deserialize_with = "text_list")]
    improvements: Vec<String>,
    #[serde(rename = "recomendacoes", deserialize_with = "text_list")]
    recommendations: Vec<String>,
    #[serde(rename = "score_aderencia")]
    adherence_score: Option<Decimal>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

/// Accept `null`, a single string or a list of strings.
fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TextOrList>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(TextOrList::Text(text)) if text.trim().is_empty() => Vec::new(),
        Some(TextOrList::Text(text)) => vec![text],
        Some(TextOrList::List(items)) => items,
    })
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

fn suggestion_payload(
    plan: &AnnualPlan,
    grade_level: Option<GradeLevel>,
    caller: Caller,
    request: &SuggestionRequest,
) -> Value {
    json!({
        "plano_id": plan.id,
        "professor_id": caller.actor_id,
        "nivel_ensino": grade_level.map(|g| g.wire_code()),
        "habilidade_foco": request.skill_focus,
        "contexto_previo": request.prior_context,
        "formato_desejado": request.kind.wire_format(),
        "parametros_adicionais": request.parameters,
    })
}

fn analysis_payload(
    plan: &AnnualPlan,
    grade_level: Option<GradeLevel>,
    units: &[ThematicUnit],
    instruction: &str,
) -> Value {
    let units: Vec<Value> = units
        .iter()
        .map(|u| {
            json!({
                "titulo": u.title,
                "descricao": u.description,
                "habilidades_bncc": u.bncc_skills.0,
                "duracao_semanas": u.duration_weeks,
                "ordem": u.position,
            })
        })
        .collect();

    json!({
        "plano_id": plan.id,
        "nivel_ensino": grade_level.map(|g| g.wire_code()),
        "introducao_geral": plan.introduction,
        "unidades_tematicas": units,
        "instrucao_analise": instruction,
    })
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Calls the assistant on behalf of a user and records the outcome.
#[derive(Clone)]
pub struct AssistantService {
    pool: PgPool,
    assistant: Arc<dyn Assistant>,
}

impl AssistantService {
    pub fn new(pool: PgPool, assistant: Arc<dyn Assistant>) -> Self {
        Self { pool, assistant }
    }

    /// Ask for a suggestion about one plan.
    pub async fn generate_suggestion(
        &self,
        caller: Caller,
        request: &SuggestionRequest,
    ) -> Result<AiSuggestion, IntegrationError> {
        let plan = self.plan(caller.school_id, request.plan_id).await?;
        let grade_level = self.grade_level(&plan).await?;
        let payload = suggestion_payload(&plan, grade_level, caller, request);
        let kind = InteractionKind::Suggestion;
        let endpoint = self.assistant.endpoint(SUGGESTION_PATH);

        let attempt = Attempt::start();
        let result = self.assistant.call(SUGGESTION_PATH, &payload).await;
        let latency_ms = attempt.elapsed_ms();

        let body = match result {
            Ok(body) => body,
            Err(e) => return Err(self.fail(caller, kind, &endpoint, &payload, e, None, latency_ms).await),
        };
        let reply: SuggestionReply = match serde_json::from_value(body.clone()) {
            Ok(reply) => reply,
            Err(e) => {
                let err = CallError::InvalidBody(e.to_string());
                return Err(self.fail(caller, kind, &endpoint, &payload, err, Some(body), latency_ms).await);
            }
        };

        let data = reply.data.unwrap_or_default();
        let metadata = reply.metadata.unwrap_or_default();
        let token_cost = metadata.token_cost.unwrap_or(0);
        let new = NewAiSuggestion {
            plan_id: plan.id,
            teacher_id: Some(caller.actor_id),
            kind: request.kind,
            skill_focus: request.skill_focus.clone(),
            prior_context: request.prior_context.clone(),
            title: data.title.unwrap_or_default(),
            body: data.text.unwrap_or_default(),
            suggested_skills: data.skills,
            model: metadata.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            token_cost,
            processing_ms: metadata.processing_ms.unwrap_or(latency_ms),
            raw_response: body.clone(),
        };
        let log = success_entry(caller, kind, &endpoint, &payload, &body, latency_ms, token_cost);

        match self.persist_suggestion(caller.school_id, &new, &log).await {
            Ok(suggestion) => {
                tracing::info!(
                    suggestion_id = %suggestion.id,
                    plan_id = %plan.id,
                    actor_id = %caller.actor_id,
                    latency_ms,
                    token_cost,
                    "assistant suggestion stored"
                );
                Ok(suggestion)
            }
            Err(e) => Err(self.persist_failed(caller, kind, &endpoint, &payload, body, latency_ms, e).await),
        }
    }

    /// Ask for an analysis of one plan and its thematic units.
    pub async fn analyze_plan(
        &self,
        caller: Caller,
        request: &AnalysisRequest,
    ) -> Result<AiAnalysis, IntegrationError> {
        let plan = self.plan(caller.school_id, request.plan_id).await?;
        let grade_level = self.grade_level(&plan).await?;
        let units = units::list_units_for_plan(&self.pool, caller.school_id, plan.id).await?;
        let instruction = request
            .instruction
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .unwrap_or(DEFAULT_ANALYSIS_INSTRUCTION);
        let payload = analysis_payload(&plan, grade_level, &units, instruction);
        let kind = InteractionKind::Analysis;
        let endpoint = self.assistant.endpoint(ANALYSIS_PATH);

        let attempt = Attempt::start();
        let result = self.assistant.call(ANALYSIS_PATH, &payload).await;
        let latency_ms = attempt.elapsed_ms();

        let body = match result {
            Ok(body) => body,
            Err(e) => return Err(self.fail(caller, kind, &endpoint, &payload, e, None, latency_ms).await),
        };
        let reply: AnalysisReply = match serde_json::from_value(body.clone()) {
            Ok(reply) => reply,
            Err(e) => {
                let err = CallError::InvalidBody(e.to_string());
                return Err(self.fail(caller, kind, &endpoint, &payload, err, Some(body), latency_ms).await);
            }
        };

        let analysis = reply.analysis.unwrap_or_default();
        let token_cost = reply.token_cost.unwrap_or(0);
        let new = NewAiAnalysis {
            plan_id: plan.id,
            requested_by: Some(caller.actor_id),
            strengths: analysis.strengths,
            improvements: analysis.improvements,
            recommendations: analysis.recommendations,
            adherence_score: analysis.adherence_score,
            token_cost,
            raw_response: body.clone(),
        };
        let log = success_entry(caller, kind, &endpoint, &payload, &body, latency_ms, token_cost);

        match self.persist_analysis(caller.school_id, &new, &log).await {
            Ok(stored) => {
                tracing::info!(
                    analysis_id = %stored.id,
                    plan_id = %plan.id,
                    actor_id = %caller.actor_id,
                    latency_ms,
                    token_cost,
                    "assistant analysis stored"
                );
                Ok(stored)
            }
            Err(e) => Err(self.persist_failed(caller, kind, &endpoint, &payload, body, latency_ms, e).await),
        }
    }

    async fn plan(&self, school_id: Uuid, plan_id: Uuid) -> Result<AnnualPlan, IntegrationError> {
        plans::get_plan(&self.pool, school_id, plan_id)
            .await?
            .ok_or(IntegrationError::PlanNotFound(plan_id))
    }

    async fn grade_level(&self, plan: &AnnualPlan) -> Result<Option<GradeLevel>, IntegrationError> {
        let class = classes::get_class(&self.pool, plan.school_id, plan.class_id).await?;
        Ok(class.map(|c| c.grade_level))
    }

    async fn persist_suggestion(
        &self,
        school_id: Uuid,
        new: &NewAiSuggestion,
        log: &NewInteractionLog,
    ) -> anyhow::Result<AiSuggestion> {
        let mut tx = self.pool.begin().await.context("failed to begin transaction")?;
        let suggestion = ai_suggestions::insert_ai_suggestion(&mut *tx, school_id, new).await?;
        interaction_logs::append_interaction_log(&mut *tx, log).await?;
        tx.commit().await.context("failed to commit suggestion")?;
        Ok(suggestion)
    }

    async fn persist_analysis(
        &self,
        school_id: Uuid,
        new: &NewAiAnalysis,
        log: &NewInteractionLog,
    ) -> anyhow::Result<AiAnalysis> {
        let mut tx = self.pool.begin().await.context("failed to begin transaction")?;
        let analysis = ai_analyses::insert_ai_analysis(&mut *tx, school_id, new).await?;
        interaction_logs::append_interaction_log(&mut *tx, log).await?;
        tx.commit().await.context("failed to commit analysis")?;
        Ok(analysis)
    }

    #[allow(clippy::too_many_arguments)]
    async fn fail(
        &self,
        caller: Caller,
        kind: InteractionKind,
        endpoint: &str,
        payload: &Value,
        error: CallError,
        response: Option<Value>,
        latency_ms: i64,
    ) -> IntegrationError {
        tracing::error!(
            kind = %kind,
            endpoint,
            actor_id = %caller.actor_id,
            latency_ms,
            error = %error,
            "assistant call failed"
        );
        let response = response.or_else(|| error.response());
        let entry = failure_entry(
            Some(caller),
            kind,
            endpoint,
            payload,
            response,
            latency_ms,
            &error.to_string(),
        );
        append_detached(&self.pool, &entry).await;
        IntegrationError::Call(error)
    }

    /// The call succeeded but its record could not be stored. The rolled-back
    /// transaction took the success row with it, so one failure row replaces it.
    #[allow(clippy::too_many_arguments)]
    async fn persist_failed(
        &self,
        caller: Caller,
        kind: InteractionKind,
        endpoint: &str,
        payload: &Value,
        body: Value,
        latency_ms: i64,
        error: anyhow::Error,
    ) -> IntegrationError {
        let message = format!("failed to store assistant response: {error:#}");
        tracing::error!(
            kind = %kind,
            endpoint,
            actor_id = %caller.actor_id,
            error = %format!("{error:#}"),
            "failed to store assistant response"
        );
        let entry = failure_entry(
            Some(caller),
            kind,
            endpoint,
            payload,
            Some(body),
            latency_ms,
            &message,
        );
        append_detached(&self.pool, &entry).await;
        IntegrationError::Database(error)
    }
}

fn success_entry(
    caller: Caller,
    kind: InteractionKind,
    endpoint: &str,
    payload: &Value,
    body: &Value,
    latency_ms: i64,
    token_cost: i32,
) -> NewInteractionLog {
    NewInteractionLog {
        school_id: Some(caller.school_id),
        actor_id: Some(caller.actor_id),
        kind,
        endpoint: endpoint.to_owned(),
        request: payload.clone(),
        response: Some(body.clone()),
        success: true,
        latency_ms,
        token_cost: Some(token_cost),
        error_message: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn suggestion_reply_defaults_missing_fields() {
        let reply: SuggestionReply = serde_json::from_value(json!({})).unwrap();
        assert!(reply.data.is_none());
        assert!(reply.metadata.is_none());

        let reply: SuggestionReply = serde_json::from_value(json!({
            "dados_sugeridos": {"titulo": "Roda de leitura", "habilidades_sugeridas": null},
            "metadata": {"custo_token": 120}
        }))
        .unwrap();
        let data = reply.data.unwrap();
        assert_eq!(data.title.as_deref(), Some("Roda de leitura"));
        assert!(data.text.is_none());
        assert!(data.skills.is_empty());
        let metadata = reply.metadata.unwrap();
        assert_eq!(metadata.token_cost, Some(120));
        assert!(metadata.model.is_none());
    }

    #[test]
    fn suggestion_reply_rejects_wrong_types() {
        let result = serde_json::from_value::<SuggestionReply>(json!({
            "dados_sugeridos": "not an object"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn analysis_reply_accepts_text_or_list() {
        let reply: AnalysisReply = serde_json::from_value(json!({
            "analise": {
                "pontos_fortes": ["a", "b"],
                "pontos_a_revisar": [],
                "recomendacoes": "Trabalhar mais a oralidade.",
                "score_aderencia": 87.5
            },
            "custo_token": 300
        }))
        .unwrap();
        let body = reply.analysis.unwrap();
        assert_eq!(body.strengths, vec!["a", "b"]);
        assert!(body.improvements.is_empty());
        assert_eq!(body.recommendations, vec!["Trabalhar mais a oralidade."]);
        assert_eq!(body.adherence_score, Some(Decimal::from_str("87.5").unwrap()));
        assert_eq!(reply.token_cost, Some(300));
    }

    #[test]
    fn blank_recommendation_text_is_empty_list() {
        let body: AnalysisBody = serde_json::from_value(json!({"recomendacoes": ""})).unwrap();
        assert!(body.recommendations.is_empty());
        assert!(body.adherence_score.is_none());
    }

    #[test]
    fn request_defaults() {
        let request: SuggestionRequest =
            serde_json::from_value(json!({"plan_id": Uuid::nil()})).unwrap();
        assert_eq!(request.kind, SuggestionKind::Activity);
        assert!(request.skill_focus.is_empty());
        assert!(request.parameters.is_empty());
    }
}
