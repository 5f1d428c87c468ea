use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use aura_core::integration::{AssistantService, HttpAssistant, WebhookClient};
use aura_core::workflow::PlanWorkflow;
use aura_db::pool;

use crate::api::{self, ApiResult, AppState};
use crate::config::AuraConfig;

// ---------------------------------------------------------------------------
// State and router
// ---------------------------------------------------------------------------

/// Wire the HTTP collaborators around `pool`.
pub fn build_state(pool: PgPool, config: &AuraConfig) -> Result<AppState> {
    let assistant = HttpAssistant::new(&config.assistant)?;
    let webhook = WebhookClient::new(pool.clone(), &config.webhook)?;
    if !webhook.is_enabled() {
        tracing::info!("workflow webhook disabled; plan transitions will not be forwarded");
    }

    Ok(AppState {
        tokens: config.token_config.clone(),
        workflow: PlanWorkflow::new(pool.clone(), Arc::new(webhook)),
        assistant: AssistantService::new(pool.clone(), Arc::new(assistant)),
        pool,
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api::accounts::routes())
        .merge(api::administration::routes())
        .merge(api::pedagogy::routes())
        .merge(api::library::routes())
        .merge(api::assistant::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, config: &AuraConfig, bind: &str, port: u16) -> Result<()> {
    let app = build_router(build_state(pool, config)?);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!(
        assistant = %config.assistant.base_url,
        "aura serve listening on http://{addr}"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("aura serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Unauthenticated liveness check that also pings the database.
async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    pool::ping(&state.pool).await?;
    Ok(Json(json!({ "status": "ok" })))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use sqlx::PgPool;
    use tower::ServiceExt;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use aura_core::integration::{AssistantConfig, WebhookConfig};
    use aura_core::token::{TokenConfig, generate_token};
    use aura_db::config::DbConfig;
    use aura_db::models::{Role, User};
    use aura_db::queries::interaction_logs::{self, InteractionLogFilter};
    use aura_db::queries::{ai_suggestions, ai_suggestions::AiSuggestionFilter};
    use aura_test_utils::fixtures::{self, Seed};
    use aura_test_utils::{create_test_db, drop_test_db};

    use crate::config::AuraConfig;

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    struct TestApp {
        pool: PgPool,
        db_name: String,
        router: Router,
        tokens: TokenConfig,
        seed: Seed,
    }

    impl TestApp {
        async fn start(assistant_url: &str) -> Self {
            let (pool, db_name) = create_test_db().await;
            let tokens = TokenConfig::new(b"serve-test-secret").unwrap();
            let config = AuraConfig {
                db_config: DbConfig::new("postgresql://unused/aura"),
                token_config: tokens.clone(),
                assistant: AssistantConfig::new(assistant_url),
                webhook: WebhookConfig::default(),
            };
            let state = super::build_state(pool.clone(), &config).unwrap();
            let seed = fixtures::seed(&pool, &format!("S{}", &Uuid::new_v4().simple().to_string()[..6])).await;
            Self {
                router: super::build_router(state),
                pool,
                db_name,
                tokens,
                seed,
            }
        }

        fn token(&self, user: &User) -> String {
            generate_token(&self.tokens, user.id, user.token_version)
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            user: Option<&User>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(user) = user {
                builder = builder.header("authorization", format!("Bearer {}", self.token(user)));
            }
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
                .await
                .unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }

        async fn finish(self) {
            self.pool.close().await;
            drop_test_db(&self.db_name).await;
        }
    }

    fn id_of(json: &Value) -> String {
        json["id"].as_str().expect("response should carry an id").to_owned()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;

        let (status, json) = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");

        app.finish().await;
    }

    #[tokio::test]
    async fn test_api_rejects_missing_and_revoked_tokens() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;

        let (status, json) = app.send(Method::GET, "/api/classes", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json["error"].is_string());

        let mut teacher = app.seed.teacher.clone();
        aura_db::queries::users::bump_token_version(&app.pool, teacher.id)
            .await
            .unwrap();
        let (status, _) = app.send(Method::GET, "/api/classes", Some(&teacher), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "old token must be revoked");

        teacher.token_version += 1;
        let (status, _) = app.send(Method::GET, "/api/classes", Some(&teacher), None).await;
        assert_eq!(status, StatusCode::OK);

        app.finish().await;
    }

    #[tokio::test]
    async fn test_users_me_returns_caller() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;

        let (status, json) = app
            .send(Method::GET, "/api/users/me", Some(&app.seed.teacher), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["username"], app.seed.teacher.username.as_str());
        assert_eq!(json["role"], "teacher");

        app.finish().await;
    }

    #[tokio::test]
    async fn test_class_crud_writes_audit_trail() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;
        let coord = app.seed.coordinator.clone();

        let (status, created) = app
            .send(
                Method::POST,
                "/api/classes",
                Some(&coord),
                Some(json!({
                    "name": "6B",
                    "grade_level": "ef6",
                    "academic_year": 2025,
                    "semester": 2
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["school_id"], app.seed.school.id.to_string());
        let id = id_of(&created);

        let (status, list) = app
            .send(Method::GET, "/api/classes?grade_level=ef6", Some(&coord), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, updated) = app
            .send(
                Method::PATCH,
                &format!("/api/classes/{id}"),
                Some(&coord),
                Some(json!({ "name": "6C" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "6C");
        assert_eq!(updated["grade_level"], "ef6");

        let (status, _) = app
            .send(Method::DELETE, &format!("/api/classes/{id}"), Some(&coord), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app
            .send(Method::GET, &format!("/api/classes/{id}"), Some(&coord), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, logs) = app
            .send(
                Method::GET,
                &format!("/api/audit-logs?object_id={id}&ordering=created_at"),
                Some(&coord),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let actions: Vec<&str> = logs
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["action"].as_str().unwrap())
            .collect();
        assert_eq!(actions, ["create", "update", "delete"]);
        assert!(
            logs.as_array()
                .unwrap()
                .iter()
                .all(|l| l["user_id"] == coord.id.to_string() && l["model_name"] == "class")
        );

        app.finish().await;
    }

    #[tokio::test]
    async fn test_other_school_rows_are_not_found() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;
        let other = fixtures::seed(&app.pool, &format!("O{}", &Uuid::new_v4().simple().to_string()[..6])).await;

        let (status, _) = app
            .send(
                Method::GET,
                &format!("/api/classes/{}", app.seed.class.id),
                Some(&other.coordinator),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(
                Method::POST,
                &format!("/api/plans/{}/submit", app.seed.plan.id),
                Some(&other.teacher),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, list) = app
            .send(Method::GET, "/api/plans", Some(&other.coordinator), None)
            .await;
        let ids: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, [other.plan.id.to_string()]);

        app.finish().await;
    }

    #[tokio::test]
    async fn test_duplicate_class_is_conflict() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;

        let (status, json) = app
            .send(
                Method::POST,
                "/api/classes",
                Some(&app.seed.coordinator),
                Some(json!({
                    "name": app.seed.class.name,
                    "grade_level": "ef5",
                    "academic_year": app.seed.class.academic_year,
                    "semester": app.seed.class.semester
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(json["error"].is_string());

        app.finish().await;
    }

    #[tokio::test]
    async fn test_plan_review_flow() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;
        let plan = app.seed.plan.id;
        let teacher = app.seed.teacher.clone();
        let coord = app.seed.coordinator.clone();

        let (status, _) = app
            .send(Method::POST, &format!("/api/plans/{plan}/approve"), Some(&coord), None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT, "draft plans cannot be approved");

        let (status, outcome) = app
            .send(Method::POST, &format!("/api/plans/{plan}/submit"), Some(&teacher), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["plan"]["status"], "pending");
        assert_eq!(outcome["changed"], true);
        assert_eq!(outcome["workflow_triggered"], false);

        let (status, outcome) = app
            .send(Method::POST, &format!("/api/plans/{plan}/submit"), Some(&teacher), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["changed"], false);

        let (status, json) = app
            .send(
                Method::POST,
                &format!("/api/plans/{plan}/reject"),
                Some(&coord),
                Some(json!({ "comment": "   " })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());

        let (status, outcome) = app
            .send(
                Method::POST,
                &format!("/api/plans/{plan}/reject"),
                Some(&coord),
                Some(json!({ "comment": "Faltam os objetivos do segundo bimestre." })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["plan"]["status"], "rejected");
        assert_eq!(
            outcome["plan"]["reviewer_comment"],
            "Faltam os objetivos do segundo bimestre."
        );
        assert_eq!(outcome["plan"]["reviewed_by"], coord.id.to_string());

        let (status, _) = app
            .send(Method::POST, &format!("/api/plans/{plan}/approve"), Some(&coord), None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT, "rejected is terminal");

        app.finish().await;
    }

    #[tokio::test]
    async fn test_plan_approve_without_body() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;
        let plan = app.seed.plan.id;

        app.send(
            Method::POST,
            &format!("/api/plans/{plan}/submit"),
            Some(&app.seed.teacher),
            None,
        )
        .await;
        let (status, outcome) = app
            .send(
                Method::POST,
                &format!("/api/plans/{plan}/approve"),
                Some(&app.seed.coordinator),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["plan"]["status"], "approved");
        assert_eq!(outcome["plan"]["reviewer_comment"], Value::Null);

        app.finish().await;
    }

    #[tokio::test]
    async fn test_suggestion_failure_is_bad_gateway_and_logged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sugestoes_planejamento/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model overloaded"))
            .expect(1)
            .mount(&server)
            .await;
        let app = TestApp::start(&format!("{}/api/", server.uri())).await;
        let school = app.seed.school.id;

        let (status, json) = app
            .send(
                Method::POST,
                "/api/ai/suggestions",
                Some(&app.seed.teacher),
                Some(json!({ "plan_id": app.seed.plan.id, "kind": "activity" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(json["error"].as_str().unwrap().contains("model overloaded"));

        let suggestions =
            ai_suggestions::list_ai_suggestions(&app.pool, school, &AiSuggestionFilter::default())
                .await
                .unwrap();
        assert!(suggestions.is_empty(), "a failed call must not persist a suggestion");

        let logs =
            interaction_logs::list_interaction_logs(&app.pool, school, &InteractionLogFilter::default())
                .await
                .unwrap();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].success);

        let (status, listed) = app
            .send(Method::GET, "/api/interaction-logs", Some(&app.seed.coordinator), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        app.finish().await;
    }

    #[tokio::test]
    async fn test_suggestion_success_is_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sugestoes_planejamento/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "dados_sugeridos": {
                    "titulo": "Roda de leitura",
                    "sugestao_texto": "Ler contos em grupo.",
                    "habilidades_sugeridas": ["EF05LP01"]
                },
                "metadata": { "custo_token": 12, "modelo_ia": "AuraMind-v3" }
            })))
            .mount(&server)
            .await;
        let app = TestApp::start(&format!("{}/api/", server.uri())).await;

        let (status, created) = app
            .send(
                Method::POST,
                "/api/ai/suggestions",
                Some(&app.seed.teacher),
                Some(json!({ "plan_id": app.seed.plan.id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Roda de leitura");
        let id = id_of(&created);

        let (status, fetched) = app
            .send(
                Method::GET,
                &format!("/api/ai/suggestions/{id}"),
                Some(&app.seed.coordinator),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["suggested_skills"], json!(["EF05LP01"]));

        app.finish().await;
    }

    #[tokio::test]
    async fn test_suggestion_for_unknown_plan_is_not_found() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/api/ai/suggestions",
                Some(&app.seed.teacher),
                Some(json!({ "plan_id": Uuid::new_v4() })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        app.finish().await;
    }

    #[tokio::test]
    async fn test_notifications_are_private_and_read_all() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;
        let teacher = app.seed.teacher.clone();
        let coord = app.seed.coordinator.clone();

        for title in ["Plano enviado", "Reunião pedagógica"] {
            let (status, _) = app
                .send(
                    Method::POST,
                    "/api/notifications",
                    Some(&coord),
                    Some(json!({ "user_id": teacher.id, "title": title })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, mine) = app
            .send(Method::GET, "/api/notifications", Some(&coord), None)
            .await;
        assert!(mine.as_array().unwrap().is_empty());

        let (_, unread) = app
            .send(Method::GET, "/api/notifications/unread", Some(&teacher), None)
            .await;
        assert_eq!(unread.as_array().unwrap().len(), 2);

        let (status, json) = app
            .send(Method::POST, "/api/notifications/read-all", Some(&teacher), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["updated"], 2);

        let (_, unread) = app
            .send(Method::GET, "/api/notifications/unread", Some(&teacher), None)
            .await;
        assert!(unread.as_array().unwrap().is_empty());

        app.finish().await;
    }

    #[tokio::test]
    async fn test_library_edits_are_author_only() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;
        let author = app.seed.teacher.clone();
        let other = fixtures::user(&app.pool, app.seed.school.id, "other", Role::Teacher).await;

        let mut ids = Vec::new();
        for public in [true, false] {
            let (status, created) = app
                .send(
                    Method::POST,
                    "/api/lesson-templates",
                    Some(&author),
                    Some(json!({
                        "title": "Frações no cotidiano",
                        "grade_level": "ef5",
                        "public": public
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            ids.push(id_of(&created));
        }
        let (public_id, private_id) = (&ids[0], &ids[1]);

        let patch = Some(json!({ "title": "Alterado" }));
        let (status, _) = app
            .send(
                Method::PATCH,
                &format!("/api/lesson-templates/{public_id}"),
                Some(&other),
                patch.clone(),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .send(
                Method::PATCH,
                &format!("/api/lesson-templates/{private_id}"),
                Some(&other),
                patch,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, copy) = app
            .send(
                Method::POST,
                &format!("/api/lesson-templates/{public_id}/duplicate"),
                Some(&other),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(copy["author_id"], other.id.to_string());
        assert_eq!(copy["public"], false);

        let (status, _) = app
            .send(
                Method::POST,
                &format!("/api/lesson-templates/{private_id}/duplicate"),
                Some(&other),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(
                Method::DELETE,
                &format!("/api/lesson-templates/{private_id}"),
                Some(&author),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        app.finish().await;
    }

    #[tokio::test]
    async fn test_roster_and_grades() {
        let app = TestApp::start("http://127.0.0.1:9/api/").await;
        let coord = app.seed.coordinator.clone();
        let class = app.seed.class.id;
        let pupil = fixtures::user(&app.pool, app.seed.school.id, "pupil", Role::Student).await;

        let (status, student) = app
            .send(
                Method::POST,
                "/api/students",
                Some(&coord),
                Some(json!({ "user_id": pupil.id, "registration_number": format!("R-{}", pupil.id.simple()) })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let student_id = id_of(&student);

        let roster_uri = format!("/api/classes/{class}/students/{student_id}");
        let (status, _) = app.send(Method::PUT, &roster_uri, Some(&coord), None).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = app.send(Method::PUT, &roster_uri, Some(&coord), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, roster) = app
            .send(Method::GET, &format!("/api/classes/{class}/students"), Some(&coord), None)
            .await;
        assert_eq!(roster.as_array().unwrap().len(), 1);

        let (status, assessment) = app
            .send(
                Method::POST,
                "/api/assessments",
                Some(&coord),
                Some(json!({
                    "class_id": class,
                    "title": "Prova bimestral",
                    "kind": "summative",
                    "max_score": "10.00",
                    "held_on": "2025-04-10"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let assessment_id = id_of(&assessment);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/grades",
                Some(&coord),
                Some(json!({ "student_id": student_id, "assessment_id": assessment_id, "score": "11" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown = Uuid::new_v4();
        let (status, body) = app
            .send(
                Method::POST,
                "/api/grades",
                Some(&coord),
                Some(json!({ "student_id": student_id, "assessment_id": unknown, "score": "5" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], format!("assessment {unknown} not found"));

        let (status, grade) = app
            .send(
                Method::POST,
                "/api/grades",
                Some(&coord),
                Some(json!({ "student_id": student_id, "assessment_id": assessment_id, "score": "8.5" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let grade_id = id_of(&grade);

        let (status, _) = app
            .send(
                Method::PATCH,
                &format!("/api/grades/{grade_id}"),
                Some(&coord),
                Some(json!({ "score": "12" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(
                Method::PATCH,
                &format!("/api/grades/{}", Uuid::new_v4()),
                Some(&coord),
                Some(json!({ "score": "5" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.send(Method::DELETE, &roster_uri, Some(&coord), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.send(Method::DELETE, &roster_uri, Some(&coord), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        app.finish().await;
    }
}
