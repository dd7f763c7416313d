//! HTTP surface for the browser extension.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::brain::ModelFactory;
use crate::config::{Backend, ModelOverrides, ServerConfig};
use crate::error::{ModelError, PipelineError};
use crate::fallback;
use crate::pipeline::AgentPipeline;
use crate::policy::DeliveryPolicy;
use crate::reasoning::ReasoningChains;
use crate::session::SessionStore;
use crate::types::{ChatMessage, Element, HistoryEntry, PageSnapshot, TaskResult};

pub struct AppState {
    pub config: ServerConfig,
    pub sessions: SessionStore,
    pub models: Arc<dyn ModelFactory>,
    pub policy: Arc<DeliveryPolicy>,
}

impl AppState {
    pub fn new(config: ServerConfig, models: Arc<dyn ModelFactory>) -> Self {
        let sessions = SessionStore::new(config.session_capacity, config.session_ttl());
        Self {
            config,
            sessions,
            models,
            policy: Arc::new(DeliveryPolicy::standard()),
        }
    }

    fn pipeline_for(&self, agent_config: &AgentConfig) -> AgentPipeline {
        let resolved = self.config.resolve(&agent_config.overrides());
        info!(model = %resolved.chat.model, "building agent pipeline");
        AgentPipeline::new(
            self.models.build(&resolved.chat),
            self.policy.clone(),
            self.config.pipeline_options(),
        )
    }
}

fn default_personality() -> String {
    "a helpful and friendly AI browsing assistant".to_string()
}

fn default_session_id() -> String {
    "default".to_string()
}

/// Model configuration sent by the extension. Missing fields fall back to
/// the server's settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default, alias = "model")]
    pub chat_model: Option<String>,
    #[serde(default)]
    pub reasoning_model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_personality")]
    pub personality: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            chat_model: None,
            reasoning_model: None,
            base_url: None,
            personality: default_personality(),
        }
    }
}

impl AgentConfig {
    fn overrides(&self) -> ModelOverrides {
        ModelOverrides {
            api_key: self.api_key.clone(),
            chat_model: self.chat_model.clone(),
            reasoning_model: self.reasoning_model.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub task: String,
    pub page_data: PageSnapshot,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(default)]
    pub config: AgentConfig,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub result: TaskResult,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub problem: String,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub config: AgentConfig,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_sessions: usize,
    pub timestamp: DateTime<Utc>,
}

/// Failures reported to the extension as `500 {"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Task processing failed: {0}")]
    Task(#[source] PipelineError),

    #[error("Analysis failed: {0}")]
    Analysis(#[source] ModelError),

    #[error("Test failed: {0}")]
    Test(#[source] PipelineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        let mut body = json!({ "detail": self.to_string() });
        if let ApiError::Task(err) | ApiError::Test(err) = &self {
            if let Some(plan) = err.partial_plan() {
                body["partial_plan"] = json!(plan);
            }
        }
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/task", post(task_handler))
        .route("/api/analyze", post(analyze_handler))
        .route(
            "/api/history/{session_id}",
            get(history_handler).delete(clear_history_handler),
        )
        .route("/api/session/{session_id}", delete(delete_session_handler))
        .route("/api/sessions", get(sessions_handler))
        .route("/api/test/agents", post(test_agents_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the process exits.
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;

    info!(backend = ?state.config.backend, "listening on http://{}", addr);

    axum::serve(listener, router(state))
        .await
        .context("server stopped")?;
    Ok(())
}

async fn root_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "service": "Browsing Copilot Backend",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "backend": format!("{:?}", state.config.backend).to_lowercase(),
        "features": [
            "Planner / Analyzer / Executor agent pipeline",
            "Keyword-only content extraction",
            "Multi-tab session support",
            "Reasoning chains"
        ]
    }))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        active_sessions: state.sessions.len(),
        timestamp: Utc::now(),
    })
}

async fn task_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    info!(session_id = %request.session_id, task = %request.task, "[Web] POST /api/task");
    let session = state.sessions.get_or_create(&request.session_id);

    let result = match state.config.backend {
        Backend::Keyword => fallback::process(&request.task, &request.page_data),
        Backend::Agents => {
            let agents = session.agents(|| state.pipeline_for(&request.config));
            agents
                .process_task(&request.task, &request.page_data, &request.chat_history)
                .await
                .map_err(ApiError::Task)?
        }
    };

    session.record(&request.task, &result);

    Ok(Json(TaskResponse {
        result,
        timestamp: Utc::now(),
        session_id: request.session_id,
    }))
}

async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    info!("[Web] POST /api/analyze");
    let resolved = state.config.resolve(&request.config.overrides());
    let chains = ReasoningChains::new(state.models.build(&resolved.reasoning));
    let analysis = chains
        .analyze_problem(&request.problem, &request.context)
        .await
        .map_err(ApiError::Analysis)?;

    Ok(Json(AnalyzeResponse {
        analysis,
        timestamp: Utc::now(),
    }))
}

async fn history_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let response = match state.sessions.get(&session_id) {
        Some(session) => {
            let history = session.history();
            HistoryResponse {
                message_count: Some(history.len()),
                history,
                session_id,
            }
        }
        None => HistoryResponse {
            history: Vec::new(),
            session_id,
            message_count: None,
        },
    };
    Json(response)
}

async fn clear_history_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<MessageResponse> {
    if let Some(session) = state.sessions.get(&session_id) {
        session.clear_history();
    }
    Json(MessageResponse {
        message: "History cleared",
        session_id,
    })
}

async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<MessageResponse> {
    if state.sessions.remove(&session_id) {
        info!(session_id = %session_id, "session deleted");
    }
    Json(MessageResponse {
        message: "Session deleted",
        session_id,
    })
}

async fn sessions_handler(State(state): State<Arc<AppState>>) -> Json<SessionsResponse> {
    let sessions = state.sessions.ids();
    Json(SessionsResponse {
        count: sessions.len(),
        sessions,
    })
}

/// A search page used to smoke-test a model configuration.
pub fn sample_page() -> PageSnapshot {
    let mut search_box = Element::new("input", "");
    search_box.text = None;
    search_box.name = Some("search".to_string());
    search_box.id = Some("search-box".to_string());

    let mut button = Element::new("button", "Search");
    button.id = Some("search-btn".to_string());

    PageSnapshot {
        url: "https://example.com".to_string(),
        title: "Example Page".to_string(),
        text: "This is a sample page with a search form.".to_string(),
        interactive_elements: vec![search_box, button],
        ..Default::default()
    }
}

async fn test_agents_handler(
    State(state): State<Arc<AppState>>,
    Json(agent_config): Json<AgentConfig>,
) -> Result<Json<Value>, ApiError> {
    info!("[Web] POST /api/test/agents");
    let pipeline = state.pipeline_for(&agent_config);
    let result = pipeline
        .process_task("Search for 'AI agents'", &sample_page(), &[])
        .await
        .map_err(ApiError::Test)?;
    Ok(Json(json!({ "status": "success", "result": result })))
}
