//! HTTP gateway for gitscribe.
//!
//! Exposes a health check, the agent stream used by the web client
//! (`GET /agent_stream?prompt=...`), the v1 API and the embedded web client.
//! The server starts even when the agent could not be initialized; `/health`
//! then reports `degraded` and chat endpoints answer with an explanation.
//!
//! Built on Axum.

pub mod api_v1;
pub mod frontend;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    response::sse::{Event as SseEvent, Sse},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use gitscribe_agent::AgentContext;

/// Shared state for every route: the startup context.
pub type SharedState = Arc<AgentContext>;

/// Build the full router.
///
/// Layers applied:
/// - CORS for GET/POST with JSON bodies
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/agent_stream", get(agent_stream_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Initialize the agent context from `config` and serve until shutdown.
pub async fn start(config: gitscribe_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let context = AgentContext::initialize(config).await;
    for issue in context.issues() {
        warn!(issue = %issue, "Starting in degraded mode");
    }

    let app = build_router(Arc::new(context));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub repository_enabled: bool,
    pub model_ready: bool,
    pub tools: Vec<String>,
    pub issues: Vec<String>,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.is_healthy() { "ok" } else { "degraded" }.into(),
        version: env!("CARGO_PKG_VERSION").into(),
        repository_enabled: state.repository_enabled(),
        model_ready: state.model_ready(),
        tools: state.tools().names().into_iter().map(String::from).collect(),
        issues: state.issues().to_vec(),
    })
}

#[derive(Debug, Deserialize)]
struct PromptQuery {
    #[serde(default)]
    prompt: String,
}

/// `GET /agent_stream?prompt=...` — SSE progress stream for the web client.
async fn agent_stream_handler(
    State(state): State<SharedState>,
    Query(query): Query<PromptQuery>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    info!(prompt_chars = query.prompt.len(), "SSE stream requested");
    api_v1::agent_event_stream(&state, &query.prompt)
}
