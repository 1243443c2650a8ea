//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`          — Run the agent on a prompt, get the answer
//! - `POST /v1/chat/stream`   — Same, as an SSE stream of progress events
//! - `GET  /v1/tools`         — List the tool catalog
//! - `GET  /v1/logs`          — SSE stream of domain events

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, Sse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{BroadcastStream, UnboundedReceiverStream};
use tracing::{info, warn};

use gitscribe_agent::{AgentContext, AgentStreamEvent};
use gitscribe_core::event::DomainEvent;

use crate::SharedState;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/tools", get(list_tools_handler))
        .route("/logs", get(log_stream_handler))
        .with_state(state)
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub outcome: String,
    pub steps: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolDto {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDto>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let prompt = payload.prompt.trim();
    if prompt.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No prompt provided."));
    }
    let agent = state
        .agent()
        .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, state.unavailable_reason()))?;

    info!(prompt_chars = prompt.len(), "v1/chat request");
    let run = agent.run(prompt).await;
    if !run.outcome.is_done() {
        warn!(outcome = %run.outcome, steps = run.steps, "Run ended abnormally");
    }

    Ok(Json(ChatResponse {
        response: run.answer,
        outcome: run.outcome.as_str().into(),
        steps: run.steps,
    }))
}

/// `POST /v1/chat/stream` — Run the agent, receive an SSE stream of events.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    info!("v1/chat/stream SSE request");
    agent_event_stream(&state, &payload.prompt)
}

/// Stream a run as SSE `data:` lines, one JSON event each.
///
/// A request that cannot start (no prompt, no agent) still gets a stream,
/// holding a single `error` event.
pub(crate) fn agent_event_stream(
    state: &AgentContext,
    prompt: &str,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>> + use<>> {
    let prompt = prompt.trim();
    let rx = match state.agent() {
        _ if prompt.is_empty() => single_event(AgentStreamEvent::error("No prompt provided.")),
        None => single_event(AgentStreamEvent::error(state.unavailable_reason())),
        Some(agent) => agent.run_stream(prompt),
    };

    let stream = UnboundedReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().data(data))
    });
    Sse::new(stream)
}

fn single_event(event: AgentStreamEvent) -> mpsc::UnboundedReceiver<AgentStreamEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    let _ = tx.send(event);
    rx
}

async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let defs = state.tools().definitions();
    let count = defs.len();

    Json(ToolListResponse {
        tools: defs
            .into_iter()
            .map(|d| ToolDto {
                name: d.name,
                description: d.description,
                parameters: d.parameters,
            })
            .collect(),
        count,
    })
}

// ── SSE Log Stream ────────────────────────────────────────────────────────

/// `GET /v1/logs` — SSE stream of domain events.
async fn log_stream_handler(
    State(state): State<SharedState>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.event_bus().subscribe();
    let stream = BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .map(|event| {
            let data = serde_json::to_string(event.as_ref()).unwrap_or_default();
            let event_name = match event.as_ref() {
                DomainEvent::ModelInvoked { .. } => "model_invoked",
                DomainEvent::ToolExecuted { .. } => "tool_executed",
                DomainEvent::RunFinished { .. } => "run_finished",
                DomainEvent::ErrorOccurred { .. } => "error_occurred",
            };
            Ok(SseEvent::default().event(event_name).data(data))
        });

    Sse::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn list_tools() {
        let app = v1_router(ready_state(MockProvider::text("unused")));

        let req = Request::builder().uri("/tools").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: ToolListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.count, 4);
        let names: Vec<&str> = json.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["list_files", "read_file", "write_file", "replace_line"]);
    }

    #[tokio::test]
    async fn chat_returns_answer() {
        let app = v1_router(ready_state(MockProvider::text("Mock response from agent")));

        let response = app
            .oneshot(post_json("/chat", serde_json::json!({"prompt": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: ChatResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.response, "Mock response from agent");
        assert_eq!(json.outcome, "done");
        assert_eq!(json.steps, 1);
    }

    #[tokio::test]
    async fn chat_rejects_empty_prompt() {
        let app = v1_router(ready_state(MockProvider::text("unused")));
        let response = app
            .oneshot(post_json("/chat", serde_json::json!({"prompt": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.error, "No prompt provided.");
    }

    #[tokio::test]
    async fn chat_unavailable_without_repository() {
        let app = v1_router(degraded_state());
        let response = app
            .oneshot(post_json("/chat", serde_json::json!({"prompt": "read notes"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(json.error.starts_with("Agent not initialized"));
    }

    #[tokio::test]
    async fn chat_stream_ends_with_complete() {
        let app = v1_router(ready_state(MockProvider::text("streamed answer")));
        let response = app
            .oneshot(post_json("/chat/stream", serde_json::json!({"prompt": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let events = sse_events(response).await;
        let terminal: Vec<_> = events
            .iter()
            .filter(|e| e["type"] == "complete" || e["type"] == "error")
            .collect();
        assert_eq!(terminal.len(), 1);
        let last = events.last().unwrap();
        assert_eq!(last["type"], "complete");
        assert_eq!(last["final_response"], "streamed answer");
        assert_eq!(last["outcome"], "done");
    }

    #[tokio::test]
    async fn chat_stream_unavailable_is_single_error_event() {
        let app = v1_router(degraded_state());
        let response = app
            .oneshot(post_json("/chat/stream", serde_json::json!({"prompt": "hi"})))
            .await
            .unwrap();

        let events = sse_events(response).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["type"], "error");
    }
}
