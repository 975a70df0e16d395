//! HTTP chat API.
//!
//! `POST /api/chat` takes a conversation and answers its last user message
//! with one stateless agent turn.

use crate::agent::{Agent, ChatMessage, ToolCallRecord};
use crate::cli::Output;
use crate::config::Settings;
use crate::engine::{get_chat_engine, EngineParams};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

/// Shared application state.
struct AppState {
    agent: Agent,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let agent = get_chat_engine(&settings, EngineParams::default(), Vec::new())?;
    let tool_count = agent.tools().len();
    let app = router(agent);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Concierge API Server");
    println!();
    Output::success(&format!("Listening on http://{} ({} tools)", addr, tool_count));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Chat", "POST /api/chat");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes around a ready agent.
fn router(agent: Agent) -> Router {
    let state = Arc::new(AppState { agent });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Deserialize)]
struct ClientMessage {
    role: Role,
    content: String,
}

impl ClientMessage {
    fn into_chat_message(self) -> ChatMessage {
        match self.role {
            Role::System => ChatMessage::system(self.content),
            Role::User => ChatMessage::user(self.content),
            Role::Assistant => ChatMessage::Assistant {
                content: Some(self.content),
                tool_calls: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<ClientMessage>,
}

#[derive(Serialize)]
struct ChatResponse {
    request_id: Uuid,
    answer: String,
    tool_calls: Vec<ToolCallRecord>,
    iterations: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    request_id: Uuid,
    error: String,
}

fn error_response(status: StatusCode, request_id: Uuid, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { request_id, error })).into_response()
}

/// Split off the final user message; everything before it is history.
fn split_conversation(mut messages: Vec<ClientMessage>) -> Result<(Vec<ChatMessage>, String), String> {
    match messages.pop() {
        Some(last) if last.role == Role::User && !last.content.trim().is_empty() => {
            let prior = messages.into_iter().map(ClientMessage::into_chat_message).collect();
            Ok((prior, last.content))
        }
        Some(_) => Err("The last message must be a non-empty user message".to_string()),
        None => Err("No messages provided".to_string()),
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    let request_id = Uuid::new_v4();

    let (prior, question) = match split_conversation(req.messages) {
        Ok(parts) => parts,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, request_id, e),
    };

    info!(%request_id, history = prior.len(), "Chat request");
    match state.agent.run_with_history(&prior, &question).await {
        Ok(response) => {
            info!(%request_id, tool_calls = response.tool_calls.len(), "Chat answered");
            Json(ChatResponse {
                request_id,
                answer: response.content,
                tool_calls: response.tool_calls,
                iterations: response.iterations,
            })
            .into_response()
        }
        Err(e) => {
            error!(%request_id, "Chat failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, request_id, e.to_string())
        }
    }
}
