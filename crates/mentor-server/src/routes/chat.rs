use crate::{error::ApiError, state::AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use mentor::{agent::RunContext, models::outcome::AgentOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    student_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct DebugInfo {
    steps_count: usize,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: AgentOutcome,
    debug: DebugInfo,
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    let context = RunContext {
        student_id: request.student_id.filter(|id| !id.trim().is_empty()),
    };
    tracing::info!(student_id = ?context.student_id, "chat request");

    let run = state.agent.run(&request.message, &context);
    let reply = match state.request_timeout {
        Some(limit) => tokio::time::timeout(limit, run)
            .await
            .map_err(|_| ApiError::Timeout)??,
        None => run.await?,
    };

    Ok(Json(ChatResponse {
        response: reply.outcome,
        debug: DebugInfo {
            steps_count: reply.steps,
        },
    }))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .with_state(state)
}
