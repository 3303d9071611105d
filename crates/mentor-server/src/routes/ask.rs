use crate::{error::ApiError, state::AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    prompt: String,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    response: String,
}

// simple ask an AI for a response, no tools
async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.agent.ask(&request.prompt).await?;
    Ok(Json(AskResponse {
        response: response.trim().to_string(),
    }))
}

async fn models_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.agent.list_models().await?))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/ask", post(ask_handler))
        .route("/api/models", get(models_handler))
        .with_state(state)
}
