// Export route modules
pub mod ask;
pub mod chat;
pub mod health;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(ask::routes(state))
        .merge(health::routes())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::state::AppState;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, response::Response};
    use http_body_util::BodyExt;
    use mentor::{
        agent::Agent,
        models::{message::Message, tool::Tool},
        providers::base::{Provider, Usage},
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Replays canned completions; `Err` entries simulate endpoint failures
    pub struct ScriptedProvider {
        replies: Mutex<Vec<Result<Message, String>>>,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        pub fn new(replies: Vec<Result<Message, String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                delay: None,
            }
        }

        pub fn slow(delay: Duration) -> Self {
            Self {
                replies: Mutex::new(vec![Ok(Message::assistant().with_text("late"))]),
                delay: Some(delay),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn complete(&self, _messages: &[Message], _tools: &[Tool]) -> Result<(Message, Usage)> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = {
                let mut replies = self.replies.lock().unwrap();
                if replies.is_empty() {
                    Err("no scripted reply left".to_string())
                } else {
                    replies.remove(0)
                }
            };
            next.map(|m| (m, Usage::default())).map_err(|e| anyhow!(e))
        }

        async fn list_models(&self) -> Result<Value> {
            Ok(json!({"object": "list", "data": [{"id": "llama-3.3-70b-versatile"}]}))
        }
    }

    pub fn state_with(provider: ScriptedProvider) -> AppState {
        AppState::new(Agent::new(Arc::new(provider)))
    }

    pub fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
