use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, Usage};

/// A mock provider that returns pre-configured responses for testing
///
/// Every conversation it is asked to complete is recorded so tests can
/// inspect what the model would have seen.
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Result<Message, String>>>>,
    seen: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Create a mock provider where some completions fail
    pub fn with_results(responses: Vec<Result<Message, String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The conversations passed to `complete`, in call order
    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, messages: &[Message], _tools: &[Tool]) -> Result<(Message, Usage)> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            Ok((Message::assistant().with_text(""), Usage::default()))
        } else {
            responses
                .remove(0)
                .map(|message| (message, Usage::default()))
                .map_err(|e| anyhow!(e))
        }
    }

    async fn list_models(&self) -> Result<Value> {
        Ok(json!({"object": "list", "data": [{"id": "mock-model"}]}))
    }
}
