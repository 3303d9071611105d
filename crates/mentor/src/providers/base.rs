use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Base trait for chat-completion providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next message for the conversation, offering the given tools
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<(Message, Usage)>;

    /// The provider's model catalogue, as reported by the remote API
    async fn list_models(&self) -> Result<Value>;
}
