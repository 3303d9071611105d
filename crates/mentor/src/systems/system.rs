use async_trait::async_trait;

use crate::errors::AgentResult;
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

/// Core trait that defines a group of tools an agent can operate
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Get system instructions, rendered into the system prompt
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Whether this system declares a tool with the given name
    fn has_tool(&self, name: &str) -> bool {
        self.tools().iter().any(|tool| tool.name == name)
    }

    /// Call a tool with the given arguments.
    ///
    /// Expected conditions such as a missing record are reported as regular
    /// content; an `Err` is reserved for bad arguments and technical failures.
    async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>>;
}
