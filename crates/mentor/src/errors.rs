use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised while resolving or executing a single tool call.
///
/// These never abort a run: the agent folds them back into the conversation
/// as error tool results so the model can react to them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Failures that end a run and are surfaced to the caller.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model invocation failed: {0}")]
    ModelInvocation(#[source] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type RunResult<T> = Result<T, RunError>;
