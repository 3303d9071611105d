use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use crate::errors::{AgentError, AgentResult, RunError, RunResult};
use crate::models::content::Content;
use crate::models::conversation::Conversation;
use crate::models::message::{Message, ToolRequest};
use crate::models::outcome::AgentOutcome;
use crate::models::tool::Tool;
use crate::prompt_template::{load_prompt, SYSTEM_PROMPT_TEMPLATE};
use crate::providers::base::Provider;
use crate::systems::System;

/// Model invocations allowed per run before giving up
pub const DEFAULT_MAX_STEPS: usize = 6;

/// Answer returned when the model keeps calling tools until the step budget runs out
pub const BUDGET_EXHAUSTED_RESPONSE: &str = "Sorry, I had an internal problem.";

/// What the model sees when a tool fails for technical reasons
pub const TOOL_FAILURE_MESSAGE: &str = "Error running the tool. Try something else.";

#[derive(Clone, Debug, Serialize)]
struct SystemInfo {
    name: String,
    description: String,
    instructions: String,
    tools: Vec<String>,
}

impl SystemInfo {
    fn new(system: &dyn System) -> Self {
        Self {
            name: system.name().to_string(),
            description: system.description().to_string(),
            instructions: system.instructions().to_string(),
            tools: system
                .tools()
                .iter()
                .map(|tool| format!("{}: {}", tool.name, tool.description))
                .collect(),
        }
    }
}

/// Caller details merged into the first user message
#[derive(Clone, Debug, Default)]
pub struct RunContext {
    pub student_id: Option<String>,
}

impl RunContext {
    pub fn for_student<S: Into<String>>(student_id: S) -> Self {
        Self {
            student_id: Some(student_id.into()),
        }
    }
}

/// The result of a completed run
#[derive(Debug)]
pub struct AgentReply {
    pub outcome: AgentOutcome,
    /// Number of model invocations made
    pub steps: usize,
    /// True when the run ended because the step budget ran out
    pub budget_exhausted: bool,
    pub conversation: Conversation,
}

enum LoopState {
    Invoking,
    ExecutingTools(Message),
    Terminal(AgentOutcome),
    BudgetExhausted,
}

/// Agent integrates a foundational LLM with the systems it needs to pilot
pub struct Agent {
    systems: Vec<Box<dyn System>>,
    provider: Arc<dyn Provider>,
    max_steps: usize,
    prompt_template: String,
}

impl Agent {
    /// Create a new Agent with the specified provider
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            systems: Vec::new(),
            provider,
            max_steps: DEFAULT_MAX_STEPS,
            prompt_template: SYSTEM_PROMPT_TEMPLATE.to_string(),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Replace the default system prompt template
    pub fn with_prompt_template<S: Into<String>>(mut self, template: S) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// Add a system to the agent
    pub fn add_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Get all tools from all systems
    fn get_tools(&self) -> Vec<Tool> {
        self.systems
            .iter()
            .flat_map(|system| system.tools().iter().cloned())
            .collect()
    }

    /// Find the system declaring a tool of this name
    fn get_system_for_tool(&self, name: &str) -> Option<&dyn System> {
        self.systems
            .iter()
            .find(|system| system.has_tool(name))
            .map(|v| &**v)
    }

    /// Dispatch a single tool call to the appropriate system
    async fn dispatch_tool_call(&self, request: &ToolRequest) -> AgentResult<Vec<Content>> {
        let call = request.tool_call.clone()?;
        let system = self
            .get_system_for_tool(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        system.call(call).await
    }

    /// Technical failures are logged and replaced by a generic message for the model
    fn sanitize_tool_result(
        request: &ToolRequest,
        result: AgentResult<Vec<Content>>,
    ) -> AgentResult<Vec<Content>> {
        match result {
            Err(AgentError::ExecutionError(e)) | Err(AgentError::Internal(e)) => {
                tracing::error!(
                    id = %request.id,
                    tool = request.name().unwrap_or_default(),
                    "tool failed: {}",
                    e
                );
                Err(AgentError::ExecutionError(TOOL_FAILURE_MESSAGE.to_string()))
            }
            other => other,
        }
    }

    fn get_system_prompt(&self) -> RunResult<String> {
        let systems: Vec<SystemInfo> = self
            .systems
            .iter()
            .map(|system| SystemInfo::new(system.as_ref()))
            .collect();

        let context = serde_json::json!({ "systems": systems });
        load_prompt(&self.prompt_template, &context).map_err(|e| RunError::Internal(e.to_string()))
    }

    fn user_prompt(message: &str, context: &RunContext) -> String {
        format!(
            "{} (Current context: StudentID: {})",
            message,
            context.student_id.as_deref().unwrap_or("Unknown")
        )
    }

    /// Answer a message, calling tools as the model requests them.
    ///
    /// The model is invoked at most `max_steps` times. Every tool request is
    /// answered in the conversation before the model is invoked again, and
    /// tool failures are reported to the model instead of ending the run.
    pub async fn run(&self, message: &str, context: &RunContext) -> RunResult<AgentReply> {
        if message.trim().is_empty() {
            return Err(RunError::InvalidInput(
                "The message must not be empty.".to_string(),
            ));
        }

        let tools = self.get_tools();
        let mut conversation =
            Conversation::seed(self.get_system_prompt()?, Self::user_prompt(message, context));
        let mut steps = 0;
        let mut state = LoopState::Invoking;

        let (outcome, budget_exhausted) = loop {
            state = match state {
                LoopState::Invoking if steps >= self.max_steps => LoopState::BudgetExhausted,
                LoopState::Invoking => {
                    let unresolved = conversation.unresolved_tool_requests();
                    if !unresolved.is_empty() {
                        return Err(RunError::Internal(format!(
                            "unanswered tool requests: {}",
                            unresolved.join(", ")
                        )));
                    }

                    steps += 1;
                    let (response, usage) = self
                        .provider
                        .complete(conversation.messages(), &tools)
                        .await
                        .map_err(RunError::ModelInvocation)?;
                    tracing::debug!(step = steps, ?usage, "model replied");

                    conversation.push(response.clone());
                    if response.tool_requests().is_empty() {
                        LoopState::Terminal(AgentOutcome::extract(&response.text()))
                    } else {
                        LoopState::ExecutingTools(response)
                    }
                }
                LoopState::ExecutingTools(response) => {
                    let requests = response.tool_requests();
                    tracing::info!(
                        step = steps,
                        tools = ?requests.iter().map(|r| r.name().unwrap_or("<invalid>")).collect::<Vec<_>>(),
                        "executing tools"
                    );

                    // Tools run concurrently; results are recorded in request order
                    let outputs =
                        join_all(requests.iter().map(|request| self.dispatch_tool_call(request)))
                            .await;

                    for (request, output) in requests.iter().zip(outputs.into_iter()) {
                        let result = Self::sanitize_tool_result(request, output);
                        if let Err(e) = &result {
                            tracing::warn!(id = %request.id, "tool call returned an error: {}", e);
                        }
                        conversation.push(Message::tool().with_tool_response(
                            request.id.clone(),
                            request.name().map(String::from),
                            result,
                        ));
                    }
                    LoopState::Invoking
                }
                LoopState::Terminal(outcome) => break (outcome, false),
                LoopState::BudgetExhausted => {
                    tracing::warn!(steps, "step budget exhausted without a final answer");
                    break (AgentOutcome::from_text(BUDGET_EXHAUSTED_RESPONSE), true);
                }
            };
        };

        Ok(AgentReply {
            outcome,
            steps,
            budget_exhausted,
            conversation,
        })
    }

    /// A single plain completion: no system prompt, no tools
    pub async fn ask(&self, prompt: &str) -> RunResult<String> {
        if prompt.trim().is_empty() {
            return Err(RunError::InvalidInput(
                "The prompt must not be empty.".to_string(),
            ));
        }

        let messages = vec![Message::user().with_text(prompt)];
        let (response, _) = self
            .provider
            .complete(&messages, &[])
            .await
            .map_err(RunError::ModelInvocation)?;
        Ok(response.text())
    }

    /// The provider's model catalogue
    pub async fn list_models(&self) -> RunResult<serde_json::Value> {
        self.provider
            .list_models()
            .await
            .map_err(RunError::ModelInvocation)
    }
}
