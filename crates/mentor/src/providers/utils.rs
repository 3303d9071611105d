use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use crate::errors::AgentError;
use crate::models::content::contents_to_text;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

/// Function name sent in place of a tool request the model emitted but we could not decode
pub const INVALID_TOOL_CALL_NAME: &str = "invalid_tool_call";

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role
        });

        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if let Some(text) = text.as_text().filter(|t| !t.is_empty()) {
                        converted["content"] = json!(text);
                    }
                }
                MessageContent::ToolRequest(request) => {
                    let (name, arguments) = match &request.tool_call {
                        Ok(tool_call) => (
                            sanitize_function_name(&tool_call.name),
                            tool_call.arguments.to_string(),
                        ),
                        // Still listed so the error response that follows has a request to answer
                        Err(_) => (INVALID_TOOL_CALL_NAME.to_string(), "{}".to_string()),
                    };

                    let tool_calls = converted
                        .as_object_mut()
                        .unwrap()
                        .entry("tool_calls")
                        .or_insert(json!([]));

                    tool_calls.as_array_mut().unwrap().push(json!({
                        "id": request.id,
                        "type": "function",
                        "function": {
                            "name": name,
                            "arguments": arguments,
                        }
                    }));
                }
                MessageContent::ToolResponse(response) => {
                    let text = match &response.tool_result {
                        Ok(contents) => contents_to_text(contents),
                        // A tool error is shown as output so the model can interpret it
                        Err(e) => format!("Error: {}", e),
                    };
                    let mut tool_message = json!({
                        "role": "tool",
                        "content": text,
                        "tool_call_id": response.id
                    });
                    if let Some(name) = &response.name {
                        tool_message["name"] = json!(name);
                    }
                    output.push(tool_message);
                }
            }
        }

        if converted.get("tool_calls").is_some() && converted.get("content").is_none() {
            converted["content"] = Value::Null;
        }
        if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
            output.insert(0, converted);
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .cloned()
        .ok_or_else(|| anyhow!("Response has no choices: {}", response))?;

    let mut message = Message::assistant();

    if let Some(text) = original.get("content").and_then(|t| t.as_str()) {
        message = message.with_text(text);
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|t| t.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default().to_string();
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default()
                .to_string();

            if !is_valid_function_name(&function_name) {
                let error = AgentError::ToolNotFound(format!(
                    "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                    function_name
                ));
                message = message.with_tool_request(id, Err(error));
                continue;
            }

            // Some models send an empty string for tools without parameters
            let parsed = if arguments.trim().is_empty() {
                Ok(json!({}))
            } else {
                serde_json::from_str::<Value>(&arguments)
            };

            match parsed {
                Ok(params) => {
                    message =
                        message.with_tool_request(id, Ok(ToolCall::new(&function_name, params)));
                }
                Err(e) => {
                    let error = AgentError::InvalidParameters(format!(
                        "Could not interpret tool use parameters for id {}: {}",
                        id, e
                    ));
                    message = message.with_tool_request(id, Err(error));
                }
            }
        }
    }

    Ok(message)
}

fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}
