use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The final answer of a run, as returned to the caller.
///
/// The model is asked for `{"response": ..., "actions_taken": [...]}`, but
/// whatever object it answers with is kept as-is, extra fields included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentOutcome(Map<String, Value>);

impl AgentOutcome {
    pub fn new<S: Into<String>>(response: S, actions_taken: Vec<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("response".to_string(), Value::String(response.into()));
        fields.insert("actions_taken".to_string(), json!(actions_taken));
        Self(fields)
    }

    /// Wrap free text that did not contain a structured answer
    pub fn from_text<S: Into<String>>(text: S) -> Self {
        Self::new(text, Vec::new())
    }

    /// Extract the structured answer from the model's final reply.
    ///
    /// The model often surrounds the object with prose or code fences, so it
    /// is taken from the first `{` to the last `}`. Anything that does not
    /// parse falls back to the raw text.
    pub fn extract(text: &str) -> Self {
        let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
            return Self::from_text(text);
        };
        if end < start {
            return Self::from_text(text);
        }

        // A JSON value that starts with `{` can only be an object
        match serde_json::from_str::<Map<String, Value>>(&text[start..=end]) {
            Ok(fields) => Self(fields),
            Err(e) => {
                tracing::debug!("final answer is not structured: {}", e);
                Self::from_text(text)
            }
        }
    }

    /// The answer text, when the model provided one
    pub fn response(&self) -> Option<&str> {
        self.0.get("response").and_then(Value::as_str)
    }

    /// Tool names the model reports having used; empty when absent
    pub fn actions_taken(&self) -> Vec<&str> {
        self.0
            .get("actions_taken")
            .and_then(Value::as_array)
            .map(|actions| actions.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}
