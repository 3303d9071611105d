use super::message::{Message, MessageContent};
use super::role::Role;

/// The ordered message log of a single run.
///
/// Messages can only be appended; nothing is ever reordered or removed while
/// a run is in progress.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a conversation with a system prompt and the user's request
    pub fn seed<S: Into<String>, U: Into<String>>(system: S, user: U) -> Self {
        Self {
            messages: vec![
                Message::system().with_text(system),
                Message::user().with_text(user),
            ],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Ids of tool requests that have no matching tool response yet.
    ///
    /// The agent checks this is empty before every model invocation.
    pub fn unresolved_tool_requests(&self) -> Vec<String> {
        let mut pending: Vec<String> = Vec::new();
        for message in &self.messages {
            for content in &message.content {
                match content {
                    MessageContent::ToolRequest(request) if message.role == Role::Assistant => {
                        pending.push(request.id.clone())
                    }
                    MessageContent::ToolResponse(response) => {
                        if let Some(pos) = pending.iter().position(|id| *id == response.id) {
                            pending.remove(pos);
                        }
                    }
                    _ => {}
                }
            }
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::Content;
    use crate::models::tool::ToolCall;
    use serde_json::json;

    #[test]
    fn test_seed() {
        let conversation = Conversation::seed("be nice", "hi");
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].role, Role::System);
        assert_eq!(conversation.messages()[1].role, Role::User);
        assert_eq!(conversation.messages()[1].text(), "hi");
    }

    #[test]
    fn test_unresolved_tool_requests() {
        let mut conversation = Conversation::seed("sys", "hi");
        conversation.push(
            Message::assistant()
                .with_tool_request("a", Ok(ToolCall::new("x", json!({}))))
                .with_tool_request("b", Ok(ToolCall::new("y", json!({})))),
        );
        assert_eq!(conversation.unresolved_tool_requests(), vec!["a", "b"]);

        conversation.push(Message::tool().with_tool_response(
            "a",
            Some("x".to_string()),
            Ok(vec![Content::text("done")]),
        ));
        assert_eq!(conversation.unresolved_tool_requests(), vec!["b"]);
    }
}
