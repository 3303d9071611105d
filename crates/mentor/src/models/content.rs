use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
/// Content produced by a tool
pub enum Content {
    Text(TextContent),
}

impl Content {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content::Text(TextContent { text: text.into() })
    }

    /// Get the text content if this is a TextContent variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(&text.text),
        }
    }
}

/// Join the text of several contents, one per line
pub fn contents_to_text(contents: &[Content]) -> String {
    contents
        .iter()
        .filter_map(Content::as_text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_to_text() {
        let contents = vec![Content::text("first"), Content::text("second")];
        assert_eq!(contents_to_text(&contents), "first\nsecond");
        assert_eq!(contents_to_text(&[]), "");
    }
}
