//! MCP tool-call result envelope.

use std::fmt::Display;

use serde::Serialize;
use serde_json::Value;
use tracing::error;

/// One block of tool output. Only text is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// The `result` of a `tools/call`: content blocks plus a failure flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    pub content: Vec<Content>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolOutput {
    fn text_block(text: String, is_error: bool) -> Self {
        Self {
            content: vec![Content::Text { text }],
            is_error,
        }
    }

    /// Pretty-printed JSON of `value`. Falls back to a failure envelope if
    /// rendering fails.
    pub fn success<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::text_block(text, false),
            Err(e) => {
                error!(error = %e, "failed to render tool result");
                Self::failure(format_args!("failed to render result: {e}"))
            }
        }
    }

    /// `Error: <message>`, flagged as an error.
    pub fn failure(message: impl Display) -> Self {
        Self::text_block(format!("Error: {message}"), true)
    }

    /// A JSON document flagged as an error.
    pub fn failure_json(value: &Value) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::text_block(text, true),
            Err(e) => Self::failure(e),
        }
    }

    /// Text of the first content block.
    pub fn text(&self) -> &str {
        match self.content.first() {
            Some(Content::Text { text }) => text,
            None => "",
        }
    }
}
