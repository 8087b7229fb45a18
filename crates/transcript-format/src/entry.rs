//! Logline and content block types.
//!
//! A logline is the canonical, renderer-agnostic unit of a transcript. Every
//! renderer (HTML, JSON, terminal) consumes loglines only and never looks at
//! the raw rollout records they were built from.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The three logline categories. Anything that is not cleanly a user or
/// assistant turn is `System`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    User,
    Assistant,
    System,
}

impl LogType {
    /// Get the string identifier for this log type.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::User => "user",
            LogType::Assistant => "assistant",
            LogType::System => "system",
        }
    }
}

/// One normalized transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Logline {
    /// Category of the entry
    #[serde(rename = "type")]
    pub kind: LogType,
    /// Timestamp copied verbatim from the source record
    pub timestamp: String,
    /// Role and content
    pub message: Message,
}

/// The `message` body of a logline. `role` always mirrors the logline type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Message {
    pub role: LogType,
    pub content: MessageContent,
}

/// Message content: either plain text (user prompts) or an ordered list of
/// blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A single content block inside a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Narrative text
    Text { text: String },
    /// Reasoning text
    Thinking { thinking: String },
    /// Tool invocation
    ToolUse {
        name: String,
        input: Value,
        /// Call correlation id, may be empty
        id: String,
    },
    /// Tool output
    ToolResult {
        content: Value,
        is_error: bool,
        tool_use_id: String,
    },
    /// Passthrough card for an unrecognized or administrative record
    SystemRecord {
        /// Source kind, e.g. `event_msg:mystery_event`
        label: String,
        /// The original record, untouched
        record: Value,
    },
    /// Inline image, passed through undecoded
    Image { source: ImageSource },
    /// Unknown block type (for forward compatibility)
    #[serde(other)]
    #[schemars(skip)]
    Unknown,
}

/// Encoded image data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ImageSource {
    #[serde(default = "default_media_type")]
    pub media_type: String,
    #[serde(default)]
    pub data: String,
}

fn default_media_type() -> String {
    "image/png".to_string()
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn thinking(thinking: impl Into<String>) -> Self {
        ContentBlock::Thinking {
            thinking: thinking.into(),
        }
    }

    pub fn tool_use(name: impl Into<String>, input: Value, id: impl Into<String>) -> Self {
        ContentBlock::ToolUse {
            name: name.into(),
            input,
            id: id.into(),
        }
    }

    pub fn tool_result(content: Value, is_error: bool, tool_use_id: impl Into<String>) -> Self {
        ContentBlock::ToolResult {
            content,
            is_error,
            tool_use_id: tool_use_id.into(),
        }
    }

    /// Wire name of the block type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Thinking { .. } => "thinking",
            ContentBlock::ToolUse { .. } => "tool_use",
            ContentBlock::ToolResult { .. } => "tool_result",
            ContentBlock::SystemRecord { .. } => "system_record",
            ContentBlock::Image { .. } => "image",
            ContentBlock::Unknown => "unknown",
        }
    }
}

impl Logline {
    /// A logline with plain-string content.
    pub fn plain(kind: LogType, timestamp: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            timestamp: timestamp.into(),
            message: Message {
                role: kind,
                content: MessageContent::Text(text.into()),
            },
        }
    }

    /// A logline with block content.
    pub fn blocks(kind: LogType, timestamp: impl Into<String>, blocks: Vec<ContentBlock>) -> Self {
        Self {
            kind,
            timestamp: timestamp.into(),
            message: Message {
                role: kind,
                content: MessageContent::Blocks(blocks),
            },
        }
    }

    /// A system card wrapping an unrecognized record verbatim.
    pub fn system_record(timestamp: impl Into<String>, label: impl Into<String>, record: Value) -> Self {
        Self::blocks(
            LogType::System,
            timestamp,
            vec![ContentBlock::SystemRecord {
                label: label.into(),
                record,
            }],
        )
    }

    /// Returns true if the logline carries something to render.
    pub fn has_content(&self) -> bool {
        match &self.message.content {
            MessageContent::Text(text) => !text.trim().is_empty(),
            MessageContent::Blocks(blocks) => !blocks.is_empty(),
        }
    }

    /// Content blocks, or an empty slice for plain-text content.
    pub fn content_blocks(&self) -> &[ContentBlock] {
        match &self.message.content {
            MessageContent::Blocks(blocks) => blocks,
            MessageContent::Text(_) => &[],
        }
    }

    /// Plain-text content, if the message is not block-structured.
    pub fn plain_text(&self) -> Option<&str> {
        match &self.message.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Blocks(_) => None,
        }
    }

    /// The trimmed prompt text when this is a human-authored user turn.
    pub fn prompt_text(&self) -> Option<&str> {
        if self.kind != LogType::User {
            return None;
        }
        self.plain_text()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// True if any block is a tool invocation.
    pub fn is_tool_call(&self) -> bool {
        self.content_blocks()
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    /// True if the content is non-empty and consists only of tool results.
    pub fn is_tool_reply(&self) -> bool {
        let blocks = self.content_blocks();
        !blocks.is_empty()
            && blocks
                .iter()
                .all(|b| matches!(b, ContentBlock::ToolResult { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_user_logline_serializes_plain_content() {
        let logline = Logline::plain(LogType::User, "2025-01-01T00:00:00Z", "Hello");
        let value = serde_json::to_value(&logline).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "user",
                "timestamp": "2025-01-01T00:00:00Z",
                "message": {"role": "user", "content": "Hello"}
            })
        );
    }

    #[test]
    fn test_tool_use_block_shape() {
        let logline = Logline::blocks(
            LogType::Assistant,
            "T",
            vec![ContentBlock::tool_use("shell", json!({"cmd": "ls"}), "call_1")],
        );
        let value = serde_json::to_value(&logline).unwrap();
        assert_eq!(
            value["message"]["content"],
            json!([{"type": "tool_use", "name": "shell", "input": {"cmd": "ls"}, "id": "call_1"}])
        );
    }

    #[test]
    fn test_parse_blocks_back() {
        let json = r#"{"type":"system","timestamp":"T","message":{"role":"system","content":[{"type":"system_record","label":"rollout:x","record":{"a":1}}]}}"#;
        let logline: Logline = serde_json::from_str(json).unwrap();
        assert_eq!(logline.kind, LogType::System);
        match &logline.content_blocks()[0] {
            ContentBlock::SystemRecord { label, record } => {
                assert_eq!(label, "rollout:x");
                assert_eq!(record, &json!({"a": 1}));
            }
            other => panic!("Expected SystemRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_block_type_tolerated() {
        let json = r#"{"type":"assistant","timestamp":"T","message":{"role":"assistant","content":[{"type":"x_future","data":1}]}}"#;
        let logline: Logline = serde_json::from_str(json).unwrap();
        assert!(matches!(logline.content_blocks()[0], ContentBlock::Unknown));
    }

    #[test]
    fn test_prompt_text_only_for_user_plain_content() {
        assert_eq!(
            Logline::plain(LogType::User, "T", "  hi  ").prompt_text(),
            Some("hi")
        );
        assert_eq!(Logline::plain(LogType::User, "T", "   ").prompt_text(), None);
        assert_eq!(Logline::plain(LogType::System, "T", "hi").prompt_text(), None);

        let tool_reply = Logline::blocks(
            LogType::User,
            "T",
            vec![ContentBlock::tool_result(json!("ok"), false, "c")],
        );
        assert_eq!(tool_reply.prompt_text(), None);
        assert!(tool_reply.is_tool_reply());
    }

    #[test]
    fn test_has_content() {
        assert!(!Logline::blocks(LogType::System, "T", vec![]).has_content());
        assert!(!Logline::plain(LogType::User, "T", "").has_content());
        assert!(Logline::system_record("T", "rollout:x", json!({})).has_content());
    }
}
