//! Message units: loglines flattened for the terminal views.
//!
//! Each logline becomes one [`MessageUnit`] with a kind, a one-line title
//! and its body lines. `view` and the TUI filter units by kind and text,
//! then group them under the prompt that opened each task.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use transcript_format::{ContentBlock, LogType, Logline, MessageContent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    User,
    Assistant,
    ToolCall,
    ToolResult,
    Thinking,
    System,
}

impl UnitKind {
    pub const ALL: [UnitKind; 6] = [
        UnitKind::User,
        UnitKind::Assistant,
        UnitKind::ToolCall,
        UnitKind::ToolResult,
        UnitKind::Thinking,
        UnitKind::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::User => "user",
            UnitKind::Assistant => "assistant",
            UnitKind::ToolCall => "tool_call",
            UnitKind::ToolResult => "tool_result",
            UnitKind::Thinking => "thinking",
            UnitKind::System => "system",
        }
    }

    /// Label for filter toggles.
    pub fn label(&self) -> &'static str {
        match self {
            UnitKind::User => "User",
            UnitKind::Assistant => "Assistant",
            UnitKind::ToolCall => "Tool calls",
            UnitKind::ToolResult => "Tool results",
            UnitKind::Thinking => "Thinking",
            UnitKind::System => "System",
        }
    }

    /// Parse a kind name, accepting a few common spellings.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "user" | "prompt" => Some(UnitKind::User),
            "assistant" | "response" => Some(UnitKind::Assistant),
            "tool_call" | "tool-call" | "toolcall" => Some(UnitKind::ToolCall),
            "tool_result" | "tool-result" | "toolresult" => Some(UnitKind::ToolResult),
            "thinking" | "reasoning" => Some(UnitKind::Thinking),
            "system" => Some(UnitKind::System),
            _ => None,
        }
    }

    /// Kinds shown when no filter was chosen: everything but thinking.
    pub fn default_set() -> BTreeSet<UnitKind> {
        UnitKind::ALL
            .into_iter()
            .filter(|k| *k != UnitKind::Thinking)
            .collect()
    }
}

/// One logline as the terminal views show it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageUnit {
    /// Position of the source logline
    pub index: usize,
    pub timestamp: String,
    pub kind: UnitKind,
    pub title: String,
    pub lines: Vec<String>,
    #[serde(skip)]
    search_text: String,
}

impl MessageUnit {
    pub fn from_logline(index: usize, logline: &Logline) -> Self {
        let (kind, title, lines) = match &logline.message.content {
            MessageContent::Text(text) => {
                let kind = match logline.kind {
                    LogType::User => UnitKind::User,
                    LogType::System => UnitKind::System,
                    LogType::Assistant => UnitKind::Assistant,
                };
                let title = first_line(text)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("({})", logline.kind.as_str()));
                (kind, title, vec![text.clone()])
            }
            MessageContent::Blocks(blocks) => {
                let kind = blocks_kind(logline.kind, blocks);
                let title = blocks_title(logline.kind, kind, blocks);
                let lines = blocks.iter().flat_map(block_lines).collect();
                (kind, title, lines)
            }
        };

        let search_text = lines.join("\n").to_lowercase();
        Self {
            index,
            timestamp: logline.timestamp.clone(),
            kind,
            title,
            lines,
            search_text,
        }
    }

    /// Case-insensitive substring match over the body; an empty query
    /// matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty() || self.search_text.contains(&query)
    }
}

fn blocks_kind(log_type: LogType, blocks: &[ContentBlock]) -> UnitKind {
    let has = |pred: fn(&ContentBlock) -> bool| blocks.iter().any(pred);
    if log_type == LogType::System {
        UnitKind::System
    } else if has(|b| matches!(b, ContentBlock::ToolUse { .. })) {
        UnitKind::ToolCall
    } else if has(|b| matches!(b, ContentBlock::ToolResult { .. })) {
        UnitKind::ToolResult
    } else if has(|b| matches!(b, ContentBlock::Thinking { .. })) {
        UnitKind::Thinking
    } else if log_type == LogType::User {
        UnitKind::User
    } else {
        UnitKind::Assistant
    }
}

fn blocks_title(log_type: LogType, kind: UnitKind, blocks: &[ContentBlock]) -> String {
    let system_label = blocks.iter().find_map(|b| match b {
        ContentBlock::SystemRecord { label, .. } => Some(label.as_str()),
        _ => None,
    });
    let tool_name = blocks.iter().find_map(|b| match b {
        ContentBlock::ToolUse { name, .. } => Some(name.as_str()),
        _ => None,
    });

    if let (LogType::System, Some(label)) = (log_type, system_label) {
        return format!("system_record: {}", label);
    }
    if let Some(name) = tool_name {
        let prefix = if log_type == LogType::System {
            "system"
        } else {
            "tool_call"
        };
        return format!("{}: {}", prefix, name);
    }
    match kind {
        UnitKind::ToolResult => "tool_result".to_string(),
        UnitKind::Thinking => "thinking".to_string(),
        _ => blocks
            .iter()
            .find_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .and_then(first_line)
            .unwrap_or(kind.as_str())
            .to_string(),
    }
}

fn block_lines(block: &ContentBlock) -> Vec<String> {
    match block {
        ContentBlock::Text { text } => vec![text.clone()],
        ContentBlock::Thinking { thinking } => vec![thinking.clone()],
        ContentBlock::ToolUse { name, input, .. } => {
            vec![format!("$ {}", name), pretty_json(input)]
        }
        ContentBlock::ToolResult {
            content, is_error, ..
        } => {
            let header = if *is_error {
                "tool_result (error)"
            } else {
                "tool_result"
            };
            vec![header.to_string(), pretty_json(content)]
        }
        ContentBlock::SystemRecord { label, record } => {
            vec![format!("system_record: {}", label), pretty_json(record)]
        }
        other => vec![serde_json::to_string_pretty(other).unwrap_or_else(|_| other.type_name().to_string())],
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn first_line(text: &str) -> Option<&str> {
    text.trim().lines().next().filter(|l| !l.is_empty())
}

pub fn build_message_units(loglines: &[Logline]) -> Vec<MessageUnit> {
    loglines
        .iter()
        .enumerate()
        .map(|(i, logline)| MessageUnit::from_logline(i, logline))
        .collect()
}

/// Units whose kind is in `kinds` and whose body contains `query`.
pub fn filter_units<'a>(
    units: &'a [MessageUnit],
    kinds: &BTreeSet<UnitKind>,
    query: &str,
) -> Vec<&'a MessageUnit> {
    units
        .iter()
        .filter(|u| kinds.contains(&u.kind) && u.matches(query))
        .collect()
}

/// Units under the user prompt that opened them.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitGroup<'a> {
    /// `None` for activity before the first prompt
    pub prompt: Option<&'a MessageUnit>,
    /// All units of the group, the prompt included
    pub units: Vec<&'a MessageUnit>,
}

/// Split units at every user unit.
pub fn group_units_by_prompt(units: &[MessageUnit]) -> Vec<UnitGroup<'_>> {
    let mut groups = Vec::new();
    let mut current = UnitGroup {
        prompt: None,
        units: Vec::new(),
    };

    for unit in units {
        if unit.kind == UnitKind::User {
            if current.prompt.is_some() || !current.units.is_empty() {
                groups.push(std::mem::replace(
                    &mut current,
                    UnitGroup {
                        prompt: None,
                        units: Vec::new(),
                    },
                ));
            }
            current.prompt = Some(unit);
        }
        current.units.push(unit);
    }
    if current.prompt.is_some() || !current.units.is_empty() {
        groups.push(current);
    }
    groups
}
