//! Event classifier and normalizer.
//!
//! Every rollout record is dispatched on its top-level `type` (the dialect)
//! and, for `event_msg` and `response_item`, on `payload.type` (the kind).
//! Each match arm produces at most one logline. Shapes that are not
//! recognized still produce a `system_record` card and are counted in the
//! drift histograms of [`ParseStats`], so nothing is dropped silently.

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::{Map, Value};
use std::io;
use tracing::{debug, warn};
use transcript_format::{ContentBlock, LogType, Logline, ParseStats, SessionData, SessionMeta};

use crate::dedup::MirrorPolicy;
use crate::meta::session_meta_from_payload;
use crate::reader::{RawItem, RawRecord};
use crate::{ParsedRollout, RolloutError, RolloutResult};

/// Histogram key for records whose kind is absent or not a string.
pub const MISSING_KIND: &str = "(missing)";

// ============================================================================
// Provenance
// ============================================================================

/// Which dialect and kind produced a logline.
///
/// Provenance only lives inside the pipeline; it is not serialized with the
/// logline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    EventUserMessage,
    EventAgentMessage,
    EventContextCompacted,
    EventTurnAborted,
    EventAgentReasoning,
    EventAgentReasoningRaw,
    EventTokenCount,
    ToolUse,
    ToolResult,
    ResponseUserMessage,
    ResponseAssistantMessage,
    ResponseReasoning,
    Compacted,
    TurnContext,
    UnrecognizedEvent,
    UnrecognizedResponseItem,
    UnrecognizedRollout,
}

impl Provenance {
    /// True for loglines built from a `response_item` `message`.
    pub fn is_response_message(self) -> bool {
        matches!(
            self,
            Provenance::ResponseUserMessage | Provenance::ResponseAssistantMessage
        )
    }
}

/// A logline together with its provenance tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub provenance: Provenance,
    pub logline: Logline,
}

impl Normalized {
    fn new(provenance: Provenance, logline: Logline) -> Self {
        Self {
            provenance,
            logline,
        }
    }
}

// ============================================================================
// Dispatch tables
// ============================================================================

enum Dialect {
    SessionMeta,
    EventMsg,
    ResponseItem,
    Compacted,
    TurnContext,
    Other,
}

impl Dialect {
    fn parse(kind: &str) -> Self {
        match kind {
            "session_meta" => Dialect::SessionMeta,
            "event_msg" => Dialect::EventMsg,
            "response_item" => Dialect::ResponseItem,
            "compacted" => Dialect::Compacted,
            "turn_context" => Dialect::TurnContext,
            _ => Dialect::Other,
        }
    }
}

#[derive(Clone, Copy)]
enum EventKind<'a> {
    UserMessage,
    AgentMessage,
    ContextCompacted,
    TurnAborted,
    AgentReasoning,
    AgentReasoningRaw,
    TokenCount,
    Other(Option<&'a str>),
}

impl<'a> EventKind<'a> {
    fn parse(payload: &'a Map<String, Value>) -> Self {
        match payload.get("type").and_then(Value::as_str) {
            Some("user_message") => EventKind::UserMessage,
            Some("agent_message") => EventKind::AgentMessage,
            Some("context_compacted") => EventKind::ContextCompacted,
            Some("turn_aborted") => EventKind::TurnAborted,
            Some("agent_reasoning") => EventKind::AgentReasoning,
            Some("agent_reasoning_raw_content") => EventKind::AgentReasoningRaw,
            Some("token_count") => EventKind::TokenCount,
            other => EventKind::Other(other),
        }
    }
}

#[derive(Clone, Copy)]
enum ItemKind<'a> {
    FunctionCall,
    CustomToolCall,
    LocalShellCall,
    WebSearchCall,
    FunctionCallOutput,
    CustomToolCallOutput,
    Message,
    Reasoning,
    Other(Option<&'a str>),
}

impl<'a> ItemKind<'a> {
    fn parse(payload: &'a Map<String, Value>) -> Self {
        match payload.get("type").and_then(Value::as_str) {
            Some("function_call") => ItemKind::FunctionCall,
            Some("custom_tool_call") => ItemKind::CustomToolCall,
            Some("local_shell_call") => ItemKind::LocalShellCall,
            Some("web_search_call") => ItemKind::WebSearchCall,
            Some("function_call_output") => ItemKind::FunctionCallOutput,
            Some("custom_tool_call_output") => ItemKind::CustomToolCallOutput,
            Some("message") => ItemKind::Message,
            Some("reasoning") => ItemKind::Reasoning,
            other => ItemKind::Other(other),
        }
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Single-pass state over one rollout.
#[derive(Debug, Default)]
pub struct Normalizer {
    stats: ParseStats,
    meta: Option<SessionMeta>,
    saw_event_messages: bool,
    items: Vec<Normalized>,
    policy: MirrorPolicy,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MirrorPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Feed one item of the record stream.
    pub fn push(&mut self, item: &RawItem) {
        match item {
            RawItem::Record(record) => self.push_record(record),
            RawItem::Malformed { .. } => {
                self.stats.total_lines += 1;
                self.stats.skipped_lines += 1;
            }
        }
    }

    /// Feed one decoded record.
    pub fn push_record(&mut self, record: &RawRecord) {
        self.stats.total_lines += 1;

        let timestamp = record.get("timestamp").and_then(Value::as_str);
        let kind = record.get("type").and_then(Value::as_str);
        let (Some(timestamp), Some(kind)) = (timestamp, kind) else {
            debug!(line = self.stats.total_lines, "record lacks timestamp or type");
            self.stats.skipped_lines += 1;
            return;
        };
        self.stats.parsed_rollout_lines += 1;

        if let Some(normalized) = self.classify(timestamp, kind, record) {
            if normalized.logline.has_content() {
                self.items.push(normalized);
            }
        }
    }

    /// Apply the mirror policy and close the stats.
    pub fn finish(self) -> RolloutResult<ParsedRollout> {
        let Normalizer {
            mut stats,
            meta,
            saw_event_messages,
            items,
            policy,
        } = self;

        let loglines = policy.apply(items, saw_event_messages);
        stats.emitted_loglines = loglines.len();

        if stats.has_drift() {
            for (dialect, histogram) in stats.histograms() {
                for (kind, count) in histogram {
                    warn!(dialect, kind = kind.as_str(), count, "unrecognized rollout shape");
                }
            }
        }

        if loglines.is_empty() {
            return Err(RolloutError::NoUsableMessages);
        }

        Ok(ParsedRollout {
            session: SessionData { loglines },
            meta,
            stats,
        })
    }

    fn classify(&mut self, timestamp: &str, kind: &str, record: &RawRecord) -> Option<Normalized> {
        let payload = record.get("payload").and_then(Value::as_object);

        match (Dialect::parse(kind), payload) {
            (Dialect::SessionMeta, Some(payload)) => {
                if self.meta.is_none() {
                    self.meta = Some(session_meta_from_payload(payload));
                }
                None
            }
            (Dialect::EventMsg, Some(payload)) => self.event(timestamp, payload, record),
            (Dialect::ResponseItem, Some(payload)) => self.response_item(timestamp, payload, record),
            (Dialect::Compacted, Some(payload)) => non_empty_str(payload.get("message")).map(|message| {
                Normalized::new(
                    Provenance::Compacted,
                    Logline::blocks(LogType::System, timestamp, vec![ContentBlock::thinking(message)]),
                )
            }),
            (Dialect::TurnContext, Some(payload)) => Some(Normalized::new(
                Provenance::TurnContext,
                Logline::blocks(
                    LogType::System,
                    timestamp,
                    vec![ContentBlock::tool_use(
                        "turn_context",
                        Value::Object(payload.clone()),
                        "",
                    )],
                ),
            )),
            (Dialect::Other, _) | (_, None) => {
                self.stats.bump_rollout_type(kind);
                Some(Normalized::new(
                    Provenance::UnrecognizedRollout,
                    Logline::system_record(
                        timestamp,
                        format!("rollout:{kind}"),
                        Value::Object(record.clone()),
                    ),
                ))
            }
        }
    }

    fn event(
        &mut self,
        timestamp: &str,
        payload: &Map<String, Value>,
        record: &RawRecord,
    ) -> Option<Normalized> {
        let kind = EventKind::parse(payload);
        if matches!(kind, EventKind::UserMessage | EventKind::AgentMessage) {
            self.saw_event_messages = true;
        }

        match kind {
            EventKind::UserMessage => non_empty_str(payload.get("message")).map(|message| {
                Normalized::new(
                    Provenance::EventUserMessage,
                    Logline::plain(LogType::User, timestamp, message.trim()),
                )
            }),
            EventKind::AgentMessage => non_empty_str(payload.get("message")).map(|message| {
                Normalized::new(
                    Provenance::EventAgentMessage,
                    Logline::blocks(LogType::Assistant, timestamp, vec![ContentBlock::text(message)]),
                )
            }),
            EventKind::ContextCompacted => Some(Normalized::new(
                Provenance::EventContextCompacted,
                Logline::blocks(
                    LogType::System,
                    timestamp,
                    vec![ContentBlock::text("**Context compacted**")],
                ),
            )),
            EventKind::TurnAborted => {
                let suffix = non_empty_str(payload.get("reason"))
                    .map(|reason| format!(" ({reason})"))
                    .unwrap_or_default();
                Some(Normalized::new(
                    Provenance::EventTurnAborted,
                    Logline::blocks(
                        LogType::System,
                        timestamp,
                        vec![ContentBlock::text(format!("**Turn aborted**{suffix}"))],
                    ),
                ))
            }
            EventKind::AgentReasoning | EventKind::AgentReasoningRaw => {
                let provenance = if matches!(kind, EventKind::AgentReasoningRaw) {
                    Provenance::EventAgentReasoningRaw
                } else {
                    Provenance::EventAgentReasoning
                };
                non_empty_str(payload.get("text")).map(|text| {
                    Normalized::new(
                        provenance,
                        Logline::blocks(LogType::System, timestamp, vec![ContentBlock::thinking(text)]),
                    )
                })
            }
            EventKind::TokenCount => Some(Normalized::new(
                Provenance::EventTokenCount,
                Logline::blocks(
                    LogType::System,
                    timestamp,
                    vec![ContentBlock::tool_use(
                        "token_count",
                        Value::Object(payload.clone()),
                        "",
                    )],
                ),
            )),
            EventKind::Other(kind) => {
                let kind = kind.unwrap_or(MISSING_KIND);
                self.stats.bump_event_type(kind);
                Some(Normalized::new(
                    Provenance::UnrecognizedEvent,
                    Logline::system_record(
                        timestamp,
                        format!("event_msg:{kind}"),
                        Value::Object(record.clone()),
                    ),
                ))
            }
        }
    }

    fn response_item(
        &mut self,
        timestamp: &str,
        payload: &Map<String, Value>,
        record: &RawRecord,
    ) -> Option<Normalized> {
        let tool_use = |name: &str, input: Value, id: String| {
            Some(Normalized::new(
                Provenance::ToolUse,
                Logline::blocks(
                    LogType::Assistant,
                    timestamp,
                    vec![ContentBlock::tool_use(name, input, id)],
                ),
            ))
        };
        let tool_result = |is_error: bool| {
            let output = payload.get("output").cloned().unwrap_or(Value::Null);
            Some(Normalized::new(
                Provenance::ToolResult,
                Logline::blocks(
                    LogType::User,
                    timestamp,
                    vec![ContentBlock::tool_result(
                        output,
                        is_error,
                        id_or_empty(payload.get("call_id")),
                    )],
                ),
            ))
        };

        match ItemKind::parse(payload) {
            ItemKind::FunctionCall => {
                let arguments = match payload.get("arguments") {
                    None | Some(Value::Null) => Value::String(String::new()),
                    Some(arguments) => arguments.clone(),
                };
                tool_use(
                    name_or(payload.get("name"), "function_call"),
                    decode_or_wrap(Some(&arguments), "arguments"),
                    id_or_empty(payload.get("call_id")),
                )
            }
            ItemKind::CustomToolCall => tool_use(
                name_or(payload.get("name"), "custom_tool_call"),
                decode_or_wrap(payload.get("input"), "input"),
                id_or_empty(payload.get("call_id")),
            ),
            ItemKind::LocalShellCall => tool_use(
                "local_shell_call",
                without_id(payload),
                id_or_empty(payload.get("call_id")),
            ),
            ItemKind::WebSearchCall => tool_use(
                "web_search_call",
                without_id(payload),
                id_or_empty(payload.get("id")),
            ),
            ItemKind::FunctionCallOutput => {
                let is_error = payload
                    .get("output")
                    .and_then(Value::as_object)
                    .and_then(|output| output.get("success"))
                    == Some(&Value::Bool(false));
                tool_result(is_error)
            }
            ItemKind::CustomToolCallOutput => tool_result(false),
            ItemKind::Message => {
                let text = extract_text(payload.get("content"));
                if text.is_empty() {
                    return None;
                }
                match payload.get("role").and_then(Value::as_str) {
                    Some("user") => Some(Normalized::new(
                        Provenance::ResponseUserMessage,
                        Logline::plain(LogType::User, timestamp, text),
                    )),
                    Some("assistant") => Some(Normalized::new(
                        Provenance::ResponseAssistantMessage,
                        Logline::blocks(LogType::Assistant, timestamp, vec![ContentBlock::text(text)]),
                    )),
                    _ => None,
                }
            }
            ItemKind::Reasoning => match payload.get("summary") {
                None | Some(Value::Null) => None,
                Some(summary) => Some(Normalized::new(
                    Provenance::ResponseReasoning,
                    Logline::blocks(
                        LogType::System,
                        timestamp,
                        vec![ContentBlock::thinking(spaced_json(summary))],
                    ),
                )),
            },
            ItemKind::Other(kind) => {
                let kind = kind.unwrap_or(MISSING_KIND);
                self.stats.bump_response_item_type(kind);
                Some(Normalized::new(
                    Provenance::UnrecognizedResponseItem,
                    Logline::system_record(
                        timestamp,
                        format!("response_item:{kind}"),
                        Value::Object(record.clone()),
                    ),
                ))
            }
        }
    }
}

// ============================================================================
// Field helpers
// ============================================================================

/// Attempt a structured decode of a string field, falling back to a
/// single-key wrapper mapping `{key: raw}`.
///
/// A string that decodes to JSON `null` is wrapped like any other failure,
/// so the result is never `null` itself.
pub fn decode_or_wrap(raw: Option<&Value>, key: &str) -> Value {
    if let Some(Value::String(text)) = raw {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Null) | Err(_) => {}
            Ok(decoded) => return decoded,
        }
    }

    let mut wrapper = Map::new();
    wrapper.insert(key.to_string(), raw.cloned().unwrap_or(Value::Null));
    Value::Object(wrapper)
}

/// Join the trimmed `input_text`/`output_text` items of a content list with
/// single spaces. Anything that is not a list yields an empty string.
pub fn extract_text(content: Option<&Value>) -> String {
    let Some(items) = content.and_then(Value::as_array) else {
        return String::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .filter(|item| {
            matches!(
                item.get("type").and_then(Value::as_str),
                Some("input_text" | "output_text")
            )
        })
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

/// A tool name, or `default` when it is missing, not a string, or empty.
/// Whitespace-only names are kept.
fn name_or<'a>(value: Option<&'a Value>, default: &'a str) -> &'a str {
    match value.and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name,
        _ => default,
    }
}

/// Writes `", "` between items and `": "` after keys.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Single-line JSON with spaced separators, source key order and
/// unescaped non-ASCII text.
pub fn spaced_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, SpacedFormatter);
    if value.serialize(&mut serializer).is_err() {
        return value.to_string();
    }
    String::from_utf8(buf).unwrap_or_else(|_| value.to_string())
}

fn id_or_empty(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
    }
}

fn without_id(payload: &Map<String, Value>) -> Value {
    Value::Object(
        payload
            .iter()
            .filter(|(key, _)| key.as_str() != "id")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn normalize(records: &[Value]) -> RolloutResult<ParsedRollout> {
        let mut normalizer = Normalizer::new();
        for record in records {
            match record.as_object() {
                Some(record) => normalizer.push_record(record),
                None => normalizer.push(&RawItem::Malformed { line: 0 }),
            }
        }
        normalizer.finish()
    }

    fn only_block(parsed: &ParsedRollout) -> &ContentBlock {
        let loglines = &parsed.session.loglines;
        assert_eq!(loglines.len(), 1);
        &loglines[0].content_blocks()[0]
    }

    #[test]
    fn test_decode_or_wrap() {
        assert_eq!(
            decode_or_wrap(Some(&json!("{\"path\":\"a.txt\"}")), "arguments"),
            json!({"path": "a.txt"})
        );
        assert_eq!(
            decode_or_wrap(Some(&json!("not json")), "arguments"),
            json!({"arguments": "not json"})
        );
        assert_eq!(
            decode_or_wrap(Some(&json!("null")), "input"),
            json!({"input": "null"})
        );
        assert_eq!(decode_or_wrap(None, "input"), json!({"input": null}));
        assert_eq!(
            decode_or_wrap(Some(&json!({"a": 1})), "input"),
            json!({"input": {"a": 1}})
        );
    }

    #[test]
    fn test_extract_text() {
        let content = json!([
            {"type": "input_text", "text": "  hello "},
            {"type": "image", "text": "ignored"},
            {"type": "output_text", "text": "   "},
            "not a mapping",
            {"type": "output_text", "text": "world"}
        ]);
        assert_eq!(extract_text(Some(&content)), "hello world");
        assert_eq!(extract_text(Some(&json!("plain"))), "");
        assert_eq!(extract_text(Some(&json!([]))), "");
        assert_eq!(extract_text(None), "");
    }

    #[test]
    fn test_user_message_is_trimmed_plain_string() {
        let parsed = normalize(&[json!({
            "timestamp": "T",
            "type": "event_msg",
            "payload": {"type": "user_message", "message": "  Hello \n"}
        })])
        .unwrap();
        assert_eq!(parsed.session.loglines[0].plain_text(), Some("Hello"));
        assert_eq!(parsed.session.loglines[0].kind, LogType::User);
    }

    #[test]
    fn test_turn_aborted_reason_suffix() {
        let parsed = normalize(&[
            json!({"timestamp": "T", "type": "event_msg", "payload": {"type": "turn_aborted", "reason": "interrupted"}}),
            json!({"timestamp": "T", "type": "event_msg", "payload": {"type": "turn_aborted", "reason": "  "}}),
        ])
        .unwrap();
        let texts: Vec<_> = parsed
            .session
            .loglines
            .iter()
            .map(|l| l.content_blocks()[0].clone())
            .collect();
        assert_eq!(
            texts,
            vec![
                ContentBlock::text("**Turn aborted** (interrupted)"),
                ContentBlock::text("**Turn aborted**"),
            ]
        );
    }

    #[test]
    fn test_function_call_output_error_flag() {
        let parsed = normalize(&[json!({
            "timestamp": "T",
            "type": "response_item",
            "payload": {"type": "function_call_output", "call_id": "c1", "output": {"success": false, "output": "boom"}}
        })])
        .unwrap();
        assert_eq!(
            only_block(&parsed),
            &ContentBlock::tool_result(json!({"success": false, "output": "boom"}), true, "c1")
        );
    }

    #[test]
    fn test_local_shell_call_drops_id_key() {
        let parsed = normalize(&[json!({
            "timestamp": "T",
            "type": "response_item",
            "payload": {"type": "local_shell_call", "id": "x", "call_id": "c2", "action": {"command": ["ls"]}}
        })])
        .unwrap();
        assert_eq!(
            only_block(&parsed),
            &ContentBlock::tool_use(
                "local_shell_call",
                json!({"type": "local_shell_call", "call_id": "c2", "action": {"command": ["ls"]}}),
                "c2"
            )
        );
    }

    #[test]
    fn test_web_search_call_uses_item_id() {
        let parsed = normalize(&[json!({
            "timestamp": "T",
            "type": "response_item",
            "payload": {
                "type": "web_search_call",
                "id": "ws1",
                "call_id": "c9",
                "status": "completed",
                "action": {"query": "rust"}
            }
        })])
        .unwrap();
        assert_eq!(
            only_block(&parsed),
            &ContentBlock::tool_use(
                "web_search_call",
                json!({"type": "web_search_call", "call_id": "c9", "status": "completed", "action": {"query": "rust"}}),
                "ws1"
            )
        );
    }

    #[test]
    fn test_agent_reasoning_raw_content_matches_agent_reasoning() {
        let parsed = normalize(&[
            json!({"timestamp": "T1", "type": "event_msg", "payload": {"type": "agent_reasoning_raw_content", "text": "raw thought"}}),
            json!({"timestamp": "T2", "type": "event_msg", "payload": {"type": "agent_reasoning_raw_content", "text": "  "}}),
            json!({"timestamp": "T3", "type": "event_msg", "payload": {"type": "agent_reasoning_raw_content", "text": ""}}),
            json!({"timestamp": "T4", "type": "event_msg", "payload": {"type": "agent_reasoning", "text": "thought"}}),
        ])
        .unwrap();
        let loglines = &parsed.session.loglines;
        assert_eq!(loglines.len(), 2);
        assert_eq!(loglines[0].kind, LogType::System);
        assert_eq!(loglines[0].content_blocks(), &[ContentBlock::thinking("raw thought")]);
        assert_eq!(loglines[1].kind, LogType::System);
        assert_eq!(loglines[1].content_blocks(), &[ContentBlock::thinking("thought")]);
    }

    #[test]
    fn test_tool_name_whitespace_is_kept() {
        let parsed = normalize(&[
            json!({"timestamp": "T", "type": "response_item", "payload": {"type": "function_call", "name": "  ", "arguments": "{}", "call_id": "c1"}}),
            json!({"timestamp": "T", "type": "response_item", "payload": {"type": "custom_tool_call", "name": "", "input": "x", "call_id": "c2"}}),
        ])
        .unwrap();
        let names: Vec<&str> = parsed
            .session
            .loglines
            .iter()
            .map(|line| match &line.content_blocks()[0] {
                ContentBlock::ToolUse { name, .. } => name.as_str(),
                other => panic!("Expected ToolUse, got {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["  ", "custom_tool_call"]);
    }

    #[test]
    fn test_function_call_missing_arguments_wraps_empty_string() {
        let parsed = normalize(&[json!({
            "timestamp": "T",
            "type": "response_item",
            "payload": {"type": "function_call", "name": "", "call_id": "c3"}
        })])
        .unwrap();
        assert_eq!(
            only_block(&parsed),
            &ContentBlock::tool_use("function_call", json!({"arguments": ""}), "c3")
        );
    }

    #[test]
    fn test_reasoning_summary_is_serialized() {
        let parsed = normalize(&[json!({
            "timestamp": "T",
            "type": "response_item",
            "payload": {"type": "reasoning", "summary": [{"type": "summary_text", "text": "plan"}]}
        })])
        .unwrap();
        assert_eq!(
            only_block(&parsed),
            &ContentBlock::thinking(r#"[{"type": "summary_text", "text": "plan"}]"#)
        );
    }

    #[test]
    fn test_spaced_json_keeps_key_order_and_unicode() {
        assert_eq!(
            spaced_json(&json!({"z": 1, "a": ["→", null], "m": {}})),
            r#"{"z": 1, "a": ["→", null], "m": {}}"#
        );
        assert_eq!(spaced_json(&json!("line\nbreak")), r#""line\nbreak""#);
    }

    #[test]
    fn test_non_mapping_payload_is_unrecognized_dialect() {
        let parsed = normalize(&[json!({"timestamp": "T", "type": "event_msg", "payload": "oops"})]).unwrap();
        assert_eq!(parsed.stats.system_rollout_types.get("event_msg"), Some(&1));
        match only_block(&parsed) {
            ContentBlock::SystemRecord { label, .. } => assert_eq!(label, "rollout:event_msg"),
            other => panic!("Expected SystemRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_kind_label() {
        let parsed = normalize(&[json!({"timestamp": "T", "type": "response_item", "payload": {"type": 7}})]).unwrap();
        assert_eq!(
            parsed.stats.system_response_item_types.get(MISSING_KIND),
            Some(&1)
        );
    }

    #[test]
    fn test_skipped_and_malformed_counted() {
        let parsed = normalize(&[
            json!({"type": "event_msg"}),
            json!({"timestamp": 5, "type": "event_msg"}),
            json!("not a mapping"),
            json!({"timestamp": "T", "type": "event_msg", "payload": {"type": "agent_message", "message": "hi"}}),
        ])
        .unwrap();
        assert_eq!(parsed.stats.total_lines, 4);
        assert_eq!(parsed.stats.skipped_lines, 3);
        assert_eq!(parsed.stats.parsed_rollout_lines, 1);
        assert_eq!(parsed.stats.emitted_loglines, 1);
    }

    #[test]
    fn test_only_meta_is_no_usable_messages() {
        let result = normalize(&[json!({
            "timestamp": "T",
            "type": "session_meta",
            "payload": {"id": "s1"}
        })]);
        assert!(matches!(result, Err(RolloutError::NoUsableMessages)));
    }

    #[test]
    fn test_empty_agent_message_still_marks_event_mirror() {
        let mut normalizer = Normalizer::new();
        normalizer.push_record(
            json!({"timestamp": "T", "type": "event_msg", "payload": {"type": "agent_message", "message": " "}})
                .as_object()
                .unwrap(),
        );
        assert!(normalizer.saw_event_messages);
        assert!(normalizer.items.is_empty());
    }
}
