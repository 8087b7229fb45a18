//! Session metadata extraction.

use serde_json::{Map, Value};
use transcript_format::SessionMeta;

use crate::reader::RawRecord;

/// Records scanned by head-only metadata lookups.
pub const DEFAULT_HEAD_RECORDS: usize = 50;

/// Build a [`SessionMeta`] from a `session_meta` payload.
///
/// `id` and `cwd` are stringified when present in another JSON shape; the
/// remaining string fields are dropped unless they are strings, and `git`
/// unless it is a mapping.
pub fn session_meta_from_payload(payload: &Map<String, Value>) -> SessionMeta {
    SessionMeta {
        id: stringify(payload.get("id")),
        timestamp: string_field(payload, "timestamp"),
        cwd: stringify(payload.get("cwd")),
        originator: string_field(payload, "originator"),
        cli_version: string_field(payload, "cli_version"),
        instructions: string_field(payload, "instructions"),
        source: string_field(payload, "source"),
        model_provider: string_field(payload, "model_provider"),
        git: payload.get("git").and_then(Value::as_object).cloned(),
    }
}

/// Find the first `session_meta` record with a mapping payload among the
/// first `limit` records (all records when `limit` is `None`).
pub fn extract_session_meta<'a, I>(records: I, limit: Option<usize>) -> Option<SessionMeta>
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    records
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .filter(|record| record.get("type").and_then(Value::as_str) == Some("session_meta"))
        .find_map(|record| record.get("payload").and_then(Value::as_object))
        .map(session_meta_from_payload)
}

fn stringify(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn string_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).map(str::to_string)
}
