//! Session discovery under `CODEX_HOME`.
//!
//! Rollouts live in:
//! - `$CODEX_HOME/sessions/YYYY/MM/DD/rollout-<ts>-<uuid>.jsonl`
//! - `$CODEX_HOME/archived_sessions/**/rollout-*.jsonl`
//!
//! `CODEX_HOME` defaults to `~/.codex`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;
use tracing::debug;
use transcript_format::{parse_timestamp, SessionMeta};

use crate::meta::{extract_session_meta, DEFAULT_HEAD_RECORDS};
use crate::normalize::extract_text;
use crate::reader::{read_items, read_rollout_head, RawItem, RawRecord};

pub const SESSIONS_SUBDIR: &str = "sessions";
pub const ARCHIVED_SESSIONS_SUBDIR: &str = "archived_sessions";

/// Preview shown for sessions without a user message in their head.
pub const NO_PREVIEW: &str = "(no message yet)";
/// Summary shown for sessions without any user text.
pub const NO_SUMMARY: &str = "(no summary)";

/// Resolve the Codex home directory.
///
/// An explicit path wins, then the `CODEX_HOME` environment variable, then
/// `~/.codex`. A leading `~` is expanded.
pub fn codex_home(explicit: Option<&Path>) -> Result<PathBuf> {
    let raw = match explicit {
        Some(path) => path.to_path_buf(),
        None => match std::env::var_os("CODEX_HOME") {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => {
                let home = dirs::home_dir().context("Failed to determine home directory")?;
                return Ok(home.join(".codex"));
            }
        },
    };

    let expanded = match raw.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(rest),
        Err(_) => raw,
    };
    Ok(fs::canonicalize(&expanded).unwrap_or(expanded))
}

/// All `rollout-*.jsonl` files under the session directories of `home`.
pub fn rollout_files(home: &Path, include_archived: bool) -> Result<Vec<PathBuf>> {
    let mut roots = vec![home.join(SESSIONS_SUBDIR)];
    if include_archived {
        roots.push(home.join(ARCHIVED_SESSIONS_SUBDIR));
    }

    let mut files = Vec::new();
    for dir in roots.iter().filter(|dir| dir.is_dir()) {
        let pattern = format!("{}/**/rollout-*.jsonl", dir.display());
        for entry in glob::glob(&pattern).with_context(|| format!("Invalid glob {pattern}"))? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "skipping unreadable session entry"),
            }
        }
    }
    Ok(files)
}

fn rollout_filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^rollout-(?P<ts>.+)-(?P<uuid>[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\.jsonl$",
        )
        .expect("valid rollout filename regex")
    })
}

/// Session UUID embedded in a `rollout-<ts>-<uuid>.jsonl` filename.
pub fn session_id_from_filename(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    rollout_filename_re()
        .captures(name)
        .map(|caps| caps["uuid"].to_string())
}

/// Filters for [`list_session_rows`].
#[derive(Debug, Clone)]
pub struct SessionQuery {
    pub limit: usize,
    pub include_archived: bool,
    /// Case-insensitive substring over preview, path, cwd, branch and id
    pub query: Option<String>,
    /// Only sessions whose recorded cwd is this directory
    pub cwd: Option<PathBuf>,
}

impl Default for SessionQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            include_archived: true,
            query: None,
            cwd: None,
        }
    }
}

/// One discovered session, as shown by `list`.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub path: PathBuf,
    pub session_id: Option<String>,
    pub preview: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub cwd: Option<String>,
    pub git_branch: Option<String>,
    pub source: Option<String>,
    pub model_provider: Option<String>,
}

impl SessionRow {
    /// Build a row from the head of a rollout.
    pub fn from_head(path: PathBuf, head: &[RawRecord], updated_at: Option<DateTime<Utc>>) -> Self {
        let meta = extract_session_meta(head, None).unwrap_or_default();
        let preview = extract_preview(head).unwrap_or_else(|| NO_PREVIEW.to_string());
        let SessionMeta {
            timestamp,
            cwd,
            source,
            model_provider,
            ..
        } = meta.clone();

        Self {
            session_id: session_id_from_filename(&path),
            path,
            preview,
            created_at: timestamp
                .as_deref()
                .and_then(parse_timestamp)
                .map(|ts| ts.with_timezone(&Utc)),
            updated_at,
            cwd,
            git_branch: meta.branch().map(str::to_string),
            source,
            model_provider,
        }
    }

    fn matches_query(&self, needle: &str) -> bool {
        let path = self.path.display().to_string();
        let haystacks = [
            Some(self.preview.as_str()),
            Some(path.as_str()),
            self.cwd.as_deref(),
            self.git_branch.as_deref(),
            self.session_id.as_deref(),
        ];
        let hit = haystacks
            .into_iter()
            .flatten()
            .any(|haystack| haystack.to_lowercase().contains(needle));
        hit
    }
}

/// Discover sessions newest first, applying the filters in `query`.
pub fn list_session_rows(home: &Path, query: &SessionQuery) -> Result<Vec<SessionRow>> {
    let needle = query
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut candidates: Vec<(PathBuf, Option<SystemTime>)> = rollout_files(home, query.include_archived)?
        .into_iter()
        .map(|path| {
            let mtime = fs::metadata(&path).and_then(|m| m.modified()).ok();
            (path, mtime)
        })
        .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1));

    let mut rows = Vec::new();
    for (path, mtime) in candidates {
        if rows.len() >= query.limit {
            break;
        }
        let Some(mtime) = mtime else {
            continue;
        };

        let head = read_rollout_head(&path, DEFAULT_HEAD_RECORDS);
        let row = SessionRow::from_head(path, &head, Some(DateTime::<Utc>::from(mtime)));

        if let Some(filter_cwd) = query.cwd.as_deref() {
            match row.cwd.as_deref() {
                Some(cwd) if paths_match(Path::new(cwd), filter_cwd) => {}
                _ => continue,
            }
        }
        if let Some(needle) = needle.as_deref() {
            if !row.matches_query(needle) {
                continue;
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

fn looks_like_environment_context(text: &str) -> bool {
    let text = text.trim();
    text.starts_with("<environment_context>") || text.starts_with("<environment_context ")
}

fn payload_of<'a>(record: &'a RawRecord, dialect: &str) -> Option<&'a serde_json::Map<String, Value>> {
    if record.get("type").and_then(Value::as_str) != Some(dialect) {
        return None;
    }
    record.get("payload").and_then(Value::as_object)
}

/// The first user text in a rollout head.
///
/// `response_item` user messages are preferred over `user_message` events;
/// injected `<environment_context>` blocks are never a preview.
pub fn extract_preview(head: &[RawRecord]) -> Option<String> {
    let from_items = head.iter().find_map(|record| {
        let payload = payload_of(record, "response_item")?;
        if payload.get("type").and_then(Value::as_str) != Some("message")
            || payload.get("role").and_then(Value::as_str) != Some("user")
        {
            return None;
        }
        let text = extract_text(payload.get("content"));
        (!text.is_empty() && !looks_like_environment_context(&text)).then_some(text)
    });
    if from_items.is_some() {
        return from_items;
    }

    head.iter().find_map(|record| {
        let payload = payload_of(record, "event_msg")?;
        if payload.get("type").and_then(Value::as_str) != Some("user_message") {
            return None;
        }
        let message = payload.get("message").and_then(Value::as_str)?.trim();
        (!message.is_empty() && !looks_like_environment_context(message))
            .then(|| message.to_string())
    })
}

/// First user text anywhere in the rollout, truncated to `max_len`
/// characters with a trailing `...`.
pub fn session_summary(path: &Path, max_len: usize) -> String {
    let items = match read_items(path) {
        Ok(items) => items,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot summarize session");
            return NO_SUMMARY.to_string();
        }
    };

    items
        .iter()
        .filter_map(|item| match item {
            RawItem::Record(record) => Some(record),
            RawItem::Malformed { .. } => None,
        })
        .find_map(|record| {
            if let Some(payload) = payload_of(record, "event_msg") {
                if payload.get("type").and_then(Value::as_str) == Some("user_message") {
                    let message = payload.get("message").and_then(Value::as_str)?.trim();
                    return (!message.is_empty()).then(|| message.to_string());
                }
            }
            let payload = payload_of(record, "response_item")?;
            if payload.get("type").and_then(Value::as_str) == Some("message")
                && payload.get("role").and_then(Value::as_str) == Some("user")
            {
                let text = extract_text(payload.get("content"));
                return (!text.is_empty()).then_some(text);
            }
            None
        })
        .map(|text| truncate_with_ellipsis(&text, max_len))
        .unwrap_or_else(|| NO_SUMMARY.to_string())
}

fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Compare two paths after resolving them; unresolvable paths compare as
/// given.
pub fn paths_match(a: &Path, b: &Path) -> bool {
    let resolve = |p: &Path| fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
    resolve(a) == resolve(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_session_id_from_filename() {
        let path = Path::new(
            "/x/sessions/2025/01/02/rollout-2025-01-02T10-00-00-0199a1b2-c3d4-7e5f-8a9b-0c1d2e3f4a5b.jsonl",
        );
        assert_eq!(
            session_id_from_filename(path).as_deref(),
            Some("0199a1b2-c3d4-7e5f-8a9b-0c1d2e3f4a5b")
        );
        assert_eq!(session_id_from_filename(Path::new("rollout-x.jsonl")), None);
    }

    #[test]
    fn test_preview_prefers_response_item_and_skips_env_context() {
        let head = vec![
            record(json!({"type": "event_msg", "payload": {"type": "user_message", "message": "from event"}})),
            record(json!({"type": "response_item", "payload": {"type": "message", "role": "user", "content": [
                {"type": "input_text", "text": "<environment_context>cwd</environment_context>"}
            ]}})),
            record(json!({"type": "response_item", "payload": {"type": "message", "role": "user", "content": [
                {"type": "input_text", "text": "fix the bug"}
            ]}})),
        ];
        assert_eq!(extract_preview(&head).as_deref(), Some("fix the bug"));
        assert_eq!(extract_preview(&head[..2]).as_deref(), Some("from event"));
        assert_eq!(extract_preview(&[]), None);
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("abcdefghij", 6), "abc...");
        assert_eq!(truncate_with_ellipsis("ééééé", 4), "é...");
    }

    #[test]
    fn test_row_matches_query() {
        let head = vec![record(json!({
            "timestamp": "2025-01-01T00:00:00Z",
            "type": "session_meta",
            "payload": {"id": "s", "timestamp": "2025-01-01T00:00:00Z", "cwd": "/work/proj", "git": {"branch": "feature/x"}}
        }))];
        let row = SessionRow::from_head(PathBuf::from("/tmp/rollout-a.jsonl"), &head, None);
        assert!(row.matches_query("feature"));
        assert!(row.matches_query("proj"));
        assert!(row.matches_query("rollout-a.jsonl"));
        assert!(!row.matches_query("nothing"));
        assert_eq!(row.preview, NO_PREVIEW);
        assert!(row.created_at.is_some());
    }

    #[test]
    fn test_codex_home_explicit_wins() {
        let home = codex_home(Some(Path::new("/definitely/not/here"))).unwrap();
        assert_eq!(home, PathBuf::from("/definitely/not/here"));
    }
}
