//! Conversation grouping: partition loglines into turns anchored on user
//! prompts, with per-turn summary figures for presentation.

use crate::timestamp::elapsed_ms;
use crate::{ContentBlock, Logline};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Assistant text at least this long is surfaced as a "long text" preview.
pub const LONG_TEXT_THRESHOLD: usize = 300;

/// A contiguous span `[start, end]` of loglines opened by one prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ConversationGroup {
    /// Index of the first logline in the group
    pub start: usize,
    /// Index of the last logline in the group (inclusive)
    pub end: usize,
    /// The prompt that opened the group; `None` for leading session activity
    pub prompt: Option<String>,
    /// Wall time from first to last logline, if both timestamps parse
    pub duration_ms: Option<i64>,
    /// Tool invocations by aliased tool name
    pub tool_counts: BTreeMap<String, usize>,
    /// Commits detected in tool output
    pub commits: Vec<Commit>,
    /// First long assistant text in the group
    pub long_text: Option<String>,
}

/// A commit line like `[main 1a2b3c4] Fix parser` found in tool output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct Commit {
    pub hash: String,
    pub subject: String,
    pub timestamp: String,
}

impl ConversationGroup {
    pub fn message_count(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn tool_calls(&self) -> usize {
        self.tool_counts.values().sum()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }
}

fn commit_re() -> &'static Regex {
    static COMMIT_RE: OnceLock<Regex> = OnceLock::new();
    COMMIT_RE.get_or_init(|| {
        Regex::new(r"\[[\w\-/]+ ([a-f0-9]{7,})\] (.+?)(?:\n|$)").expect("valid commit regex")
    })
}

/// Find all `[<scope> <hash>] <subject>` commit lines in `text`.
pub fn find_commits(text: &str, timestamp: &str) -> Vec<Commit> {
    commit_re()
        .captures_iter(text)
        .map(|caps| Commit {
            hash: caps[1].to_string(),
            subject: caps[2].to_string(),
            timestamp: timestamp.to_string(),
        })
        .collect()
}

/// Split `text` around commit lines: `(before, Some(commit))` pairs followed
/// by a trailing `(after, None)`.
pub fn split_commits<'a>(text: &'a str) -> Vec<(&'a str, Option<(&'a str, &'a str)>)> {
    let mut parts = Vec::new();
    let mut last_end = 0;
    for caps in commit_re().captures_iter(text) {
        let (Some(whole), Some(hash), Some(subject)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        parts.push((
            &text[last_end..whole.start()],
            Some((hash.as_str(), subject.as_str())),
        ));
        last_end = whole.end();
    }
    parts.push((&text[last_end..], None));
    parts
}

/// Strip the harness namespace from tool names (`functions.shell` → `shell`).
pub fn tool_alias(name: &str) -> &str {
    name.strip_prefix("functions.").unwrap_or(name)
}

/// Partition loglines into conversation groups.
///
/// A group opens at every user logline with non-empty plain-string content.
/// Activity before the first prompt forms a group without a prompt, and a
/// session without prompts yields exactly one such group.
pub fn group_conversation(loglines: &[Logline]) -> Vec<ConversationGroup> {
    let mut spans: Vec<(usize, usize, Option<String>)> = Vec::new();
    let mut current_start = 0;
    let mut current_prompt: Option<String> = None;

    for (i, logline) in loglines.iter().enumerate() {
        let prompt = logline.prompt_text();
        if prompt.is_some() && i > current_start {
            spans.push((current_start, i - 1, current_prompt.take()));
            current_start = i;
        }
        if current_prompt.is_none() {
            current_prompt = prompt.map(str::to_string);
        }
    }
    if !loglines.is_empty() {
        spans.push((current_start, loglines.len() - 1, current_prompt));
    }

    spans
        .into_iter()
        .map(|(start, end, prompt)| summarize(&loglines[start..=end], start, end, prompt))
        .collect()
}

fn summarize(
    loglines: &[Logline],
    start: usize,
    end: usize,
    prompt: Option<String>,
) -> ConversationGroup {
    let mut tool_counts = BTreeMap::new();
    let mut commits = Vec::new();
    let mut long_text = None;

    for logline in loglines {
        for block in logline.content_blocks() {
            match block {
                ContentBlock::ToolUse { name, .. } => {
                    *tool_counts.entry(tool_alias(name).to_string()).or_insert(0) += 1;
                }
                ContentBlock::ToolResult { content, .. } => {
                    if let Some(text) = content.as_str() {
                        commits.extend(find_commits(text, &logline.timestamp));
                    }
                }
                ContentBlock::Text { text } => {
                    if long_text.is_none() && text.chars().count() >= LONG_TEXT_THRESHOLD {
                        long_text = Some(text.clone());
                    }
                }
                _ => {}
            }
        }
    }

    let duration_ms = match (loglines.first(), loglines.last()) {
        (Some(first), Some(last)) => elapsed_ms(&first.timestamp, &last.timestamp),
        _ => None,
    };

    ConversationGroup {
        start,
        end,
        prompt,
        duration_ms,
        tool_counts,
        commits,
        long_text,
    }
}

/// `3 shell · 1 apply_patch`, most used first.
pub fn format_tool_stats(tool_counts: &BTreeMap<String, usize>) -> String {
    let mut counts: Vec<(&String, &usize)> = tool_counts.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    counts
        .into_iter()
        .map(|(name, count)| format!("{} {}", count, name))
        .collect::<Vec<_>>()
        .join(" · ")
}

/// Average, min and max task time over groups that were opened by a prompt.
pub fn task_time_summary(groups: &[ConversationGroup]) -> Option<String> {
    let durations: Vec<i64> = groups
        .iter()
        .filter(|g| g.prompt.is_some())
        .filter_map(|g| g.duration_ms)
        .collect();
    let min = *durations.iter().min()?;
    let max = *durations.iter().max()?;
    let avg = durations.iter().sum::<i64>() / durations.len() as i64;
    Some(format!(
        "task time avg {} · min {} · max {}",
        crate::format_duration_ms(Some(avg)),
        crate::format_duration_ms(Some(min)),
        crate::format_duration_ms(Some(max))
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn user(ts: &str, text: &str) -> Logline {
        Logline::plain(LogType::User, ts, text)
    }

    fn system(ts: &str) -> Logline {
        Logline::blocks(LogType::System, ts, vec![ContentBlock::text("**Context compacted**")])
    }

    fn tool(ts: &str, name: &str) -> Logline {
        Logline::blocks(
            LogType::Assistant,
            ts,
            vec![ContentBlock::tool_use(name, json!({}), "c")],
        )
    }

    fn output(ts: &str, text: &str) -> Logline {
        Logline::blocks(
            LogType::User,
            ts,
            vec![ContentBlock::tool_result(json!(text), false, "c")],
        )
    }

    #[test]
    fn test_leading_system_activity_forms_promptless_group() {
        let loglines = vec![
            system("2025-01-01T00:00:00Z"),
            user("2025-01-01T00:00:01Z", "first"),
            tool("2025-01-01T00:00:02Z", "functions.shell"),
            user("2025-01-01T00:00:03Z", "second"),
        ];
        let groups = group_conversation(&loglines);
        let spans: Vec<_> = groups
            .iter()
            .map(|g| (g.start, g.end, g.prompt.as_deref()))
            .collect();
        assert_eq!(
            spans,
            vec![(0, 0, None), (1, 2, Some("first")), (3, 3, Some("second"))]
        );
        assert_eq!(groups[1].tool_counts.get("shell"), Some(&1));
        assert_eq!(groups[1].duration_ms, Some(1000));
    }

    #[test]
    fn test_no_prompts_yields_single_group() {
        let loglines = vec![system("T1"), tool("T2", "shell")];
        let groups = group_conversation(&loglines);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].prompt, None);
        assert_eq!(groups[0].message_count(), 2);
        assert_eq!(groups[0].duration_ms, None);
    }

    #[test]
    fn test_tool_replies_do_not_open_groups() {
        let loglines = vec![
            user("T1", "do it"),
            tool("T2", "shell"),
            output("T3", "[main abc1234] Add parser\n 1 file changed"),
        ];
        let groups = group_conversation(&loglines);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].commit_count(), 1);
        assert_eq!(groups[0].commits[0].hash, "abc1234");
        assert_eq!(groups[0].commits[0].subject, "Add parser");
    }

    #[test]
    fn test_empty_input() {
        assert!(group_conversation(&[]).is_empty());
    }

    #[test]
    fn test_split_commits() {
        let parts = split_commits("before\n[feat/x 0123456789] Subject\nafter");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], ("before\n", Some(("0123456789", "Subject"))));
        assert_eq!(parts[1], ("after", None));
    }

    #[test]
    fn test_format_tool_stats_orders_by_count() {
        let mut counts = BTreeMap::new();
        counts.insert("apply_patch".to_string(), 1);
        counts.insert("shell".to_string(), 3);
        assert_eq!(format_tool_stats(&counts), "3 shell · 1 apply_patch");
    }

    #[test]
    fn test_task_time_summary_ignores_promptless_groups() {
        let loglines = vec![
            system("2025-01-01T00:00:00Z"),
            system("2025-01-01T01:00:00Z"),
            user("2025-01-01T01:00:00Z", "a"),
            tool("2025-01-01T01:00:10Z", "shell"),
            user("2025-01-01T01:01:00Z", "b"),
            tool("2025-01-01T01:01:30Z", "shell"),
        ];
        let groups = group_conversation(&loglines);
        assert_eq!(
            task_time_summary(&groups).as_deref(),
            Some("task time avg 20s · min 10s · max 30s")
        );
        assert_eq!(task_time_summary(&groups[..1]), None);
    }
}
