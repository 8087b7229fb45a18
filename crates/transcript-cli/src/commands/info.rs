//! Info command - Show session metadata, parse statistics and task groups.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use transcript_format::{
    format_duration_ms, format_tool_stats, group_conversation, task_time_summary,
    ConversationGroup, ParseStats, SessionMeta,
};
use transcript_rollout::discovery::{session_summary, NO_SUMMARY};

use super::source::load_transcript;

const SUMMARY_MAX: usize = 200;

#[derive(Serialize)]
struct SessionInfo<'a> {
    source_path: &'a str,
    summary: String,
    github_repo: Option<String>,
    meta: Option<&'a SessionMeta>,
    stats: &'a ParseStats,
    task_time: Option<String>,
    groups: Vec<GroupInfo>,
}

#[derive(Serialize)]
struct GroupInfo {
    start: usize,
    end: usize,
    prompt: Option<String>,
    duration_ms: Option<i64>,
    messages: usize,
    tool_calls: usize,
    tool_counts: BTreeMap<String, usize>,
    commits: Vec<String>,
}

impl From<&ConversationGroup> for GroupInfo {
    fn from(group: &ConversationGroup) -> Self {
        GroupInfo {
            start: group.start,
            end: group.end,
            prompt: group.prompt.clone(),
            duration_ms: group.duration_ms,
            messages: group.message_count(),
            tool_calls: group.tool_calls(),
            tool_counts: group.tool_counts.clone(),
            commits: group
                .commits
                .iter()
                .map(|c| format!("{} {}", c.hash, c.subject))
                .collect(),
        }
    }
}

pub fn run(path: &Path, json: bool) -> Result<()> {
    let export = load_transcript(path)?;
    let groups = group_conversation(export.loglines());
    let summary = summarize(path, &groups);
    let github_repo = export.meta.as_ref().and_then(SessionMeta::github_repo);
    let stats = &export.stats;

    if json {
        let info = SessionInfo {
            source_path: &export.source_path,
            summary,
            github_repo,
            meta: export.meta.as_ref(),
            stats,
            task_time: task_time_summary(&groups),
            groups: groups.iter().map(GroupInfo::from).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Session Information");
    println!();
    println!("Source:       {}", export.source_path);
    println!("Summary:      {}", summary);
    if let Some(ref meta) = export.meta {
        if let Some(ref id) = meta.id {
            println!("Session id:   {}", id);
        }
        if let Some(ref ts) = meta.timestamp {
            println!("Started:      {}", ts);
        }
        if let Some(ref cwd) = meta.cwd {
            println!("CWD:          {}", cwd);
        }
        if let Some(ref originator) = meta.originator {
            println!("Originator:   {}", originator);
        }
        if let Some(ref version) = meta.cli_version {
            println!("CLI version:  {}", version);
        }
        if let Some(ref provider) = meta.model_provider {
            println!("Provider:     {}", provider);
        }
        if let Some(ref source) = meta.source {
            println!("Source kind:  {}", source);
        }
        if let Some(branch) = meta.branch() {
            println!("Branch:       {}", branch);
        }
        if let Some(url) = meta.repository_url() {
            println!("Repository:   {}", url);
        }
    }
    if let Some(ref repo) = github_repo {
        println!("GitHub:       {}", repo);
    }

    println!();
    println!("Statistics");
    println!("  Lines:      {}", stats.total_lines);
    println!("  Records:    {}", stats.parsed_rollout_lines);
    println!("  Skipped:    {}", stats.skipped_lines);
    println!("  Loglines:   {}", stats.emitted_loglines);
    println!("  System:     {}", stats.system_total());

    if stats.has_drift() {
        println!();
        println!("Unrecognized record types");
        for (label, histogram) in stats.histograms() {
            for (kind, count) in histogram {
                println!("  {}:{} ({}x)", label, kind, count);
            }
        }
    }

    println!();
    println!("Conversation ({} group(s))", groups.len());
    if let Some(task_time) = task_time_summary(&groups) {
        println!("  {}", task_time);
    }
    for (i, group) in groups.iter().enumerate() {
        let label = if group.prompt.is_some() {
            format!("#{}", i + 1)
        } else {
            "Start".to_string()
        };
        let prompt = group
            .prompt
            .as_deref()
            .map(|p| p.replace('\n', " "))
            .unwrap_or_else(|| "(session start)".to_string());
        println!(
            "  {:<6} {:>8}  {}",
            label,
            format_duration_ms(group.duration_ms),
            prompt
        );
        let tools = format_tool_stats(&group.tool_counts);
        if !tools.is_empty() {
            println!("         tools: {}", tools);
        }
        for commit in &group.commits {
            println!("         commit {} {}", commit.hash, commit.subject);
        }
    }

    Ok(())
}

/// First user text of the rollout, or the first prompt of an export.
fn summarize(path: &Path, groups: &[ConversationGroup]) -> String {
    let summary = session_summary(path, SUMMARY_MAX);
    if summary != NO_SUMMARY {
        return summary;
    }
    groups
        .iter()
        .find_map(|g| g.prompt.as_deref())
        .map(|p| truncate_chars(p, SUMMARY_MAX))
        .unwrap_or(summary)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
