//! List command - Show recent Codex sessions (non-interactive).

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use transcript_rollout::discovery::{SessionQuery, SessionRow};

use super::source::find_sessions;

const COLUMN_MAX: usize = 24;
const PREVIEW_MAX: usize = 160;

#[derive(Serialize)]
struct SessionListing {
    index: usize,
    path: String,
    session_id: Option<String>,
    preview: String,
    created_at: Option<String>,
    updated_at: Option<String>,
    cwd: Option<String>,
    git_branch: Option<String>,
    source: Option<String>,
    model_provider: Option<String>,
}

pub fn run(codex_home: Option<&Path>, query: &SessionQuery, show_cwd: bool, json: bool) -> Result<()> {
    let rows = find_sessions(codex_home, query)?;

    if json {
        let listings: Vec<SessionListing> = rows
            .iter()
            .enumerate()
            .map(|(index, row)| SessionListing {
                index,
                path: row.path.to_string_lossy().to_string(),
                session_id: row.session_id.clone(),
                preview: row.preview.clone(),
                created_at: row.created_at.map(|d| d.to_rfc3339()),
                updated_at: row.updated_at.map(|d| d.to_rfc3339()),
                cwd: row.cwd.clone(),
                git_branch: row.git_branch.clone(),
                source: row.source.clone(),
                model_provider: row.model_provider.clone(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    print_table(&rows, show_cwd);
    println!("\n{} session(s) found.", rows.len());
    Ok(())
}

/// Print the resume-style table with a leading position column.
pub fn print_table(rows: &[SessionRow], show_cwd: bool) {
    let now = Utc::now();
    let metrics = ColumnWidths::measure(rows, show_cwd, now);
    println!("{:>3}  {}", "#", metrics.header());
    for (i, row) in rows.iter().enumerate() {
        println!("{:>3}  {}", i, metrics.row(row, now));
    }
}

/// Column widths for the resume-style table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnWidths {
    updated: usize,
    branch: usize,
    cwd: usize,
    show_cwd: bool,
}

impl ColumnWidths {
    pub fn measure(rows: &[SessionRow], show_cwd: bool, now: DateTime<Utc>) -> Self {
        let mut widths = ColumnWidths {
            updated: "Updated".len(),
            branch: "Branch".len(),
            cwd: if show_cwd { "CWD".len() } else { 0 },
            show_cwd,
        };
        for row in rows {
            widths.updated = widths.updated.max(updated_label(row, now).chars().count());
            widths.branch = widths
                .branch
                .max(right_elide(row.git_branch.as_deref().unwrap_or(""), COLUMN_MAX).chars().count());
            if show_cwd {
                widths.cwd = widths
                    .cwd
                    .max(right_elide(row.cwd.as_deref().unwrap_or(""), COLUMN_MAX).chars().count());
            }
        }
        widths
    }

    pub fn header(&self) -> String {
        let mut parts = vec![
            pad("Updated", self.updated),
            pad("Branch", self.branch),
        ];
        if self.show_cwd {
            parts.push(pad("CWD", self.cwd));
        }
        parts.push("Conversation".to_string());
        parts.join("  ")
    }

    pub fn row(&self, row: &SessionRow, now: DateTime<Utc>) -> String {
        let mut parts = vec![
            pad(&updated_label(row, now), self.updated),
            pad(&or_dash(right_elide(row.git_branch.as_deref().unwrap_or(""), COLUMN_MAX)), self.branch),
        ];
        if self.show_cwd {
            parts.push(pad(
                &or_dash(right_elide(row.cwd.as_deref().unwrap_or(""), COLUMN_MAX)),
                self.cwd,
            ));
        }
        parts.push(preview_label(&row.preview));
        parts.join("  ")
    }
}

/// `updated_at`, else `created_at`, as a relative label.
pub fn updated_label(row: &SessionRow, now: DateTime<Utc>) -> String {
    match row.updated_at.or(row.created_at) {
        Some(ts) => human_time_ago(ts, now),
        None => "-".to_string(),
    }
}

/// `5 minutes ago`, `1 day ago`, ...
pub fn human_time_ago(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - ts).num_seconds();
    let (n, unit) = if secs < 60 {
        (secs.max(0), "second")
    } else if secs < 60 * 60 {
        (secs / 60, "minute")
    } else if secs < 60 * 60 * 24 {
        (secs / 3600, "hour")
    } else {
        (secs / 86_400, "day")
    };
    if n == 1 {
        format!("{} {} ago", n, unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

/// Keep the tail of `s`, marking the cut with a leading `…`.
pub fn right_elide(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if max_len == 0 {
        return String::new();
    }
    if len <= max_len {
        return s.to_string();
    }
    let tail: String = s.chars().skip(len - (max_len - 1)).collect();
    format!("…{}", tail)
}

fn preview_label(preview: &str) -> String {
    let single = preview.replace('\n', " ");
    let single = single.trim();
    if single.chars().count() > PREVIEW_MAX {
        let kept: String = single.chars().take(PREVIEW_MAX).collect();
        format!("{}…", kept)
    } else {
        single.to_string()
    }
}

fn or_dash(s: String) -> String {
    if s.is_empty() {
        "-".to_string()
    } else {
        s
    }
}

fn pad(s: &str, width: usize) -> String {
    format!("{:<width$}", s, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap()
    }

    fn row(branch: Option<&str>, cwd: Option<&str>, preview: &str) -> SessionRow {
        SessionRow {
            path: PathBuf::from("/x/rollout.jsonl"),
            session_id: Some("abc".to_string()),
            preview: preview.to_string(),
            created_at: None,
            updated_at: Some(now() - Duration::minutes(5)),
            cwd: cwd.map(str::to_string),
            git_branch: branch.map(str::to_string),
            source: None,
            model_provider: None,
        }
    }

    #[test]
    fn test_human_time_ago() {
        assert_eq!(human_time_ago(now(), now()), "0 seconds ago");
        assert_eq!(human_time_ago(now() - Duration::seconds(1), now()), "1 second ago");
        assert_eq!(human_time_ago(now() - Duration::minutes(5), now()), "5 minutes ago");
        assert_eq!(human_time_ago(now() - Duration::hours(1), now()), "1 hour ago");
        assert_eq!(human_time_ago(now() - Duration::days(3), now()), "3 days ago");
        assert_eq!(human_time_ago(now() + Duration::seconds(30), now()), "0 seconds ago");
    }

    #[test]
    fn test_right_elide() {
        assert_eq!(right_elide("short", 24), "short");
        assert_eq!(right_elide("/home/dev/projects/widgets", 10), "…s/widgets");
        assert_eq!(right_elide("abc", 1), "…");
        assert_eq!(right_elide("abc", 0), "");
    }

    #[test]
    fn test_preview_label_truncates() {
        let long = "x".repeat(200);
        let label = preview_label(&long);
        assert_eq!(label.chars().count(), 161);
        assert!(label.ends_with('…'));
        assert_eq!(preview_label("  multi\nline  "), "multi line");
    }

    #[test]
    fn test_table_layout() {
        let rows = vec![
            row(Some("main"), Some("/home/dev/proj"), "Fix the build"),
            row(None, None, "(no message yet)"),
        ];
        let widths = ColumnWidths::measure(&rows, true, now());
        assert_eq!(widths.header(), "Updated        Branch  CWD             Conversation");
        assert_eq!(
            widths.row(&rows[0], now()),
            "5 minutes ago  main    /home/dev/proj  Fix the build"
        );
        assert_eq!(
            widths.row(&rows[1], now()),
            "5 minutes ago  -       -               (no message yet)"
        );
    }

    #[test]
    fn test_table_without_cwd() {
        let rows = vec![row(Some("main"), Some("/home/dev/proj"), "Hi")];
        let widths = ColumnWidths::measure(&rows, false, now());
        assert_eq!(widths.header(), "Updated        Branch  Conversation");
        assert_eq!(widths.row(&rows[0], now()), "5 minutes ago  main    Hi");
    }
}
