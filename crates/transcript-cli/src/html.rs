//! Standalone HTML rendering.
//!
//! A transcript page is one self-contained `index.html`: embedded CSS, a
//! drift banner when unrecognized records were seen, a conversation index
//! and one card per logline. A small JSON island (`#viewer-meta`) carries
//! card kinds, ids, timestamps and group spans for in-page navigation.

use serde_json::{json, Value};
use transcript_format::{
    format_duration_ms, format_tool_stats, group_conversation, split_commits, task_time_summary,
    tool_alias, ArchiveIndex, ContentBlock, ConversationGroup, LogType, Logline, MessageContent,
    ParseStats, SessionMeta, TranscriptExport, VIEWER_FORMAT,
};

/// Prompt previews in the conversation index are cut here.
const PROMPT_PREVIEW_MAX: usize = 160;
/// Long-reply snippets in the conversation index are cut here.
const LONG_TEXT_SNIPPET_MAX: usize = 4000;

// ============================================================================
// Escaping and text
// ============================================================================

/// Escape text for element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Paragraphs split on blank lines, with fenced code kept verbatim.
fn render_text(text: &str) -> String {
    let mut html = String::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut code: Option<Vec<&str>> = None;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            match code.take() {
                Some(block) => {
                    html.push_str(&format!("<pre><code>{}</code></pre>", escape(&block.join("\n"))));
                }
                None => {
                    flush_paragraph(&mut paragraph, &mut html);
                    code = Some(Vec::new());
                }
            }
            continue;
        }
        match code.as_mut() {
            Some(block) => block.push(line),
            None if line.trim().is_empty() => flush_paragraph(&mut paragraph, &mut html),
            None => paragraph.push(line),
        }
    }
    if let Some(block) = code {
        html.push_str(&format!("<pre><code>{}</code></pre>", escape(&block.join("\n"))));
    }
    flush_paragraph(&mut paragraph, &mut html);
    html
}

fn flush_paragraph(paragraph: &mut Vec<&str>, html: &mut String) {
    if !paragraph.is_empty() {
        let lines: Vec<String> = paragraph.iter().map(|l| escape(l)).collect();
        html.push_str(&format!("<p>{}</p>", lines.join("<br>")));
        paragraph.clear();
    }
}

fn is_json_like(text: &str) -> bool {
    let text = text.trim();
    (text.starts_with('{') && text.ends_with('}')) || (text.starts_with('[') && text.ends_with(']'))
}

fn pretty_json(value: &Value) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!("<pre class=\"json\">{}</pre>", escape(&pretty))
}

/// Pretty-print `text` when it holds JSON, otherwise show it preformatted.
fn json_or_pre(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if is_json_like(text) => pretty_json(&value),
        _ => format!("<pre>{}</pre>", escape(text)),
    }
}

fn truncate_chars(text: &str, max: usize, marker: &str) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max).collect();
    format!("{}{}", kept, marker)
}

// ============================================================================
// Item kinds
// ============================================================================

/// Kind of a transcript card, used for styling and navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    User,
    Assistant,
    ToolCall,
    ToolReply,
    System,
}

impl ItemKind {
    pub fn of(logline: &Logline) -> Self {
        match logline.kind {
            LogType::Assistant if logline.is_tool_call() => ItemKind::ToolCall,
            LogType::Assistant => ItemKind::Assistant,
            LogType::User if logline.is_tool_reply() => ItemKind::ToolReply,
            LogType::User => ItemKind::User,
            LogType::System => ItemKind::System,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::User => "user",
            ItemKind::Assistant => "assistant",
            ItemKind::ToolCall => "tool_call",
            ItemKind::ToolReply => "tool_reply",
            ItemKind::System => "system",
        }
    }

    /// One-letter code used in the viewer metadata.
    pub fn code(&self) -> char {
        match self {
            ItemKind::User => 'u',
            ItemKind::Assistant => 'a',
            ItemKind::ToolCall => 't',
            ItemKind::ToolReply => 'r',
            ItemKind::System => 's',
        }
    }
}

fn message_id(index: usize) -> String {
    format!("msg-{}", index)
}

// ============================================================================
// Blocks
// ============================================================================

fn render_block(block: &ContentBlock, github_repo: Option<&str>) -> String {
    match block {
        ContentBlock::Text { text } => format!("<div class=\"assistant-text\">{}</div>", render_text(text)),
        ContentBlock::Thinking { thinking } => format!(
            "<div class=\"thinking\"><div class=\"thinking-label\">Thinking</div>{}</div>",
            render_text(thinking)
        ),
        ContentBlock::ToolUse { name, input, id } => render_tool_use(name, input, id),
        ContentBlock::ToolResult {
            content, is_error, ..
        } => render_tool_result(content, *is_error, github_repo),
        ContentBlock::SystemRecord { label, record } => format!(
            "<details class=\"system-record\"><summary>{}</summary>{}</details>",
            escape(label),
            pretty_json(record)
        ),
        ContentBlock::Image { source } => format!(
            "<div class=\"image-block\"><img src=\"data:{};base64,{}\" alt=\"image\"></div>",
            escape(&source.media_type),
            escape(&source.data)
        ),
        ContentBlock::Unknown => "<p class=\"unknown-block\">(unsupported block)</p>".to_string(),
    }
}

fn render_tool_use(name: &str, input: &Value, id: &str) -> String {
    let alias = tool_alias(name);
    let id_attr = if id.is_empty() {
        String::new()
    } else {
        format!(" data-tool-id=\"{}\"", escape(id))
    };

    if alias == "exec_command" {
        let command = ["cmd", "command"]
            .iter()
            .find_map(|k| input.get(k))
            .map(command_text)
            .unwrap_or_default();
        let description = ["justification", "description"]
            .iter()
            .find_map(|k| input.get(k).and_then(Value::as_str))
            .unwrap_or("");
        return bash_tool(&command, description, &id_attr);
    }
    if alias == "shell" || alias == "bash" {
        let command = input.get("command").map(command_text).unwrap_or_default();
        let description = input
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("");
        return bash_tool(&command, description, &id_attr);
    }
    if alias == "apply_patch" {
        if let Some(patch) = input
            .get("patch")
            .or_else(|| input.get("input"))
            .and_then(Value::as_str)
        {
            return format!(
                "<div class=\"tool-use patch\"{}><div class=\"tool-header\">apply_patch</div><pre class=\"patch\">{}</pre></div>",
                id_attr,
                escape(patch)
            );
        }
    }

    let description = input
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("");
    let display_input = match input {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != "description")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    };
    let description_html = if description.is_empty() {
        String::new()
    } else {
        format!("<div class=\"tool-description\">{}</div>", escape(description))
    };
    format!(
        "<div class=\"tool-use\"{}><div class=\"tool-header\">{}</div>{}{}</div>",
        id_attr,
        escape(name),
        description_html,
        pretty_json(&display_input)
    )
}

/// Shell commands arrive as a string or an argv array.
fn command_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .map(|p| p.as_str().map(str::to_string).unwrap_or_else(|| p.to_string()))
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

fn bash_tool(command: &str, description: &str, id_attr: &str) -> String {
    let description_html = if description.is_empty() {
        String::new()
    } else {
        format!("<div class=\"tool-description\">{}</div>", escape(description))
    };
    format!(
        "<div class=\"tool-use bash\"{}><div class=\"tool-header\">$ shell</div>{}<pre class=\"command\">{}</pre></div>",
        id_attr,
        description_html,
        escape(command)
    )
}

fn render_tool_result(content: &Value, is_error: bool, github_repo: Option<&str>) -> String {
    let body = match content {
        Value::String(text) => {
            let parts = split_commits(text);
            if parts.len() == 1 {
                format!("<pre>{}</pre>", escape(text))
            } else {
                parts
                    .into_iter()
                    .map(|(before, commit)| {
                        let before = before.trim();
                        let mut html = if before.is_empty() {
                            String::new()
                        } else {
                            format!("<pre>{}</pre>", escape(before))
                        };
                        if let Some((hash, subject)) = commit {
                            html.push_str(&commit_card(hash, subject, github_repo));
                        }
                        html
                    })
                    .collect()
            }
        }
        other => pretty_json(other),
    };
    let class = if is_error {
        "tool-result tool-error"
    } else {
        "tool-result"
    };
    format!("<div class=\"{}\">{}</div>", class, body)
}

fn commit_card(hash: &str, subject: &str, github_repo: Option<&str>) -> String {
    let short: String = hash.chars().take(7).collect();
    let hash_html = match github_repo {
        Some(repo) => format!(
            "<a href=\"https://github.com/{}/commit/{}\">{}</a>",
            escape(repo),
            escape(hash),
            escape(&short)
        ),
        None => escape(&short),
    };
    format!(
        "<div class=\"commit-card\"><span class=\"commit-hash\">{}</span> {}</div>",
        hash_html,
        escape(subject)
    )
}

// ============================================================================
// Messages
// ============================================================================

fn render_message(index: usize, logline: &Logline, github_repo: Option<&str>) -> String {
    let kind = ItemKind::of(logline);
    let body = match &logline.message.content {
        MessageContent::Text(text) if is_json_like(text) => {
            format!("<div class=\"user-content\">{}</div>", json_or_pre(text))
        }
        MessageContent::Text(text) => {
            format!("<div class=\"user-content\">{}</div>", render_text(text))
        }
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .map(|b| render_block(b, github_repo))
            .collect(),
    };
    let id = message_id(index);
    format!(
        "<div class=\"message {kind}\" id=\"{id}\"><div class=\"message-header\"><span class=\"role-label\">{role}</span><a href=\"#{id}\" class=\"timestamp-link\"><time datetime=\"{ts}\">{ts}</time></a></div><div class=\"message-content\">{body}</div></div>\n",
        kind = kind.as_str(),
        id = id,
        role = role_label(kind),
        ts = escape(&logline.timestamp),
        body = body
    )
}

fn role_label(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::User => "User",
        ItemKind::Assistant => "Assistant",
        ItemKind::ToolCall => "Tool call",
        ItemKind::ToolReply => "Tool reply",
        ItemKind::System => "System",
    }
}

// ============================================================================
// Page sections
// ============================================================================

fn drift_banner(stats: &ParseStats) -> String {
    let total = stats.system_total();
    if total == 0 {
        return String::new();
    }
    let mut html = format!(
        "<div class=\"drift-warning\"><strong>{} record(s) were not recognized and are shown as System cards.</strong> The rollout format may have changed.",
        total
    );
    for (label, histogram) in stats.histograms() {
        if histogram.is_empty() {
            continue;
        }
        let counts = serde_json::to_value(histogram).unwrap_or(Value::Null);
        html.push_str(&format!(
            "<div class=\"drift-group\"><span>{}</span>{}</div>",
            escape(label),
            pretty_json(&counts)
        ));
    }
    html.push_str("</div>\n");
    html
}

fn session_header(meta: Option<&SessionMeta>, github_repo: Option<&str>) -> String {
    let Some(meta) = meta else {
        return String::new();
    };
    let mut facts = Vec::new();
    if let Some(ref id) = meta.id {
        facts.push(format!("<span>session {}</span>", escape(id)));
    }
    if let Some(ref cwd) = meta.cwd {
        facts.push(format!("<span>{}</span>", escape(cwd)));
    }
    if let Some(branch) = meta.branch() {
        facts.push(format!("<span>branch {}</span>", escape(branch)));
    }
    if let Some(repo) = github_repo {
        facts.push(format!(
            "<a href=\"https://github.com/{0}\">{0}</a>",
            escape(repo)
        ));
    }
    if let Some(ref version) = meta.cli_version {
        facts.push(format!("<span>codex {}</span>", escape(version)));
    }
    format!("<div class=\"session-meta\">{}</div>\n", facts.join(" · "))
}

fn group_label(group: &ConversationGroup, prompt_number: usize) -> String {
    match group.prompt {
        Some(_) => format!("#{}", prompt_number),
        None => "Start".to_string(),
    }
}

fn conversation_index(groups: &[ConversationGroup]) -> String {
    let mut html = String::from("<nav class=\"conversation-index\"><h2>Conversation</h2>");
    if let Some(summary) = task_time_summary(groups) {
        html.push_str(&format!("<div class=\"task-time\">{}</div>", escape(&summary)));
    }
    let mut prompt_number = 0;
    for group in groups {
        if group.prompt.is_some() {
            prompt_number += 1;
        }
        let prompt = group
            .prompt
            .as_deref()
            .map(|p| truncate_chars(p.replace('\n', " ").trim(), PROMPT_PREVIEW_MAX, "…"))
            .unwrap_or_else(|| "(session start)".to_string());
        let tools = format_tool_stats(&group.tool_counts);
        let commits = match group.commit_count() {
            0 => String::new(),
            1 => "<span class=\"index-commits\">1 commit</span>".to_string(),
            n => format!("<span class=\"index-commits\">{} commits</span>", n),
        };
        let long_text = group
            .long_text
            .as_deref()
            .map(|text| {
                format!(
                    "<details class=\"index-long-text\"><summary>Long reply</summary>{}</details>",
                    render_text(&truncate_chars(text, LONG_TEXT_SNIPPET_MAX, "\n\n…"))
                )
            })
            .unwrap_or_default();

        html.push_str(&format!(
            "<div class=\"index-item\"><a href=\"#{id}\"><span class=\"index-label\">{label}</span> <span class=\"index-prompt\">{prompt}</span></a><div class=\"index-stats\"><span>{messages} messages</span><span>{duration}</span>{tools}{commits}</div>{long_text}</div>",
            id = message_id(group.start),
            label = group_label(group, prompt_number),
            prompt = escape(&prompt),
            messages = group.message_count(),
            duration = format_duration_ms(group.duration_ms),
            tools = if tools.is_empty() {
                String::new()
            } else {
                format!("<span>{}</span>", escape(&tools))
            },
            commits = commits,
            long_text = long_text,
        ));
    }
    html.push_str("</nav>\n");
    html
}

fn viewer_meta(loglines: &[Logline], groups: &[ConversationGroup]) -> String {
    let kinds: String = loglines.iter().map(|l| ItemKind::of(l).code()).collect();
    let ids: Vec<String> = (0..loglines.len()).map(message_id).collect();
    let timestamps: Vec<&str> = loglines.iter().map(|l| l.timestamp.as_str()).collect();
    let spans: Vec<Value> = groups
        .iter()
        .map(|g| json!({"start": g.start, "end": g.end, "prompt": g.prompt}))
        .collect();
    let meta = json!({
        "format": VIEWER_FORMAT,
        "total": loglines.len(),
        "kinds": kinds,
        "ids": ids,
        "ts": timestamps,
        "groups": spans,
    });
    // Keep `</script>` inside strings from closing the island.
    meta.to_string().replace("</", "<\\/")
}

// ============================================================================
// Pages
// ============================================================================

/// Render one session as a standalone page.
pub fn render_transcript(export: &TranscriptExport, github_repo: Option<&str>) -> String {
    let loglines = export.loglines();
    let groups = group_conversation(loglines);

    let mut body = String::new();
    body.push_str(&session_header(export.meta.as_ref(), github_repo));
    body.push_str(&format!(
        "<div class=\"summary\">{} messages · {} groups</div>\n",
        loglines.len(),
        groups.len()
    ));
    body.push_str(&drift_banner(&export.stats));
    body.push_str(&conversation_index(&groups));
    body.push_str("<main class=\"transcript\">\n");
    for (i, logline) in loglines.iter().enumerate() {
        body.push_str(&render_message(i, logline, github_repo));
    }
    body.push_str("</main>\n");
    body.push_str(&format!(
        "<script type=\"application/json\" id=\"viewer-meta\">{}</script>\n",
        viewer_meta(loglines, &groups)
    ));

    page("Codex transcript", &body)
}

/// Render the index page of a batch export.
pub fn render_archive_index(index: &ArchiveIndex) -> String {
    let mut body = format!(
        "<div class=\"summary\">{} session(s)</div>\n<div class=\"archive-list\">\n",
        index.sessions.len()
    );
    for entry in &index.sessions {
        body.push_str(&format!(
            "<a class=\"archive-item\" href=\"{href}\"><span class=\"archive-updated\">{updated}</span><span class=\"archive-id\">{id}</span><span class=\"archive-preview\">{preview}</span></a>\n",
            href = escape(&entry.href),
            updated = escape(&entry.updated),
            id = escape(&entry.session_id),
            preview = escape(&truncate_chars(&entry.preview, PROMPT_PREVIEW_MAX, "…")),
        ));
    }
    body.push_str("</div>\n");
    page("Codex transcripts", &body)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n<title>{title}</title>\n<style>{css}</style>\n</head>\n<body>\n<div class=\"container\">\n<h1>{title}</h1>\n{body}</div>\n</body>\n</html>\n",
        title = escape(title),
        css = CSS,
        body = body
    )
}

const CSS: &str = r#"
:root {
  color-scheme: light dark;
  --bg: #f5f5f5; --card: #ffffff; --text: #212121; --muted: #757575;
  --user: #e3f2fd; --user-border: #1976d2;
  --assistant: #f5f5f5; --assistant-border: #9e9e9e;
  --thinking: #fff8e1; --thinking-border: #ffc107;
  --tool: #f3e5f5; --tool-border: #9c27b0;
  --result: #e8f5e9; --error: #ffebee;
  --system: #fff7ed; --system-border: #f97316;
  --code-bg: #263238; --code-text: #aed581;
}
@media (prefers-color-scheme: dark) {
  :root {
    --bg: #0b0f14; --card: #111827; --text: #e5e7eb; --muted: #a1a1aa;
    --user: #0b2a3d; --user-border: #38bdf8;
    --assistant: #0f172a; --assistant-border: #64748b;
    --thinking: #2a240f; --thinking-border: #fbbf24;
    --tool: #25152d; --tool-border: #c084fc;
    --result: #0f2418; --error: #2b1215;
    --system: #2b1a0f; --system-border: #fb923c;
    --code-bg: #0b1020; --code-text: #a7f3d0;
  }
}
* { box-sizing: border-box; }
body { background: var(--bg); color: var(--text); font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 0; line-height: 1.6; }
.container { max-width: 900px; margin: 0 auto; padding: 16px; }
h1 { font-size: 1.5rem; margin: 0 0 8px; }
a { color: inherit; }
pre { background: var(--code-bg); color: var(--code-text); padding: 10px; border-radius: 6px; overflow-x: auto; white-space: pre-wrap; word-break: break-word; font-size: 0.85rem; }
.session-meta, .summary, .task-time { color: var(--muted); font-size: 0.9rem; margin-bottom: 8px; }
.drift-warning { background: var(--system); border-left: 4px solid var(--system-border); padding: 12px; border-radius: 8px; margin: 12px 0; }
.drift-group span { font-weight: 600; }
.conversation-index { background: var(--card); border-radius: 8px; padding: 12px 16px; margin: 16px 0; }
.conversation-index h2 { font-size: 1.1rem; margin: 0 0 8px; }
.index-item { padding: 6px 0; border-bottom: 1px solid rgba(127,127,127,0.2); }
.index-item > a { text-decoration: none; }
.index-label { font-weight: 700; margin-right: 4px; }
.index-stats { color: var(--muted); font-size: 0.8rem; display: flex; gap: 12px; flex-wrap: wrap; }
.index-commits { color: var(--user-border); }
.message { background: var(--card); border-radius: 8px; margin: 12px 0; padding: 10px 14px; border-left: 4px solid var(--assistant-border); }
.message.user { background: var(--user); border-left-color: var(--user-border); }
.message.tool_call, .message.tool_reply { border-left-color: var(--tool-border); }
.message.system { background: var(--system); border-left-color: var(--system-border); }
.message-header { display: flex; justify-content: space-between; font-size: 0.8rem; color: var(--muted); }
.role-label { font-weight: 600; text-transform: uppercase; }
.timestamp-link { text-decoration: none; }
.thinking { background: var(--thinking); border-left: 3px solid var(--thinking-border); padding: 6px 10px; border-radius: 6px; font-style: italic; }
.thinking-label { font-size: 0.75rem; font-weight: 600; text-transform: uppercase; }
.tool-use { background: var(--tool); padding: 6px 10px; border-radius: 6px; margin: 6px 0; }
.tool-header { font-family: monospace; font-weight: 600; }
.tool-description { color: var(--muted); font-size: 0.85rem; }
.tool-result { background: var(--result); padding: 6px 10px; border-radius: 6px; margin: 6px 0; }
.tool-result.tool-error { background: var(--error); }
.commit-card { border-left: 3px solid var(--user-border); padding: 4px 8px; margin: 6px 0; font-size: 0.9rem; }
.commit-hash { font-family: monospace; font-weight: 600; }
.system-record summary { cursor: pointer; font-family: monospace; }
.image-block img { max-width: 100%; }
.archive-list { display: flex; flex-direction: column; gap: 8px; }
.archive-item { display: grid; grid-template-columns: 140px 1fr; gap: 4px 12px; background: var(--card); padding: 10px 14px; border-radius: 8px; text-decoration: none; }
.archive-updated, .archive-id { color: var(--muted); font-size: 0.85rem; }
.archive-preview { grid-column: 1 / -1; }
"#;
