//! Viewer - Interactive transcript browser.
//!
//! Units are listed under the prompt that opened them. Kind toggles and a
//! text filter narrow the list; the right pane shows the selected unit.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use transcript_format::{parse_timestamp, Logline};

use super::common::{centered_rect, clip, clip_with_ellipsis, kind_style};
use crate::units::{build_message_units, group_units_by_prompt, MessageUnit, UnitKind};

/// Body lines shown per unit in the detail pane.
const MAX_DETAIL_LINES: usize = 2000;

/// Action returned by the viewer to the app loop.
pub enum ViewerAction {
    Quit,
    None,
}

#[derive(Debug, PartialEq)]
enum Mode {
    Normal,
    Search,
    Help,
}

/// A prompt and the units it opened, as positions into `units`.
struct GroupSpan {
    prompt: Option<usize>,
    members: Vec<usize>,
}

/// A list row: a group header or a unit.
#[derive(Debug, PartialEq)]
enum Row {
    Group(String),
    Unit(usize),
}

pub struct ViewerState {
    source: String,
    units: Vec<MessageUnit>,
    groups: Vec<GroupSpan>,
    kinds: BTreeSet<UnitKind>,
    query: String,
    mode: Mode,
    rows: Vec<Row>,
    /// Row positions of unit rows, in display order
    unit_rows: Vec<usize>,
    selected: usize,
    detail_scroll: u16,
    shown_groups: usize,
    status_message: Option<(String, Instant)>,
}

impl ViewerState {
    pub fn new(source: impl Into<String>, loglines: &[Logline]) -> Self {
        let units = build_message_units(loglines);
        let groups = group_units_by_prompt(&units)
            .into_iter()
            .map(|g| GroupSpan {
                prompt: g.prompt.map(|u| u.index),
                members: g.units.iter().map(|u| u.index).collect(),
            })
            .collect();

        let mut state = ViewerState {
            source: source.into(),
            units,
            groups,
            kinds: UnitKind::default_set(),
            query: String::new(),
            mode: Mode::Normal,
            rows: Vec::new(),
            unit_rows: Vec::new(),
            selected: 0,
            detail_scroll: 0,
            shown_groups: 0,
            status_message: None,
        };
        state.refresh();
        state
    }

    fn selected_unit(&self) -> Option<&MessageUnit> {
        let row = self.unit_rows.get(self.selected)?;
        match self.rows.get(*row)? {
            Row::Unit(i) => self.units.get(*i),
            Row::Group(_) => None,
        }
    }

    /// Rebuild rows after a filter change, keeping the selection when it
    /// is still visible.
    fn refresh(&mut self) {
        let previous = self.selected_unit().map(|u| u.index);

        self.rows.clear();
        self.unit_rows.clear();
        self.shown_groups = 0;

        for (n, group) in self.groups.iter().enumerate() {
            let visible: Vec<usize> = group
                .members
                .iter()
                .copied()
                .filter(|&i| {
                    let unit = &self.units[i];
                    self.kinds.contains(&unit.kind) && unit.matches(&self.query)
                })
                .collect();
            let Some(&first) = visible.first() else {
                continue;
            };

            self.shown_groups += 1;
            let label = match group.prompt {
                Some(p) => format!(
                    "{:04}  {}  prompt  {}",
                    n + 1,
                    short_time(&self.units[p].timestamp),
                    self.units[p].title
                ),
                None => format!(
                    "{:04}  {}  (no prompt yet)",
                    n + 1,
                    short_time(&self.units[first].timestamp)
                ),
            };
            self.rows.push(Row::Group(label));
            for i in visible {
                self.unit_rows.push(self.rows.len());
                self.rows.push(Row::Unit(i));
            }
        }

        self.selected = previous
            .and_then(|index| {
                self.unit_rows
                    .iter()
                    .position(|&row| self.rows[row] == Row::Unit(index))
            })
            .unwrap_or(0)
            .min(self.unit_rows.len().saturating_sub(1));
        self.detail_scroll = 0;
    }

    fn toggle_kind(&mut self, kind: UnitKind) {
        if !self.kinds.remove(&kind) {
            self.kinds.insert(kind);
        }
        let state = if self.kinds.contains(&kind) {
            "shown"
        } else {
            "hidden"
        };
        self.set_status(format!("{} {}", kind.label(), state));
        self.refresh();
    }

    fn move_down(&mut self) {
        if self.selected + 1 < self.unit_rows.len() {
            self.selected += 1;
            self.detail_scroll = 0;
        }
    }

    fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.detail_scroll = 0;
        }
    }

    pub fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Called before rendering to expire the status message.
    pub fn tick(&mut self) {
        if let Some((_, ref t)) = self.status_message {
            if t.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
            }
        }
    }

    /// Handle a key event and return an action.
    pub fn handle_key(&mut self, key: KeyEvent) -> ViewerAction {
        if key.kind != KeyEventKind::Press {
            return ViewerAction::None;
        }

        match self.mode {
            Mode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return ViewerAction::Quit,
                KeyCode::Char('j') | KeyCode::Down => self.move_down(),
                KeyCode::Char('k') | KeyCode::Up => self.move_up(),
                KeyCode::Char('g') | KeyCode::Home => {
                    self.selected = 0;
                    self.detail_scroll = 0;
                }
                KeyCode::Char('G') | KeyCode::End => {
                    self.selected = self.unit_rows.len().saturating_sub(1);
                    self.detail_scroll = 0;
                }
                KeyCode::PageDown | KeyCode::Char('l') => {
                    self.detail_scroll = self.detail_scroll.saturating_add(10);
                }
                KeyCode::PageUp | KeyCode::Char('h') => {
                    self.detail_scroll = self.detail_scroll.saturating_sub(10);
                }
                KeyCode::Char('/') => self.mode = Mode::Search,
                KeyCode::Char('?') => self.mode = Mode::Help,
                KeyCode::Char(c @ '1'..='6') => {
                    let slot = c as usize - '1' as usize;
                    self.toggle_kind(UnitKind::ALL[slot]);
                }
                _ => {}
            },
            Mode::Search => match key.code {
                KeyCode::Esc => {
                    self.mode = Mode::Normal;
                    self.query.clear();
                    self.refresh();
                }
                KeyCode::Enter => self.mode = Mode::Normal,
                KeyCode::Backspace => {
                    self.query.pop();
                    self.refresh();
                }
                KeyCode::Char(c) => {
                    self.query.push(c);
                    self.refresh();
                }
                _ => {}
            },
            Mode::Help => self.mode = Mode::Normal,
        }

        ViewerAction::None
    }

    /// Render the viewer.
    pub fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(f.area());

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[1]);

        self.draw_filter_bar(f, chunks[0]);
        self.draw_unit_list(f, main_chunks[0]);
        self.draw_detail(f, main_chunks[1]);
        self.draw_status_bar(f, chunks[2]);

        if self.mode == Mode::Help {
            self.draw_help(f);
        }
    }

    fn draw_filter_bar(&self, f: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for (slot, kind) in UnitKind::ALL.iter().enumerate() {
            let on = self.kinds.contains(kind);
            let style = if on {
                kind_style(*kind)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            spans.push(Span::styled(
                format!("[{}] {} {}", if on { "x" } else { " " }, slot + 1, kind.label()),
                style,
            ));
            spans.push(Span::raw("  "));
        }
        if !self.query.is_empty() {
            spans.push(Span::styled(
                format!("/{}", self.query),
                Style::default().fg(Color::Yellow),
            ));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_unit_list(&self, f: &mut Frame, area: Rect) {
        let title = format!(
            " Transcript ({}/{} shown; {}/{} prompts) ",
            self.unit_rows.len(),
            self.units.len(),
            self.shown_groups,
            self.groups.len()
        );
        let block = Block::default().borders(Borders::ALL).title(title);

        if self.rows.is_empty() {
            let msg = if self.units.is_empty() {
                "Session has no messages."
            } else {
                "No matching messages."
            };
            let paragraph = Paragraph::new(msg)
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(paragraph, area);
            return;
        }

        let width = area.width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = self
            .rows
            .iter()
            .map(|row| match row {
                Row::Group(label) => ListItem::new(Line::from(Span::styled(
                    clip_with_ellipsis(label, width),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))),
                Row::Unit(i) => {
                    let unit = &self.units[*i];
                    let prefix = format!("  {}  ", short_time(&unit.timestamp));
                    let kind = format!("{:<11} ", unit.kind.as_str());
                    let room = width.saturating_sub(prefix.len() + kind.len());
                    ListItem::new(Line::from(vec![
                        Span::styled(prefix, Style::default().fg(Color::DarkGray)),
                        Span::styled(kind, kind_style(unit.kind)),
                        Span::raw(clip_with_ellipsis(&unit.title, room)),
                    ]))
                }
            })
            .collect();

        let mut list_state =
            ListState::default().with_selected(self.unit_rows.get(self.selected).copied());
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray));
        f.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_detail(&self, f: &mut Frame, area: Rect) {
        let Some(unit) = self.selected_unit() else {
            let paragraph = Paragraph::new("No message selected")
                .block(Block::default().borders(Borders::ALL).title(" Message "))
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(paragraph, area);
            return;
        };

        let title = format!(" {}  {} ", unit.kind.as_str(), unit.timestamp);
        let block = Block::default().borders(Borders::ALL).title(title);

        let mut lines: Vec<Line> = vec![
            Line::from(Span::styled(
                unit.title.clone(),
                kind_style(unit.kind).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        for line in unit.lines.iter().take(MAX_DETAIL_LINES) {
            for sub in line.lines() {
                lines.push(Line::from(sub.to_string()));
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.detail_scroll, 0));
        f.render_widget(paragraph, area);
    }

    fn draw_status_bar(&self, f: &mut Frame, area: Rect) {
        let (text, style) = if let Some((ref msg, _)) = self.status_message {
            (msg.clone(), Style::default().fg(Color::Green))
        } else if self.mode == Mode::Search {
            (
                format!("Search: {}_ | Esc: cancel  Enter: confirm", self.query),
                Style::default().fg(Color::Yellow),
            )
        } else {
            (
                format!(
                    "{}  |  j/k: navigate  1-6: kinds  /: search  ?: help  q: quit",
                    self.source
                ),
                Style::default().fg(Color::DarkGray),
            )
        };
        let text = clip(&text, area.width as usize).to_string();
        f.render_widget(Paragraph::new(text).style(style), area);
    }

    fn draw_help(&self, f: &mut Frame) {
        let area = centered_rect(60, 50, f.area());
        let lines = vec![
            Line::from(Span::styled(
                "Keys",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("  j/k, Up/Down   move between messages"),
            Line::from("  g/G            first / last message"),
            Line::from("  h/l, PgUp/PgDn scroll the message pane"),
            Line::from("  1-6            toggle user, assistant, tool calls,"),
            Line::from("                 tool results, thinking, system"),
            Line::from("  /              filter by text"),
            Line::from("  q, Esc         quit"),
        ];
        let popup = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Help "));
        f.render_widget(Clear, area);
        f.render_widget(popup, area);
    }
}

/// `HH:MM:SS` for RFC 3339 timestamps, the raw value otherwise.
fn short_time(timestamp: &str) -> String {
    match parse_timestamp(timestamp) {
        Some(ts) => ts.format("%H:%M:%S").to_string(),
        None => clip(timestamp, 19).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;
    use transcript_format::{ContentBlock, LogType};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn loglines() -> Vec<Logline> {
        vec![
            Logline::system_record("2025-01-01T00:00:00Z", "rollout:x", json!({})),
            Logline::plain(LogType::User, "2025-01-01T00:00:01Z", "List files"),
            Logline::blocks(
                LogType::Assistant,
                "2025-01-01T00:00:02Z",
                vec![ContentBlock::thinking("hmm")],
            ),
            Logline::blocks(
                LogType::Assistant,
                "2025-01-01T00:00:03Z",
                vec![ContentBlock::tool_use("shell", json!({"command": "ls"}), "c")],
            ),
            Logline::blocks(
                LogType::Assistant,
                "2025-01-01T00:00:04Z",
                vec![ContentBlock::text("Here they are")],
            ),
        ]
    }

    fn shown_indices(state: &ViewerState) -> Vec<usize> {
        state
            .rows
            .iter()
            .filter_map(|r| match r {
                Row::Unit(i) => Some(*i),
                Row::Group(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_thinking_hidden_by_default() {
        let state = ViewerState::new("s.jsonl", &loglines());
        assert_eq!(shown_indices(&state), vec![0, 1, 3, 4]);
        assert_eq!(state.shown_groups, 2);
        assert_eq!(
            state.rows[2],
            Row::Group("0002  00:00:01  prompt  List files".to_string())
        );
    }

    #[test]
    fn test_toggle_kinds() {
        let mut state = ViewerState::new("s.jsonl", &loglines());
        state.handle_key(key(KeyCode::Char('5')));
        assert_eq!(shown_indices(&state), vec![0, 1, 2, 3, 4]);
        state.handle_key(key(KeyCode::Char('6')));
        assert_eq!(shown_indices(&state), vec![1, 2, 3, 4]);
        assert_eq!(state.shown_groups, 1);
    }

    #[test]
    fn test_search_keeps_selection() {
        let mut state = ViewerState::new("s.jsonl", &loglines());
        state.handle_key(key(KeyCode::Char('j')));
        state.handle_key(key(KeyCode::Char('j')));
        assert_eq!(state.selected_unit().map(|u| u.index), Some(3));

        state.handle_key(key(KeyCode::Char('/')));
        for c in "ls".chars() {
            state.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(shown_indices(&state), vec![3]);
        assert_eq!(state.selected_unit().map(|u| u.index), Some(3));

        state.handle_key(key(KeyCode::Esc));
        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(shown_indices(&state), vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_quit() {
        let mut state = ViewerState::new("s.jsonl", &loglines());
        assert!(matches!(state.handle_key(key(KeyCode::Char('q'))), ViewerAction::Quit));
    }

    #[test]
    fn test_draw_renders_list_and_detail() {
        let state = ViewerState::new("s.jsonl", &loglines());
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| state.draw(f)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Transcript (4/5 shown; 2/2 prompts)"));
        assert!(text.contains("system_record: rollout:x"));
    }

    #[test]
    fn test_short_time() {
        assert_eq!(short_time("2025-01-01T10:20:30.123Z"), "10:20:30");
        assert_eq!(short_time("T"), "T");
    }
}
