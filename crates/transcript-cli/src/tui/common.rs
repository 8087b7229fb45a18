//! Shared TUI helpers.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
};

use crate::units::UnitKind;

/// The first `max_chars` characters of `s`.
pub fn clip(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// `s` cut to `max_chars` characters, the last one replaced by `…` when
/// anything was dropped.
pub fn clip_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    match max_chars {
        0 => String::new(),
        n => format!("{}…", clip(s, n - 1)),
    }
}

/// Colour of a unit kind in lists and headers.
pub fn kind_style(kind: UnitKind) -> Style {
    match kind {
        UnitKind::User => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        UnitKind::Assistant => Style::default().fg(Color::Magenta),
        UnitKind::ToolCall => Style::default().fg(Color::Blue),
        UnitKind::ToolResult => Style::default().fg(Color::Cyan),
        UnitKind::Thinking => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::DIM),
        UnitKind::System => Style::default().fg(Color::Red),
    }
}

/// A popup of `percent_x` by `percent_y` in the middle of `area`.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let margin_y = (100 - percent_y) / 2;
    let margin_x = (100 - percent_x) / 2;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(margin_y),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(margin_y),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(margin_x),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(margin_x),
        ])
        .split(rows[1])[1]
}
