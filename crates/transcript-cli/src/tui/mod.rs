//! Terminal transcript viewer.
//!
//! Opens one session (a rollout or an exported transcript.json) and
//! browses its units grouped by prompt.

pub mod common;
pub mod viewer;

use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use transcript_rollout::discovery::SessionQuery;

use viewer::{ViewerAction, ViewerState};

use crate::commands::source::{latest_session, load_transcript};

/// Run the viewer on a single session file.
pub fn run_tui(path: &Path) -> Result<()> {
    let export = load_transcript(path)?;
    if export.loglines().is_empty() {
        println!("Session has no messages.");
        return Ok(());
    }
    let mut state = ViewerState::new(path.display().to_string(), export.loglines());

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Restore the terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_app_loop(&mut terminal, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

/// Open the most recently updated session under the Codex home.
pub fn run_latest(codex_home: Option<&Path>, query: &SessionQuery) -> Result<()> {
    let row = latest_session(codex_home, query)?;
    debug!(path = %row.path.display(), "opening latest session");
    run_tui(&row.path)
}

fn run_app_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut ViewerState,
) -> Result<()> {
    loop {
        state.tick();
        terminal.draw(|f| state.draw(f))?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                match state.handle_key(key) {
                    ViewerAction::Quit => break,
                    ViewerAction::None => {}
                }
            }
        }
    }

    Ok(())
}
