//! Shared helpers for loading sessions and discovering recent rollouts.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;
use transcript_format::{TranscriptExport, SESSION_FORMAT};
use transcript_rollout::discovery::{self, SessionQuery, SessionRow};
use transcript_rollout::{parse_rollout_file_with, MirrorPolicy};

/// Load a rollout or a previously written `transcript.json`.
pub fn load_transcript(path: &Path) -> Result<TranscriptExport> {
    load_transcript_with(path, MirrorPolicy::default())
}

pub fn load_transcript_with(path: &Path, policy: MirrorPolicy) -> Result<TranscriptExport> {
    if path.extension().map(|e| e == "json").unwrap_or(false) {
        match TranscriptExport::from_path(path) {
            Ok(export) if export.format == SESSION_FORMAT => return Ok(export),
            Ok(export) => debug!(format = %export.format, "not a session export, parsing as rollout"),
            Err(e) => debug!(error = %e, "not a session export, parsing as rollout"),
        }
    }

    let parsed = parse_rollout_file_with(path, policy)
        .with_context(|| format!("Failed to parse rollout: {:?}", path))?;
    Ok(TranscriptExport::new(
        path.display().to_string(),
        parsed.session,
        parsed.meta,
        parsed.stats,
    ))
}

/// Discover sessions under the Codex home, newest first.
pub fn find_sessions(codex_home: Option<&Path>, query: &SessionQuery) -> Result<Vec<SessionRow>> {
    let home = discovery::codex_home(codex_home)?;
    debug!(home = %home.display(), "discovering sessions");
    discovery::list_session_rows(&home, query)
        .with_context(|| format!("Failed to discover sessions under {:?}", home))
}

/// The most recent session matching `query`.
pub fn latest_session(codex_home: Option<&Path>, query: &SessionQuery) -> Result<SessionRow> {
    find_sessions(codex_home, query)?
        .into_iter()
        .next()
        .context("No Codex sessions found under ~/.codex/sessions (or CODEX_HOME)")
}
