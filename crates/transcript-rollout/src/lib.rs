//! # transcript-rollout
//!
//! Reader and normalizer for Codex CLI rollout logs.
//!
//! A rollout is a stream of JSON records in several dialects (`event_msg`,
//! `response_item`, `session_meta`, ...). This crate maps it onto one
//! canonical sequence of [`Logline`](transcript_format::Logline)s:
//!
//! 1. [`reader`] splits the file into raw records, counting malformed lines
//! 2. [`normalize`] classifies each record and builds at most one logline
//! 3. [`dedup`] resolves `event_msg` / `response_item` message mirrors
//! 4. the resulting [`ParseStats`] report every shape that was not recognized
//!
//! [`discovery`] finds rollouts under `CODEX_HOME`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use transcript_rollout::parse_rollout_file;
//!
//! let parsed = parse_rollout_file("rollout.jsonl".as_ref())?;
//! println!(
//!     "{} loglines, {} unrecognized",
//!     parsed.stats.emitted_loglines,
//!     parsed.stats.system_total()
//! );
//! # Ok::<(), transcript_rollout::RolloutError>(())
//! ```

pub mod dedup;
pub mod discovery;
mod error;
pub mod meta;
pub mod normalize;
pub mod reader;

pub use dedup::MirrorPolicy;
pub use error::*;
pub use meta::{extract_session_meta, session_meta_from_payload};
pub use normalize::{decode_or_wrap, extract_text, Normalizer};
pub use reader::{RawItem, RawRecord};

use std::path::Path;
use transcript_format::{ParseStats, SessionData, SessionMeta};

/// Result of parsing one rollout.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRollout {
    pub session: SessionData,
    pub meta: Option<SessionMeta>,
    pub stats: ParseStats,
}

/// Parse a rollout file with the default mirror policy.
pub fn parse_rollout_file(path: &Path) -> RolloutResult<ParsedRollout> {
    parse_rollout_file_with(path, MirrorPolicy::default())
}

/// Parse a rollout file.
pub fn parse_rollout_file_with(path: &Path, policy: MirrorPolicy) -> RolloutResult<ParsedRollout> {
    let items = reader::read_items(path)?;
    parse_items(&items, policy)
}

/// Normalize an in-memory record stream.
pub fn parse_items(items: &[RawItem], policy: MirrorPolicy) -> RolloutResult<ParsedRollout> {
    let mut normalizer = Normalizer::with_policy(policy);
    for item in items {
        normalizer.push(item);
    }
    normalizer.finish()
}

/// Normalize newline-delimited rollout text.
pub fn parse_rollout_str(text: &str) -> RolloutResult<ParsedRollout> {
    parse_items(&reader::parse_json_lines(text), MirrorPolicy::default())
}
