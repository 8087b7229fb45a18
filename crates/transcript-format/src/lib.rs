//! # transcript-format
//!
//! Canonical, renderer-agnostic types for rollout transcripts.
//!
//! This crate provides:
//! - The `Logline` / `ContentBlock` model every renderer consumes
//! - `SessionMeta` and `ParseStats` produced alongside the loglines
//! - Conversation grouping and per-turn summaries
//! - Reading, writing and validating `transcript.json` exports
//!
//! ## Example
//!
//! ```rust,no_run
//! use transcript_format::{group_conversation, TranscriptExport};
//!
//! let export = TranscriptExport::from_path("transcript.json")?;
//! for group in group_conversation(export.loglines()) {
//!     println!("{}: {} messages", group.prompt.as_deref().unwrap_or("(session start)"), group.message_count());
//! }
//! # Ok::<(), transcript_format::TranscriptError>(())
//! ```

mod entry;
mod error;
mod file;
mod grouping;
mod meta;
mod stats;
mod timestamp;
mod validation;

pub use entry::*;
pub use error::*;
pub use file::*;
pub use grouping::*;
pub use meta::*;
pub use stats::*;
pub use timestamp::*;
pub use validation::*;

/// Format tag of a single-session export
pub const SESSION_FORMAT: &str = "codex-transcripts.session.v1";

/// Format tag of a batch export index
pub const INDEX_FORMAT: &str = "codex-transcripts.index.v1";

/// Format tag of the HTML viewer's embedded metadata
pub const VIEWER_FORMAT: &str = "codex-transcripts.viewer.v2";
