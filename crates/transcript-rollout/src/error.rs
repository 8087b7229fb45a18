//! Error types for rollout parsing.

use std::path::PathBuf;
use thiserror::Error;

/// File-level failures. Per-record problems never surface here; they are
/// absorbed and counted in the parse stats.
#[derive(Debug, Error)]
pub enum RolloutError {
    /// The file could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON-array rollout could not be decoded
    #[error("Failed to parse {path:?} as JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Nothing in the file normalized to a non-empty logline
    #[error("no usable messages found in rollout file")]
    NoUsableMessages,
}

/// Result type for rollout operations.
pub type RolloutResult<T> = Result<T, RolloutError>;
