//! Error types for transcript export operations.

use thiserror::Error;

/// Errors that can occur when reading or writing transcript exports.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// The document is JSON but not a transcript export
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<serde_json::Error> for TranscriptError {
    fn from(source: serde_json::Error) -> Self {
        TranscriptError::Json {
            message: source.to_string(),
            source,
        }
    }
}

/// Invariant violations found in a transcript export.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A logline with nothing to render
    #[error("Logline {index} has empty content")]
    EmptyContent { index: usize },

    /// `message.role` disagrees with the logline type
    #[error("Logline {index} has type {kind} but role {role}")]
    RoleMismatch {
        index: usize,
        kind: String,
        role: String,
    },

    /// Recorded stats disagree with the logline count
    #[error("Stats report {recorded} emitted loglines but the session has {actual}")]
    EmittedCountMismatch { recorded: usize, actual: usize },

    /// A session without any loglines
    #[error("Session has no loglines")]
    NoLoglines,
}

/// Result type for transcript operations.
pub type TranscriptResult<T> = Result<T, TranscriptError>;
