//! Reading and writing transcript exports (`transcript.json`) and archive
//! indexes.

use crate::{Logline, ParseStats, SessionMeta, TranscriptError, TranscriptResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// The normalized session body: `{"loglines": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SessionData {
    pub loglines: Vec<Logline>,
}

/// A normalized session export, as written to `transcript.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TranscriptExport {
    /// Always [`crate::SESSION_FORMAT`]
    pub format: String,
    /// Path of the rollout the export was built from
    pub source_path: String,
    pub meta: Option<SessionMeta>,
    pub stats: ParseStats,
    pub session: SessionData,
}

impl TranscriptExport {
    pub fn new(
        source_path: impl Into<String>,
        session: SessionData,
        meta: Option<SessionMeta>,
        stats: ParseStats,
    ) -> Self {
        Self {
            format: crate::SESSION_FORMAT.to_string(),
            source_path: source_path.into(),
            meta,
            stats,
            session,
        }
    }

    /// Read an export from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> TranscriptResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read an export from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> TranscriptResult<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let export: TranscriptExport = serde_json::from_str(&text)?;
        if export.format != crate::SESSION_FORMAT {
            return Err(TranscriptError::UnsupportedFormat(export.format));
        }
        Ok(export)
    }

    /// Write the export to a path as pretty-printed JSON.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> TranscriptResult<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    /// Write the export to a writer as pretty-printed JSON.
    pub fn write_to<W: Write>(&self, mut writer: W) -> TranscriptResult<()> {
        write_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn loglines(&self) -> &[Logline] {
        &self.session.loglines
    }
}

/// One session in a batch export index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ArchiveEntry {
    pub session_id: String,
    /// Human label, e.g. `3 hours ago`
    pub updated: String,
    /// Unix seconds of the last update, 0 if unknown
    pub updated_ts: i64,
    pub preview: String,
    /// Path of the session's output relative to the index
    pub href: String,
}

/// Index written next to a batch export (`index.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ArchiveIndex {
    /// Always [`crate::INDEX_FORMAT`]
    pub format: String,
    pub sessions: Vec<ArchiveEntry>,
}

impl ArchiveIndex {
    /// Build an index with the newest sessions first.
    pub fn new(mut sessions: Vec<ArchiveEntry>) -> Self {
        sessions.sort_by(|a, b| b.updated_ts.cmp(&a.updated_ts));
        Self {
            format: crate::INDEX_FORMAT.to_string(),
            sessions,
        }
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> TranscriptResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Write `value` as pretty JSON followed by a newline.
pub fn write_pretty<W: Write, T: Serialize>(writer: &mut W, value: &T) -> TranscriptResult<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogType;
    use pretty_assertions::assert_eq;

    fn sample_export() -> TranscriptExport {
        let session = SessionData {
            loglines: vec![Logline::plain(LogType::User, "2025-01-01T00:00:00Z", "Hello")],
        };
        let stats = ParseStats {
            total_lines: 1,
            parsed_rollout_lines: 1,
            emitted_loglines: 1,
            ..ParseStats::default()
        };
        TranscriptExport::new("/tmp/rollout.jsonl", session, None, stats)
    }

    #[test]
    fn test_write_then_read() {
        let export = sample_export();
        let mut buf = Vec::new();
        export.write_to(&mut buf).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.contains("\"format\": \"codex-transcripts.session.v1\""));
        assert!(text.ends_with('\n'));

        let parsed = TranscriptExport::from_reader(std::io::Cursor::new(buf)).unwrap();
        assert_eq!(parsed, export);
    }

    #[test]
    fn test_rejects_other_formats() {
        let mut export = sample_export();
        export.format = "something.else".to_string();
        let json = serde_json::to_string(&export).unwrap();
        let result = TranscriptExport::from_reader(std::io::Cursor::new(json));
        assert!(matches!(result, Err(TranscriptError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_archive_index_sorted_newest_first() {
        let entry = |id: &str, ts: i64| ArchiveEntry {
            session_id: id.to_string(),
            updated: "-".to_string(),
            updated_ts: ts,
            preview: String::new(),
            href: format!("{id}/index.html"),
        };
        let index = ArchiveIndex::new(vec![entry("old", 1), entry("new", 5)]);
        assert_eq!(index.format, crate::INDEX_FORMAT);
        assert_eq!(index.sessions[0].session_id, "new");
    }
}
