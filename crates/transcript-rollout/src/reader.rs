//! Rollout record reader.
//!
//! Two encodings are supported:
//! - newline-delimited JSON, one record per line (`rollout-*.jsonl`)
//! - a single JSON array of records (`*.json`)
//!
//! Malformed lines never abort a read; they are reported as
//! [`RawItem::Malformed`] so the caller can count them.

use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use crate::{RolloutError, RolloutResult};

/// One parsed JSON object from a rollout.
pub type RawRecord = Map<String, Value>;

/// An item of the record stream.
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    /// A JSON object
    Record(RawRecord),
    /// A line (or array element) that is not a JSON object
    Malformed { line: usize },
}

/// How a rollout file is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    JsonLines,
    JsonArray,
}

impl Encoding {
    /// `.json` files hold an array; everything else is read line by line.
    pub fn for_path(path: &Path) -> Self {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Encoding::JsonArray
        } else {
            Encoding::JsonLines
        }
    }
}

/// Iterator over the records of a newline-delimited JSON stream.
pub struct JsonLines<R> {
    lines: io::Lines<R>,
    line_num: usize,
}

impl<R: BufRead> JsonLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
        }
    }
}

impl<R: BufRead> Iterator for JsonLines<R> {
    type Item = io::Result<RawItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            self.line_num += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            return Some(Ok(match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(record)) => RawItem::Record(record),
                Ok(_) => {
                    debug!(line = self.line_num, "skipping non-object rollout line");
                    RawItem::Malformed {
                        line: self.line_num,
                    }
                }
                Err(e) => {
                    debug!(line = self.line_num, error = %e, "skipping malformed rollout line");
                    RawItem::Malformed {
                        line: self.line_num,
                    }
                }
            }));
        }
    }
}

/// Split newline-delimited JSON text into items.
pub fn parse_json_lines(text: &str) -> Vec<RawItem> {
    JsonLines::new(text.as_bytes())
        .filter_map(Result::ok)
        .collect()
}

/// Decode a JSON-array rollout.
///
/// A document that is an object with a `loglines` key is an already
/// normalized export and yields no raw records; so does any other non-array
/// document. Array elements that are not objects are reported as malformed.
pub fn parse_json_array(text: &str) -> serde_json::Result<Vec<RawItem>> {
    let items = match serde_json::from_str::<Value>(text)? {
        Value::Array(values) => values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| match value {
                Value::Object(record) => RawItem::Record(record),
                _ => RawItem::Malformed { line: idx + 1 },
            })
            .collect(),
        Value::Object(doc) if doc.contains_key("loglines") => {
            debug!("document is already normalized; no raw records");
            Vec::new()
        }
        _ => Vec::new(),
    };
    Ok(items)
}

/// Read a whole rollout into memory.
pub fn read_items(path: &Path) -> RolloutResult<Vec<RawItem>> {
    let io_err = |source| RolloutError::Io {
        path: path.to_path_buf(),
        source,
    };

    match Encoding::for_path(path) {
        Encoding::JsonArray => {
            let text = std::fs::read_to_string(path).map_err(io_err)?;
            parse_json_array(&text).map_err(|source| RolloutError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
        Encoding::JsonLines => {
            let file = File::open(path).map_err(io_err)?;
            JsonLines::new(BufReader::new(file))
                .collect::<io::Result<Vec<_>>>()
                .map_err(io_err)
        }
    }
}

/// Read at most `max_records` leading records of a newline-delimited rollout.
///
/// Used for cheap listing; malformed lines are skipped and any I/O error
/// yields whatever was read so far.
pub fn read_rollout_head(path: &Path, max_records: usize) -> Vec<RawRecord> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot open rollout head");
            return Vec::new();
        }
    };

    JsonLines::new(BufReader::new(file))
        .map_while(Result::ok)
        .filter_map(|item| match item {
            RawItem::Record(record) => Some(record),
            RawItem::Malformed { .. } => None,
        })
        .take(max_records)
        .collect()
}
