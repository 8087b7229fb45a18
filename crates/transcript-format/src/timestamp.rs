//! Best-effort timestamp handling. Timestamps in loglines are kept verbatim;
//! parsing only happens for derived values like durations.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an RFC 3339 timestamp. `Z` and numeric offsets are accepted, as are
/// zone-less timestamps (read as UTC). Returns `None` on anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    NAIVE_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(raw, fmt)
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    })
}

/// Milliseconds from `start` to `end`, or `None` if either fails to parse.
pub fn elapsed_ms(start: &str, end: &str) -> Option<i64> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;
    Some((end - start).num_milliseconds())
}

/// Format a duration as `42s`, `3m 05s` or `1h 02m`; unknown or negative
/// durations render as `-`.
pub fn format_duration_ms(ms: Option<i64>) -> String {
    let Some(ms) = ms.filter(|ms| *ms >= 0) else {
        return "-".to_string();
    };
    let secs = ms / 1000;
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m {:02}s", mins, secs % 60);
    }
    format!("{}h {:02}m", mins / 60, mins % 60)
}
