//! Parse statistics and format-drift histograms.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters collected over one parse call.
///
/// The three histograms count records that were rendered as system cards
/// because their dialect or kind is not recognized ("format drift").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct ParseStats {
    /// Non-blank input lines (or array items) seen
    pub total_lines: usize,
    /// Records with a string `timestamp` and `type`
    pub parsed_rollout_lines: usize,
    /// Malformed lines and records missing required fields
    pub skipped_lines: usize,
    /// Loglines in the final, deduplicated sequence
    pub emitted_loglines: usize,
    /// Unrecognized top-level record types
    pub system_rollout_types: BTreeMap<String, usize>,
    /// Unrecognized `event_msg` kinds
    pub system_event_types: BTreeMap<String, usize>,
    /// Unrecognized `response_item` kinds
    pub system_response_item_types: BTreeMap<String, usize>,
}

impl ParseStats {
    pub fn bump_rollout_type(&mut self, kind: &str) {
        bump(&mut self.system_rollout_types, kind);
    }

    pub fn bump_event_type(&mut self, kind: &str) {
        bump(&mut self.system_event_types, kind);
    }

    pub fn bump_response_item_type(&mut self, kind: &str) {
        bump(&mut self.system_response_item_types, kind);
    }

    /// Total number of records rendered as unrecognized system cards.
    pub fn system_total(&self) -> usize {
        self.histograms()
            .iter()
            .map(|(_, h)| h.values().sum::<usize>())
            .sum()
    }

    /// Returns true if any unrecognized dialect or kind was seen.
    pub fn has_drift(&self) -> bool {
        self.histograms().iter().any(|(_, h)| !h.is_empty())
    }

    /// The drift histograms with their dialect labels.
    pub fn histograms(&self) -> [(&'static str, &BTreeMap<String, usize>); 3] {
        [
            ("rollout", &self.system_rollout_types),
            ("event_msg", &self.system_event_types),
            ("response_item", &self.system_response_item_types),
        ]
    }
}

fn bump(counter: &mut BTreeMap<String, usize>, kind: &str) {
    *counter.entry(kind.to_string()).or_insert(0) += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_and_totals() {
        let mut stats = ParseStats::default();
        assert!(!stats.has_drift());

        stats.bump_event_type("mystery_event");
        stats.bump_event_type("mystery_event");
        stats.bump_rollout_type("totally_new_type");

        assert!(stats.has_drift());
        assert_eq!(stats.system_event_types.get("mystery_event"), Some(&2));
        assert_eq!(stats.system_total(), 3);
    }

    #[test]
    fn test_serializes_all_fields() {
        let stats = ParseStats::default();
        let value = serde_json::to_value(&stats).unwrap();
        for key in [
            "total_lines",
            "parsed_rollout_lines",
            "skipped_lines",
            "emitted_loglines",
            "system_rollout_types",
            "system_event_types",
            "system_response_item_types",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
