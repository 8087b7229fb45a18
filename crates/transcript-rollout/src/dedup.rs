//! Mirror deduplication.
//!
//! Some originators write every turn twice: once as an `event_msg`
//! (`user_message` / `agent_message`) and once as a `response_item`
//! `message`. The decision of which mirror to keep is made once per
//! session, after the single pass, from provenance tags alone.

use transcript_format::Logline;

use crate::normalize::Normalized;

/// How to resolve `event_msg` / `response_item` message mirrors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MirrorPolicy {
    /// Drop every `response_item` message logline whenever the session
    /// contained at least one `user_message` or `agent_message` event.
    #[default]
    PreferEventMessages,
    /// Keep both mirrors.
    KeepAll,
}

impl MirrorPolicy {
    /// Resolve mirrors and strip provenance tags.
    pub fn apply(self, items: Vec<Normalized>, saw_event_messages: bool) -> Vec<Logline> {
        match self {
            MirrorPolicy::PreferEventMessages => dedup_mirrors(items, saw_event_messages),
            MirrorPolicy::KeepAll => items.into_iter().map(|item| item.logline).collect(),
        }
    }
}

/// Keep event-message mirrors over response-item mirrors.
///
/// When `saw_event_messages` is false the response-item messages are the
/// only source of turn text and everything is kept.
pub fn dedup_mirrors(items: Vec<Normalized>, saw_event_messages: bool) -> Vec<Logline> {
    items
        .into_iter()
        .filter(|item| !(saw_event_messages && item.provenance.is_response_message()))
        .map(|item| item.logline)
        .collect()
}
