//! Message classification for rendering.
//!
//! Chat transcripts are rendered with three per-message decorations: a date
//! divider above the first message of a calendar day, a timestamp under the
//! last message of a cluster, and an avatar beside the first message of a
//! counterpart cluster. A cluster is a maximal run of consecutive non-system
//! messages from one sender within one local minute; a system message
//! interposed in such a run breaks it.
//!
//! [`classify`] is a pure function over the full ordered transcript plus the
//! viewer id. It never reorders: display order is arrival order.
//!
//! # Edge cases
//!
//! - Two absent timestamps compare equal for the date divider, so records
//!   without a creation time do not rain dividers over old imports.
//! - An absent timestamp never matches any minute, not even another absent
//!   one, so such a message neither clusters nor shows a timestamp.

use chrono::{Datelike, NaiveDateTime, Timelike};
use parley_proto::{ChatMessage, UserId};

/// Rendering decisions for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderDirective {
    /// Workflow-event card rather than a chat bubble.
    pub system: bool,
    /// Sent by the viewer; rendered on the own-message side.
    pub mine: bool,
    /// Render a calendar-day divider above this message.
    pub show_date_divider: bool,
    /// Render the send time under this message.
    pub show_timestamp: bool,
    /// Render the counterpart avatar beside this message.
    pub show_avatar: bool,
}

/// Classify a transcript for rendering.
///
/// `viewer_id` decides which messages are "mine"; pass `None` while identity
/// is still unresolved and every message renders as the counterpart's.
pub fn classify(messages: &[ChatMessage], viewer_id: Option<UserId>) -> Vec<RenderDirective> {
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let previous = index.checked_sub(1).and_then(|p| messages.get(p));
            let next = messages.get(index + 1);

            let system = message.is_system();
            let mine = viewer_id.is_some() && message.sender_id == viewer_id;

            let show_date_divider =
                previous.is_none_or(|prev| day_key(prev) != day_key(message));
            let starts_cluster = previous.is_none_or(|prev| !same_cluster(prev, message));
            let ends_cluster = next.is_none_or(|nxt| !same_cluster(message, nxt));

            RenderDirective {
                system,
                mine,
                show_date_divider,
                show_timestamp: !system && message.created_at.is_some() && ends_cluster,
                show_avatar: !system && !mine && starts_cluster,
            }
        })
        .collect()
}

/// Local calendar day, `None` when the record has no timestamp.
fn day_key(message: &ChatMessage) -> Option<(i32, u32, u32)> {
    message.created_at.map(|ts| (ts.year(), ts.month(), ts.day()))
}

/// Local minute truncation.
fn minute_key(ts: NaiveDateTime) -> (i32, u32, u32, u32, u32) {
    (ts.year(), ts.month(), ts.day(), ts.hour(), ts.minute())
}

/// Two adjacent messages belong to one cluster.
///
/// Requires both non-system, one sender, and one local minute; an absent
/// timestamp matches nothing.
fn same_cluster(earlier: &ChatMessage, later: &ChatMessage) -> bool {
    if earlier.is_system() || later.is_system() {
        return false;
    }
    if earlier.sender_id != later.sender_id {
        return false;
    }
    match (earlier.created_at, later.created_at) {
        (Some(a), Some(b)) => minute_key(a) == minute_key(b),
        _ => false,
    }
}
