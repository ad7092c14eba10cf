//! Property-based tests for the transcript classifier.
//!
//! Tests verify the rendering laws against an independent restatement of
//! each rule, for arbitrary transcripts drawn from a small pool of senders,
//! days, and minutes so clusters and day changes actually occur.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use parley_app::classify;
use parley_proto::{ChatMessage, MessageKind, UserId};
use proptest::prelude::*;

fn kind_strategy() -> impl Strategy<Value = MessageKind> {
    prop_oneof![
        6 => Just(MessageKind::Plain),
        1 => Just(MessageKind::ProposalOffer),
        1 => Just(MessageKind::ProposalAccepted),
        1 => Just(MessageKind::ProposalRejected),
        1 => Just(MessageKind::ReviewNotice),
    ]
}

fn sender_strategy() -> impl Strategy<Value = Option<UserId>> {
    prop_oneof![
        1 => Just(None),
        6 => (1u64..4).prop_map(Some),
    ]
}

/// Timestamps from a 3-day, 2-hour, 4-minute pool, or absent.
fn timestamp_strategy() -> impl Strategy<Value = Option<NaiveDateTime>> {
    let concrete = (10u32..13, 0u32..2, 0u32..4, 0u32..60).prop_map(|(day, hour, minute, second)| {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .unwrap()
    });

    prop_oneof![
        1 => Just(None),
        5 => concrete.prop_map(Some),
    ]
}

fn message_strategy() -> impl Strategy<Value = ChatMessage> {
    (kind_strategy(), sender_strategy(), timestamp_strategy()).prop_map(
        |(kind, sender_id, created_at)| ChatMessage {
            id: "m".to_string(),
            kind,
            sender_id,
            receiver_id: None,
            content: Some("body".to_string()),
            created_at,
            proposal_id: None,
            can_review: None,
            proposal_status: None,
        },
    )
}

fn transcript_strategy() -> impl Strategy<Value = Vec<ChatMessage>> {
    prop::collection::vec(message_strategy(), 0..30)
}

fn viewer_strategy() -> impl Strategy<Value = Option<UserId>> {
    prop_oneof![
        1 => Just(None),
        3 => (1u64..4).prop_map(Some),
    ]
}

/// Local calendar day, absent when the timestamp is absent.
fn day_key(message: &ChatMessage) -> Option<(i32, u32, u32)> {
    message.created_at.map(|at| (at.year(), at.month(), at.day()))
}

/// Independent restatement of the clustering rule: consecutive messages
/// belong together when both are chat bubbles from the same sender within
/// the same local minute.
fn clusters_with(previous: &ChatMessage, current: &ChatMessage) -> bool {
    if previous.is_system() || current.is_system() {
        return false;
    }
    if previous.sender_id != current.sender_id {
        return false;
    }
    match (previous.created_at, current.created_at) {
        (Some(a), Some(b)) => {
            (a.year(), a.month(), a.day(), a.hour(), a.minute())
                == (b.year(), b.month(), b.day(), b.hour(), b.minute())
        },
        _ => false,
    }
}

proptest! {
    #[test]
    fn prop_one_directive_per_message(
        transcript in transcript_strategy(),
        viewer in viewer_strategy(),
    ) {
        let directives = classify(&transcript, viewer);
        prop_assert_eq!(directives.len(), transcript.len());
    }

    #[test]
    fn prop_classification_is_deterministic(
        transcript in transcript_strategy(),
        viewer in viewer_strategy(),
    ) {
        let first = classify(&transcript, viewer);
        let second = classify(&transcript, viewer);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_date_divider_follows_local_day_change(
        transcript in transcript_strategy(),
        viewer in viewer_strategy(),
    ) {
        let directives = classify(&transcript, viewer);

        for (index, directive) in directives.iter().enumerate() {
            let expected = match index.checked_sub(1).and_then(|prev| transcript.get(prev)) {
                // The raw predecessor decides, system or not.
                Some(previous) => day_key(previous) != day_key(&transcript[index]),
                None => true,
            };
            prop_assert_eq!(
                directive.show_date_divider, expected,
                "divider mismatch at index {}", index
            );
        }
    }

    #[test]
    fn prop_timestamp_marks_cluster_tails_only(
        transcript in transcript_strategy(),
        viewer in viewer_strategy(),
    ) {
        let directives = classify(&transcript, viewer);

        for (index, directive) in directives.iter().enumerate() {
            let message = &transcript[index];
            let ends_cluster = transcript
                .get(index + 1)
                .is_none_or(|next| !clusters_with(message, next));
            let expected = !message.is_system() && message.created_at.is_some() && ends_cluster;
            prop_assert_eq!(
                directive.show_timestamp, expected,
                "timestamp mismatch at index {}", index
            );
        }
    }

    #[test]
    fn prop_avatar_marks_counterpart_cluster_heads_only(
        transcript in transcript_strategy(),
        viewer in viewer_strategy(),
    ) {
        let directives = classify(&transcript, viewer);

        for (index, directive) in directives.iter().enumerate() {
            let message = &transcript[index];
            let mine = viewer.is_some() && message.sender_id == viewer;
            let starts_cluster = index
                .checked_sub(1)
                .and_then(|prev| transcript.get(prev))
                .is_none_or(|previous| !clusters_with(previous, message));
            let expected = !message.is_system() && !mine && starts_cluster;
            prop_assert_eq!(
                directive.show_avatar, expected,
                "avatar mismatch at index {}", index
            );
        }
    }

    #[test]
    fn prop_system_messages_carry_no_chrome(
        transcript in transcript_strategy(),
        viewer in viewer_strategy(),
    ) {
        let directives = classify(&transcript, viewer);

        for (index, directive) in directives.iter().enumerate() {
            if transcript[index].is_system() {
                prop_assert!(directive.system);
                prop_assert!(!directive.show_timestamp);
                prop_assert!(!directive.show_avatar);
            }
        }
    }

    #[test]
    fn prop_unresolved_viewer_owns_nothing(transcript in transcript_strategy()) {
        let directives = classify(&transcript, None);
        prop_assert!(directives.iter().all(|directive| !directive.mine));
    }
}

/// A short exchange as it arrives live: fetched history first, then a push
/// in the same minute from the other participant.
#[test]
fn history_then_push_renders_as_one_day() {
    let at = |second| {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .and_then(|date| date.and_hms_opt(10, 0, second))
            .unwrap()
    };
    let message = |id: &str, sender, second| ChatMessage {
        id: id.to_string(),
        kind: MessageKind::Plain,
        sender_id: Some(sender),
        receiver_id: None,
        content: Some("hi".to_string()),
        created_at: Some(at(second)),
        proposal_id: None,
        can_review: None,
        proposal_status: None,
    };

    let transcript = vec![message("h1", 2, 0), message("p1", 1, 30)];
    let directives = classify(&transcript, Some(1));

    // One divider for the shared day.
    assert!(directives[0].show_date_divider);
    assert!(!directives[1].show_date_divider);

    // Different senders never cluster: both messages end their own run.
    assert!(directives[0].show_timestamp);
    assert!(directives[1].show_timestamp);

    // Avatar on the counterpart's head, never on the viewer's own bubble.
    assert!(directives[0].show_avatar);
    assert!(!directives[1].show_avatar);
    assert!(directives[1].mine);
}
