//! Fuzz target for the transcript classifier
//!
//! # Strategy
//!
//! - Arbitrary transcripts with sender/timestamp gaps and system kinds
//! - Timestamps collapse onto a few days and minutes so day breaks and
//!   minute clusters actually form
//!
//! # Invariants
//!
//! - Exactly one directive per message, in order
//! - The first message always opens with a date divider
//! - System kinds never carry a timestamp or an avatar
//! - A timestamp requires a creation time; an avatar requires a counterpart

#![no_main]

use arbitrary::Arbitrary;
use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;
use parley_app::classify;
use parley_proto::{ChatMessage, MessageKind};

#[derive(Debug, Arbitrary)]
struct Input {
    messages: Vec<RawMessage>,
    viewer: Option<u8>,
}

#[derive(Debug, Arbitrary)]
struct RawMessage {
    id: u16,
    kind: KindChoice,
    sender: Option<u8>,
    stamp: Option<Stamp>,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum KindChoice {
    Plain,
    Offer,
    Accepted,
    Rejected,
    Review,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
struct Stamp {
    day: u8,
    hour: u8,
    minute: u8,
}

fuzz_target!(|input: Input| {
    let messages: Vec<ChatMessage> = input.messages.iter().map(to_message).collect();
    let viewer = input.viewer.map(u64::from);

    let directives = classify(&messages, viewer);
    assert_eq!(directives.len(), messages.len());

    for (index, (message, directive)) in messages.iter().zip(&directives).enumerate() {
        if index == 0 {
            assert!(directive.show_date_divider, "transcript opened without a divider");
        }

        assert_eq!(directive.system, message.is_system());
        if directive.system {
            assert!(!directive.show_timestamp);
            assert!(!directive.show_avatar);
        }

        if directive.show_timestamp {
            assert!(message.created_at.is_some(), "timestamp without a creation time");
        }
        if directive.show_avatar {
            assert!(!directive.mine, "avatar on the viewer's own message");
        }
        if directive.mine {
            assert!(viewer.is_some() && message.sender_id == viewer);
        }
    }
});

fn to_message(raw: &RawMessage) -> ChatMessage {
    let created_at = raw.stamp.and_then(|stamp| {
        NaiveDate::from_ymd_opt(2025, 3, 10 + u32::from(stamp.day % 3))?
            .and_hms_opt(u32::from(stamp.hour % 2), u32::from(stamp.minute % 4), 0)
    });

    ChatMessage {
        id: raw.id.to_string(),
        kind: to_kind(raw.kind),
        sender_id: raw.sender.map(u64::from),
        receiver_id: None,
        content: None,
        created_at,
        proposal_id: None,
        can_review: None,
        proposal_status: None,
    }
}

fn to_kind(choice: KindChoice) -> MessageKind {
    match choice {
        KindChoice::Plain => MessageKind::Plain,
        KindChoice::Offer => MessageKind::ProposalOffer,
        KindChoice::Accepted => MessageKind::ProposalAccepted,
        KindChoice::Rejected => MessageKind::ProposalRejected,
        KindChoice::Review => MessageKind::ReviewNotice,
    }
}
