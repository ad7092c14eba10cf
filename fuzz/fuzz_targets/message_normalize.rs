//! Fuzz target for ChatMessage normalization
//!
//! # Strategy
//!
//! - Arbitrary bytes fed through the JSON body path used for pushed frames
//! - Exercises field-name probing, nested sender objects, id coercion
//!
//! # Invariants
//!
//! - from_json never panics; non-JSON and id-less records return an error
//! - A normalized kind maps back to itself through its wire spelling
//! - proposal_status only survives on proposal-offer records
//! - System kinds always render a non-empty display text

#![no_main]

use libfuzzer_sys::fuzz_target;
use parley_proto::{ChatMessage, MessageKind};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else { return };
    let Ok(message) = ChatMessage::from_json(text) else { return };

    assert_eq!(MessageKind::from_wire(message.kind.as_wire()), message.kind);
    assert_eq!(message.is_system(), message.kind != MessageKind::Plain);

    if message.proposal_status.is_some() {
        assert_eq!(message.kind, MessageKind::ProposalOffer);
    }

    if message.is_system() {
        assert!(!message.display_text().is_empty(), "system kind rendered blank");
    }
});
