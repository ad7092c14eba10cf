//! Fuzz target for the proposal lifecycle machine
//!
//! # Strategy
//!
//! - Arbitrary op sequences mixing pushed events (offer/accept/reject) with
//!   the viewer's own propose call and REST snapshot installs
//! - Ids drawn from a small range so collisions and restarts actually occur,
//!   with absent ids mixed in
//!
//! # Invariants
//!
//! - A refused transition leaves the state byte-for-byte untouched
//! - A settled status never changes under a same-or-absent-id event
//! - linked and can_review never downgrade except through seed

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parley_app::ProposalState;
use parley_proto::{ProposalSnapshot, ProposalStatus};

#[derive(Debug, Clone, Arbitrary)]
enum ProposalOp {
    Offer { id: Option<u8> },
    Accept { id: Option<u8>, can_review: Option<bool> },
    Reject { id: Option<u8> },
    Begin { id: Option<u8>, linked: bool, can_review: bool },
    Seed { id: Option<u8>, status: Option<StatusChoice>, linked: bool, can_review: bool },
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum StatusChoice {
    Pending,
    Accepted,
    Rejected,
}

fuzz_target!(|ops: Vec<ProposalOp>| {
    let mut state = ProposalState::default();

    for op in ops {
        let before = state.clone();

        let result = match &op {
            ProposalOp::Offer { id } => state.offer_received(id.map(u64::from)),
            ProposalOp::Accept { id, can_review } => {
                state.accept(id.map(u64::from), *can_review)
            }
            ProposalOp::Reject { id } => state.reject(id.map(u64::from)),
            ProposalOp::Begin { id, linked, can_review } => {
                state.begin(ProposalSnapshot {
                    linked: *linked,
                    can_review: *can_review,
                    proposal_id: id.map(u64::from),
                    status: None,
                });
                Ok(())
            }
            ProposalOp::Seed { id, status, linked, can_review } => {
                state.seed(ProposalSnapshot {
                    linked: *linked,
                    can_review: *can_review,
                    proposal_id: id.map(u64::from),
                    status: status.map(to_status),
                });
                Ok(())
            }
        };

        if result.is_err() {
            assert_eq!(state, before, "a refused transition mutated the state");
            continue;
        }

        // Seed is the authoritative snapshot install and may reset anything.
        if matches!(op, ProposalOp::Seed { .. }) {
            continue;
        }

        assert!(state.linked >= before.linked, "linked downgraded by {op:?}");
        assert!(state.can_review >= before.can_review, "can_review downgraded by {op:?}");

        // Settled outcomes only move under a provably different id, and the
        // viewer's own begin() is an explicit restart.
        if before.settled()
            && !matches!(op, ProposalOp::Begin { .. })
            && !names_other_proposal(&before, &op)
        {
            assert_eq!(state.status, before.status, "settled status changed by {op:?}");
        }
    }
});

fn to_status(choice: StatusChoice) -> ProposalStatus {
    match choice {
        StatusChoice::Pending => ProposalStatus::Pending,
        StatusChoice::Accepted => ProposalStatus::Accepted,
        StatusChoice::Rejected => ProposalStatus::Rejected,
    }
}

fn names_other_proposal(state: &ProposalState, op: &ProposalOp) -> bool {
    let incoming = match op {
        ProposalOp::Offer { id }
        | ProposalOp::Accept { id, .. }
        | ProposalOp::Reject { id }
        | ProposalOp::Begin { id, .. }
        | ProposalOp::Seed { id, .. } => id.map(u64::from),
    };
    matches!((state.proposal_id, incoming), (Some(current), Some(new)) if current != new)
}
