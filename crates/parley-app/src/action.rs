//! Room engine side-effects and intents.
//!
//! This module defines the [`RoomAction`] enum, which represents
//! instructions produced by the [`crate::RoomApp`] state machine for the
//! runtime to execute.

use parley_proto::{OutboundMessage, ProposalId, ProposeRequest};

/// Why a room view closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Identity could not be resolved; the user must sign in again.
    AuthRequired,
    /// History could not be fetched; nothing can render.
    HistoryUnavailable,
    /// The viewer left the room.
    Left,
    /// The viewer navigated away.
    Dismissed,
}

/// Actions produced by the room state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    /// Render the view.
    Render,

    /// Publish a message on the realtime connection.
    Publish {
        /// The outbound payload.
        message: OutboundMessage,
    },

    /// Create a collaboration proposal.
    Propose {
        /// The propose call body.
        request: ProposeRequest,
    },

    /// Accept a proposal.
    Accept {
        /// Proposal to accept.
        proposal_id: ProposalId,
    },

    /// Reject a proposal.
    Reject {
        /// Proposal to reject.
        proposal_id: ProposalId,
    },

    /// Leave the room for good.
    Leave,

    /// Tear the room view down.
    CloseRoom {
        /// Why the view is closing.
        reason: CloseReason,
    },
}
