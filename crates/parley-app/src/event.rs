//! Room engine input events.
//!
//! This module defines [`RoomEvent`], the set of inputs that drive the
//! [`crate::RoomApp`] state machine.
//!
//! Events originate from three sources:
//! - The realtime connection (lifecycle transitions and pushed messages).
//! - Bootstrap and workflow REST calls, folded into events by the runtime.
//! - Periodic ticks from the driver.

use parley_proto::{ChatMessage, ProposalId, ProposalSnapshot, UserId, UserProfile};

/// Events processed by the room state machine.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// Periodic tick.
    Tick,

    /// Realtime handshake started.
    Connecting,

    /// Realtime session established and subscribed.
    Connected,

    /// Realtime connect or session failed.
    ConnectionFailed {
        /// Human-readable reason for display.
        message: String,
    },

    /// Realtime session ended cleanly.
    Disconnected,

    /// A message arrived on the room topic.
    MessageReceived {
        /// The normalized record.
        message: ChatMessage,
    },

    /// The viewer's identity resolved.
    IdentityResolved {
        /// The authenticated user's profile.
        user: UserProfile,
    },

    /// The viewer's identity could not be resolved. Fatal for the room.
    IdentityFailed {
        /// What the identity call reported.
        message: String,
    },

    /// The room list yielded counterpart details for this room.
    CounterpartResolved {
        /// Counterpart profile, when the entry carried one.
        profile: Option<UserProfile>,
        /// Receiver-id hint for outbound addressing.
        receiver_id: Option<UserId>,
    },

    /// The room's proposal state was fetched.
    ProposalLoaded {
        /// Authoritative server-side snapshot.
        snapshot: ProposalSnapshot,
    },

    /// Message history was fetched.
    HistoryLoaded {
        /// Records oldest first.
        messages: Vec<ChatMessage>,
    },

    /// Message history could not be fetched. Fatal for the room.
    HistoryFailed {
        /// What the history call reported.
        message: String,
    },

    /// The viewer's propose call succeeded.
    ProposalOpened {
        /// Response snapshot; missing fields fold over current state.
        snapshot: ProposalSnapshot,
    },

    /// A proposal was accepted via the viewer's own call.
    ProposalAccepted {
        /// Proposal that settled.
        proposal_id: Option<ProposalId>,
        /// Review entitlement, when the response carried one.
        can_review: Option<bool>,
    },

    /// A proposal was rejected via the viewer's own call.
    ProposalRejected {
        /// Proposal that settled.
        proposal_id: Option<ProposalId>,
    },

    /// The viewer left the room for good.
    RoomLeft,

    /// A user-initiated call failed; state is unchanged.
    OperationFailed {
        /// Which operation failed, for the status line.
        operation: &'static str,
        /// What the call reported.
        message: String,
    },
}
