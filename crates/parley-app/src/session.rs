//! Observable view state for one room visit.
//!
//! This module defines the data structures that represent the client's view
//! of a single room: [`RoomSession`] plus the [`EntryContext`] carried over
//! from the referring screen.
//!
//! These structures are the "view model" of the engine. They hold exactly
//! what rendering needs and nothing about sockets or HTTP; the state machine
//! in [`crate::RoomApp`] is the only writer.

use parley_proto::{ChatMessage, PostId, ProposalId, ProposalStatus, RoomId, UserId, UserProfile};

use crate::proposal::ProposalState;

/// Default cap on retained room history.
pub const DEFAULT_MAX_HISTORY: usize = 4096;

/// Connection state as the view sees it.
///
/// Mirrors the transport-layer machine without owning it: the app only
/// records transitions it is told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No realtime session.
    Offline,
    /// Handshake in progress.
    Connecting,
    /// Subscribed and able to publish.
    Online,
    /// The last attempt failed; a retry is user-initiated.
    Failed {
        /// Human-readable reason for display.
        message: String,
    },
}

impl ConnectionState {
    /// Publishing is currently possible.
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

/// State carried over from the screen that opened the room.
#[derive(Debug, Clone, Default)]
pub struct EntryContext {
    /// Composed-but-unsent text to publish once the room is ready.
    pub draft: Option<String>,
    /// Receiver id hint, when the referrer knew it.
    pub receiver_hint: Option<UserId>,
    /// Counterpart profile, when the referrer carried one.
    pub counterpart: Option<UserProfile>,
    /// Talent post this visit refers to, for proposals.
    pub talent_post_id: Option<PostId>,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Retained history cap; the oldest records are evicted beyond it.
    pub max_history: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { max_history: DEFAULT_MAX_HISTORY }
    }
}

/// Client-local view of one room visit.
#[derive(Debug, Clone)]
pub struct RoomSession {
    /// Room being viewed.
    pub room_id: RoomId,
    /// The other participant, best-effort resolved.
    pub counterpart: Option<UserProfile>,
    /// Addressee for outbound messages, once resolved.
    pub receiver_id: Option<UserId>,
    /// Realtime connection state, as last reported.
    pub connection: ConnectionState,
    /// Messages in arrival order: history fetch order, then push order.
    pub messages: Vec<ChatMessage>,
    /// Proposal lifecycle state.
    pub proposal: ProposalState,
    /// The carried-over draft has been published.
    pub draft_sent: bool,
}

impl RoomSession {
    /// Create an empty session for one room.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            counterpart: None,
            receiver_id: None,
            connection: ConnectionState::Offline,
            messages: Vec::new(),
            proposal: ProposalState::default(),
            draft_sent: false,
        }
    }

    /// Append a pushed message, evicting the oldest beyond the cap.
    pub fn push_message(&mut self, message: ChatMessage, max_history: usize) {
        self.messages.push(message);
        evict_front(&mut self.messages, max_history);
    }

    /// Install fetched history ahead of anything already pushed.
    ///
    /// Pushes may land before the history fetch completes; arrival order is
    /// preserved by keeping them after the fetched records.
    pub fn merge_history(&mut self, history: Vec<ChatMessage>, max_history: usize) {
        let pushed = std::mem::take(&mut self.messages);
        self.messages = history;
        self.messages.extend(pushed);
        evict_front(&mut self.messages, max_history);
    }

    /// Record a proposal outcome on every message belonging to it.
    ///
    /// The overlay is how an offer card rendered from old history reflects a
    /// decision that arrived later.
    pub fn annotate_proposal(&mut self, proposal_id: ProposalId, status: ProposalStatus) {
        for message in &mut self.messages {
            if message.proposal_id == Some(proposal_id) {
                message.proposal_status = Some(status);
            }
        }
    }
}

/// Drop the oldest records beyond the cap, preserving order of the rest.
fn evict_front(messages: &mut Vec<ChatMessage>, max_history: usize) {
    if messages.len() > max_history {
        let excess = messages.len() - max_history;
        messages.drain(..excess);
    }
}
