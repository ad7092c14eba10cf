//! Room state machine.
//!
//! This module defines the [`RoomApp`] state machine, which manages the
//! interactive state of one room visit completely decoupled from I/O and
//! protocol mechanics.
//!
//! This is a pure state machine: it consumes [`crate::RoomEvent`] inputs and
//! produces [`crate::RoomAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Holds the [`RoomSession`] view state: transcript, counterpart,
//!   connection state, proposal lifecycle.
//! - Applies workflow messages to the proposal machine and annotates the
//!   originating offer cards with outcomes.
//! - Publishes the carried-over draft exactly once, when the connection is
//!   online, identity is resolved, and a receiver is known.
//! - Maps fatal bootstrap failures to a [`RoomAction::CloseRoom`] with a
//!   typed reason; soft failures degrade and render with defaults.

use parley_proto::{
    ChatMessage, MessageKind, OutboundMessage, PostId, ProposalStatus, ProposeRequest, RoomId,
    UserId, UserProfile,
};
use tracing::{debug, error, trace, warn};

use crate::{
    action::{CloseReason, RoomAction},
    classify::{RenderDirective, classify},
    event::RoomEvent,
    session::{AppConfig, ConnectionState, EntryContext, RoomSession},
};

/// Greeting sent with a proposal when the viewer composed nothing.
const PROPOSAL_GREETING: &str = "Sent a collaboration proposal.";

/// Room state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies, fully testable without a socket or a server.
#[derive(Debug, Clone)]
pub struct RoomApp {
    /// Engine configuration.
    config: AppConfig,
    /// View state for this room visit.
    session: RoomSession,
    /// The viewer, once identity resolves.
    me: Option<UserProfile>,
    /// Carried-over draft, consumed on first publish.
    draft: Option<String>,
    /// Talent post reference for proposals.
    talent_post_id: Option<PostId>,
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
    /// Set once the view has closed, with the reason.
    closed: Option<CloseReason>,
}

impl RoomApp {
    /// Create a room machine from the entry context.
    pub fn new(room_id: RoomId, entry: EntryContext, config: AppConfig) -> Self {
        let mut session = RoomSession::new(room_id);
        session.counterpart = entry.counterpart;
        session.receiver_id = entry.receiver_hint;

        Self {
            config,
            session,
            me: None,
            draft: entry.draft,
            talent_post_id: entry.talent_post_id,
            status_message: None,
            closed: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: RoomEvent) -> Vec<RoomAction> {
        match event {
            RoomEvent::Tick => vec![],
            RoomEvent::Connecting => {
                self.session.connection = ConnectionState::Connecting;
                vec![RoomAction::Render]
            },
            RoomEvent::Connected => {
                self.session.connection = ConnectionState::Online;
                let mut actions = self.try_send_draft();
                actions.push(RoomAction::Render);
                actions
            },
            RoomEvent::ConnectionFailed { message } => {
                self.session.connection = ConnectionState::Failed { message };
                vec![RoomAction::Render]
            },
            RoomEvent::Disconnected => {
                self.session.connection = ConnectionState::Offline;
                vec![RoomAction::Render]
            },
            RoomEvent::MessageReceived { message } => {
                self.apply_workflow(&message);
                self.session.push_message(message, self.config.max_history);
                vec![RoomAction::Render]
            },
            RoomEvent::IdentityResolved { user } => {
                self.me = Some(user);
                let mut actions = self.try_send_draft();
                actions.push(RoomAction::Render);
                actions
            },
            RoomEvent::IdentityFailed { message } => {
                error!(%message, "identity unresolved, closing room");
                self.closed = Some(CloseReason::AuthRequired);
                vec![RoomAction::CloseRoom { reason: CloseReason::AuthRequired }]
            },
            RoomEvent::CounterpartResolved { profile, receiver_id } => {
                // Entry context wins; the room list only fills gaps.
                if self.session.counterpart.is_none() {
                    self.session.counterpart = profile;
                }
                if self.session.receiver_id.is_none() {
                    self.session.receiver_id = receiver_id;
                }
                let mut actions = self.try_send_draft();
                actions.push(RoomAction::Render);
                actions
            },
            RoomEvent::ProposalLoaded { snapshot } => {
                self.session.proposal.seed(snapshot);
                vec![RoomAction::Render]
            },
            RoomEvent::HistoryLoaded { messages } => {
                self.session.merge_history(messages, self.config.max_history);
                self.infer_receiver();
                let mut actions = self.try_send_draft();
                actions.push(RoomAction::Render);
                actions
            },
            RoomEvent::HistoryFailed { message } => {
                error!(%message, "history unavailable, closing room");
                self.closed = Some(CloseReason::HistoryUnavailable);
                vec![RoomAction::CloseRoom { reason: CloseReason::HistoryUnavailable }]
            },
            RoomEvent::ProposalOpened { snapshot } => {
                self.session.proposal.begin(snapshot);
                self.status_message = Some("Proposal sent.".to_string());
                vec![RoomAction::Render]
            },
            RoomEvent::ProposalAccepted { proposal_id, can_review } => {
                match self.session.proposal.accept(proposal_id, can_review) {
                    Ok(()) => {
                        self.annotate_outcome(ProposalStatus::Accepted);
                        self.status_message = Some("Proposal accepted.".to_string());
                    },
                    Err(error) => warn!(%error, "ignoring proposal transition"),
                }
                vec![RoomAction::Render]
            },
            RoomEvent::ProposalRejected { proposal_id } => {
                match self.session.proposal.reject(proposal_id) {
                    Ok(()) => {
                        self.annotate_outcome(ProposalStatus::Rejected);
                        self.status_message = Some("Proposal declined.".to_string());
                    },
                    Err(error) => warn!(%error, "ignoring proposal transition"),
                }
                vec![RoomAction::Render]
            },
            RoomEvent::RoomLeft => {
                self.closed = Some(CloseReason::Left);
                vec![RoomAction::CloseRoom { reason: CloseReason::Left }]
            },
            RoomEvent::OperationFailed { operation, message } => {
                self.status_message = Some(format!("{operation} failed: {message}"));
                vec![RoomAction::Render]
            },
        }
    }

    /// Send the composed text to the room.
    ///
    /// Publishing needs an online connection and a resolved receiver;
    /// without either the text is dropped silently, matching the
    /// fire-and-forget publish contract.
    pub fn send_text(&mut self, content: &str) -> Vec<RoomAction> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return vec![];
        }
        if !self.session.connection.is_online() {
            trace!("dropping send while not online");
            return vec![];
        }
        let Some(receiver_id) = self.session.receiver_id else {
            trace!("dropping send without a resolved receiver");
            return vec![];
        };

        vec![
            RoomAction::Publish {
                message: OutboundMessage {
                    room_id: self.session.room_id,
                    receiver_id,
                    content: trimmed.to_string(),
                },
            },
            RoomAction::Render,
        ]
    }

    /// Open a collaboration proposal towards the counterpart.
    ///
    /// Refused without a resolved receiver, and while a proposal is already
    /// pending or the participants are linked.
    pub fn propose(&mut self) -> Vec<RoomAction> {
        if self.session.proposal.linked || self.session.proposal.pending() {
            return vec![];
        }
        let Some(target_user_id) = self.session.receiver_id else {
            trace!("dropping propose without a resolved receiver");
            return vec![];
        };

        self.status_message = Some("Sending proposal...".to_string());
        vec![
            RoomAction::Propose {
                request: ProposeRequest {
                    target_user_id,
                    message: PROPOSAL_GREETING.to_string(),
                    talent_post_id: self.talent_post_id,
                },
            },
            RoomAction::Render,
        ]
    }

    /// Accept the current proposal.
    pub fn accept_proposal(&mut self) -> Vec<RoomAction> {
        if self.session.proposal.settled() {
            return vec![];
        }
        let Some(proposal_id) = self.session.proposal.proposal_id else {
            return vec![];
        };

        self.status_message = Some("Accepting proposal...".to_string());
        vec![RoomAction::Accept { proposal_id }, RoomAction::Render]
    }

    /// Reject the current proposal.
    pub fn reject_proposal(&mut self) -> Vec<RoomAction> {
        if self.session.proposal.settled() {
            return vec![];
        }
        let Some(proposal_id) = self.session.proposal.proposal_id else {
            return vec![];
        };

        self.status_message = Some("Declining proposal...".to_string());
        vec![RoomAction::Reject { proposal_id }, RoomAction::Render]
    }

    /// Leave the room for good.
    pub fn leave(&mut self) -> Vec<RoomAction> {
        self.status_message = Some("Leaving room...".to_string());
        vec![RoomAction::Leave, RoomAction::Render]
    }

    /// Close the view without leaving the room.
    pub fn dismiss(&mut self) -> Vec<RoomAction> {
        self.closed = Some(CloseReason::Dismissed);
        vec![RoomAction::CloseRoom { reason: CloseReason::Dismissed }]
    }

    /// Set a status message to display to the user.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// View state for rendering.
    pub fn session(&self) -> &RoomSession {
        &self.session
    }

    /// The viewer's profile, once identity resolved.
    pub fn me(&self) -> Option<&UserProfile> {
        self.me.as_ref()
    }

    /// The viewer's id, once identity resolved.
    pub fn viewer_id(&self) -> Option<UserId> {
        self.me.as_ref().and_then(|me| me.id)
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Why the view closed. `None` while it is live.
    pub fn closed(&self) -> Option<CloseReason> {
        self.closed
    }

    /// Classify the transcript for rendering.
    pub fn directives(&self) -> Vec<RenderDirective> {
        classify(&self.session.messages, self.viewer_id())
    }

    /// Drive the proposal machine from a pushed workflow message and
    /// annotate the transcript with settled outcomes.
    fn apply_workflow(&mut self, message: &ChatMessage) {
        let result = match message.kind {
            MessageKind::Plain | MessageKind::ReviewNotice => return,
            MessageKind::ProposalOffer => {
                self.session.proposal.offer_received(message.proposal_id)
            },
            MessageKind::ProposalAccepted => {
                self.session.proposal.accept(message.proposal_id, message.can_review)
            },
            MessageKind::ProposalRejected => self.session.proposal.reject(message.proposal_id),
        };

        match result {
            Ok(()) => {
                if let Some(status) = settled_status(message.kind) {
                    self.annotate_outcome(status);
                }
            },
            Err(error) => {
                warn!(%error, kind = message.kind.as_wire(), "ignoring proposal transition");
            },
        }
    }

    /// Mark every message of the current proposal with its outcome.
    fn annotate_outcome(&mut self, status: ProposalStatus) {
        if let Some(proposal_id) = self.session.proposal.proposal_id {
            self.session.annotate_proposal(proposal_id, status);
        }
    }

    /// Resolve the receiver from the first history message by elimination:
    /// whichever participant of that message is not the viewer.
    fn infer_receiver(&mut self) {
        if self.session.receiver_id.is_some() {
            return;
        }
        let Some(viewer) = self.viewer_id() else {
            return;
        };
        let Some(first) = self.session.messages.first() else {
            return;
        };

        let inferred =
            [first.sender_id, first.receiver_id].into_iter().flatten().find(|id| *id != viewer);
        if let Some(receiver_id) = inferred {
            debug!(receiver_id, "receiver inferred from history");
            self.session.receiver_id = Some(receiver_id);
        }
    }

    /// Publish the carried-over draft once every gate is open: connection
    /// online, identity resolved, receiver known.
    ///
    /// `Option::take` is the replay guard: whichever enabling event fires
    /// last consumes the draft, and re-delivery of any of them finds it
    /// already gone.
    fn try_send_draft(&mut self) -> Vec<RoomAction> {
        if !self.session.connection.is_online() || self.viewer_id().is_none() {
            return vec![];
        }
        let Some(receiver_id) = self.session.receiver_id else {
            return vec![];
        };
        let Some(draft) = self.draft.take() else {
            return vec![];
        };

        let content = draft.trim().to_string();
        if content.is_empty() {
            return vec![];
        }

        debug!("publishing carried-over draft");
        self.session.draft_sent = true;
        vec![RoomAction::Publish {
            message: OutboundMessage { room_id: self.session.room_id, receiver_id, content },
        }]
    }
}

/// Terminal status carried by a workflow message kind, if any.
fn settled_status(kind: MessageKind) -> Option<ProposalStatus> {
    match kind {
        MessageKind::ProposalAccepted => Some(ProposalStatus::Accepted),
        MessageKind::ProposalRejected => Some(ProposalStatus::Rejected),
        MessageKind::Plain | MessageKind::ProposalOffer | MessageKind::ReviewNotice => None,
    }
}
