//! Message record normalization.
//!
//! Room history and pushed frames arrive as JSON objects whose field names
//! drifted across backend generations: the kind may be spelled `kind`,
//! `messageKind`, `type`, or `messageType`; the proposal id may be
//! `proposalId`, `proposalConnectionId`, or `connectionId`; ids appear as
//! numbers or numeric strings. All of that variance is absorbed here, once,
//! by probing candidate fields in a fixed priority order. Downstream code
//! (classifier, proposal machine, rendering) sees only [`ChatMessage`].
//!
//! Unknown kind spellings degrade to [`MessageKind::Plain`]; an unparseable
//! timestamp degrades to `None`. The only hard requirement is an id: a
//! record without one cannot be deduplicated or annotated and is rejected
//! as malformed (callers log and drop it).

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::{
    errors::{ProtocolError, Result},
    ids::{MessageId, ProposalId, RoomId, UserId},
    probe::{as_id, as_text, probe},
    proposal::ProposalStatus,
};

/// Normalized message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Free-text chat content.
    Plain,
    /// A collaboration proposal was offered.
    ProposalOffer,
    /// A proposal was accepted.
    ProposalAccepted,
    /// A proposal was rejected.
    ProposalRejected,
    /// The participants may now review each other.
    ReviewNotice,
}

impl MessageKind {
    /// Map a raw kind string to a normalized kind.
    ///
    /// Matching is case-insensitive and tolerates the verb/participle
    /// variants observed in the wild. Anything unrecognized is `Plain`.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PROPOSAL_OFFER" | "PROPOSAL_PROPOSE" | "PROPOSE" | "OFFER" => Self::ProposalOffer,
            "PROPOSAL_ACCEPTED" | "PROPOSAL_ACCEPT" | "ACCEPT" | "ACCEPTED" => {
                Self::ProposalAccepted
            },
            "PROPOSAL_REJECTED" | "PROPOSAL_REJECT" | "REJECT" | "REJECTED" => {
                Self::ProposalRejected
            },
            "REVIEW_NOTICE" | "REVIEW_REQUEST" | "REVIEW" => Self::ReviewNotice,
            _ => Self::Plain,
        }
    }

    /// Canonical wire spelling, used in logs.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::ProposalOffer => "PROPOSAL_OFFER",
            Self::ProposalAccepted => "PROPOSAL_ACCEPTED",
            Self::ProposalRejected => "PROPOSAL_REJECTED",
            Self::ReviewNotice => "REVIEW_NOTICE",
        }
    }

    /// Workflow-event kinds, as opposed to free text.
    pub fn is_system(self) -> bool {
        !matches!(self, Self::Plain)
    }
}

/// One unit of room history, normalized at ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Server-assigned id, unique within the room.
    pub id: MessageId,
    /// Normalized kind.
    pub kind: MessageKind,
    /// Sender, absent for some system kinds.
    pub sender_id: Option<UserId>,
    /// Addressee, absent for some system kinds.
    pub receiver_id: Option<UserId>,
    /// Display text. System kinds may omit it; see [`Self::display_text`].
    pub content: Option<String>,
    /// Creation time; absence degrades time display, never crashes it.
    pub created_at: Option<NaiveDateTime>,
    /// Proposal this message belongs to, for proposal kinds.
    pub proposal_id: Option<ProposalId>,
    /// Review entitlement riding on accepted-kind frames, when present.
    pub can_review: Option<bool>,
    /// Client-side overlay recording a later accept/reject outcome.
    /// Never part of the wire record.
    pub proposal_status: Option<ProposalStatus>,
}

impl ChatMessage {
    /// Normalize one raw JSON record.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidBody`] when the value is not an object.
    /// - [`ProtocolError::MissingField`] when no id field is present.
    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(ProtocolError::InvalidBody { reason: "record is not an object".into() });
        }

        let id = probe(value, &["id", "messageId"])
            .and_then(as_text)
            .ok_or(ProtocolError::MissingField { field: "id" })?;

        let kind = probe(value, &["kind", "messageKind", "type", "messageType"])
            .and_then(Value::as_str)
            .map_or(MessageKind::Plain, MessageKind::from_wire);

        let sender_id =
            probe(value, &["senderId"]).and_then(as_id).or_else(|| nested_id(value, "sender"));
        let receiver_id =
            probe(value, &["receiverId"]).and_then(as_id).or_else(|| nested_id(value, "receiver"));

        let content = probe(value, &["content", "message", "text"])
            .and_then(Value::as_str)
            .map(str::to_string);

        let created_at = probe(value, &["createdAt", "created_at", "sentAt"])
            .and_then(Value::as_str)
            .and_then(parse_timestamp);

        let proposal_id = probe(value, &["proposalId", "proposalConnectionId", "connectionId"])
            .and_then(as_id);

        let can_review = probe(value, &["canReview"]).and_then(Value::as_bool);

        // A status field is only meaningful on proposal records; other kinds
        // reuse the name for unrelated data.
        let proposal_status = if kind == MessageKind::ProposalOffer {
            probe(value, &["proposalStatus", "status"])
                .and_then(Value::as_str)
                .and_then(ProposalStatus::from_wire)
        } else {
            None
        };

        Ok(Self {
            id,
            kind,
            sender_id,
            receiver_id,
            content,
            created_at,
            proposal_id,
            can_review,
            proposal_status,
        })
    }

    /// Normalize one raw JSON text body (a pushed frame).
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidBody`] when the text is not JSON, plus the
    /// errors of [`Self::from_value`].
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|error| ProtocolError::InvalidBody { reason: error.to_string() })?;
        Self::from_value(&value)
    }

    /// Display text with human-readable fallbacks for system kinds.
    pub fn display_text(&self) -> String {
        if let Some(content) = self.content.as_deref()
            && !content.is_empty()
        {
            return content.to_string();
        }
        match self.kind {
            MessageKind::Plain => String::new(),
            MessageKind::ProposalOffer => "Sent a collaboration proposal.".to_string(),
            MessageKind::ProposalAccepted => "Proposal accepted.".to_string(),
            MessageKind::ProposalRejected => "Proposal declined.".to_string(),
            MessageKind::ReviewNotice => "A review can now be written.".to_string(),
        }
    }

    /// Workflow-event message, as opposed to free text.
    pub fn is_system(&self) -> bool {
        self.kind.is_system()
    }
}

/// Outbound publish payload: `{roomId, receiverId, content}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Target room.
    pub room_id: RoomId,
    /// Addressee.
    pub receiver_id: UserId,
    /// Free-text body.
    pub content: String,
}

/// Id out of a nested participant object (`sender.id`, `sender.userPk`).
fn nested_id(value: &Value, outer: &str) -> Option<u64> {
    value.get(outer).and_then(|inner| probe(inner, &["id", "userPk"])).and_then(as_id)
}

/// Tolerant timestamp parse.
///
/// Accepts the zoneless ISO form the backend usually serves, full RFC 3339
/// with an offset, and the space-separated variant. Anything else is `None`.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_local());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(parsed);
    }
    None
}
