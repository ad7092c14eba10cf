//! Connection-proposal wire shapes.
//!
//! The proposal REST endpoints (fetch, propose, accept) all answer with the
//! same loose object; [`ProposalSnapshot::from_value`] normalizes it. The
//! lifecycle itself lives in the app layer; this module only knows the wire.

use serde::Serialize;
use serde_json::Value;

use crate::{
    ids::{PostId, ProposalId, UserId},
    probe::{as_id, probe},
};

/// Proposal lifecycle status as the backend spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalStatus {
    /// Offered, awaiting the counterpart's decision.
    Pending,
    /// Accepted; the participants are linked.
    Accepted,
    /// Rejected.
    Rejected,
}

impl ProposalStatus {
    /// Map a raw status string, `None` for anything unrecognized.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "WAITING" => Some(Self::Pending),
            "ACCEPTED" => Some(Self::Accepted),
            "REJECTED" | "DECLINED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Canonical wire spelling.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// Server-side proposal state for one room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProposalSnapshot {
    /// The participants are formally linked.
    pub linked: bool,
    /// The viewer may write a review.
    pub can_review: bool,
    /// Id of the current proposal, when one exists.
    pub proposal_id: Option<ProposalId>,
    /// Status of the current proposal, when one exists.
    pub status: Option<ProposalStatus>,
}

impl ProposalSnapshot {
    /// Normalize one raw snapshot object. Absent fields default.
    pub fn from_value(value: &Value) -> Self {
        Self {
            linked: probe(value, &["linked"]).and_then(Value::as_bool).unwrap_or(false),
            can_review: probe(value, &["canReview"]).and_then(Value::as_bool).unwrap_or(false),
            proposal_id: probe(value, &["proposalId", "connectionId", "id"]).and_then(as_id),
            status: probe(value, &["status"])
                .and_then(Value::as_str)
                .and_then(ProposalStatus::from_wire),
        }
    }
}

/// Body of the propose call: `{targetUserId, message, talentPostId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeRequest {
    /// The counterpart being proposed to.
    pub target_user_id: UserId,
    /// Greeting shown alongside the proposal.
    pub message: String,
    /// Talent post this proposal refers to, when entry carried one.
    pub talent_post_id: Option<PostId>,
}
