//! Connection-proposal lifecycle.
//!
//! A proposal moves `None -> Pending -> Accepted | Rejected`. The two
//! outcomes are terminal per proposal id: once settled, only an offer under
//! a **new** id restarts the lifecycle at Pending. Illegal transitions are
//! refused with [`TransitionError`] instead of silently overwriting, which
//! is what keeps a late or replayed push from regressing an accepted link.
//!
//! Events rarely carry every field, so transitions fold: an absent incoming
//! id keeps the current one, and `can_review` only ever upgrades to `true`.
//! [`ProposalState::seed`] is the one unconditional write, reserved for the
//! authoritative REST snapshot at bootstrap.

use parley_proto::{ProposalId, ProposalSnapshot, ProposalStatus};
use thiserror::Error;

/// Refused proposal transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The current proposal is already settled under this id.
    #[error("proposal already {} and cannot become {}", status.as_wire(), attempted.as_wire())]
    AlreadySettled {
        /// Settled outcome being defended.
        status: ProposalStatus,
        /// Status the refused event asked for.
        attempted: ProposalStatus,
    },
}

/// Proposal lifecycle state for one room session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalState {
    /// Current lifecycle status, `None` before any proposal exists.
    pub status: Option<ProposalStatus>,
    /// Id of the current proposal, when known.
    pub proposal_id: Option<ProposalId>,
    /// The participants are formally linked.
    pub linked: bool,
    /// The viewer may write a review.
    pub can_review: bool,
    /// The viewer's own propose call is outstanding; disables the propose
    /// affordance for the actor only.
    pub mine_pending: bool,
}

impl ProposalState {
    /// Install the authoritative REST snapshot, replacing local state.
    pub fn seed(&mut self, snapshot: ProposalSnapshot) {
        self.status = snapshot.status;
        self.proposal_id = snapshot.proposal_id;
        self.linked = snapshot.linked;
        self.can_review = snapshot.can_review;
        self.mine_pending = false;
    }

    /// Record a successful propose call by the viewer.
    ///
    /// The response is folded rather than trusted wholesale: a missing
    /// status defaults to Pending and a missing id keeps the current one.
    pub fn begin(&mut self, snapshot: ProposalSnapshot) {
        self.status = snapshot.status.or(Some(ProposalStatus::Pending));
        self.proposal_id = snapshot.proposal_id.or(self.proposal_id);
        self.linked = self.linked || snapshot.linked;
        self.can_review = self.can_review || snapshot.can_review;
        self.mine_pending = true;
    }

    /// A proposal offer arrived on the room topic.
    ///
    /// A new id restarts the lifecycle at Pending; the same id after a
    /// settled outcome is refused.
    ///
    /// # Errors
    ///
    /// - [`TransitionError::AlreadySettled`] when the current proposal is
    ///   settled and the offer does not carry a different id
    pub fn offer_received(
        &mut self,
        proposal_id: Option<ProposalId>,
    ) -> Result<(), TransitionError> {
        if !self.is_new_proposal(proposal_id)
            && let Some(status @ (ProposalStatus::Accepted | ProposalStatus::Rejected)) =
                self.status
        {
            return Err(TransitionError::AlreadySettled {
                status,
                attempted: ProposalStatus::Pending,
            });
        }

        self.status = Some(ProposalStatus::Pending);
        self.proposal_id = proposal_id.or(self.proposal_id);
        Ok(())
    }

    /// The proposal was accepted, by push or by the viewer's own call.
    ///
    /// Accepting marks the participants linked and clears `mine_pending`.
    /// A re-delivered accept for the already-accepted id is a no-op apart
    /// from folding the payload.
    ///
    /// # Errors
    ///
    /// - [`TransitionError::AlreadySettled`] when the same proposal was
    ///   already rejected
    pub fn accept(
        &mut self,
        proposal_id: Option<ProposalId>,
        can_review: Option<bool>,
    ) -> Result<(), TransitionError> {
        if !self.is_new_proposal(proposal_id) {
            match self.status {
                Some(ProposalStatus::Rejected) => {
                    return Err(TransitionError::AlreadySettled {
                        status: ProposalStatus::Rejected,
                        attempted: ProposalStatus::Accepted,
                    });
                },
                Some(ProposalStatus::Accepted) => {
                    self.proposal_id = proposal_id.or(self.proposal_id);
                    if can_review == Some(true) {
                        self.can_review = true;
                    }
                    return Ok(());
                },
                _ => {},
            }
        }

        self.status = Some(ProposalStatus::Accepted);
        self.proposal_id = proposal_id.or(self.proposal_id);
        self.linked = true;
        if can_review == Some(true) {
            self.can_review = true;
        }
        self.mine_pending = false;
        Ok(())
    }

    /// The proposal was rejected, by push or by the viewer's own call.
    ///
    /// # Errors
    ///
    /// - [`TransitionError::AlreadySettled`] when the same proposal was
    ///   already accepted
    pub fn reject(&mut self, proposal_id: Option<ProposalId>) -> Result<(), TransitionError> {
        if !self.is_new_proposal(proposal_id) {
            match self.status {
                Some(ProposalStatus::Accepted) => {
                    return Err(TransitionError::AlreadySettled {
                        status: ProposalStatus::Accepted,
                        attempted: ProposalStatus::Rejected,
                    });
                },
                Some(ProposalStatus::Rejected) => {
                    self.proposal_id = proposal_id.or(self.proposal_id);
                    return Ok(());
                },
                _ => {},
            }
        }

        self.status = Some(ProposalStatus::Rejected);
        self.proposal_id = proposal_id.or(self.proposal_id);
        self.mine_pending = false;
        Ok(())
    }

    /// The current proposal reached a terminal outcome.
    pub fn settled(&self) -> bool {
        matches!(self.status, Some(ProposalStatus::Accepted | ProposalStatus::Rejected))
    }

    /// A proposal is awaiting a decision.
    pub fn pending(&self) -> bool {
        self.status == Some(ProposalStatus::Pending)
    }

    /// The incoming id definitely names a different proposal.
    ///
    /// An absent id on either side cannot prove a restart, so it counts as
    /// the current proposal; that is what makes settling monotonic.
    fn is_new_proposal(&self, proposal_id: Option<ProposalId>) -> bool {
        matches!(
            (self.proposal_id, proposal_id),
            (Some(current), Some(incoming)) if current != incoming
        )
    }
}
