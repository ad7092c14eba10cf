//! Identifier aliases shared across the wire types.
//!
//! The backend serves numeric ids both as JSON numbers and as strings;
//! normalization accepts either form. Entity ids become `u64`, while message
//! ids stay strings: they are only ever compared for identity and some
//! deployments issue non-numeric ones.

/// Room identifier.
pub type RoomId = u64;

/// Participant identifier.
pub type UserId = u64;

/// Connection-proposal identifier.
pub type ProposalId = u64;

/// Talent-post identifier a proposal can reference.
pub type PostId = u64;

/// Server-assigned message identifier, unique within a room.
pub type MessageId = String;
