//! Wire-facing types for the Parley chat client.
//!
//! This crate owns everything that touches backend-defined shapes, with no
//! I/O of its own:
//!
//! - [`Frame`]: the text frame codec for the broker subprotocol carried over
//!   the realtime connection.
//! - [`ChatMessage`]: normalized room history records. The backend has served
//!   several generations of field names; ingestion probes the known variants
//!   once and downstream code only ever sees the normalized type.
//! - [`UserProfile`] / [`RoomEntry`]: profile and room-list normalization,
//!   including display-name and avatar fallback chains.
//! - [`ProposalSnapshot`] / [`ProposalStatus`]: the connection-proposal REST
//!   and push shapes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod frame;
mod ids;
mod message;
mod probe;
mod proposal;
mod roster;

pub use errors::{ProtocolError, Result};
pub use frame::{Command, Frame, SEND_DESTINATION, room_topic};
pub use ids::{MessageId, PostId, ProposalId, RoomId, UserId};
pub use message::{ChatMessage, MessageKind, OutboundMessage};
pub use proposal::{ProposalSnapshot, ProposalStatus, ProposeRequest};
pub use roster::{RoomEntry, UserProfile, absolute_url};
