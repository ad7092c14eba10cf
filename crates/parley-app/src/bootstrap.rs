//! Staged room bootstrap.
//!
//! Entering a room loads its context over REST in a fixed order: identity,
//! counterpart, proposal snapshot, history. Each stage becomes a
//! [`RoomEvent`] for the machine. Identity and history failures are fatal
//! and close the room; the counterpart and proposal stages degrade to
//! defaults with a warning.
//!
//! The whole sequence is screened by a [`Liveness`] flag so a room view
//! dismissed mid-load stops issuing requests instead of racing stale
//! results into a dead machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parley_client::ChatApi;
use parley_proto::RoomId;
use tracing::warn;

use crate::event::RoomEvent;

/// Shared flag marking one room visit as still on screen.
///
/// Cloned into whatever drives the bootstrap; `dismiss` flips it when the
/// view goes away so in-flight stages stop early.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    /// New flag, live.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Mark the visit as over.
    pub fn dismiss(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    /// Whether the visit is still live.
    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the room context and return the events to feed the machine.
///
/// Stages run strictly in order. An identity failure short-circuits the
/// rest. `need_counterpart` skips the room-list stage when the entry
/// context already named the counterpart. After every stage the
/// [`Liveness`] flag is consulted and a dismissed visit returns whatever
/// was gathered so far.
pub async fn bootstrap<A: ChatApi>(
    api: &A,
    room_id: RoomId,
    need_counterpart: bool,
    liveness: &Liveness,
) -> Vec<RoomEvent> {
    let mut events = Vec::new();

    match api.fetch_me().await {
        Ok(user) => events.push(RoomEvent::IdentityResolved { user }),
        Err(error) => {
            warn!(%error, "identity fetch failed");
            events.push(RoomEvent::IdentityFailed { message: error.to_string() });
            return events;
        },
    }
    if !liveness.is_live() {
        return events;
    }

    if need_counterpart {
        match api.fetch_rooms().await {
            Ok(rooms) => {
                match rooms.into_iter().find(|entry| entry.room_id == Some(room_id)) {
                    Some(entry) => events.push(RoomEvent::CounterpartResolved {
                        profile: entry.counterpart,
                        receiver_id: entry.receiver_hint,
                    }),
                    None => warn!(room_id, "room missing from the room list"),
                }
            },
            Err(error) => warn!(%error, "room list fetch failed"),
        }
        if !liveness.is_live() {
            return events;
        }
    }

    match api.fetch_proposal(room_id).await {
        Ok(snapshot) => events.push(RoomEvent::ProposalLoaded { snapshot }),
        Err(error) => warn!(%error, "proposal fetch failed, keeping defaults"),
    }
    if !liveness.is_live() {
        return events;
    }

    match api.fetch_history(room_id).await {
        Ok(messages) => events.push(RoomEvent::HistoryLoaded { messages }),
        Err(error) => {
            warn!(%error, "history fetch failed");
            events.push(RoomEvent::HistoryFailed { message: error.to_string() });
        },
    }

    events
}
