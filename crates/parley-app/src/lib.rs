//! Room engine for Parley
//!
//! Pure state machines and a generic runtime for one room visit, enabling
//! deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`RoomApp`]: room state machine (transcript, proposal lifecycle, draft)
//! - [`classify()`]: pure transcript classifier for rendering
//! - [`bootstrap()`]: staged REST load producing machine events
//! - [`Driver`]: trait for platform-specific I/O abstraction
//! - [`Runtime`]: generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bootstrap;
mod classify;
mod driver;
mod event;
mod proposal;
mod runtime;
mod session;
#[cfg(feature = "transport")]
mod socket;

pub use action::{CloseReason, RoomAction};
pub use app::RoomApp;
pub use bootstrap::{Liveness, bootstrap};
pub use classify::{RenderDirective, classify};
pub use driver::Driver;
pub use event::RoomEvent;
pub use proposal::{ProposalState, TransitionError};
pub use runtime::{Runtime, RuntimeConfig};
pub use session::{AppConfig, ConnectionState, DEFAULT_MAX_HISTORY, EntryContext, RoomSession};
#[cfg(feature = "transport")]
pub use socket::{SocketDriver, SocketError, UiCommand};
