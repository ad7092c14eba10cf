//! Client
//!
//! Session plumbing for the Parley chat service: the realtime connection
//! state machine, the REST collaborators, and bearer token persistence.
//!
//! # Architecture
//!
//! The connection follows the Sans-IO, action-based pattern used by
//! [`parley_proto`]'s consumers: methods take events (frames, clock readings,
//! user commands) and return [`ConnectionAction`]s for the caller to execute.
//! Anything that touches a socket or the network lives behind a seam: the
//! optional transport adapter for WebSocket I/O and the [`ChatApi`] trait for
//! REST.
//!
//! # Components
//!
//! - [`Connection`]: Realtime session state machine
//! - [`RestClient`]: HTTP implementation of [`ChatApi`]
//! - [`TokenStore`]: Bearer token persistence (file-backed or in-memory)
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::Transport`]: Channel pair pumping frames over a WebSocket
//! - [`transport::connect`]: Open the socket

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
mod error;
pub mod rest;
pub mod token;

#[cfg(feature = "transport")]
pub mod transport;

pub use connection::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionStatus, DEFAULT_HANDSHAKE_TIMEOUT,
};
pub use error::ClientError;
pub use rest::{ChatApi, DEFAULT_REQUEST_TIMEOUT, RestClient, RestConfig, RestError};
pub use token::{FileTokenStore, MemoryTokenStore, TOKEN_KEY, TokenError, TokenStore};
