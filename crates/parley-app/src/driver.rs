//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the room runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use parley_proto::Frame;

use crate::{RoomAction, RoomApp};

/// Abstracts I/O operations for the room runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in production and in simulation.
///
/// # Implementations
///
/// - **Socket**: `SocketDriver` pairs a WebSocket transport with a UI
///   command channel (behind the `transport` feature)
/// - **Simulation**: scripted drivers with virtual time and canned frames
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Wait briefly for user input and apply it to the machine.
    ///
    /// Translates whatever the platform considers input into calls on the
    /// machine's intent methods and returns the resulting actions. With no
    /// input pending this should time out and return the machine's
    /// response to [`RoomEvent::Tick`](crate::RoomEvent::Tick) so the
    /// runtime keeps cycling.
    fn poll_event(
        &mut self,
        app: &mut RoomApp,
    ) -> impl Future<Output = Result<Vec<RoomAction>, Self::Error>> + Send;

    /// Send a frame to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or send fails.
    fn send_frame(&mut self, frame: Frame) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive a frame from the server without blocking.
    ///
    /// Returns `None` when nothing is ready this cycle. A closed socket is
    /// visible as [`is_connected`](Driver::is_connected) turning false.
    fn recv_frame(&mut self) -> impl Future<Output = Option<Frame>> + Send;

    /// Establish the socket connection to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    fn connect(&mut self, url: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Check if the socket to the server is up.
    fn is_connected(&self) -> bool;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the room state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &RoomApp) -> Result<(), Self::Error>;

    /// Stop the connection and clean up resources.
    fn stop(&mut self);
}
