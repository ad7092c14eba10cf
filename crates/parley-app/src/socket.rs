//! Socket driver for embedding the room runtime.
//!
//! Implements the [`Driver`] trait on top of the WebSocket transport from
//! `parley-client`. User input arrives as [`UiCommand`] values over a
//! channel and rendering goes through a callback, so any frontend that can
//! send commands and draw snapshots can host a room.

use std::time::Instant;

use parley_client::transport::{self, Transport, TransportError};
use parley_proto::Frame;
use thiserror::Error;
use tokio::sync::mpsc::{Receiver, error::TryRecvError};

use crate::{Driver, RoomAction, RoomApp, RoomEvent};

/// Socket driver errors.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel send error.
    #[error("channel send error")]
    ChannelSend,
}

/// User intent delivered to the driver by the embedding frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    /// Send the composed text to the room.
    Send(String),
    /// Open a collaboration proposal.
    Propose,
    /// Accept the current proposal.
    Accept,
    /// Reject the current proposal.
    Reject,
    /// Leave the room for good.
    Leave,
    /// Close the view without leaving the room.
    Dismiss,
}

/// WebSocket driver implementing the [`Driver`] trait.
///
/// Holds the transport once connected, a command channel from the
/// frontend, and a render callback invoked with each state snapshot.
pub struct SocketDriver {
    transport: Option<Transport>,
    commands: Receiver<UiCommand>,
    render: Box<dyn FnMut(&RoomApp) + Send>,
}

impl SocketDriver {
    /// Create a new socket driver.
    pub fn new(
        commands: Receiver<UiCommand>,
        render: impl FnMut(&RoomApp) + Send + 'static,
    ) -> Self {
        Self { transport: None, commands, render: Box::new(render) }
    }
}

impl Driver for SocketDriver {
    type Error = SocketError;
    type Instant = Instant;

    async fn poll_event(&mut self, app: &mut RoomApp) -> Result<Vec<RoomAction>, Self::Error> {
        let timeout = tokio::time::Duration::from_millis(100);

        tokio::select! {
            biased;

            maybe_command = self.commands.recv() => {
                match maybe_command {
                    Some(UiCommand::Send(text)) => Ok(app.send_text(&text)),
                    Some(UiCommand::Propose) => Ok(app.propose()),
                    Some(UiCommand::Accept) => Ok(app.accept_proposal()),
                    Some(UiCommand::Reject) => Ok(app.reject_proposal()),
                    Some(UiCommand::Leave) => Ok(app.leave()),
                    // A closed command channel means the frontend is gone.
                    Some(UiCommand::Dismiss) | None => Ok(app.dismiss()),
                }
            }

            // Tick timeout
            () = tokio::time::sleep(timeout) => {
                Ok(app.handle(RoomEvent::Tick))
            }
        }
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), Self::Error> {
        if let Some(transport) = &self.transport {
            transport.to_server.send(frame).await.map_err(|_| SocketError::ChannelSend)?;
        }
        Ok(())
    }

    async fn recv_frame(&mut self) -> Option<Frame> {
        let transport = self.transport.as_mut()?;
        match transport.from_server.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                // The reader task ended, so the socket is gone.
                self.transport = None;
                None
            },
        }
    }

    async fn connect(&mut self, url: &str) -> Result<(), Self::Error> {
        let transport = transport::connect(url).await?;
        self.transport = Some(transport);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn render(&mut self, app: &RoomApp) -> Result<(), Self::Error> {
        (self.render)(app);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(ref transport) = self.transport {
            transport.stop();
        }
    }
}

impl Drop for SocketDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
