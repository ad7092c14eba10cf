//! Generic runtime for room orchestration.
//!
//! The Runtime drives the room event loop, coordinating between:
//! - [`RoomApp`]: room state machine
//! - [`Connection`]: session machine for the realtime socket
//! - [`Driver`]: platform-specific I/O
//! - [`ChatApi`]: REST backend for bootstrap and room operations
//!
//! One loop cycle polls the driver for input, drains at most one inbound
//! frame, and advances the session machine's clock. REST operations run
//! inline, suspending the cycle until the backend answers, so at most one
//! room operation is in flight at any time.

use parley_client::{
    ChatApi, Connection, ConnectionAction, ConnectionConfig, ConnectionStatus, RestError,
};
use parley_proto::{
    ChatMessage, Frame, OutboundMessage, RoomId, SEND_DESTINATION, room_topic,
};
use tracing::{debug, warn};

use crate::{
    AppConfig, Driver, EntryContext, Liveness, RoomAction, RoomApp, RoomEvent, bootstrap,
};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// WebSocket endpoint for the realtime session.
    pub ws_url: String,
    /// Bearer token for the session handshake. With no token the socket
    /// stage is skipped and the room stays read-only.
    pub token: Option<String>,
    /// Room machine configuration.
    pub app: AppConfig,
    /// Session machine configuration.
    pub connection: ConnectionConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://127.0.0.1:8080/ws".to_string(),
            token: None,
            app: AppConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }
}

/// Generic runtime that orchestrates the machine, session, and driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `A`: REST backend
pub struct Runtime<D, A>
where
    D: Driver,
    A: ChatApi,
{
    driver: D,
    api: A,
    app: RoomApp,
    connection: Connection<D::Instant>,
    liveness: Liveness,
    room_id: RoomId,
    config: RuntimeConfig,
}

impl<D, A> Runtime<D, A>
where
    D: Driver,
    A: ChatApi,
{
    /// Create a new runtime for one room visit.
    pub fn new(driver: D, api: A, room_id: RoomId, entry: EntryContext, config: RuntimeConfig) -> Self {
        let app = RoomApp::new(room_id, entry, config.app.clone());
        let connection = Connection::new(config.connection.clone());
        Self { driver, api, app, connection, liveness: Liveness::new(), room_id, config }
    }

    /// Liveness flag for this visit.
    ///
    /// Cloning it lets an embedder stop the bootstrap from outside, for
    /// example when the user navigates away mid-load.
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// Run the room until it closes and return the final machine state.
    ///
    /// The sequence is: render once, bootstrap over REST, open the socket,
    /// then cycle until a [`RoomAction::CloseRoom`] surfaces. Fatal
    /// bootstrap failures close the room before the socket stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<RoomApp, D::Error> {
        self.driver.render(&self.app)?;

        let need_counterpart = self.app.session().counterpart.is_none();
        let events = bootstrap(&self.api, self.room_id, need_counterpart, &self.liveness).await;
        let closed = self.process_events(events).await?;

        if !closed {
            self.connect().await?;
            loop {
                let should_close = self.process_cycle().await?;
                if should_close {
                    break;
                }
            }
        }

        self.liveness.dismiss();
        self.teardown().await;
        Ok(self.app)
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the room closed.
    async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        let actions = self.driver.poll_event(&mut self.app).await?;
        if !actions.is_empty() && self.process_actions(actions).await? {
            return Ok(true);
        }

        if self.driver.is_connected() {
            if let Some(frame) = self.driver.recv_frame().await
                && self.handle_inbound(frame).await?
            {
                return Ok(true);
            }
        } else if matches!(
            self.connection.status(),
            ConnectionStatus::Connecting | ConnectionStatus::Connected
        ) && self.handle_socket_closed().await?
        {
            return Ok(true);
        }

        self.tick().await
    }

    /// Feed one inbound frame through the session machine.
    async fn handle_inbound(&mut self, frame: Frame) -> Result<bool, D::Error> {
        let was = self.connection.status();

        let connection_actions = match self.connection.handle_frame(&frame) {
            Ok(actions) => actions,
            Err(error) => {
                warn!(%error, "dropping unexpected frame");
                return Ok(false);
            },
        };

        let mut events = Vec::new();
        for action in connection_actions {
            match action {
                ConnectionAction::SendFrame(frame) => self.driver.send_frame(frame).await?,
                ConnectionAction::Deliver(delivered) => {
                    match ChatMessage::from_json(&delivered.body) {
                        Ok(message) => events.push(RoomEvent::MessageReceived { message }),
                        Err(error) => warn!(%error, "dropping malformed message body"),
                    }
                },
                ConnectionAction::Close { reason } => {
                    debug!(reason, "session machine closed the socket");
                    self.driver.stop();
                },
            }
        }

        let now = self.connection.status();
        if was != ConnectionStatus::Connected && now == ConnectionStatus::Connected {
            match self.connection.subscribe(&room_topic(self.room_id)) {
                Ok(actions) => self.send_connection_frames(actions).await?,
                Err(error) => warn!(%error, "subscribe refused"),
            }
            events.push(RoomEvent::Connected);
        }
        if was != ConnectionStatus::Error && now == ConnectionStatus::Error {
            events.push(RoomEvent::ConnectionFailed { message: self.session_error() });
        }

        self.process_events(events).await
    }

    /// React to the socket dropping out from under the session machine.
    async fn handle_socket_closed(&mut self) -> Result<bool, D::Error> {
        let was = self.connection.status();
        self.connection.socket_closed();

        let event = match (was, self.connection.status()) {
            (ConnectionStatus::Connected, _) => RoomEvent::Disconnected,
            (_, ConnectionStatus::Error) => {
                RoomEvent::ConnectionFailed { message: self.session_error() }
            },
            _ => return Ok(false),
        };
        self.process_events(vec![event]).await
    }

    /// Advance the session machine's clock.
    async fn tick(&mut self) -> Result<bool, D::Error> {
        let was = self.connection.status();
        let actions = self.connection.tick(self.driver.now());
        self.send_connection_frames(actions).await?;

        if was == ConnectionStatus::Connecting
            && self.connection.status() == ConnectionStatus::Error
        {
            return self
                .process_events(vec![RoomEvent::ConnectionFailed {
                    message: self.session_error(),
                }])
                .await;
        }
        Ok(false)
    }

    /// Process actions returned by the machine.
    ///
    /// Returns `true` if the room closed.
    async fn process_actions(&mut self, initial_actions: Vec<RoomAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    RoomAction::Render => self.driver.render(&self.app)?,
                    RoomAction::CloseRoom { reason } => {
                        debug!(?reason, "room closed");
                        return Ok(true);
                    },
                    RoomAction::Publish { message } => self.publish(&message).await?,
                    RoomAction::Propose { request } => {
                        let event = match self.api.propose(self.room_id, &request).await {
                            Ok(snapshot) => RoomEvent::ProposalOpened { snapshot },
                            Err(error) => operation_failed("propose", &error),
                        };
                        pending_actions.extend(self.app.handle(event));
                    },
                    RoomAction::Accept { proposal_id } => {
                        let event = match self.api.accept_proposal(proposal_id).await {
                            Ok(snapshot) => RoomEvent::ProposalAccepted {
                                proposal_id: snapshot.proposal_id.or(Some(proposal_id)),
                                can_review: snapshot.can_review.then_some(true),
                            },
                            Err(error) => operation_failed("accept", &error),
                        };
                        pending_actions.extend(self.app.handle(event));
                    },
                    RoomAction::Reject { proposal_id } => {
                        let event = match self.api.reject_proposal(proposal_id).await {
                            Ok(snapshot) => RoomEvent::ProposalRejected {
                                proposal_id: snapshot.proposal_id.or(Some(proposal_id)),
                            },
                            Err(error) => operation_failed("reject", &error),
                        };
                        pending_actions.extend(self.app.handle(event));
                    },
                    RoomAction::Leave => {
                        let event = match self.api.leave_room(self.room_id).await {
                            Ok(()) => RoomEvent::RoomLeft,
                            Err(error) => operation_failed("leave", &error),
                        };
                        pending_actions.extend(self.app.handle(event));
                    },
                }
            }
        }
        Ok(false)
    }

    /// Process events from the session layer back through the machine.
    async fn process_events(&mut self, events: Vec<RoomEvent>) -> Result<bool, D::Error> {
        for event in events {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Process actions synchronously (for use in sync contexts).
    fn process_actions_sync(&mut self, actions: Vec<RoomAction>) {
        for action in actions {
            match action {
                RoomAction::Render => {
                    if let Err(error) = self.driver.render(&self.app) {
                        warn!(%error, "failed to render");
                    }
                },
                other => warn!(?other, "unexpected action in sync context"),
            }
        }
    }

    /// Open the socket and start the session handshake.
    ///
    /// Connection failures are not fatal to the runtime: the machine shows
    /// the failure and the room stays open for reading.
    async fn connect(&mut self) -> Result<(), D::Error> {
        let actions = self.app.handle(RoomEvent::Connecting);
        self.process_actions_sync(actions);

        if let Err(error) = self.driver.connect(&self.config.ws_url).await {
            warn!(%error, "socket connect failed");
            let actions = self
                .app
                .handle(RoomEvent::ConnectionFailed { message: error.to_string() });
            self.process_actions_sync(actions);
            return Ok(());
        }

        let Some(token) = self.config.token.as_deref() else {
            warn!("no session token, skipping handshake");
            let actions = self.app.handle(RoomEvent::ConnectionFailed {
                message: "no session token".to_string(),
            });
            self.process_actions_sync(actions);
            return Ok(());
        };

        match self.connection.connect(token, self.driver.now()) {
            Ok(actions) => self.send_connection_frames(actions).await?,
            Err(error) => warn!(%error, "handshake refused by session machine"),
        }
        Ok(())
    }

    /// Encode and publish one outbound message through the session.
    async fn publish(&mut self, message: &OutboundMessage) -> Result<(), D::Error> {
        let body = match serde_json::to_string(message) {
            Ok(body) => body,
            Err(error) => {
                warn!(%error, "failed to encode outbound message");
                return Ok(());
            },
        };

        match self.connection.publish(SEND_DESTINATION, &body) {
            Ok(actions) => self.send_connection_frames(actions).await,
            Err(error) => {
                warn!(%error, "publish refused while not connected");
                Ok(())
            },
        }
    }

    /// Execute frame sends and closes issued by the session machine.
    ///
    /// `Deliver` never appears here: only `handle_frame` produces it and
    /// the inbound path consumes it directly.
    async fn send_connection_frames(
        &mut self,
        actions: Vec<ConnectionAction>,
    ) -> Result<(), D::Error> {
        for action in actions {
            match action {
                ConnectionAction::SendFrame(frame) => self.driver.send_frame(frame).await?,
                ConnectionAction::Close { reason } => {
                    debug!(reason, "session machine closed the socket");
                    self.driver.stop();
                },
                ConnectionAction::Deliver(frame) => {
                    warn!(command = ?frame.command, "unexpected deliver outside the inbound path");
                },
            }
        }
        Ok(())
    }

    /// Best-effort socket goodbye once the room is done.
    async fn teardown(&mut self) {
        let actions = self.connection.disconnect();
        if let Err(error) = self.send_connection_frames(actions).await {
            debug!(%error, "disconnect send failed");
        }
        self.driver.stop();
    }

    /// The session machine's error text, with a generic fallback.
    fn session_error(&self) -> String {
        self.connection.last_error().unwrap_or("session error").to_string()
    }

    /// Get a reference to the machine.
    pub fn app(&self) -> &RoomApp {
        &self.app
    }

    /// Get a mutable reference to the machine.
    pub fn app_mut(&mut self) -> &mut RoomApp {
        &mut self.app
    }
}

/// Log a failed REST operation and fold it into an event.
fn operation_failed(operation: &'static str, error: &RestError) -> RoomEvent {
    warn!(%error, operation, "room operation failed");
    RoomEvent::OperationFailed { operation, message: error.to_string() }
}
