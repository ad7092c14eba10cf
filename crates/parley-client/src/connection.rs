//! Realtime connection state machine.
//!
//! Manages the subscribe/publish session lifecycle over the text frame
//! protocol. Uses the action pattern: methods take time as input and return
//! actions for the driver to execute. This keeps the state machine pure (no
//! I/O) and makes testing straightforward.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐  connect   ┌────────────┐  CONNECTED   ┌───────────┐
//! │ Idle │───────────>│ Connecting │─────────────>│ Connected │
//! └──────┘            └────────────┘              └───────────┘
//!    ↑                      │                           │
//!    │                      │ ERROR / timeout           │ disconnect /
//!    │                      │ / socket close            │ socket close
//!    │                      ↓                           │
//!    │                 ┌───────┐                        │
//!    │                 │ Error │ (connect starts over)  │
//!    │                 └───────┘                        │
//!    └──────────────────────────────────────────────────┘
//! ```
//!
//! There is no automatic reconnect: a failed handshake parks the machine in
//! [`ConnectionStatus::Error`] until the user retries with another `connect`.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use parley_proto::{Command, Frame};

use crate::error::ClientError;

/// Time allowed to complete the CONNECT/CONNECTED handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Actions returned by the connection state machine.
///
/// The driver (test harness or production runtime) executes these actions:
/// - `SendFrame`: Encode and send the frame over the transport
/// - `Deliver`: Hand an inbound MESSAGE frame to the application layer
/// - `Close`: Close the underlying socket with the given reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Send this frame to the server
    SendFrame(Frame),

    /// Deliver this inbound frame to the application
    Deliver(Frame),

    /// Close the connection with this reason
    Close {
        /// Reason for closing the connection
        reason: String,
    },
}

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No session active and none being established
    Idle,
    /// CONNECT sent, waiting for CONNECTED
    Connecting,
    /// Handshake complete, subscribe/publish allowed
    Connected,
    /// Session failed (handshake error, server ERROR, lost socket)
    Error,
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for completing the handshake
    pub handshake_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT }
    }
}

/// Connection state machine.
///
/// Tracks the session lifecycle for a single room view. This is a pure state
/// machine: no sockets, no clock of its own. Time is passed as parameters to
/// the methods that need it.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Current status
    status: ConnectionStatus,
    /// Configuration
    config: ConnectionConfig,
    /// When the active handshake started
    connect_started: Option<I>,
    /// Why the machine entered [`ConnectionStatus::Error`]
    last_error: Option<String>,
    /// Session identifier echoed by the server, when it sends one
    session: Option<String>,
    /// Destinations with a live subscription
    subscriptions: Vec<String>,
    /// Counter for generated subscription ids
    next_subscription: u64,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a new connection in [`ConnectionStatus::Idle`].
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            status: ConnectionStatus::Idle,
            config,
            connect_started: None,
            last_error: None,
            session: None,
            subscriptions: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Current connection status
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Session identifier from the CONNECTED frame. `None` until connected or
    /// when the server omits it.
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Why the machine last entered [`ConnectionStatus::Error`].
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Maximum time allowed for handshake completion.
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        self.config.handshake_timeout
    }

    /// Start the handshake.
    ///
    /// Transitions to Connecting and returns the CONNECT frame carrying the
    /// bearer token. Allowed from Idle and from Error (user-driven retry);
    /// a retry starts a fresh session with no surviving subscriptions.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidState`] if a session is already connecting or
    ///   connected
    pub fn connect(&mut self, token: &str, now: I) -> Result<Vec<ConnectionAction>, ClientError> {
        match self.status {
            ConnectionStatus::Idle | ConnectionStatus::Error => {},
            status => {
                return Err(ClientError::InvalidState {
                    status,
                    operation: "connect".to_string(),
                });
            },
        }

        self.status = ConnectionStatus::Connecting;
        self.connect_started = Some(now);
        self.last_error = None;
        self.session = None;
        self.subscriptions.clear();

        Ok(vec![ConnectionAction::SendFrame(Frame::connect(Some(token)))])
    }

    /// Subscribe to a destination.
    ///
    /// Emits SUBSCRIBE with a generated subscription id. Subscribing to a
    /// destination that is already live is a no-op.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidState`] if not connected
    pub fn subscribe(&mut self, destination: &str) -> Result<Vec<ConnectionAction>, ClientError> {
        if self.status != ConnectionStatus::Connected {
            return Err(ClientError::InvalidState {
                status: self.status,
                operation: "subscribe".to_string(),
            });
        }

        if self.subscriptions.iter().any(|d| d == destination) {
            return Ok(vec![]);
        }

        let id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.push(destination.to_string());

        Ok(vec![ConnectionAction::SendFrame(Frame::subscribe(&id, destination))])
    }

    /// Publish a body to a destination. Fire-and-forget: no receipt is
    /// requested and there is no internal queue.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidState`] if not connected; callers decide
    ///   whether to drop or surface the refused publish
    pub fn publish(
        &mut self,
        destination: &str,
        body: &str,
    ) -> Result<Vec<ConnectionAction>, ClientError> {
        if self.status != ConnectionStatus::Connected {
            return Err(ClientError::InvalidState {
                status: self.status,
                operation: "publish".to_string(),
            });
        }

        Ok(vec![ConnectionAction::SendFrame(Frame::send(destination, body))])
    }

    /// Process an inbound frame and update state.
    ///
    /// CONNECTED completes the handshake, MESSAGE yields a
    /// [`ConnectionAction::Deliver`], ERROR fails the session and closes.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnexpectedFrame`] if the command is not valid for the
    ///   current status. The session is unchanged; callers log and drop the
    ///   frame rather than tearing down.
    pub fn handle_frame(&mut self, frame: &Frame) -> Result<Vec<ConnectionAction>, ClientError> {
        match (self.status, frame.command) {
            (ConnectionStatus::Connecting, Command::Connected) => {
                self.status = ConnectionStatus::Connected;
                self.connect_started = None;
                self.session = frame.header("session").map(str::to_owned);
                Ok(vec![])
            },

            (ConnectionStatus::Connected, Command::Message) => {
                Ok(vec![ConnectionAction::Deliver(frame.clone())])
            },

            (
                ConnectionStatus::Connecting | ConnectionStatus::Connected,
                Command::Error,
            ) => {
                let reason = error_reason(frame);
                self.status = ConnectionStatus::Error;
                self.last_error = Some(reason.clone());
                self.subscriptions.clear();
                Ok(vec![ConnectionAction::Close { reason }])
            },

            (status, command) => Err(ClientError::UnexpectedFrame { status, command }),
        }
    }

    /// Record that the underlying socket closed.
    ///
    /// A close while connected is a clean end of session (back to Idle); a
    /// close during the handshake is a failure.
    pub fn socket_closed(&mut self) {
        match self.status {
            ConnectionStatus::Connected => {
                self.status = ConnectionStatus::Idle;
                self.session = None;
                self.subscriptions.clear();
            },
            ConnectionStatus::Connecting => {
                self.status = ConnectionStatus::Error;
                self.connect_started = None;
                self.last_error = Some("connection closed during handshake".to_string());
            },
            ConnectionStatus::Idle | ConnectionStatus::Error => {},
        }
    }

    /// End the session gracefully. Idempotent from any state and safe before
    /// the handshake completes; DISCONNECT is only sent when a handshake had
    /// completed.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        match self.status {
            ConnectionStatus::Connected => {
                self.status = ConnectionStatus::Idle;
                self.session = None;
                self.subscriptions.clear();
                vec![
                    ConnectionAction::SendFrame(Frame::disconnect()),
                    ConnectionAction::Close { reason: "client disconnect".to_string() },
                ]
            },
            ConnectionStatus::Connecting => {
                self.status = ConnectionStatus::Idle;
                self.connect_started = None;
                vec![ConnectionAction::Close { reason: "connect aborted".to_string() }]
            },
            ConnectionStatus::Idle | ConnectionStatus::Error => vec![],
        }
    }

    /// Elapsed handshake time, if the deadline is exceeded. `None` otherwise.
    #[must_use]
    pub fn check_timeout(&self, now: I) -> Option<Duration> {
        if self.status != ConnectionStatus::Connecting {
            return None;
        }
        let started = self.connect_started?;
        let elapsed = now - started;
        if elapsed > self.config.handshake_timeout { Some(elapsed) } else { None }
    }

    /// Process periodic maintenance.
    ///
    /// Call this periodically while connecting; a handshake older than the
    /// configured deadline resolves to Error instead of hanging forever.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        let Some(elapsed) = self.check_timeout(now) else {
            return vec![];
        };

        let reason = format!("handshake timeout after {elapsed:?}");
        self.status = ConnectionStatus::Error;
        self.connect_started = None;
        self.last_error = Some(reason.clone());
        vec![ConnectionAction::Close { reason }]
    }
}

/// Best reason string an ERROR frame offers.
fn error_reason(frame: &Frame) -> String {
    frame
        .header("message")
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
        .or_else(|| frame.body.lines().next().filter(|l| !l.trim().is_empty()).map(str::to_owned))
        .unwrap_or_else(|| "server error".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn connected_frame() -> Frame {
        Frame::new(Command::Connected).with_header("version", "1.2").with_header("session", "s-1")
    }

    fn connected_machine(t0: Instant) -> Connection {
        let mut conn = Connection::new(ConnectionConfig::default());
        conn.connect("tok", t0).unwrap();
        conn.handle_frame(&connected_frame()).unwrap();
        conn
    }

    #[test]
    fn connection_lifecycle() {
        let t0 = Instant::now();
        let mut conn = Connection::new(ConnectionConfig::default());

        assert_eq!(conn.status(), ConnectionStatus::Idle);
        assert_eq!(conn.session(), None);

        let actions = conn.connect("tok", t0).unwrap();
        assert_eq!(conn.status(), ConnectionStatus::Connecting);
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            ConnectionAction::SendFrame(frame) => {
                assert_eq!(frame.command, Command::Connect);
                assert_eq!(frame.header("authorization"), Some("Bearer tok"));
            },
            other => panic!("expected SendFrame(CONNECT), got {other:?}"),
        }

        let actions = conn.handle_frame(&connected_frame()).unwrap();
        assert_eq!(conn.status(), ConnectionStatus::Connected);
        assert_eq!(conn.session(), Some("s-1"));
        assert!(actions.is_empty());

        let actions = conn.disconnect();
        assert_eq!(conn.status(), ConnectionStatus::Idle);
        assert_eq!(actions.len(), 2);
        assert!(matches!(
            &actions[0],
            ConnectionAction::SendFrame(frame) if frame.command == Command::Disconnect
        ));
        assert!(matches!(actions[1], ConnectionAction::Close { .. }));
    }

    #[test]
    fn connect_rejected_while_active() {
        let t0 = Instant::now();
        let mut conn = Connection::new(ConnectionConfig::default());
        conn.connect("tok", t0).unwrap();

        let result = conn.connect("tok", t0);
        assert!(matches!(result, Err(ClientError::InvalidState { .. })));

        conn.handle_frame(&connected_frame()).unwrap();
        let result = conn.connect("tok", t0);
        assert!(matches!(result, Err(ClientError::InvalidState { .. })));
    }

    #[test]
    fn connect_allowed_again_after_error() {
        let t0 = Instant::now();
        let mut conn = Connection::new(ConnectionConfig::default());
        conn.connect("tok", t0).unwrap();

        let error = Frame::new(Command::Error).with_header("message", "auth rejected");
        let actions = conn.handle_frame(&error).unwrap();
        assert_eq!(conn.status(), ConnectionStatus::Error);
        assert_eq!(conn.last_error(), Some("auth rejected"));
        assert!(
            matches!(&actions[0], ConnectionAction::Close { reason } if reason == "auth rejected")
        );

        let actions = conn.connect("tok2", t0).unwrap();
        assert_eq!(conn.status(), ConnectionStatus::Connecting);
        assert_eq!(conn.last_error(), None);
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn subscribe_only_when_connected() {
        let t0 = Instant::now();
        let mut conn: Connection = Connection::new(ConnectionConfig::default());

        let result = conn.subscribe("/topic/room.7");
        assert!(matches!(result, Err(ClientError::InvalidState { .. })));

        let mut conn = connected_machine(t0);
        let actions = conn.subscribe("/topic/room.7").unwrap();
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            ConnectionAction::SendFrame(frame) => {
                assert_eq!(frame.command, Command::Subscribe);
                assert_eq!(frame.header("id"), Some("sub-0"));
                assert_eq!(frame.header("destination"), Some("/topic/room.7"));
            },
            other => panic!("expected SendFrame(SUBSCRIBE), got {other:?}"),
        }
    }

    #[test]
    fn duplicate_subscribe_is_noop() {
        let t0 = Instant::now();
        let mut conn = connected_machine(t0);

        assert_eq!(conn.subscribe("/topic/room.7").unwrap().len(), 1);
        assert!(conn.subscribe("/topic/room.7").unwrap().is_empty());

        // A different destination still gets its own id.
        let actions = conn.subscribe("/topic/room.8").unwrap();
        match &actions[0] {
            ConnectionAction::SendFrame(frame) => {
                assert_eq!(frame.header("id"), Some("sub-1"));
            },
            other => panic!("expected SendFrame(SUBSCRIBE), got {other:?}"),
        }
    }

    #[test]
    fn publish_refused_when_not_connected() {
        let mut conn: Connection = Connection::new(ConnectionConfig::default());

        let result = conn.publish("/app/room.send", "{}");
        match result {
            Err(ClientError::InvalidState { status, operation }) => {
                assert_eq!(status, ConnectionStatus::Idle);
                assert_eq!(operation, "publish");
            },
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn publish_emits_send_frame() {
        let t0 = Instant::now();
        let mut conn = connected_machine(t0);

        let actions = conn.publish("/app/room.send", r#"{"roomId":7}"#).unwrap();
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            ConnectionAction::SendFrame(frame) => {
                assert_eq!(frame.command, Command::Send);
                assert_eq!(frame.header("destination"), Some("/app/room.send"));
                assert_eq!(frame.body, r#"{"roomId":7}"#);
            },
            other => panic!("expected SendFrame(SEND), got {other:?}"),
        }
    }

    #[test]
    fn message_delivered_only_when_connected() {
        let t0 = Instant::now();
        let mut conn = Connection::new(ConnectionConfig::default());
        conn.connect("tok", t0).unwrap();

        let message = Frame::new(Command::Message)
            .with_header("destination", "/topic/room.7")
            .with_body(r#"{"id":1}"#);

        // Still connecting: unexpected, session unchanged.
        let result = conn.handle_frame(&message);
        assert!(matches!(result, Err(ClientError::UnexpectedFrame { .. })));
        assert_eq!(conn.status(), ConnectionStatus::Connecting);

        conn.handle_frame(&connected_frame()).unwrap();
        let actions = conn.handle_frame(&message).unwrap();
        assert_eq!(actions, vec![ConnectionAction::Deliver(message)]);
    }

    #[test]
    fn error_reason_falls_back_to_body() {
        let t0 = Instant::now();
        let mut conn = connected_machine(t0);

        let error = Frame::new(Command::Error).with_body("broker unavailable\ndetails follow");
        let actions = conn.handle_frame(&error).unwrap();
        assert_eq!(conn.status(), ConnectionStatus::Error);
        assert!(matches!(
            &actions[0],
            ConnectionAction::Close { reason } if reason == "broker unavailable"
        ));
    }

    #[test]
    fn socket_close_while_connected_is_clean() {
        let t0 = Instant::now();
        let mut conn = connected_machine(t0);

        conn.socket_closed();
        assert_eq!(conn.status(), ConnectionStatus::Idle);
        assert_eq!(conn.last_error(), None);
        assert_eq!(conn.session(), None);
    }

    #[test]
    fn socket_close_during_handshake_is_failure() {
        let t0 = Instant::now();
        let mut conn = Connection::new(ConnectionConfig::default());
        conn.connect("tok", t0).unwrap();

        conn.socket_closed();
        assert_eq!(conn.status(), ConnectionStatus::Error);
        assert_eq!(conn.last_error(), Some("connection closed during handshake"));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let t0 = Instant::now();
        let mut conn: Connection = Connection::new(ConnectionConfig::default());
        assert!(conn.disconnect().is_empty());

        let mut conn = connected_machine(t0);
        assert_eq!(conn.disconnect().len(), 2);
        assert!(conn.disconnect().is_empty());
    }

    #[test]
    fn disconnect_before_handshake_sends_no_frame() {
        let t0 = Instant::now();
        let mut conn = Connection::new(ConnectionConfig::default());
        conn.connect("tok", t0).unwrap();

        let actions = conn.disconnect();
        assert_eq!(conn.status(), ConnectionStatus::Idle);
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], ConnectionAction::Close { .. }));
    }

    #[test]
    fn handshake_timeout_on_tick() {
        let t0 = Instant::now();
        let mut conn = Connection::new(ConnectionConfig::default());
        conn.connect("tok", t0).unwrap();

        // Before the deadline: nothing.
        assert!(conn.tick(t0 + Duration::from_secs(5)).is_empty());
        assert_eq!(conn.status(), ConnectionStatus::Connecting);

        let actions = conn.tick(t0 + Duration::from_secs(11));
        assert_eq!(conn.status(), ConnectionStatus::Error);
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            ConnectionAction::Close { reason } => {
                assert!(reason.starts_with("handshake timeout"), "reason: {reason}");
            },
            other => panic!("expected Close, got {other:?}"),
        }
    }

    #[test]
    fn tick_is_noop_when_connected() {
        let t0 = Instant::now();
        let mut conn = connected_machine(t0);

        assert!(conn.tick(t0 + Duration::from_secs(3600)).is_empty());
        assert_eq!(conn.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn stale_error_frame_while_idle_is_rejected_without_transition() {
        let mut conn: Connection = Connection::new(ConnectionConfig::default());

        let error = Frame::new(Command::Error).with_header("message", "late");
        let result = conn.handle_frame(&error);
        assert!(matches!(result, Err(ClientError::UnexpectedFrame { .. })));
        assert_eq!(conn.status(), ConnectionStatus::Idle);
        assert_eq!(conn.last_error(), None);
    }
}
