//! Text frame codec for the broker subprotocol.
//!
//! The realtime connection speaks a STOMP-shaped subprotocol: each WebSocket
//! text message carries exactly one frame. A frame is:
//!
//! ```text
//! COMMAND\n
//! name:value\n
//! name:value\n
//! \n
//! body\0
//! ```
//!
//! Header names and values escape `\`, CR, LF, and `:` as `\\`, `\r`, `\n`,
//! and `\c`. The body is carried verbatim (JSON for every frame this client
//! sends or consumes) and terminated by a NUL octet.
//!
//! # Invariants
//!
//! - Round trip: `Frame::decode(&frame.encode())` reproduces the frame for
//!   any header content, because escaping covers every delimiter character.
//! - First wins: when a header name repeats, [`Frame::header`] returns the
//!   first occurrence, matching broker behavior.
//! - A frame consisting only of EOL characters is a broker heartbeat and
//!   decodes to [`ProtocolError::EmptyFrame`] so transports can skip it
//!   silently instead of logging it as damage.

use crate::{
    errors::{ProtocolError, Result},
    ids::RoomId,
};

/// Fixed logical destination for outbound room messages.
pub const SEND_DESTINATION: &str = "/app/room.send";

/// Broadcast topic carrying one room's frames.
pub fn room_topic(room_id: RoomId) -> String {
    format!("/topic/room.{room_id}")
}

/// Frame commands this client sends or consumes.
///
/// Client-to-server: `Connect`, `Subscribe`, `Send`, `Disconnect`.
/// Server-to-client: `Connected`, `Message`, `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open a broker session (carries credentials).
    Connect,
    /// Broker acknowledgment completing the handshake.
    Connected,
    /// Register interest in a topic.
    Subscribe,
    /// Publish a message to a destination.
    Send,
    /// Close the broker session cleanly.
    Disconnect,
    /// Broadcast delivery from a subscribed topic.
    Message,
    /// Fatal broker-side failure; the server closes after sending it.
    Error,
}

impl Command {
    /// Wire spelling of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Send => "SEND",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Error => "ERROR",
        }
    }

    /// Parse a command line.
    ///
    /// # Errors
    ///
    /// `ProtocolError::UnknownCommand` for anything outside the set above;
    /// unknown commands are not skippable because the frame's role cannot be
    /// determined without them.
    pub fn parse(line: &str) -> Result<Self> {
        match line {
            "CONNECT" => Ok(Self::Connect),
            "CONNECTED" => Ok(Self::Connected),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "SEND" => Ok(Self::Send),
            "DISCONNECT" => Ok(Self::Disconnect),
            "MESSAGE" => Ok(Self::Message),
            "ERROR" => Ok(Self::Error),
            other => Err(ProtocolError::UnknownCommand { command: other.to_string() }),
        }
    }
}

/// One broker frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Headers in wire order. Names repeat; the first occurrence wins.
    pub headers: Vec<(String, String)>,
    /// Body, carried verbatim.
    pub body: String,
}

impl Frame {
    /// Create a bare frame with no headers and an empty body.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: String::new() }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// CONNECT frame opening a broker session.
    ///
    /// The bearer token rides in an `authorization` header, the same
    /// credential the REST layer sends.
    pub fn connect(token: Option<&str>) -> Self {
        let frame = Self::new(Command::Connect).with_header("accept-version", "1.2");
        match token {
            Some(token) => frame.with_header("authorization", format!("Bearer {token}")),
            None => frame,
        }
    }

    /// SUBSCRIBE frame for a topic.
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe).with_header("id", id).with_header("destination", destination)
    }

    /// SEND frame publishing a JSON body to a destination.
    pub fn send(destination: &str, body: impl Into<String>) -> Self {
        Self::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    /// DISCONNECT frame closing the session cleanly.
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// First value of the named header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(header, _)| header == name).map(|(_, value)| value.as_str())
    }

    /// Encode to the wire text form, NUL terminator included.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.body.len().saturating_add(64));
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(&escape_header(name));
            out.push(':');
            out.push_str(&escape_header(value));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decode one frame from a WebSocket text message.
    ///
    /// Tolerates a missing NUL terminator and CRLF line endings; both occur
    /// in the wild across broker implementations.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::EmptyFrame`] for heartbeat frames (EOLs only).
    /// - [`ProtocolError::UnknownCommand`] for an unrecognized command line.
    /// - [`ProtocolError::MalformedHeader`] for a header line without `:`.
    /// - [`ProtocolError::BadEscape`] / [`ProtocolError::TruncatedEscape`]
    ///   for invalid header escaping.
    pub fn decode(raw: &str) -> Result<Self> {
        let text = raw.strip_suffix('\0').unwrap_or(raw);
        if text.trim_matches(['\n', '\r']).is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }

        let (command_line, mut rest) = text.split_once('\n').unwrap_or((text, ""));
        let command = Command::parse(command_line.trim_end_matches('\r'))?;

        let mut headers = Vec::new();
        loop {
            let (line, tail) = match rest.split_once('\n') {
                Some(parts) => parts,
                None => (rest, ""),
            };
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                // Blank line (or end of input): everything after is the body.
                rest = tail;
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ProtocolError::MalformedHeader { line: line.to_string() })?;
            headers.push((unescape_header(name)?, unescape_header(value)?));
            rest = tail;
        }

        Ok(Self { command, headers, body: rest.to_string() })
    }
}

fn escape_header(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some(found) => return Err(ProtocolError::BadEscape { found }),
            None => return Err(ProtocolError::TruncatedEscape),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arbitrary_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            Just(Command::Connect),
            Just(Command::Connected),
            Just(Command::Subscribe),
            Just(Command::Send),
            Just(Command::Disconnect),
            Just(Command::Message),
            Just(Command::Error),
        ]
    }

    impl Arbitrary for Frame {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            // Bodies come from any::<String>() so newlines and NULs are
            // exercised; header text comes from regex strategies.
            (arbitrary_command(), prop::collection::vec((".*", ".*"), 0..8), any::<String>())
                .prop_map(|(command, headers, body)| Self { command, headers, body })
                .boxed()
        }
    }

    proptest! {
        #[test]
        fn frame_round_trip(frame in any::<Frame>()) {
            let wire = frame.encode();
            let parsed = Frame::decode(&wire).unwrap();
            prop_assert_eq!(parsed, frame);
        }
    }

    #[test]
    fn decode_connected() {
        let frame = Frame::decode("CONNECTED\nversion:1.2\n\n\0").unwrap();
        assert_eq!(frame.command, Command::Connected);
        assert_eq!(frame.header("version"), Some("1.2"));
        assert_eq!(frame.body, "");
    }

    #[test]
    fn decode_message_with_json_body() {
        let wire = "MESSAGE\ndestination:/topic/room.7\nsubscription:sub-0\n\n{\"id\":1}\0";
        let frame = Frame::decode(wire).unwrap();
        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.header("destination"), Some("/topic/room.7"));
        assert_eq!(frame.body, "{\"id\":1}");
    }

    #[test]
    fn decode_tolerates_crlf_and_missing_null() {
        let frame = Frame::decode("CONNECTED\r\nversion:1.2\r\n\r\n").unwrap();
        assert_eq!(frame.command, Command::Connected);
        assert_eq!(frame.header("version"), Some("1.2"));
    }

    #[test]
    fn heartbeat_is_empty_frame() {
        assert_eq!(Frame::decode("\n"), Err(ProtocolError::EmptyFrame));
        assert_eq!(Frame::decode("\r\n\r\n"), Err(ProtocolError::EmptyFrame));
    }

    #[test]
    fn unknown_command_rejected() {
        let result = Frame::decode("NACK\n\n\0");
        assert!(matches!(result, Err(ProtocolError::UnknownCommand { .. })));
    }

    #[test]
    fn header_without_colon_rejected() {
        let result = Frame::decode("MESSAGE\nnot a header\n\n\0");
        assert!(matches!(result, Err(ProtocolError::MalformedHeader { .. })));
    }

    #[test]
    fn colon_in_value_survives_round_trip() {
        let frame = Frame::new(Command::Connect).with_header("authorization", "Bearer a:b:c");
        let parsed = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(parsed.header("authorization"), Some("Bearer a:b:c"));
    }

    #[test]
    fn first_header_occurrence_wins() {
        let frame = Frame::new(Command::Message)
            .with_header("destination", "/topic/room.1")
            .with_header("destination", "/topic/room.2");
        assert_eq!(frame.header("destination"), Some("/topic/room.1"));
    }

    #[test]
    fn connect_carries_bearer_token() {
        let frame = Frame::connect(Some("tok-123"));
        assert_eq!(frame.header("authorization"), Some("Bearer tok-123"));
        assert_eq!(frame.header("accept-version"), Some("1.2"));
    }

    #[test]
    fn room_topic_shape() {
        assert_eq!(room_topic(42), "/topic/room.42");
    }
}
