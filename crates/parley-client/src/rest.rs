//! REST collaborators for room bootstrap and proposal workflow.
//!
//! One thin client wraps every backend call: bearer auth injected when a
//! token is present, JSON in and out, a client-level request timeout. The
//! response path is deliberately tolerant: read the body as text, parse as
//! JSON, and fall back to wrapping the raw text as `{"message": <text>}` so
//! a misbehaving gateway still yields something displayable.
//!
//! [`ChatApi`] is the seam the orchestration layer depends on; tests swap in
//! a mock, production uses [`RestClient`].

use std::time::Duration;

use reqwest::{Method, header::ACCEPT};
use serde_json::{Value, json};
use tracing::warn;

use parley_proto::{
    ChatMessage, ProposalId, ProposalSnapshot, ProposeRequest, RoomEntry, RoomId, UserProfile,
};

use thiserror::Error;

use crate::token::TokenStore;

/// Default client-level timeout for one REST request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from REST calls.
#[derive(Debug, Error)]
pub enum RestError {
    /// Request never produced a usable response (DNS, socket, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("{message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Backend `message` field when present, else "METHOD path -> status"
        message: String,
    },

    /// Response body had a shape no tolerant reading could use.
    #[error("unexpected {what} payload: {detail}")]
    Decode {
        /// Which payload failed
        what: &'static str,
        /// What was wrong with it
        detail: String,
    },
}

/// REST client configuration.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL of the backend, scheme included, no trailing slash required
    pub base_url: String,
    /// Client-level timeout applied to every request
    pub request_timeout: Duration,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Backend operations the orchestration layer depends on.
///
/// Implemented by [`RestClient`] for production and by in-memory mocks in
/// tests. Methods return `impl Future` so implementations stay free of boxed
/// futures.
pub trait ChatApi {
    /// Fetch the authenticated user's profile.
    fn fetch_me(&self) -> impl Future<Output = Result<UserProfile, RestError>> + Send;

    /// Fetch the room list for the authenticated user.
    fn fetch_rooms(&self) -> impl Future<Output = Result<Vec<RoomEntry>, RestError>> + Send;

    /// Fetch the persisted message history of one room, oldest first.
    fn fetch_history(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, RestError>> + Send;

    /// Fetch the proposal state linked to one room.
    fn fetch_proposal(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<ProposalSnapshot, RestError>> + Send;

    /// Create a collaboration proposal in one room.
    fn propose(
        &self,
        room_id: RoomId,
        request: &ProposeRequest,
    ) -> impl Future<Output = Result<ProposalSnapshot, RestError>> + Send;

    /// Accept a pending proposal.
    fn accept_proposal(
        &self,
        proposal_id: ProposalId,
    ) -> impl Future<Output = Result<ProposalSnapshot, RestError>> + Send;

    /// Reject a pending proposal.
    fn reject_proposal(
        &self,
        proposal_id: ProposalId,
    ) -> impl Future<Output = Result<ProposalSnapshot, RestError>> + Send;

    /// Leave a room. Idempotent: leaving a room that is already gone
    /// succeeds.
    fn leave_room(&self, room_id: RoomId) -> impl Future<Output = Result<(), RestError>> + Send;
}

/// HTTP implementation of [`ChatApi`].
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    config: RestConfig,
    token: Option<String>,
}

impl RestClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// - [`RestError::Transport`] if the underlying HTTP client cannot be
    ///   constructed
    pub fn new(config: RestConfig) -> Result<Self, RestError> {
        let http = reqwest::Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { http, config, token: None })
    }

    /// Build a client with the bearer token loaded from a [`TokenStore`].
    ///
    /// An unreadable store is logged and treated as "no token": requests go
    /// out unauthenticated until [`Self::set_token`] provides one.
    ///
    /// # Errors
    ///
    /// - [`RestError::Transport`] if the underlying HTTP client cannot be
    ///   constructed
    pub fn with_store(config: RestConfig, store: &impl TokenStore) -> Result<Self, RestError> {
        let mut client = Self::new(config)?;
        match store.load() {
            Ok(token) => client.token = token,
            Err(error) => warn!(%error, "token store unreadable, starting unauthenticated"),
        }
        Ok(client)
    }

    /// Set or clear the bearer token injected into every request.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// The bearer token currently injected, if any. The realtime handshake
    /// sends the same credential.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// WebSocket endpoint derived from the base URL (`http` becomes `ws`,
    /// `https` becomes `wss`).
    #[must_use]
    pub fn websocket_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let ws = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws}/ws")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Issue one request and normalize the response into JSON.
    ///
    /// Non-2xx statuses surface the backend `message` field when present,
    /// else a uniform "METHOD path -> status" string.
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        method: &Method,
        path: &str,
    ) -> Result<Value, RestError> {
        let mut request = request.header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body = serde_json::from_str::<Value>(&text)
            .unwrap_or_else(|_| json!({ "message": text }));

        if status.is_success() {
            return Ok(body);
        }

        let message = body
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map_or_else(
                || format!("{method} {path} -> {}", status.as_u16()),
                str::to_owned,
            );
        Err(RestError::Api { status: status.as_u16(), message })
    }
}

impl ChatApi for RestClient {
    async fn fetch_me(&self) -> Result<UserProfile, RestError> {
        let path = "/api/me";
        let body = self.execute(self.http.get(self.url(path)), &Method::GET, path).await?;
        Ok(UserProfile::from_value(&body))
    }

    async fn fetch_rooms(&self) -> Result<Vec<RoomEntry>, RestError> {
        let path = "/api/chat/my-rooms";
        let body = self.execute(self.http.get(self.url(path)), &Method::GET, path).await?;

        let Some(list) = entries(&body, &["rooms", "data"]) else {
            warn!("room list payload was not an array, treating as empty");
            return Ok(vec![]);
        };
        Ok(list.iter().map(RoomEntry::from_value).collect())
    }

    async fn fetch_history(&self, room_id: RoomId) -> Result<Vec<ChatMessage>, RestError> {
        let path = format!("/api/chat/rooms/{room_id}/messages");
        let body = self.execute(self.http.get(self.url(&path)), &Method::GET, &path).await?;

        let Some(list) = entries(&body, &["messages", "data"]) else {
            return Err(RestError::Decode {
                what: "history",
                detail: "expected an array of messages".to_string(),
            });
        };

        let mut messages = Vec::with_capacity(list.len());
        for entry in list {
            match ChatMessage::from_value(entry) {
                Ok(message) => messages.push(message),
                Err(err) => warn!(error = %err, "skipping malformed history entry"),
            }
        }
        Ok(messages)
    }

    async fn fetch_proposal(&self, room_id: RoomId) -> Result<ProposalSnapshot, RestError> {
        let path = format!("/api/chat/rooms/{room_id}/proposal");
        let body = self.execute(self.http.get(self.url(&path)), &Method::GET, &path).await?;
        Ok(ProposalSnapshot::from_value(&body))
    }

    async fn propose(
        &self,
        room_id: RoomId,
        request: &ProposeRequest,
    ) -> Result<ProposalSnapshot, RestError> {
        let path = format!("/api/chat/rooms/{room_id}/proposal");
        let body = self
            .execute(self.http.post(self.url(&path)).json(request), &Method::POST, &path)
            .await?;
        Ok(ProposalSnapshot::from_value(&body))
    }

    async fn accept_proposal(&self, proposal_id: ProposalId) -> Result<ProposalSnapshot, RestError> {
        let path = format!("/api/chat/proposals/{proposal_id}/accept");
        let body = self.execute(self.http.post(self.url(&path)), &Method::POST, &path).await?;
        Ok(ProposalSnapshot::from_value(&body))
    }

    async fn reject_proposal(&self, proposal_id: ProposalId) -> Result<ProposalSnapshot, RestError> {
        let path = format!("/api/chat/proposals/{proposal_id}/reject");
        let body = self.execute(self.http.post(self.url(&path)), &Method::POST, &path).await?;
        Ok(ProposalSnapshot::from_value(&body))
    }

    async fn leave_room(&self, room_id: RoomId) -> Result<(), RestError> {
        let path = format!("/api/chat/rooms/{room_id}/leave");
        match self.execute(self.http.delete(self.url(&path)), &Method::DELETE, &path).await {
            Ok(_) => Ok(()),
            // Already gone counts as left.
            Err(RestError::Api { status: 404, .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Pull a list out of a tolerant payload: a bare array, or an array under
/// one of the given keys.
fn entries<'a>(body: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    if let Some(list) = body.as_array() {
        return Some(list);
    }
    keys.iter().find_map(|key| body.get(*key).and_then(Value::as_array))
}
