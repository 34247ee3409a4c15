//! Chat session
//!
//! [`LoungeSession`] is the policy layer above the connection manager: it
//! owns at most one live [`Connection`], folds incoming frames into the
//! [`Transcript`], announces connection changes as system entries and
//! tracks the [`ConnectionState`] shown to the user.
//!
//! Connecting again supersedes the previous connection. The old transport is
//! closed with [`SUPERSEDED_CLOSE_CODE`] / [`SUPERSEDED_REASON`] so the
//! teardown is never mistaken for an unexpected disconnect.

use tokio_util::sync::CancellationToken;

use crate::connection::{Connection, Connector, TransportEvent, NORMAL_CLOSE};
use crate::error::{Error, Result};
use crate::transcript::Transcript;
use crate::types::{CanonicalMessage, ConnectionState, Credentials, Route};

/// Close code used when a newer connection replaces an older one
pub const SUPERSEDED_CLOSE_CODE: u16 = 4000;
/// Close reason used when a newer connection replaces an older one
pub const SUPERSEDED_REASON: &str = "superseded";

/// One user's view of the lounge
pub struct LoungeSession {
    connector: Connector,
    connection: Option<Connection>,
    username: String,
    state: ConnectionState,
    transcript: Transcript,
}

impl LoungeSession {
    pub fn new(connector: Connector) -> Self {
        Self {
            connector,
            connection: None,
            username: String::new(),
            state: ConnectionState::Disconnected,
            transcript: Transcript::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Username of the current (or last) connection
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Connect, replacing any existing connection.
    ///
    /// Frames the server sent before this call returns are already in the
    /// transcript when it does.
    pub async fn connect(
        &mut self,
        route: Route,
        credentials: &Credentials,
        cancel: Option<CancellationToken>,
    ) -> Result<()> {
        self.supersede();
        self.state = ConnectionState::Connecting;

        let mut options = self.connector.default_options();
        options.cancel = cancel;

        match self.connector.connect(route, credentials, options).await {
            Ok(mut connection) => {
                self.username = connection.target().username().to_string();
                self.state = ConnectionState::Connected;
                let notice = if self.username.is_empty() {
                    "Connected to lounge.".to_string()
                } else {
                    format!("Connected to lounge as {}.", self.username)
                };
                self.transcript.push_system(notice);

                for frame in connection.drain_buffered() {
                    self.transcript.ingest_frame(&frame, &self.username);
                }
                self.connection = Some(connection);
                Ok(())
            }
            Err(e) if e.is_abort() => {
                self.state = ConnectionState::Disconnected;
                self.transcript.push_system("Connection cancelled.");
                Err(e)
            }
            Err(e) => {
                self.state = ConnectionState::Error;
                self.transcript
                    .push_system(format!("Connection failed: {}", e));
                Err(e)
            }
        }
    }

    /// Wait for the next transport event and apply it.
    ///
    /// Returns the transcript entries it produced (possibly none), or `None`
    /// when there is no connection to wait on. Cancel-safe: nothing changes
    /// until an event has been received.
    pub async fn next_update(&mut self) -> Option<Vec<CanonicalMessage>> {
        let connection = self.connection.as_mut()?;
        let event = connection.next_event().await;
        Some(self.apply_event(event))
    }

    /// Send a chat message as a bare text frame.
    pub fn send(&self, body: &str) -> Result<()> {
        self.connection
            .as_ref()
            .ok_or(Error::NotConnected)?
            .send_text(body)
    }

    /// Close the connection normally.
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close(NORMAL_CLOSE, "client disconnect") {
                tracing::warn!(error = %e, "Failed to close connection");
            }
            self.state = ConnectionState::Disconnected;
            self.transcript.push_system("Disconnected from lounge.");
        }
    }

    fn supersede(&mut self) {
        if let Some(previous) = self.connection.take() {
            tracing::info!("Superseding previous connection");
            if let Err(e) = previous.close(SUPERSEDED_CLOSE_CODE, SUPERSEDED_REASON) {
                tracing::warn!(error = %e, "Failed to close superseded connection");
            }
        }
    }

    fn apply_event(&mut self, event: Option<TransportEvent>) -> Vec<CanonicalMessage> {
        match event {
            Some(TransportEvent::Frame(raw)) => {
                tracing::trace!(len = raw.len(), "Frame received");
                self.transcript.ingest_frame(&raw, &self.username).to_vec()
            }
            Some(TransportEvent::Open) => Vec::new(),
            Some(TransportEvent::Error(reason)) => {
                tracing::warn!(reason = %reason, "Connection error");
                self.state = ConnectionState::Error;
                vec![self
                    .transcript
                    .push_system(format!("Connection error: {}", reason))
                    .clone()]
            }
            Some(TransportEvent::Closed { code, reason }) => {
                self.connection = None;
                if self.state != ConnectionState::Error {
                    self.state = ConnectionState::Disconnected;
                }
                if reason == SUPERSEDED_REASON {
                    tracing::info!("Connection superseded");
                    return Vec::new();
                }
                tracing::info!(?code, reason = %reason, "Connection closed");
                let notice = match code {
                    Some(code) => format!("Disconnected from lounge (code {}).", code),
                    None => "Disconnected from lounge.".to_string(),
                };
                vec![self.transcript.push_system(notice).clone()]
            }
            None => {
                self.connection = None;
                if self.state != ConnectionState::Error {
                    self.state = ConnectionState::Disconnected;
                }
                vec![self
                    .transcript
                    .push_system("Disconnected from lounge.")
                    .clone()]
            }
        }
    }
}
