//! Connection Manager
//!
//! Opens a transport to the resolved lounge endpoint and settles exactly
//! once: open, failed, aborted (cancellation) or timed out.
//!
//! ## Buffering
//!
//! Frames received before the caller starts consuming are held in a bounded
//! queue owned by the [`Connection`]. [`Connection::drain_buffered`] hands
//! them over in arrival order; [`Connection::next_event`] continues with live
//! events after them, so nothing is lost or reordered between "open" and
//! "caller ready".
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lounge_core::config::ConnectionConfig;
//! use lounge_core::{ConnectOptions, Connector, Credentials, Route};
//!
//! # async fn run() -> lounge_core::Result<()> {
//! let connector = Connector::new(&ConnectionConfig::default())?;
//! let mut connection = connector
//!     .connect(Route::Login, &Credentials::new("alice"), ConnectOptions::default())
//!     .await?;
//!
//! for frame in connection.drain_buffered() {
//!     println!("{}", frame);
//! }
//! # Ok(())
//! # }
//! ```

mod attempt;
mod transport;
mod ws;

#[cfg(test)]
pub(crate) mod testing;

pub use attempt::{AttemptState, ConnectionAttempt, FrameBuffer};
pub use transport::{Dialer, EventReceiver, Transport, TransportEvent, NORMAL_CLOSE};
pub use ws::{WsDialer, WsTransport};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;

use crate::config::ConnectionConfig;
use crate::endpoint::ConnectionTarget;
use crate::error::{Error, Result};
use crate::types::{Credentials, Route};

/// Per-call connection options
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Cancels the attempt when fired; already-fired tokens fail immediately
    pub cancel: Option<CancellationToken>,
    /// How long to wait for the transport to open
    pub timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            cancel: None,
            timeout: Duration::from_millis(10_000),
        }
    }
}

impl ConnectOptions {
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Whatever settled the attempt first
enum Settlement {
    Open,
    Failed(Error),
    Aborted,
    TimedOut,
}

impl Settlement {
    fn state(&self) -> AttemptState {
        match self {
            Settlement::Open => AttemptState::Open,
            Settlement::Failed(_) => AttemptState::Failed,
            Settlement::Aborted => AttemptState::Aborted,
            Settlement::TimedOut => AttemptState::TimedOut,
        }
    }
}

/// Opens connections to the lounge
pub struct Connector {
    config: ConnectionConfig,
    dialer: Arc<dyn Dialer>,
}

impl Connector {
    /// Create a connector that dials real WebSockets
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        Self::with_dialer(config, Arc::new(WsDialer::new()))
    }

    /// Create a connector over a custom transport
    pub fn with_dialer(config: &ConnectionConfig, dialer: Arc<dyn Dialer>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            dialer,
        })
    }

    /// Default options from configuration (no cancellation)
    pub fn default_options(&self) -> ConnectOptions {
        ConnectOptions::default().with_timeout(self.config.timeout())
    }

    /// Resolve the target a connect call would use
    pub fn target(&self, route: Route, credentials: &Credentials) -> Result<ConnectionTarget> {
        ConnectionTarget::resolve(&self.config, route, credentials)
    }

    /// Connect and wait for the transport to open.
    ///
    /// Settles exactly once with the first of: open, transport error, close
    /// before open, cancellation, timeout. On every outcome but open the
    /// transport is closed before returning.
    pub async fn connect(
        &self,
        route: Route,
        credentials: &Credentials,
        options: ConnectOptions,
    ) -> Result<Connection> {
        let target = self.target(route, credentials)?;
        let mut attempt = ConnectionAttempt::new(self.config.buffer_capacity);

        let cancel = options.cancel.unwrap_or_default();
        if cancel.is_cancelled() {
            attempt.settle(AttemptState::Aborted);
            tracing::info!(route = %route, "Connection cancelled before dialling");
            return Err(Error::Aborted);
        }

        if credentials.password.is_some() {
            tracing::debug!("Password supplied; the lounge handshake does not transmit it");
        }

        let url = target.url();
        tracing::info!(url = %url, timeout_ms = options.timeout.as_millis() as u64, "Connecting");

        let (transport, mut events) = self.dialer.dial(&url)?;
        attempt.begin(transport);

        let deadline = tokio::time::sleep(options.timeout);
        tokio::pin!(deadline);

        let settlement = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Settlement::Aborted,
                _ = &mut deadline => break Settlement::TimedOut,
                event = events.recv() => match event {
                    Some(TransportEvent::Open) => break Settlement::Open,
                    Some(TransportEvent::Frame(frame)) => attempt.buffer_frame(frame),
                    Some(TransportEvent::Error(reason)) => {
                        break Settlement::Failed(Error::Transport { code: None, reason })
                    }
                    Some(TransportEvent::Closed { code, reason }) => {
                        let reason = if reason.is_empty() {
                            "connection closed before opening".to_string()
                        } else {
                            reason
                        };
                        break Settlement::Failed(Error::Transport { code, reason });
                    }
                    None => break Settlement::Failed(Error::transport("transport ended before opening")),
                },
            }
        };

        attempt.settle(settlement.state());

        match settlement {
            Settlement::Open => {
                let (transport, buffered) = attempt
                    .into_open()
                    .ok_or_else(|| Error::transport("opened attempt lost its transport"))?;
                tracing::info!(url = %url, buffered = buffered.len(), "Connection open");
                Ok(Connection::new(target, transport, events, buffered))
            }
            Settlement::Failed(e) => {
                tracing::warn!(url = %url, error = %e, "Connection failed");
                Err(e)
            }
            Settlement::Aborted => {
                tracing::info!(url = %url, "Connection aborted");
                Err(Error::Aborted)
            }
            Settlement::TimedOut => {
                tracing::warn!(url = %url, timeout_ms = options.timeout.as_millis() as u64, "Connection timed out");
                Err(Error::Timeout {
                    timeout_ms: options.timeout.as_millis() as u64,
                })
            }
        }
    }
}

/// An open connection handed to the consumer
pub struct Connection {
    target: ConnectionTarget,
    transport: Box<dyn Transport>,
    events: EventReceiver,
    buffered: FrameBuffer,
    /// First non-frame event met while absorbing frames into the buffer
    pending: Option<TransportEvent>,
}

impl Connection {
    fn new(
        target: ConnectionTarget,
        transport: Box<dyn Transport>,
        events: EventReceiver,
        buffered: FrameBuffer,
    ) -> Self {
        Self {
            target,
            transport,
            events,
            buffered,
            pending: None,
        }
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Take every frame received so far that the consumer has not seen.
    ///
    /// Frames already delivered by the transport are absorbed first (up to
    /// the buffer capacity), so the result covers everything up to the next
    /// non-frame event. Later calls return only newer frames.
    pub fn drain_buffered(&mut self) -> Vec<String> {
        self.absorb_ready_frames();
        self.buffered.drain()
    }

    /// Next event in arrival order: buffered frames first, then live events.
    ///
    /// Returns `None` once the transport has gone away.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        if let Some(frame) = self.buffered.pop() {
            return Some(TransportEvent::Frame(frame));
        }
        if let Some(event) = self.pending.take() {
            return Some(event);
        }
        self.events.recv().await
    }

    /// Send a chat message as a bare text frame
    pub fn send_text(&self, text: &str) -> Result<()> {
        self.transport.send_text(text)
    }

    pub fn close(&self, code: u16, reason: &str) -> Result<()> {
        self.transport.close(code, reason)
    }

    fn absorb_ready_frames(&mut self) {
        while self.pending.is_none() && self.buffered.has_room() {
            match self.events.try_recv() {
                Ok(TransportEvent::Frame(frame)) => {
                    self.buffered.push(frame);
                }
                Ok(other) => self.pending = Some(other),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockDialer;
    use super::*;

    fn connector(dialer: Arc<MockDialer>) -> Connector {
        let config = ConnectionConfig {
            base_url: Some("ws://lounge.test".to_string()),
            ..Default::default()
        };
        Connector::with_dialer(&config, dialer).unwrap()
    }

    fn frame(text: &str) -> TransportEvent {
        TransportEvent::Frame(text.to_string())
    }

    #[tokio::test]
    async fn test_connect_opens_and_targets_route() {
        let dialer = Arc::new(MockDialer::new(vec![TransportEvent::Open]));
        let connector = connector(dialer.clone());

        let connection = connector
            .connect(Route::Register, &Credentials::new(" bob "), ConnectOptions::default())
            .await
            .expect("connect should succeed");

        assert_eq!(connection.target().username(), "bob");
        assert_eq!(dialer.url(0), "ws://lounge.test/ws/lounge/register?userName=bob");
        assert!(dialer.log(0).closes().is_empty());
    }

    #[tokio::test]
    async fn test_password_is_never_transmitted() {
        let dialer = Arc::new(MockDialer::new(vec![TransportEvent::Open]));
        let credentials = Credentials {
            username: "alice".to_string(),
            password: Some("hunter2".to_string()),
        };

        connector(dialer.clone())
            .connect(Route::Login, &credentials, ConnectOptions::default())
            .await
            .unwrap();

        assert!(!dialer.url(0).contains("hunter2"));
        assert!(dialer.log(0).sent().is_empty());
    }

    #[tokio::test]
    async fn test_pre_cancelled_never_dials() {
        let dialer = Arc::new(MockDialer::new(vec![TransportEvent::Open]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = connector(dialer.clone())
            .connect(
                Route::Login,
                &Credentials::new("alice"),
                ConnectOptions::default().with_cancel(cancel),
            )
            .await;

        assert!(matches!(result, Err(ref e) if e.is_abort()));
        assert_eq!(dialer.dial_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_configured_window() {
        let dialer = Arc::new(MockDialer::new(vec![]));
        let started = tokio::time::Instant::now();

        let result = connector(dialer.clone())
            .connect(
                Route::Login,
                &Credentials::new("alice"),
                ConnectOptions::default().with_timeout(Duration::from_millis(250)),
            )
            .await;

        let elapsed = started.elapsed();
        assert!(matches!(result, Err(Error::Timeout { timeout_ms: 250 })));
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < Duration::from_millis(300));
        assert_eq!(dialer.log(0).closes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_connecting_tears_down() {
        let dialer = Arc::new(MockDialer::new(vec![]));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let result = connector(dialer.clone())
            .connect(
                Route::Login,
                &Credentials::new("alice"),
                ConnectOptions::default().with_cancel(cancel),
            )
            .await;

        assert!(matches!(result, Err(Error::Aborted)));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(dialer.log(0).closes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_beats_simultaneous_open() {
        let dialer = Arc::new(MockDialer::new(vec![]));
        let cancel = CancellationToken::new();

        let remote = dialer.clone();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            remote.emit(0, TransportEvent::Open);
            trigger.cancel();
        });

        let result = connector(dialer.clone())
            .connect(
                Route::Login,
                &Credentials::new("alice"),
                ConnectOptions::default().with_cancel(cancel),
            )
            .await;

        assert!(matches!(result, Err(Error::Aborted)));
        assert_eq!(dialer.dial_count(), 1);
        assert_eq!(dialer.log(0).closes().len(), 1);
    }

    #[tokio::test]
    async fn test_close_before_open_reports_code() {
        let dialer = Arc::new(MockDialer::new(vec![TransportEvent::Closed {
            code: Some(1006),
            reason: String::new(),
        }]));

        let err = connector(dialer.clone())
            .connect(Route::Login, &Credentials::new("alice"), ConnectOptions::default())
            .await
            .err()
            .expect("close before open must fail");

        match err {
            Error::Transport { code, reason } => {
                assert_eq!(code, Some(1006));
                assert_eq!(reason, "connection closed before opening");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(dialer.log(0).closes().len(), 1);
    }

    #[tokio::test]
    async fn test_first_signal_wins() {
        // Error first: the later open is never observed
        let dialer = Arc::new(MockDialer::new(vec![
            TransportEvent::Error("refused".to_string()),
            TransportEvent::Open,
        ]));
        let result = connector(dialer.clone())
            .connect(Route::Login, &Credentials::new("alice"), ConnectOptions::default())
            .await;
        assert!(matches!(result, Err(Error::Transport { .. })));
        assert_eq!(dialer.log(0).closes().len(), 1);

        // Open first: the later error reaches the consumer as a live event
        let dialer = Arc::new(MockDialer::new(vec![
            TransportEvent::Open,
            TransportEvent::Error("reset".to_string()),
        ]));
        let mut connection = connector(dialer.clone())
            .connect(Route::Login, &Credentials::new("alice"), ConnectOptions::default())
            .await
            .expect("open wins");
        assert_eq!(
            connection.next_event().await,
            Some(TransportEvent::Error("reset".to_string()))
        );
        assert!(dialer.log(0).closes().is_empty());
    }

    #[tokio::test]
    async fn test_buffered_then_live_frames_keep_order() {
        let dialer = Arc::new(MockDialer::new(vec![
            frame("f1"),
            TransportEvent::Open,
            frame("f2"),
            frame("f3"),
        ]));
        let mut connection = connector(dialer.clone())
            .connect(Route::Login, &Credentials::new("alice"), ConnectOptions::default())
            .await
            .unwrap();

        // Frames that arrive after open but before draining
        dialer.emit(0, frame("f4"));

        let mut seen = connection.drain_buffered();
        assert!(connection.drain_buffered().is_empty());

        dialer.emit(0, frame("f5"));
        dialer.emit(0, TransportEvent::Closed {
            code: Some(1000),
            reason: "bye".to_string(),
        });

        while let Some(event) = connection.next_event().await {
            match event {
                TransportEvent::Frame(text) => seen.push(text),
                TransportEvent::Closed { .. } => break,
                other => panic!("unexpected event: {other:?}"),
            }
        }

        assert_eq!(seen, vec!["f1", "f2", "f3", "f4", "f5"]);
    }

    #[tokio::test]
    async fn test_drain_stops_at_non_frame_event() {
        let dialer = Arc::new(MockDialer::new(vec![
            TransportEvent::Open,
            frame("a"),
            TransportEvent::Error("glitch".to_string()),
            frame("b"),
        ]));
        let mut connection = connector(dialer)
            .connect(Route::Login, &Credentials::new("alice"), ConnectOptions::default())
            .await
            .unwrap();

        assert_eq!(connection.drain_buffered(), vec!["a".to_string()]);
        assert_eq!(
            connection.next_event().await,
            Some(TransportEvent::Error("glitch".to_string()))
        );
        assert_eq!(connection.next_event().await, Some(frame("b")));
    }

    #[tokio::test]
    async fn test_send_and_close_go_to_transport() {
        let dialer = Arc::new(MockDialer::new(vec![TransportEvent::Open]));
        let connection = connector(dialer.clone())
            .connect(Route::Login, &Credentials::new("alice"), ConnectOptions::default())
            .await
            .unwrap();

        connection.send_text("hello").unwrap();
        connection.close(NORMAL_CLOSE, "done").unwrap();

        let log = dialer.log(0);
        assert_eq!(log.sent(), vec!["hello".to_string()]);
        assert_eq!(log.closes(), vec![(NORMAL_CLOSE, "done".to_string())]);
    }

    #[test]
    fn test_connector_rejects_invalid_config() {
        let config = ConnectionConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(Connector::with_dialer(&config, Arc::new(MockDialer::new(vec![]))).is_err());
    }
}
