//! WebSocket transport built on tokio-tungstenite
//!
//! Each dial spawns one task that owns the socket. The task reports
//! [`TransportEvent`]s over an unbounded channel and takes outbound
//! commands from the [`WsTransport`] handle. Dropping the handle closes
//! the socket.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::transport::{Dialer, EventReceiver, Transport, TransportEvent, NORMAL_CLOSE};
use crate::error::{Error, Result};

enum Command {
    Send(String),
    Close { code: u16, reason: String },
}

/// Dials real WebSocket connections (`ws://` and `wss://`).
#[derive(Debug, Default, Clone, Copy)]
pub struct WsDialer;

impl WsDialer {
    pub fn new() -> Self {
        Self
    }
}

impl Dialer for WsDialer {
    fn dial(&self, url: &str) -> Result<(Box<dyn Transport>, EventReceiver)> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::transport(format!("no async runtime available: {}", e)))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        runtime.spawn(run_socket(url.to_string(), command_rx, event_tx));

        Ok((Box::new(WsTransport { commands: command_tx }), event_rx))
    }
}

/// Handle to a socket task spawned by [`WsDialer`]
pub struct WsTransport {
    commands: mpsc::UnboundedSender<Command>,
}

impl Transport for WsTransport {
    fn send_text(&self, text: &str) -> Result<()> {
        self.commands
            .send(Command::Send(text.to_string()))
            .map_err(|_| Error::transport("socket task has stopped"))
    }

    fn close(&self, code: u16, reason: &str) -> Result<()> {
        self.commands
            .send(Command::Close {
                code,
                reason: reason.to_string(),
            })
            .map_err(|_| Error::transport("socket task has stopped"))
    }
}

async fn run_socket(
    url: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    // The receiver may already be gone (attempt settled); nothing to report then.
    let emit = |event: TransportEvent| {
        let _ = events.send(event);
    };

    let connect = tokio_tungstenite::connect_async(url.as_str());
    tokio::pin!(connect);

    let stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((stream, _response)) => break stream,
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "WebSocket connect failed");
                    emit(TransportEvent::Error(e.to_string()));
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Send(_)) => {
                    tracing::warn!(url = %url, "Dropping frame sent before the socket opened");
                    continue;
                }
                Some(Command::Close { code, reason }) => {
                    emit(TransportEvent::Closed { code: Some(code), reason });
                    return;
                }
                None => return,
            },
        }
    };

    tracing::info!(url = %url, "WebSocket connected");
    emit(TransportEvent::Open);

    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(text)) => {
                    if let Err(e) = sink.send(WsMessage::Text(text)).await {
                        emit(TransportEvent::Error(e.to_string()));
                        emit(TransportEvent::Closed { code: None, reason: e.to_string() });
                        return;
                    }
                }
                Some(Command::Close { code, reason }) => {
                    close_sink(&mut sink, code, &reason).await;
                    emit(TransportEvent::Closed { code: Some(code), reason });
                    return;
                }
                None => {
                    close_sink(&mut sink, NORMAL_CLOSE, "client dropped").await;
                    return;
                }
            },
            message = source.next() => match message {
                Some(Ok(WsMessage::Text(text))) => emit(TransportEvent::Frame(text)),
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => emit(TransportEvent::Frame(text)),
                    Err(_) => tracing::debug!("Ignoring non-UTF-8 binary frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.into_owned()),
                        None => (None, String::new()),
                    };
                    tracing::info!(?code, reason = %reason, "WebSocket closed by server");
                    emit(TransportEvent::Closed { code, reason });
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "WebSocket error");
                    emit(TransportEvent::Error(e.to_string()));
                    emit(TransportEvent::Closed { code: None, reason: e.to_string() });
                    return;
                }
                None => {
                    emit(TransportEvent::Closed { code: None, reason: "stream ended".to_string() });
                    return;
                }
            },
        }
    }
}

async fn close_sink<S>(sink: &mut S, code: u16, reason: &str)
where
    S: futures::Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
{
    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: reason.to_string().into(),
    };
    if let Err(e) = sink.send(WsMessage::Close(Some(frame))).await {
        tracing::debug!(error = %e, "Failed to send close frame");
    }
}
