//! Transport abstraction
//!
//! A [`Dialer`] starts a connection without waiting for it and hands back a
//! [`Transport`] for outbound traffic plus an [`EventReceiver`] on which the
//! connection reports what happens to it, in delivery order.

use tokio::sync::mpsc;

use crate::error::Result;

/// Close code for an ordinary, caller-initiated close
pub const NORMAL_CLOSE: u16 = 1000;

/// Something the transport observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established
    Open,
    /// A text frame arrived
    Frame(String),
    /// Low-level failure
    Error(String),
    /// The connection closed
    Closed { code: Option<u16>, reason: String },
}

/// Ordered stream of [`TransportEvent`]s for one connection
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Outbound side of a live connection.
pub trait Transport: Send + Sync {
    /// Send a bare text frame.
    fn send_text(&self, text: &str) -> Result<()>;

    /// Close the connection with the given code and reason.
    fn close(&self, code: u16, reason: &str) -> Result<()>;
}

/// Starts transport connections.
pub trait Dialer: Send + Sync {
    /// Begin connecting to `url`.
    ///
    /// Returns immediately; the outcome of the connection arrives as
    /// [`TransportEvent::Open`], [`TransportEvent::Error`] or
    /// [`TransportEvent::Closed`] on the returned receiver.
    fn dial(&self, url: &str) -> Result<(Box<dyn Transport>, EventReceiver)>;
}
