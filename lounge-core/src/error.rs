//! Error types for lounge-core

use thiserror::Error;

/// Main error type for the lounge-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Endpoint could not be resolved
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    /// The caller cancelled the connection attempt
    #[error("connection attempt aborted")]
    Aborted,

    /// No open event arrived within the configured window
    #[error("connection timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Low-level transport failure, or the transport closed before opening
    #[error("transport error{}: {reason}", close_code_suffix(.code))]
    Transport { code: Option<u16>, reason: String },

    /// An operation needed an open connection
    #[error("not connected")]
    NotConnected,
}

impl Error {
    /// True when the failure came from the caller's cancellation signal.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Aborted)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    pub(crate) fn transport(reason: impl Into<String>) -> Self {
        Error::Transport {
            code: None,
            reason: reason.into(),
        }
    }
}

fn close_code_suffix(code: &Option<u16>) -> String {
    match code {
        Some(code) => format!(" (close code {})", code),
        None => String::new(),
    }
}

/// Result type alias for lounge-core
pub type Result<T> = std::result::Result<T, Error>;
