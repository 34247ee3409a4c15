//! # lounge-core
//!
//! Core library for lounge - a terminal client for the lounge chat service.
//!
//! This library provides:
//! - Domain types for canonical chat messages and connection state
//! - The connection manager (endpoint resolution, handshake, settlement)
//! - The payload normalizer for heterogeneous server frames
//! - Transcript and session assembly
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three stages:
//! - **Transport:** [`Connector`] opens a WebSocket and settles exactly once
//! - **Normalization:** [`normalize()`] turns each raw frame into canonical messages
//! - **Transcript:** [`LoungeSession`] appends messages and tracks [`ConnectionState`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use lounge_core::{Config, Connector, Credentials, LoungeSession, Route};
//!
//! # async fn run() -> lounge_core::Result<()> {
//! let config = Config::load()?;
//! let mut session = LoungeSession::new(Connector::new(&config.connection)?);
//!
//! session
//!     .connect(Route::Login, &Credentials::new("alice"), None)
//!     .await?;
//! session.send("hello lounge")?;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use connection::{ConnectOptions, Connection, Connector};
pub use error::{Error, Result};
pub use normalize::normalize;
pub use session::LoungeSession;
pub use transcript::Transcript;
pub use types::*;

// Public modules
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod format;
pub mod logging;
pub mod normalize;
pub mod session;
pub mod transcript;
pub mod types;
