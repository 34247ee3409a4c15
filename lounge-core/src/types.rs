//! Core domain types for lounge
//!
//! These types are the canonical data model consumed by renderers: whatever
//! shape a server frame arrives in, it ends up as one or more
//! [`CanonicalMessage`] values.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Frame** | One discrete text message delivered over the transport |
//! | **Batch** | A single frame encoding multiple chat entries (newest-first) |
//! | **Canonical message** | The normalized, rendering-ready form of one chat entry |
//! | **Settlement** | A pending connection attempt reaching its one terminal outcome |
//! | **Danger level** | Coded severity label on optional safety analysis |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender name reserved for synthetic and server-system text.
pub const SYSTEM_SENDER: &str = "System";

// ============================================
// Handshake
// ============================================

/// Which lounge endpoint the handshake targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Login,
    Register,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Login => "login",
            Route::Register => "register",
        }
    }

    /// Fixed server path for this route
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/ws/lounge/login",
            Route::Register => "/ws/lounge/register",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(Route::Login),
            "register" => Ok(Route::Register),
            _ => Err(format!("unknown route: {}", s)),
        }
    }
}

/// Identity presented during the handshake.
///
/// The handshake is passwordless: `password` is accepted for form
/// compatibility but never transmitted.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
        }
    }
}

// ============================================
// Connection state
// ============================================

/// Connection status shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Connecting,
    #[default]
    Disconnected,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Messages
// ============================================

/// Safety-analysis block optionally attached to a message.
///
/// Every field is defaulted when missing from the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAnalysis {
    /// Narrative assessment text
    pub assessment: String,
    /// Reasoning behind the assessment
    pub reasoning: String,
    /// Coded severity label ("Unknown" when absent)
    pub danger_level: String,
    /// Raw model predictions, kept opaque
    pub model_predictions: serde_json::Map<String, serde_json::Value>,
    /// Numeric risk score (0 when absent)
    pub risk_score: f64,
    /// Grooming-style label ("N/A" when absent)
    pub grooming_style: String,
}

impl Default for SafetyAnalysis {
    fn default() -> Self {
        Self {
            assessment: String::new(),
            reasoning: String::new(),
            danger_level: "Unknown".to_string(),
            model_predictions: serde_json::Map::new(),
            risk_score: 0.0,
            grooming_style: "N/A".to_string(),
        }
    }
}

/// A normalized chat entry, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    /// Unique, non-empty identifier
    pub id: String,
    /// Sender name; [`SYSTEM_SENDER`] for server/system text
    pub sender: String,
    /// Message body
    pub body: String,
    /// When the message happened (now, if the server's time was unusable)
    pub event_time: DateTime<Utc>,
    /// Verbatim time text to show when it could not be parsed
    pub display_label: Option<String>,
    /// Sent by the local user
    pub is_own: bool,
    /// Sent by the system
    pub is_system: bool,
    /// Optional safety analysis
    pub analysis: Option<SafetyAnalysis>,
}

impl CanonicalMessage {
    /// Build a synthetic system entry stamped with the current time.
    pub fn system(body: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: SYSTEM_SENDER.to_string(),
            body: body.into(),
            event_time: Utc::now(),
            display_label: None,
            is_own: false,
            is_system: true,
            analysis: None,
        }
    }
}

/// True when `sender` names the system, ignoring ASCII case.
pub fn is_system_sender(sender: &str) -> bool {
    sender.eq_ignore_ascii_case(SYSTEM_SENDER)
}
