//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/lounge/config.toml`, then
//! environment overrides (`LOUNGE_WS_BASE_URL`, `LOUNGE_WS_PORT`,
//! `LOUNGE_CONNECT_TIMEOUT_MS`) are applied on top.
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/lounge/` (~/.config/lounge/)
//! - State/Logs: `$XDG_STATE_HOME/lounge/` (~/.local/state/lounge/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`ConnectionConfig::base_url`]
pub const ENV_BASE_URL: &str = "LOUNGE_WS_BASE_URL";
/// Environment variable overriding [`ConnectionConfig::port`]
pub const ENV_PORT: &str = "LOUNGE_WS_PORT";
/// Environment variable overriding [`ConnectionConfig::timeout_ms`]
pub const ENV_TIMEOUT_MS: &str = "LOUNGE_CONNECT_TIMEOUT_MS";

/// Port used when the port override is `auto`.
pub const DEV_DEFAULT_PORT: u16 = 8000;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Endpoint and connection behaviour
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    /// Explicit WebSocket base URL (e.g., `wss://chat.example.com`).
    /// Takes precedence over `origin` when set.
    pub base_url: Option<String>,

    /// Origin the client is served from; the transport scheme and host are
    /// derived from it when `base_url` is unset.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Port override: a number, or `auto` for the development default
    pub port: Option<String>,

    /// Connection timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum frames held before the consumer drains them
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            origin: default_origin(),
            port: None,
            timeout_ms: default_timeout_ms(),
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

fn default_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_buffer_capacity() -> usize {
    256
}

/// Parsed form of [`ConnectionConfig::port`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortOverride {
    /// Pick [`DEV_DEFAULT_PORT`]
    Auto,
    /// Use this port
    Port(u16),
}

impl PortOverride {
    /// The concrete port this override resolves to.
    pub fn resolve(self) -> u16 {
        match self {
            PortOverride::Auto => DEV_DEFAULT_PORT,
            PortOverride::Port(port) => port,
        }
    }
}

impl std::str::FromStr for PortOverride {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(PortOverride::Auto);
        }
        s.parse::<u16>()
            .map(PortOverride::Port)
            .map_err(|_| Error::Config(format!("invalid port override: {:?}", s)))
    }
}

impl ConnectionConfig {
    /// Connection timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed port override, if one is configured and non-blank
    pub fn port_override(&self) -> Result<Option<PortOverride>> {
        match self.port.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }

    /// Explicit base URL, if one is configured and non-blank
    pub fn base_url_override(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::Config(
                "connection.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(Error::Config(
                "connection.buffer_capacity must be greater than 0".to_string(),
            ));
        }
        self.port_override()?;
        Ok(())
    }

    /// Apply environment-style overrides read through `lookup`.
    ///
    /// Blank values are ignored so an exported-but-empty variable does not
    /// clobber the file configuration.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = non_blank(ENV_BASE_URL) {
            self.base_url = Some(base_url);
        }
        if let Some(port) = non_blank(ENV_PORT) {
            self.port = Some(port);
        }
        if let Some(timeout) = non_blank(ENV_TIMEOUT_MS) {
            self.timeout_ms = timeout.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be an integer, got {:?}", ENV_TIMEOUT_MS, timeout))
            })?;
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path, then apply environment overrides.
    ///
    /// Connection settings are validated when a [`crate::Connector`] is built,
    /// so callers can layer their own overrides first.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Config::default()
        };

        config
            .connection
            .apply_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/lounge/config.toml` (~/.config/lounge/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("lounge").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/lounge/` (~/.local/state/lounge/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("lounge")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/lounge/lounge.log` (~/.local/state/lounge/lounge.log).
    /// Daily files are rolled from this name as `lounge.YYYY-MM-DD.log`.
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("lounge.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.connection.base_url.is_none());
        assert_eq!(config.connection.timeout_ms, 10_000);
        assert_eq!(config.connection.timeout(), Duration::from_secs(10));
        assert_eq!(config.connection.buffer_capacity, 256);
        assert_eq!(config.logging.level, "info");
        assert!(config.connection.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[connection]
base_url = "wss://chat.example.com/"
port = "auto"
timeout_ms = 2500

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(
            config.connection.base_url_override(),
            Some("wss://chat.example.com/")
        );
        assert_eq!(
            config.connection.port_override().unwrap(),
            Some(PortOverride::Auto)
        );
        assert_eq!(config.connection.timeout_ms, 2500);
        assert_eq!(config.connection.origin, "http://localhost:3000");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[connection]\norigin = \"https://lounge.example.org\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.connection.origin, "https://lounge.example.org");

        std::fs::write(&path, "[connection\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_port_override_parsing() {
        assert_eq!("auto".parse::<PortOverride>().unwrap(), PortOverride::Auto);
        assert_eq!(" AUTO ".parse::<PortOverride>().unwrap(), PortOverride::Auto);
        assert_eq!(
            "9001".parse::<PortOverride>().unwrap(),
            PortOverride::Port(9001)
        );
        assert!("http".parse::<PortOverride>().is_err());
        assert!("70000".parse::<PortOverride>().is_err());
        assert_eq!(PortOverride::Auto.resolve(), DEV_DEFAULT_PORT);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "ws://override.local:9000"),
            (ENV_PORT, "  "),
            (ENV_TIMEOUT_MS, "500"),
        ]
        .into_iter()
        .collect();

        let mut config = ConnectionConfig {
            port: Some("7000".to_string()),
            ..Default::default()
        };
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(
            config.base_url_override(),
            Some("ws://override.local:9000")
        );
        // Blank override leaves the file value alone
        assert_eq!(config.port.as_deref(), Some("7000"));
        assert_eq!(config.timeout_ms, 500);
    }

    #[test]
    fn test_env_override_rejects_bad_timeout() {
        let mut config = ConnectionConfig::default();
        let result = config.apply_overrides(|key| {
            (key == ENV_TIMEOUT_MS).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validation() {
        let config = ConnectionConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConnectionConfig {
            buffer_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConnectionConfig {
            port: Some("not-a-port".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
