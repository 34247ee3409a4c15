//! Endpoint resolution and connection URL construction
//!
//! The base origin comes from an explicit override when configured, otherwise
//! it is derived from the client's own origin: `https` upgrades to `wss`,
//! anything else uses `ws`, and the origin's port is kept unless a port
//! override is configured.

use url::Url;

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::types::{Credentials, Route};

/// Query parameter carrying the handshake identifier
pub const USERNAME_PARAM: &str = "userName";

/// Resolve the WebSocket base origin (no trailing slash).
pub fn resolve_base(config: &ConnectionConfig) -> Result<String> {
    if let Some(base_url) = config.base_url_override() {
        return Ok(base_url.trim_end_matches('/').to_string());
    }

    let origin = Url::parse(config.origin.trim())
        .map_err(|e| Error::Endpoint(format!("invalid origin {:?}: {}", config.origin, e)))?;

    let scheme = match origin.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    let host = origin
        .host_str()
        .ok_or_else(|| Error::Endpoint(format!("origin {:?} has no host", config.origin)))?;
    let port = match config.port_override()? {
        Some(port) => Some(port.resolve()),
        None => origin.port(),
    };

    Ok(match port {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    })
}

/// A fully resolved handshake target. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    base: String,
    route: Route,
    username: String,
}

impl ConnectionTarget {
    pub fn new(base: impl Into<String>, route: Route, username: &str) -> Self {
        Self {
            base: base.into(),
            route,
            username: username.trim().to_string(),
        }
    }

    /// Resolve the base from configuration and bind the route and identity.
    pub fn resolve(config: &ConnectionConfig, route: Route, credentials: &Credentials) -> Result<Self> {
        Ok(Self::new(resolve_base(config)?, route, &credentials.username))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn route(&self) -> Route {
        self.route
    }

    /// Trimmed username; empty when none was supplied
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Build the connection URL.
    ///
    /// An empty username is omitted from the query. If the base cannot be
    /// parsed as a URL the path and query are concatenated by hand.
    pub fn url(&self) -> String {
        match Url::parse(&self.base).and_then(|base| base.join(self.route.path())) {
            Ok(mut url) => {
                if !self.username.is_empty() {
                    url.query_pairs_mut()
                        .append_pair(USERNAME_PARAM, &self.username);
                }
                url.to_string()
            }
            Err(e) => {
                tracing::debug!(base = %self.base, error = %e, "Falling back to manual URL construction");
                let mut url = format!("{}{}", self.base.trim_end_matches('/'), self.route.path());
                if !self.username.is_empty() {
                    url.push('?');
                    url.push_str(USERNAME_PARAM);
                    url.push('=');
                    url.push_str(&urlencoding::encode(&self.username));
                }
                url
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(origin: &str) -> ConnectionConfig {
        ConnectionConfig {
            origin: origin.to_string(),
            ..Default::default()
        }
    }

    fn username_from(url: &str) -> Option<String> {
        Url::parse(url).ok().and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == USERNAME_PARAM)
                .map(|(_, v)| v.into_owned())
        })
    }

    #[test]
    fn test_base_override_wins_and_drops_trailing_slash() {
        let config = ConnectionConfig {
            base_url: Some("wss://chat.example.com/".to_string()),
            port: Some("auto".to_string()),
            ..config("http://localhost:3000")
        };
        assert_eq!(resolve_base(&config).unwrap(), "wss://chat.example.com");
    }

    #[test]
    fn test_secure_origin_upgrades_scheme() {
        let base = resolve_base(&config("https://lounge.example.org")).unwrap();
        assert_eq!(base, "wss://lounge.example.org");

        let base = resolve_base(&config("http://localhost:3000")).unwrap();
        assert_eq!(base, "ws://localhost:3000");
    }

    #[test]
    fn test_port_override() {
        let mut cfg = config("http://localhost:3000");
        cfg.port = Some("9001".to_string());
        assert_eq!(resolve_base(&cfg).unwrap(), "ws://localhost:9001");

        cfg.port = Some("auto".to_string());
        assert_eq!(resolve_base(&cfg).unwrap(), "ws://localhost:8000");
    }

    #[test]
    fn test_invalid_origin() {
        assert!(matches!(
            resolve_base(&config("not a url")),
            Err(Error::Endpoint(_))
        ));
    }

    #[test]
    fn test_url_with_username() {
        let target = ConnectionTarget::new("ws://localhost:8000", Route::Login, "  alice ");
        assert_eq!(target.username(), "alice");
        assert_eq!(
            target.url(),
            "ws://localhost:8000/ws/lounge/login?userName=alice"
        );
    }

    #[test]
    fn test_url_omits_empty_username() {
        let target = ConnectionTarget::new("wss://chat.example.com", Route::Register, "   ");
        assert_eq!(target.url(), "wss://chat.example.com/ws/lounge/register");
    }

    #[test]
    fn test_username_round_trips_through_query() {
        let names = [
            "a&b=c",
            "what?#fragment",
            "space cadet",
            "100%/path+plus",
            "émile ☕",
            " padded ",
        ];
        for name in names {
            let target = ConnectionTarget::new("wss://chat.example.com", Route::Login, name);
            assert_eq!(
                username_from(&target.url()).as_deref(),
                Some(name.trim()),
                "round trip failed for {:?}",
                name
            );
        }
    }

    #[test]
    fn test_malformed_base_falls_back_to_concatenation() {
        let target = ConnectionTarget::new("lounge-host/", Route::Login, "a b&c");
        assert_eq!(target.url(), "lounge-host/ws/lounge/login?userName=a%20b%26c");
    }
}
