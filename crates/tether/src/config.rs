//! Socket configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_reconnect::RetryPolicy;

/// Everything a [`Socket`](crate::Socket) needs to know up front.
///
/// Mirrors the connection options an application would pass when opening
/// a session: where the server lives, which transports to offer, how
/// patient to be, and whether to fight to get back in after a drop.
///
/// There is no unload hook here: an embedder that wants the classic
/// "flush a disconnect frame when the page goes away" behavior calls
/// [`Socket::disconnect`](crate::Socket::disconnect) from its own
/// shutdown path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Server host name or address.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Use `https` for the handshake URL (and secure variants of each
    /// transport's scheme).
    pub secure: bool,

    /// Path prefix mounted on the server, without slashes.
    pub resource: String,

    /// Transports to offer, in preference order. The handshake response
    /// narrows this to what the server actually supports.
    pub transports: Vec<String>,

    /// When the preferred transport fails to open, walk down the
    /// remaining negotiated transports instead of giving up.
    pub try_multiple_transports: bool,

    /// How long a single transport gets to open before it is abandoned.
    /// `None` disables the timer.
    pub connect_timeout: Option<Duration>,

    /// Start a reconnection campaign after an unexpected drop.
    pub reconnect: bool,

    /// Backoff schedule and attempt ceiling for reconnection.
    pub retry: RetryPolicy,

    /// Extra query string appended to the handshake URL.
    pub query: Option<String>,

    /// Have the [`Driver`](crate::Driver) issue the first connect as
    /// soon as it starts running.
    pub auto_connect: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 80,
            secure: false,
            resource: "engine".to_string(),
            transports: vec!["websocket".to_string(), "xhr-polling".to_string()],
            try_multiple_transports: true,
            connect_timeout: Some(Duration::from_secs(10)),
            reconnect: true,
            retry: RetryPolicy::default(),
            query: None,
            auto_connect: true,
        }
    }
}

impl SocketConfig {
    /// Config pointing at `host:port` with every other knob at its
    /// default.
    pub fn for_host(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}
