//! Handshake request/response codec and transport URL construction.
//!
//! Before any transport opens, the client performs one HTTP GET against
//! the server's handshake endpoint. The response body negotiates the
//! session: an opaque session id, two timeouts, and the transports the
//! server is willing to speak. How the GET is performed is the embedder's
//! concern — this module only builds the URL and parses the body.

use std::time::Duration;

use crate::ProtocolError;

/// Protocol revision carried in every handshake and transport URL.
/// Servers reject clients speaking a different revision.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// HandshakeRequest
// ---------------------------------------------------------------------------

/// Everything needed to build a deterministic handshake URL.
///
/// Two requests with the same fields produce byte-identical URLs, which
/// keeps the codec testable; cache-busting comes from the caller-supplied
/// `timestamp_ms`, not from hidden clock reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Use `https` instead of `http`.
    pub secure: bool,
    /// Target host name.
    pub host: String,
    /// Target port.
    pub port: u16,
    /// Server resource prefix (first path segment).
    pub resource: String,
    /// Cache-busting timestamp, milliseconds since the epoch.
    pub timestamp_ms: u64,
    /// Extra query parameters, already URL-encoded, without a leading
    /// `&` or `?`.
    pub query: Option<String>,
}

impl HandshakeRequest {
    /// Builds the handshake URL:
    /// `http(s)://<host>:<port>/<resource>/<version>/?t=<ts>[&query]`.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        let mut url = format!(
            "{scheme}://{}:{}/{}/{PROTOCOL_VERSION}/?t={}",
            self.host, self.port, self.resource, self.timestamp_ms
        );
        if let Some(query) = &self.query {
            url.push('&');
            url.push_str(query);
        }
        url
    }
}

/// Builds the URL a transport connects to once a session exists:
/// `http(s)://<host>:<port>/<resource>/<version>/<transport>/<session>`.
pub fn transport_url(
    secure: bool,
    host: &str,
    port: u16,
    resource: &str,
    transport: &str,
    session_id: &str,
) -> String {
    let scheme = if secure { "https" } else { "http" };
    format!(
        "{scheme}://{host}:{port}/{resource}/{PROTOCOL_VERSION}/{transport}/{session_id}"
    )
}

// ---------------------------------------------------------------------------
// Handshake (response)
// ---------------------------------------------------------------------------

/// The negotiated session parameters from a handshake response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Opaque session token issued by the server.
    pub session_id: String,
    /// Maximum silence the server tolerates between heartbeats.
    pub heartbeat_timeout: Duration,
    /// How long the server keeps the session alive after a close.
    pub close_timeout: Duration,
    /// Transport names the server is willing to speak, in server order.
    pub transports: Vec<String>,
}

impl Handshake {
    /// Parses the colon-delimited 4-field response body:
    /// `<session>:<heartbeat secs>:<close secs>:<comma transports>`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::BadHandshake`] when fewer than 4 fields
    /// are present or a timeout field is not a number of seconds.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let fields: Vec<&str> = raw.split(':').collect();
        if fields.len() < 4 {
            return Err(ProtocolError::BadHandshake(format!(
                "expected 4 fields, got {}",
                fields.len()
            )));
        }

        let heartbeat = parse_seconds(fields[1], "heartbeat timeout")?;
        let close = parse_seconds(fields[2], "close timeout")?;

        Ok(Handshake {
            session_id: fields[0].to_string(),
            heartbeat_timeout: heartbeat,
            close_timeout: close,
            transports: fields[3]
                .split(',')
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    /// Encodes the response body. The inverse of [`Handshake::decode`];
    /// used by test doubles standing in for a server.
    pub fn encode(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.session_id,
            self.heartbeat_timeout.as_secs(),
            self.close_timeout.as_secs(),
            self.transports.join(",")
        )
    }
}

fn parse_seconds(field: &str, what: &str) -> Result<Duration, ProtocolError> {
    field
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ProtocolError::BadHandshake(format!("{what} is not a number: {field:?}")))
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_four_fields_round_trips_exactly() {
        let raw = "abc123:20:25:websocket,xhr-polling";
        let handshake = Handshake::decode(raw).expect("should decode");

        assert_eq!(handshake.session_id, "abc123");
        assert_eq!(handshake.heartbeat_timeout, Duration::from_secs(20));
        assert_eq!(handshake.close_timeout, Duration::from_secs(25));
        assert_eq!(handshake.transports, vec!["websocket", "xhr-polling"]);

        // And back out byte-for-byte.
        assert_eq!(handshake.encode(), raw);
    }

    #[test]
    fn test_decode_fewer_than_four_fields_fails() {
        for raw in ["", "abc", "abc:20", "abc:20:25"] {
            assert!(
                matches!(
                    Handshake::decode(raw),
                    Err(ProtocolError::BadHandshake(_))
                ),
                "should reject {raw:?}"
            );
        }
    }

    #[test]
    fn test_decode_non_numeric_timeout_fails() {
        let result = Handshake::decode("sid:soon:25:websocket");
        assert!(matches!(result, Err(ProtocolError::BadHandshake(_))));
    }

    #[test]
    fn test_decode_single_transport() {
        let handshake = Handshake::decode("sid:15:30:websocket").unwrap();
        assert_eq!(handshake.transports, vec!["websocket"]);
    }

    #[test]
    fn test_decode_empty_transport_list() {
        // A server advertising no transports is a valid (if useless)
        // response; selection simply finds no candidates later.
        let handshake = Handshake::decode("sid:15:30:").unwrap();
        assert!(handshake.transports.is_empty());
    }

    #[test]
    fn test_handshake_url_is_deterministic() {
        let request = HandshakeRequest {
            secure: false,
            host: "example.test".into(),
            port: 8080,
            resource: "engine".into(),
            timestamp_ms: 1_700_000_000_000,
            query: None,
        };
        assert_eq!(
            request.url(),
            "http://example.test:8080/engine/1/?t=1700000000000"
        );
        // Same inputs, same URL.
        assert_eq!(request.url(), request.clone().url());
    }

    #[test]
    fn test_handshake_url_appends_query() {
        let request = HandshakeRequest {
            secure: true,
            host: "example.test".into(),
            port: 443,
            resource: "engine".into(),
            timestamp_ms: 7,
            query: Some("token=xyz".into()),
        };
        assert_eq!(
            request.url(),
            "https://example.test:443/engine/1/?t=7&token=xyz"
        );
    }

    #[test]
    fn test_transport_url_includes_session() {
        let url = transport_url(false, "example.test", 80, "engine", "websocket", "abc123");
        assert_eq!(url, "http://example.test:80/engine/1/websocket/abc123");
    }
}
