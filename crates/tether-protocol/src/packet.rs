//! Packet types and the wire framing codec.
//!
//! Every in-band protocol unit is a [`Packet`]. On the wire a packet is a
//! single text frame:
//!
//! ```text
//! <type> ":" [ "j" ":" ] <namespace> ":" <payload>
//! ```
//!
//! - `<type>` is a one-character code: `0` = disconnect, `1` = message,
//!   `2` = heartbeat, `3` = connect.
//! - The optional `j` flag marks a message payload that must be parsed as
//!   JSON instead of plain text.
//! - `<namespace>` is the logical sub-channel address: empty for the
//!   default namespace, otherwise `/`-prefixed (`/chat`). The connection
//!   manager routes by this address only.
//! - `<payload>` is everything after the last mandatory separator, so it
//!   may itself contain `:` without escaping.

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The content of a `message` packet.
///
/// The wire distinguishes plain text from structured data with the `j`
/// flag, so the receiver knows whether to hand the application a string
/// or a parsed JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// An opaque text payload, delivered verbatim.
    Text(String),

    /// A structured payload, encoded as JSON on the wire.
    #[cfg(feature = "json")]
    Json(serde_json::Value),
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// One framed protocol unit.
///
/// Every decoded packet carries a namespace address (empty string =
/// default namespace). Heartbeats are connection-level and always travel
/// on the default address.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Close a logical sub-channel (or, on the default namespace, the
    /// whole connection).
    Disconnect {
        /// Addressed namespace.
        path: String,
    },

    /// Namespace join request / acknowledgment. The server's root
    /// acknowledgment carries the session id; namespace joins carry none.
    Connect {
        /// Addressed namespace.
        path: String,
        /// Session id, present only on the root handshake acknowledgment.
        /// An empty session encodes the same as an absent one.
        session: Option<String>,
    },

    /// An application message addressed to one namespace.
    Message {
        /// Addressed namespace.
        path: String,
        /// Text or JSON-tagged content.
        payload: Payload,
    },

    /// Keep-alive probe. The token is opaque and echoed verbatim; the
    /// codec never interprets its content.
    Heartbeat {
        /// Opaque echo token.
        token: String,
    },
}

impl Packet {
    /// Returns the namespace address this packet is routed by.
    ///
    /// Heartbeats are connection-level and report the default address.
    pub fn path(&self) -> &str {
        match self {
            Packet::Disconnect { path }
            | Packet::Connect { path, .. }
            | Packet::Message { path, .. } => path,
            Packet::Heartbeat { .. } => "",
        }
    }

    /// Encodes this packet into a wire frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::BadJson`] if a JSON payload cannot be
    /// serialized. This cannot happen for payloads built from
    /// `serde_json::Value`, but the codec surface stays fallible so all
    /// encode paths are handled uniformly.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        match self {
            Packet::Disconnect { path } => Ok(format!("0:{path}:")),
            Packet::Connect { path, session } => {
                let sid = session.as_deref().unwrap_or("");
                Ok(format!("3:{path}:{sid}"))
            }
            Packet::Message { path, payload } => match payload {
                Payload::Text(text) => Ok(format!("1:{path}:{text}")),
                #[cfg(feature = "json")]
                Payload::Json(value) => {
                    let json = serde_json::to_string(value)
                        .map_err(|e| ProtocolError::BadJson(e.to_string()))?;
                    Ok(format!("1:j:{path}:{json}"))
                }
            },
            Packet::Heartbeat { token } => Ok(format!("2::{token}")),
        }
    }

    /// Decodes a wire frame into a packet.
    ///
    /// # Errors
    /// - [`ProtocolError::Truncated`] — a mandatory separator is missing.
    /// - [`ProtocolError::UnknownType`] — unrecognized type code. The
    ///   caller drops the packet; this is not fatal to the connection.
    /// - [`ProtocolError::BadNamespace`] — address is neither empty nor
    ///   `/`-prefixed.
    /// - [`ProtocolError::BadJson`] — `j`-flagged payload is not valid
    ///   JSON.
    pub fn decode(raw: &str) -> Result<Packet, ProtocolError> {
        let (code, rest) = raw
            .split_once(':')
            .ok_or_else(|| ProtocolError::Truncated(raw.to_string()))?;

        match code {
            "0" => {
                let (path, _reason) = split_address(raw, rest)?;
                Ok(Packet::Disconnect { path })
            }
            "1" => {
                #[cfg(feature = "json")]
                if let Some(rest) = rest.strip_prefix("j:") {
                    let (path, body) = split_address(raw, rest)?;
                    let value: serde_json::Value = serde_json::from_str(&body)
                        .map_err(|e| ProtocolError::BadJson(e.to_string()))?;
                    return Ok(Packet::Message {
                        path,
                        payload: Payload::Json(value),
                    });
                }
                let (path, body) = split_address(raw, rest)?;
                Ok(Packet::Message {
                    path,
                    payload: Payload::Text(body),
                })
            }
            "2" => {
                // The address slot is present but heartbeats are always
                // connection-level; a routed heartbeat is malformed.
                let (path, token) = split_address(raw, rest)?;
                if !path.is_empty() {
                    return Err(ProtocolError::BadNamespace(path));
                }
                Ok(Packet::Heartbeat { token })
            }
            "3" => {
                let (path, sid) = split_address(raw, rest)?;
                let session = if sid.is_empty() { None } else { Some(sid) };
                Ok(Packet::Connect { path, session })
            }
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

/// Splits `<namespace>:<payload>` and validates the address.
///
/// `raw` is only used to report the full offending frame on error.
fn split_address(raw: &str, rest: &str) -> Result<(String, String), ProtocolError> {
    let (path, payload) = rest
        .split_once(':')
        .ok_or_else(|| ProtocolError::Truncated(raw.to_string()))?;
    if !path.is_empty() && !path.starts_with('/') {
        return Err(ProtocolError::BadNamespace(path.to_string()));
    }
    Ok((path.to_string(), payload.to_string()))
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(packet: Packet) {
        let frame = packet.encode().expect("encode should succeed");
        let decoded = Packet::decode(&frame).expect("decode should succeed");
        assert_eq!(packet, decoded, "frame was {frame:?}");
    }

    // =====================================================================
    // Framing round trips
    // =====================================================================

    #[test]
    fn test_encode_disconnect_wire_shape() {
        let packet = Packet::Disconnect {
            path: "/chat".into(),
        };
        assert_eq!(packet.encode().unwrap(), "0:/chat:");
    }

    #[test]
    fn test_encode_connect_root_carries_session() {
        let packet = Packet::Connect {
            path: String::new(),
            session: Some("abc123".into()),
        };
        assert_eq!(packet.encode().unwrap(), "3::abc123");
    }

    #[test]
    fn test_encode_connect_namespace_has_no_session() {
        let packet = Packet::Connect {
            path: "/news".into(),
            session: None,
        };
        assert_eq!(packet.encode().unwrap(), "3:/news:");
    }

    #[test]
    fn test_round_trip_every_packet_type() {
        round_trip(Packet::Disconnect { path: String::new() });
        round_trip(Packet::Disconnect { path: "/a".into() });
        round_trip(Packet::Connect {
            path: String::new(),
            session: Some("s-1".into()),
        });
        round_trip(Packet::Connect {
            path: "/a".into(),
            session: None,
        });
        round_trip(Packet::Message {
            path: "/a".into(),
            payload: Payload::Text("hello".into()),
        });
        round_trip(Packet::Heartbeat { token: "7".into() });
    }

    #[test]
    fn test_round_trip_payload_containing_separator() {
        // The payload is the trailing field, so it may contain `:`
        // without any escaping.
        round_trip(Packet::Message {
            path: "/a".into(),
            payload: Payload::Text("a:b:c".into()),
        });
    }

    #[test]
    fn test_round_trip_json_payload_non_ascii() {
        round_trip(Packet::Message {
            path: "/i18n".into(),
            payload: Payload::Json(serde_json::json!({
                "greeting": "héllo wörld ✓",
                "n": 42,
            })),
        });
    }

    #[test]
    fn test_json_flag_marks_structured_payload() {
        let frame = Packet::Message {
            path: "/a".into(),
            payload: Payload::Json(serde_json::json!([1, 2])),
        }
        .encode()
        .unwrap();
        assert_eq!(frame, "1:j:/a:[1,2]");
    }

    #[test]
    fn test_plain_text_that_looks_like_json_stays_text() {
        // Without the `j` flag the receiver must not parse the body.
        let decoded = Packet::decode("1:/a:{\"x\":1}").unwrap();
        assert_eq!(
            decoded,
            Packet::Message {
                path: "/a".into(),
                payload: Payload::Text("{\"x\":1}".into()),
            }
        );
    }

    #[test]
    fn test_heartbeat_token_is_opaque() {
        // Tokens are echoed verbatim; the codec never interprets them.
        round_trip(Packet::Heartbeat {
            token: "~h~weird token:with colon".into(),
        });
    }

    // =====================================================================
    // Malformed frames
    // =====================================================================

    #[test]
    fn test_decode_unknown_type_code_fails() {
        let err = Packet::decode("9:/a:hi").unwrap_err();
        assert_eq!(err, ProtocolError::UnknownType("9".into()));
    }

    #[test]
    fn test_decode_empty_frame_fails() {
        assert!(matches!(
            Packet::decode(""),
            Err(ProtocolError::Truncated(_))
        ));
    }

    #[test]
    fn test_decode_missing_payload_separator_fails() {
        assert!(matches!(
            Packet::decode("1:/chat"),
            Err(ProtocolError::Truncated(_))
        ));
    }

    #[test]
    fn test_decode_unprefixed_namespace_fails() {
        assert!(matches!(
            Packet::decode("1:chat:hi"),
            Err(ProtocolError::BadNamespace(_))
        ));
    }

    #[test]
    fn test_decode_routed_heartbeat_fails() {
        assert!(matches!(
            Packet::decode("2:/a:token"),
            Err(ProtocolError::BadNamespace(_))
        ));
    }

    #[test]
    fn test_decode_malformed_json_payload_fails() {
        assert!(matches!(
            Packet::decode("1:j:/a:{not json"),
            Err(ProtocolError::BadJson(_))
        ));
    }

    #[test]
    fn test_path_accessor_reports_routing_address() {
        assert_eq!(
            Packet::Message {
                path: "/a".into(),
                payload: Payload::Text(String::new()),
            }
            .path(),
            "/a"
        );
        // Heartbeats always route to the connection itself.
        assert_eq!(Packet::Heartbeat { token: "1".into() }.path(), "");
    }
}
