//! Error types for the wire codec.
//!
//! Each crate in Tether defines its own error enum. A `ProtocolError`
//! always means a framing or parsing problem — never a networking or
//! connection-state problem. A malformed frame is dropped by the
//! connection manager; it is not fatal to the connection.

/// Errors produced while encoding or decoding wire frames.
///
/// All variants carry owned strings so the error is `Clone + PartialEq`
/// and can travel inside emitted events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame ended before all mandatory fields were present.
    #[error("truncated frame: {0:?}")]
    Truncated(String),

    /// The leading type code is not one of the known packet types.
    #[error("unknown packet type code: {0:?}")]
    UnknownType(String),

    /// The namespace address is neither empty nor `/`-prefixed.
    #[error("invalid namespace address: {0:?}")]
    BadNamespace(String),

    /// A payload carried the JSON flag but did not parse as JSON.
    #[cfg(feature = "json")]
    #[error("malformed json payload: {0}")]
    BadJson(String),

    /// The handshake response body did not have the expected shape.
    #[error("malformed handshake response: {0}")]
    BadHandshake(String),
}
