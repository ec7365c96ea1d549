//! Transport layer error types.

/// Errors reported by a concrete transport implementation.
///
/// Variants carry owned strings so errors stay `Clone + PartialEq` and
/// can be forwarded inside emitted events without losing information.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// An operation was attempted before `connect()` succeeded.
    #[error("transport is not connected")]
    NotConnected,

    /// The transport failed to establish its carrier.
    #[error("transport connect failed: {0}")]
    ConnectFailed(String),

    /// A frame could not be written to the carrier.
    #[error("transport send failed: {0}")]
    SendFailed(String),

    /// The carrier was closed by the peer or the local side.
    #[error("transport closed: {0}")]
    Closed(String),
}
