//! Error types surfaced by the connection manager.

use tether_protocol::ProtocolError;
use tether_transport::TransportError;

/// Server advice attached to an error, telling the client how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    /// Drop the current connection and start a reconnection campaign.
    Reconnect,
}

/// Anything that can go wrong on a live socket.
///
/// Kept `Clone + PartialEq` so errors can ride inside
/// [`Event`](crate::Event) values handed to every listener.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SocketError {
    /// The handshake request failed or its body did not parse.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport layer reported a failure, optionally with server
    /// advice on how to recover.
    #[error("transport failure: {error}")]
    Transport {
        #[source]
        error: TransportError,
        advice: Option<Advice>,
    },
}

impl SocketError {
    /// Wraps a transport error with no recovery advice.
    pub fn transport(error: TransportError) -> Self {
        Self::Transport {
            error,
            advice: None,
        }
    }

    /// Wraps a transport error carrying reconnect advice.
    pub fn transport_with_reconnect(error: TransportError) -> Self {
        Self::Transport {
            error,
            advice: Some(Advice::Reconnect),
        }
    }

    /// The advice attached to this error, if any.
    pub fn advice(&self) -> Option<Advice> {
        match self {
            Self::Transport { advice, .. } => *advice,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advice_only_on_transport_errors() {
        let plain = SocketError::Handshake("timed out".into());
        assert_eq!(plain.advice(), None);

        let advised =
            SocketError::transport_with_reconnect(TransportError::Closed("reset".into()));
        assert_eq!(advised.advice(), Some(Advice::Reconnect));

        let unadvised = SocketError::transport(TransportError::NotConnected);
        assert_eq!(unadvised.advice(), None);
    }
}
