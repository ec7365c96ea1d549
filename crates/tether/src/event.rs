//! Lifecycle and message events published by the socket.

use std::time::Duration;

use tether_protocol::Payload;

use crate::SocketError;

/// Everything a socket (or one of its namespaces) can tell a listener.
///
/// Lifecycle events are published to the socket's own listeners *and*
/// fanned out to every namespace, so a namespace handle is enough to
/// observe the connection it rides on. Two exceptions: `Message` is
/// delivered only to the namespace it was addressed to, and `Connect`
/// reaches a namespace only when that namespace's own join is
/// acknowledged — the root acknowledgment fires it on the socket alone.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A transport was selected and is being opened.
    Connecting { transport: String },

    /// The transport's carrier is open; frames can flow.
    Open,

    /// The server acknowledged the session. The socket is fully up.
    Connect,

    /// An inbound message, delivered to its target namespace.
    Message(Payload),

    /// The connection ended. `reason` is `"booted"` for a deliberate
    /// close (local or server-initiated) and `"connection lost"` when
    /// the heartbeat went silent or the carrier dropped.
    Disconnect { reason: String },

    /// Something went wrong. The socket may already have reacted to any
    /// attached advice by the time listeners see this.
    Error(SocketError),

    /// Every candidate transport was tried and none opened.
    ConnectFailed,

    /// A retry attempt has been scheduled `delay` from now.
    Reconnecting { delay: Duration, attempt: u32 },

    /// A retry attempt succeeded on the named transport.
    Reconnect { transport: String, attempt: u32 },

    /// The retry campaign exhausted its ceiling without getting back in.
    ReconnectFailed,
}
