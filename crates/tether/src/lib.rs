//! Tether: a client-side multiplexed messaging engine.
//!
//! Tether maintains one logical connection to a server over whichever
//! transport the two sides can agree on, multiplexes any number of
//! namespaces over it, keeps it alive with heartbeats, and fights to
//! re-establish it when it drops:
//!
//! - **Handshake** — an HTTP request yields a session id, heartbeat and
//!   close timeouts, and the server's transport list
//!   ([`tether_protocol`]).
//! - **Transport negotiation** — the configured preference order is
//!   intersected with the server's list and each candidate is probed
//!   and tried in turn ([`tether_transport`]).
//! - **Namespaces** — logical channels sharing the one physical
//!   connection ([`Namespace`]).
//! - **Reconnection** — exponential backoff with a bounded attempt
//!   ceiling and a final pass cycling through every transport
//!   ([`tether_reconnect`]).
//!
//! The core [`Socket`] is synchronous and I/O-free, driven entirely
//! through its `on_*` entry points; [`Driver`] is the tokio shell that
//! runs it. See each module's docs for the details.

mod config;
mod driver;
mod error;
mod event;
mod namespace;
mod socket;
mod timer;

pub use config::SocketConfig;
pub use driver::{Driver, Io};
pub use error::{Advice, SocketError};
pub use event::Event;
pub use namespace::Namespace;
pub use socket::Socket;

// Re-exported so embedders rarely need the component crates directly.
pub use tether_events::ListenerId;
pub use tether_protocol::{Handshake, HandshakeRequest, Packet, Payload};
pub use tether_reconnect::RetryPolicy;
pub use tether_transport::{
    Environment, FixedOrigin, Locator, OriginProvider, Transport, TransportContext,
    TransportError, TransportFactory, TransportRegistry,
};

/// Everything most embedders need.
pub mod prelude {
    pub use crate::{
        Driver, Event, Io, Namespace, Payload, RetryPolicy, Socket, SocketConfig, SocketError,
        Transport, TransportContext, TransportFactory, TransportRegistry,
    };
}
