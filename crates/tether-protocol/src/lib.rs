//! Wire protocol for Tether.
//!
//! This crate defines what travels on the wire and nothing else:
//!
//! - **Packets** ([`Packet`], [`Payload`]) — the framed protocol units
//!   (disconnect / message / heartbeat / connect) and their text codec.
//! - **Handshake** ([`HandshakeRequest`], [`Handshake`]) — the
//!   session-negotiation URL and response body.
//! - **Errors** ([`ProtocolError`]) — framing and parsing failures.
//!
//! # Architecture
//!
//! The protocol layer sits below the connection manager. It knows nothing
//! about transports, namespaces, or retries — it only converts between
//! typed values and wire text:
//!
//! ```text
//! Transport (text frames) → Protocol (Packet) → Socket (routing, state)
//! ```

mod error;
mod handshake;
mod packet;

pub use error::ProtocolError;
pub use handshake::{transport_url, Handshake, HandshakeRequest, PROTOCOL_VERSION};
pub use packet::{Packet, Payload};
