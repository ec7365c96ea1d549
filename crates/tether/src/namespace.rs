//! Namespace handles: logical channels multiplexed over one socket.

use tether_events::{Emitter, ListenerId};
use tether_protocol::Packet;

use crate::Event;

/// One logical channel on a shared physical connection.
///
/// Created through [`Socket::of`](crate::Socket::of). The default
/// namespace has the empty path and is implicitly connected as soon as
/// the socket is; every other namespace announces itself to the server
/// with a connect packet and is considered connected once that packet is
/// acknowledged.
#[derive(Debug)]
pub struct Namespace {
    path: String,
    connected: bool,
    emitter: Emitter<Event>,
}

impl Namespace {
    pub(crate) fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            // The root namespace needs no join handshake of its own.
            connected: path.is_empty(),
            emitter: Emitter::new(),
        }
    }

    /// The namespace path, `""` for the default namespace.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the server has acknowledged this namespace.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Registers a listener for every event touching this namespace.
    pub fn on<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Event) + 'static,
    {
        self.emitter.on(listener)
    }

    /// Registers a listener that fires once and is removed.
    pub fn once<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnOnce(&Event) + 'static,
    {
        self.emitter.once(listener)
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.emitter.off(id)
    }

    pub(crate) fn emit(&mut self, event: &Event) {
        self.emitter.emit(event);
    }

    /// Handles a packet the socket routed here by path.
    pub(crate) fn handle_packet(&mut self, packet: &Packet) {
        match packet {
            Packet::Connect { .. } => {
                tracing::debug!(path = %self.path, "namespace connected");
                self.connected = true;
                self.emitter.emit(&Event::Connect);
            }
            Packet::Disconnect { .. } => {
                self.on_disconnect("booted");
            }
            Packet::Message { payload, .. } => {
                self.emitter.emit(&Event::Message(payload.clone()));
            }
            // Heartbeats are handled at the socket level, never routed.
            Packet::Heartbeat { .. } => {}
        }
    }

    /// Marks the namespace down and tells its listeners.
    pub(crate) fn on_disconnect(&mut self, reason: &str) {
        self.connected = false;
        self.emitter.emit(&Event::Disconnect {
            reason: reason.to_string(),
        });
    }
}
