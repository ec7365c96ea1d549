//! Async shell around the synchronous [`Socket`] core.
//!
//! The socket never blocks and never performs I/O; the driver is the
//! single task that owns it and connects it to the world:
//!
//! ```text
//!   app / transport I/O ──Io──▶ ┌────────┐
//!                               │ Driver │──HandshakeRequest──▶ embedder
//!   timers (sleep_until) ─────▶ └────────┘
//! ```
//!
//! One `select!` loop, two wake sources: an inbound [`Io`] message, or
//! the socket's nearest timer deadline. Every staged handshake request
//! is forwarded on the handshake channel for the embedder to perform
//! with whatever HTTP client it has.

use std::time::Instant;

use tokio::sync::mpsc;

use tether_protocol::{HandshakeRequest, Payload};

use crate::{Socket, SocketError};

/// Everything the outside world can feed into the driver.
#[derive(Debug)]
pub enum Io {
    /// Issue a connect (no-op if one is already under way).
    Connect,
    /// Send a message to the namespace at `path`.
    Send { path: String, payload: Payload },
    /// Close deliberately and cancel any retry campaign.
    Disconnect,

    /// The handshake HTTP request succeeded; here is its body.
    HandshakeResponse(String),
    /// The handshake HTTP request failed.
    HandshakeError(String),
    /// The transport's carrier opened.
    TransportOpen,
    /// One inbound wire frame.
    TransportData(String),
    /// The transport's carrier closed.
    TransportClosed,
    /// An error from the transport or embedder, advice and all.
    Error(SocketError),

    /// Stop the driver and return the socket.
    Shutdown,
}

/// Owns a [`Socket`] and runs its event loop on tokio.
pub struct Driver {
    socket: Socket,
    io: mpsc::UnboundedReceiver<Io>,
    handshakes: mpsc::UnboundedSender<HandshakeRequest>,
}

impl Driver {
    pub fn new(
        socket: Socket,
        io: mpsc::UnboundedReceiver<Io>,
        handshakes: mpsc::UnboundedSender<HandshakeRequest>,
    ) -> Self {
        Self {
            socket,
            io,
            handshakes,
        }
    }

    /// The socket, for wiring up listeners before the loop starts.
    pub fn socket_mut(&mut self) -> &mut Socket {
        &mut self.socket
    }

    /// Runs until [`Io::Shutdown`] arrives or every sender is dropped.
    /// Returns the socket so final state can be inspected.
    pub async fn run(mut self) -> Socket {
        if self.socket.config().auto_connect {
            self.socket.connect();
        }
        self.forward_handshake();

        loop {
            let deadline = self.socket.next_deadline();
            tokio::select! {
                message = self.io.recv() => {
                    match message {
                        Some(Io::Connect) => {
                            self.socket.connect();
                        }
                        Some(Io::Send { path, payload }) => {
                            self.socket.send(&path, payload);
                        }
                        Some(Io::Disconnect) => self.socket.disconnect(),
                        Some(Io::HandshakeResponse(body)) => {
                            self.socket.on_handshake_response(&body);
                        }
                        Some(Io::HandshakeError(message)) => {
                            self.socket.on_handshake_error(&message);
                        }
                        Some(Io::TransportOpen) => self.socket.on_transport_open(),
                        Some(Io::TransportData(frame)) => {
                            self.socket.on_transport_data(&frame);
                        }
                        Some(Io::TransportClosed) => self.socket.on_transport_close(),
                        Some(Io::Error(error)) => self.socket.on_error(error),
                        Some(Io::Shutdown) | None => {
                            tracing::debug!("driver shutting down");
                            break;
                        }
                    }
                }
                _ = sleep_until(deadline) => {
                    self.socket.poll_timers(Instant::now());
                }
            }
            self.forward_handshake();
        }
        self.socket
    }

    fn forward_handshake(&mut self) {
        if let Some(request) = self.socket.take_handshake_request() {
            // A dropped receiver just means nobody is performing
            // handshakes anymore; the connect timer will expire it.
            let _ = self.handshakes.send(request);
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        }
        None => std::future::pending().await,
    }
}
