//! A complete Tether session against an in-process toy server.
//!
//! Everything stays in memory: the "network" is a pair of channels, the
//! transport is a loopback that pushes frames straight into the server
//! task, and the server speaks just enough of the protocol to hand out a
//! session, ack connects, emit heartbeats, and echo messages back in
//! uppercase.
//!
//! Run with `RUST_LOG=debug cargo run -p loopback-demo` to watch the
//! whole connect / message / heartbeat / disconnect sequence.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tether::prelude::*;
use tether::{Environment, HandshakeRequest, Packet, TransportError};

const SESSION_ID: &str = "loopback-1";
const HEARTBEAT_SECS: u64 = 2;

// ---------------------------------------------------------------------------
// Loopback transport
// ---------------------------------------------------------------------------

struct LoopbackTransport {
    to_server: UnboundedSender<String>,
    io: UnboundedSender<Io>,
    opened: UnboundedSender<()>,
}

impl Transport for LoopbackTransport {
    fn name(&self) -> &str {
        "loopback"
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        // The carrier is a channel; it is open the moment we say so.
        self.opened
            .send(())
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        self.io
            .send(Io::TransportOpen)
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        Ok(())
    }

    fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        self.to_server
            .send(frame.to_string())
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn disconnect(&mut self) {}

    fn supports_cross_domain(&self) -> bool {
        true
    }
}

struct LoopbackFactory {
    to_server: UnboundedSender<String>,
    io: UnboundedSender<Io>,
    opened: UnboundedSender<()>,
}

impl TransportFactory for LoopbackFactory {
    fn name(&self) -> &str {
        "loopback"
    }

    fn is_supported(&self, _env: &Environment) -> bool {
        true
    }

    fn supports_cross_domain(&self) -> bool {
        true
    }

    fn create(&self, _ctx: &TransportContext) -> Box<dyn Transport> {
        Box::new(LoopbackTransport {
            to_server: self.to_server.clone(),
            io: self.io.clone(),
            opened: self.opened.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Toy server
// ---------------------------------------------------------------------------

/// Answers handshakes, acks connects, heartbeats, and echoes messages
/// back uppercased.
async fn toy_server(
    mut handshakes: UnboundedReceiver<HandshakeRequest>,
    mut from_client: UnboundedReceiver<String>,
    mut opened: UnboundedReceiver<()>,
    io: UnboundedSender<Io>,
) {
    let mut heartbeat = tokio::time::interval(Duration::from_secs(1));
    let mut heartbeat_seq = 0u32;
    let mut live = false;

    loop {
        tokio::select! {
            request = handshakes.recv() => {
                let Some(request) = request else { break };
                info!(url = %request.url(), "server: handshake");
                let body = format!("{SESSION_ID}:{HEARTBEAT_SECS}:5:loopback");
                if io.send(Io::HandshakeResponse(body)).is_err() {
                    break;
                }
            }
            _ = opened.recv() => {
                live = true;
                // Ack the session on the root namespace.
                let _ = io.send(Io::TransportData(format!("3::{SESSION_ID}")));
            }
            frame = from_client.recv() => {
                let Some(frame) = frame else { break };
                match Packet::decode(&frame) {
                    Ok(Packet::Message { path, payload }) => {
                        let text = match payload {
                            Payload::Text(text) => text,
                            other => format!("{other:?}"),
                        };
                        info!(%path, %text, "server: message");
                        let echo = Packet::Message {
                            path,
                            payload: Payload::Text(text.to_uppercase()),
                        };
                        let _ = io.send(Io::TransportData(
                            echo.encode().expect("text payloads always encode"),
                        ));
                    }
                    Ok(Packet::Connect { path, .. }) if !path.is_empty() => {
                        info!(%path, "server: namespace join");
                        let _ = io.send(Io::TransportData(format!("3:{path}:")));
                    }
                    Ok(Packet::Disconnect { path }) if path.is_empty() => {
                        info!("server: client disconnected");
                        live = false;
                    }
                    Ok(other) => info!(?other, "server: packet"),
                    Err(error) => info!(%error, "server: bad frame"),
                }
            }
            _ = heartbeat.tick() => {
                if live {
                    heartbeat_seq += 1;
                    let _ = io.send(Io::TransportData(format!("2::{heartbeat_seq}")));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (to_server_tx, to_server_rx) = mpsc::unbounded_channel();
    let (io_tx, io_rx) = mpsc::unbounded_channel();
    let (opened_tx, opened_rx) = mpsc::unbounded_channel();
    let (handshake_tx, handshake_rx) = mpsc::unbounded_channel();

    let mut registry = TransportRegistry::new();
    registry.register(Box::new(LoopbackFactory {
        to_server: to_server_tx,
        io: io_tx.clone(),
        opened: opened_tx,
    }));

    let config = SocketConfig {
        host: "loopback.local".into(),
        transports: vec!["loopback".into()],
        ..SocketConfig::default()
    };
    let mut socket = Socket::new(config, registry);
    socket.on(|event| info!(?event, "client: event"));
    socket
        .of("/shout")
        .on(|event| {
            if let Event::Message(Payload::Text(text)) = event {
                info!(%text, "client: /shout echo");
            }
        });

    tokio::spawn(toy_server(handshake_rx, to_server_rx, opened_rx, io_tx.clone()));

    let driver = Driver::new(socket, io_rx, handshake_tx);

    let script = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        for text in ["hello", "tether", "goodbye"] {
            let _ = io_tx.send(Io::Send {
                path: "/shout".into(),
                payload: Payload::Text(text.into()),
            });
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        // Ride out a couple of heartbeats, then leave cleanly.
        tokio::time::sleep(Duration::from_secs(3)).await;
        let _ = io_tx.send(Io::Disconnect);
        let _ = io_tx.send(Io::Shutdown);
    };

    let (socket, ()) = tokio::join!(driver.run(), script);
    info!(state = ?socket, "session over");
}
