//! Transport abstraction layer for Tether.
//!
//! The engine speaks to the network through interchangeable
//! byte-transports (WebSocket, XHR polling, server-sent events, …).
//! This crate defines the *contract* those transports satisfy — not any
//! concrete implementation:
//!
//! - [`Transport`] — the per-instance capability set the connection
//!   manager drives: `connect`, `send`, `disconnect`, plus an instance
//!   cross-domain capability.
//! - [`TransportFactory`] — static probes consulted during selection.
//!   Selection is pure: no transport instance exists until a factory is
//!   chosen and `create` is called.
//! - [`TransportRegistry`] — the name → factory table the connection
//!   manager iterates, in its own configured order.
//! - [`Locator`] / [`OriginProvider`] — structured addresses and
//!   cross-origin detection.

mod error;
mod locator;

pub use error::TransportError;
pub use locator::{FixedOrigin, Locator, OriginProvider};

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Host-environment capabilities a factory's support probe may consult.
///
/// A polling transport needs CORS to reach a foreign host; a JSON-framed
/// transport needs a JSON codec. Native embedders have everything and use
/// `Environment::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    /// Cross-origin HTTP requests are possible.
    pub has_cors: bool,
    /// A JSON parser/serializer is available.
    pub has_json: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            has_cors: true,
            has_json: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Transport contract
// ---------------------------------------------------------------------------

/// Everything a factory needs to construct a transport instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportContext {
    /// Fully-built endpoint URL for this transport and session.
    pub url: String,
    /// The negotiated session id.
    pub session_id: String,
}

/// The capability set every concrete transport implements.
///
/// Instances are owned exclusively by the connection manager and replaced
/// (never aliased) on a transport swap. Inbound traffic does not flow
/// through this trait: the embedder's I/O layer feeds received frames to
/// the connection manager directly, keeping the contract one-directional
/// and the core free of callbacks into itself.
pub trait Transport {
    /// The transport's registered name (`"websocket"`, `"xhr-polling"`).
    fn name(&self) -> &str;

    /// Begins establishing the carrier. Completion is reported to the
    /// connection manager by the embedder (`on_transport_open`).
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Writes one wire frame.
    fn send(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Writes a batch of frames in order.
    ///
    /// Defaults to sequential [`Transport::send`]. Transports with a
    /// cheaper bulk encoding (e.g. a polling POST body) should override.
    fn send_batch(&mut self, frames: &[String]) -> Result<(), TransportError> {
        for frame in frames {
            self.send(frame)?;
        }
        Ok(())
    }

    /// Tears down the carrier. Must be safe to call more than once.
    fn disconnect(&mut self);

    /// Whether this instance may talk to a host other than the origin.
    fn supports_cross_domain(&self) -> bool;
}

/// Static probes for a transport kind, consulted before construction.
pub trait TransportFactory {
    /// The name this factory registers under.
    fn name(&self) -> &str;

    /// Can this transport run at all in the given environment?
    fn is_supported(&self, env: &Environment) -> bool;

    /// Can this transport reach a host other than the current origin?
    fn supports_cross_domain(&self) -> bool;

    /// Constructs a fresh instance. Only called after this factory won
    /// selection.
    fn create(&self, ctx: &TransportContext) -> Box<dyn Transport>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Name → factory table.
///
/// The registry imposes no ordering of its own; the connection manager
/// iterates its configured candidate list and looks each name up here.
#[derive(Default)]
pub struct TransportRegistry {
    factories: HashMap<String, Box<dyn TransportFactory>>,
}

impl TransportRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under its own name, replacing any previous
    /// registration of that name.
    pub fn register(&mut self, factory: Box<dyn TransportFactory>) {
        tracing::debug!(name = factory.name(), "registering transport factory");
        self.factories.insert(factory.name().to_string(), factory);
    }

    /// Looks up a factory by name.
    pub fn get(&self, name: &str) -> Option<&dyn TransportFactory> {
        self.factories.get(name).map(Box::as_ref)
    }

    /// Returns `true` if a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// A do-nothing transport for probing the registry surface.
    struct StubTransport {
        name: &'static str,
        sent: Vec<String>,
    }

    impl Transport for StubTransport {
        fn name(&self) -> &str {
            self.name
        }
        fn connect(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
        fn send(&mut self, frame: &str) -> Result<(), TransportError> {
            self.sent.push(frame.to_string());
            Ok(())
        }
        fn disconnect(&mut self) {}
        fn supports_cross_domain(&self) -> bool {
            true
        }
    }

    struct StubFactory {
        name: &'static str,
        supported: bool,
    }

    impl TransportFactory for StubFactory {
        fn name(&self) -> &str {
            self.name
        }
        fn is_supported(&self, _env: &Environment) -> bool {
            self.supported
        }
        fn supports_cross_domain(&self) -> bool {
            false
        }
        fn create(&self, _ctx: &TransportContext) -> Box<dyn Transport> {
            Box::new(StubTransport {
                name: self.name,
                sent: Vec::new(),
            })
        }
    }

    #[test]
    fn test_registry_lookup_by_name() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(StubFactory {
            name: "websocket",
            supported: true,
        }));

        assert!(registry.contains("websocket"));
        assert!(registry.get("websocket").is_some());
        assert!(registry.get("xhr-polling").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_replaces_same_name() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(StubFactory {
            name: "websocket",
            supported: true,
        }));
        registry.register(Box::new(StubFactory {
            name: "websocket",
            supported: false,
        }));

        assert_eq!(registry.len(), 1);
        let factory = registry.get("websocket").unwrap();
        assert!(!factory.is_supported(&Environment::default()));
    }

    #[test]
    fn test_selection_is_a_pure_probe() {
        // Probing a factory must not construct a transport; `create` is
        // the only constructor. This is a compile-shape test more than a
        // runtime one: is_supported takes &self and returns a bool.
        let factory = StubFactory {
            name: "websocket",
            supported: true,
        };
        assert!(factory.is_supported(&Environment::default()));
        assert!(!factory.supports_cross_domain());
    }

    #[test]
    fn test_send_batch_defaults_to_sequential_send() {
        let mut transport = StubTransport {
            name: "stub",
            sent: Vec::new(),
        };
        let frames = vec!["1::a".to_string(), "1::b".to_string()];
        transport.send_batch(&frames).unwrap();
        assert_eq!(transport.sent, frames);
    }

    #[test]
    fn test_environment_default_has_everything() {
        let env = Environment::default();
        assert!(env.has_cors);
        assert!(env.has_json);
    }
}
