//! Shared test doubles: a scriptable in-memory transport and helpers to
//! walk a socket through the connect sequence by hand.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tether::{
    Environment, Event, Socket, Transport, TransportContext, TransportError, TransportFactory,
    TransportRegistry,
};

/// The handshake body most tests answer with.
pub const HANDSHAKE: &str = "sid1234:15:25:websocket,xhr-polling";

/// The root connect acknowledgment matching [`HANDSHAKE`].
pub const CONNECT_ACK: &str = "3::sid1234";

/// Everything the mock transports record, shared with the factory so
/// tests can inspect traffic after the socket consumed the instances.
#[derive(Debug, Default)]
pub struct TransportLog {
    pub frames: RefCell<Vec<String>>,
    pub created: Cell<u32>,
    pub connects: Cell<u32>,
    pub disconnects: Cell<u32>,
    /// When set, instances fail synchronously on `connect`. Shared so a
    /// test can flip it mid-scenario.
    pub fail_connect: Cell<bool>,
}

pub struct MockTransport {
    name: String,
    cross_domain: bool,
    log: Rc<TransportLog>,
}

impl Transport for MockTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        self.log.connects.set(self.log.connects.get() + 1);
        if self.log.fail_connect.get() {
            Err(TransportError::ConnectFailed("refused".into()))
        } else {
            Ok(())
        }
    }

    fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        self.log.frames.borrow_mut().push(frame.to_string());
        Ok(())
    }

    fn disconnect(&mut self) {
        self.log.disconnects.set(self.log.disconnects.get() + 1);
    }

    fn supports_cross_domain(&self) -> bool {
        self.cross_domain
    }
}

pub struct MockFactory {
    name: String,
    supported: bool,
    cross_domain: bool,
    log: Rc<TransportLog>,
}

impl MockFactory {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            supported: true,
            cross_domain: true,
            log: Rc::new(TransportLog::default()),
        }
    }

    /// This factory's support probe reports `false`.
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    /// Instances refuse cross-origin targets.
    pub fn same_origin_only(mut self) -> Self {
        self.cross_domain = false;
        self
    }

    /// Instances fail synchronously on `connect`.
    pub fn failing(self) -> Self {
        self.log.fail_connect.set(true);
        self
    }

    /// Handle on the traffic log, kept by the test before registration.
    pub fn log(&self) -> Rc<TransportLog> {
        Rc::clone(&self.log)
    }
}

impl TransportFactory for MockFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_supported(&self, _env: &Environment) -> bool {
        self.supported
    }

    fn supports_cross_domain(&self) -> bool {
        self.cross_domain
    }

    fn create(&self, _ctx: &TransportContext) -> Box<dyn Transport> {
        self.log.created.set(self.log.created.get() + 1);
        Box::new(MockTransport {
            name: self.name.clone(),
            cross_domain: self.cross_domain,
            log: Rc::clone(&self.log),
        })
    }
}

/// Builds a registry from the given factories.
pub fn registry(factories: Vec<MockFactory>) -> TransportRegistry {
    let mut registry = TransportRegistry::new();
    for factory in factories {
        registry.register(Box::new(factory));
    }
    registry
}

/// Records every socket-level event into a shared log.
pub fn record(socket: &mut Socket) -> Rc<RefCell<Vec<Event>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    socket.on(move |event| sink.borrow_mut().push(event.clone()));
    log
}

/// Walks `socket` through handshake, transport open, and the server's
/// connect acknowledgment.
pub fn bring_up(socket: &mut Socket) {
    assert!(socket.connect(), "connect should start a handshake");
    socket
        .take_handshake_request()
        .expect("a handshake request should be staged");
    socket.on_handshake_response(HANDSHAKE);
    socket.on_transport_open();
    socket.on_transport_data(CONNECT_ACK);
    assert!(socket.is_connected(), "connect sequence should finish");
}
