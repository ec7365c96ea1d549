//! The connection manager: one physical connection, many namespaces.
//!
//! # Architecture
//!
//! ```text
//!   application
//!       │  connect() / send() / disconnect()
//!       ▼
//!   ┌─────────────────────────────────────────────┐
//!   │ Socket                                      │
//!   │   lifecycle flags  (connecting/open/…)      │
//!   │   handshake staging                         │
//!   │   transport selection + fallback            │
//!   │   outbound buffer                           │
//!   │   namespaces (path → Namespace)             │
//!   │   reconnect session                         │
//!   │   timers (connect / heartbeat / retry)      │
//!   └─────────────────────────────────────────────┘
//!       ▲  on_handshake_response / on_transport_data / poll_timers …
//!       │
//!   embedder (Driver, test harness, …)
//! ```
//!
//! The socket performs no I/O and never sleeps. The embedder fetches
//! staged handshake requests with [`Socket::take_handshake_request`],
//! performs them, and reports the outcome back through the `on_*` entry
//! points; likewise it sleeps until [`Socket::next_deadline`] and then
//! calls [`Socket::poll_timers`]. Everything observable comes out as
//! [`Event`] values on the socket's and namespaces' emitters.

use std::collections::{HashMap, VecDeque};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tether_events::{Emitter, ListenerId};
use tether_protocol::{transport_url, Handshake, HandshakeRequest, Packet, Payload};
use tether_reconnect::{step, ConnectionView, ReconnectSession, RetryAction, DEFER_POLL};
use tether_transport::{
    Environment, FixedOrigin, OriginProvider, Transport, TransportContext, TransportError,
    TransportRegistry,
};

use crate::timer::{TimerKind, TimerSet};
use crate::{Advice, Event, Namespace, SocketConfig, SocketError};

/// Client endpoint of one multiplexed connection.
pub struct Socket {
    config: SocketConfig,
    registry: TransportRegistry,
    origin: Box<dyn OriginProvider>,
    environment: Environment,
    emitter: Emitter<Event>,

    // Lifecycle. `open` means the carrier is up; `connected` means the
    // server has acknowledged the session on top of it.
    connecting: bool,
    connected: bool,
    open: bool,
    handshaking: bool,

    session: Option<Handshake>,
    /// Negotiated transports: configured (or requested) ∩ server-allowed,
    /// in the configured order.
    transports: Vec<String>,
    /// Working set for the fallback walk, populated on first failure.
    remaining: Option<Vec<String>>,
    /// Transport override passed to [`Socket::connect_with`], consumed
    /// when the handshake response arrives.
    requested: Option<Vec<String>>,
    transport: Option<Box<dyn Transport>>,

    buffer: VecDeque<Packet>,
    do_buffer: bool,

    namespaces: HashMap<String, Namespace>,
    reconnect: Option<ReconnectSession>,
    /// A retry is already on the timer. One failure may surface through
    /// several signals (an error event plus the fallback exhausting);
    /// only the first of them schedules.
    retry_scheduled: bool,
    timers: TimerSet,
    staged_handshake: Option<HandshakeRequest>,
}

impl Socket {
    pub fn new(config: SocketConfig, registry: TransportRegistry) -> Self {
        Self {
            config,
            registry,
            origin: Box::new(FixedOrigin::none()),
            environment: Environment::default(),
            emitter: Emitter::new(),
            connecting: false,
            connected: false,
            open: false,
            handshaking: false,
            session: None,
            transports: Vec::new(),
            remaining: None,
            requested: None,
            transport: None,
            buffer: VecDeque::new(),
            do_buffer: false,
            namespaces: HashMap::new(),
            reconnect: None,
            retry_scheduled: false,
            timers: TimerSet::default(),
            staged_handshake: None,
        }
    }

    /// Replaces the origin provider used for cross-origin decisions.
    pub fn set_origin(&mut self, origin: Box<dyn OriginProvider>) {
        self.origin = origin;
    }

    /// Replaces the capability description transports are probed with.
    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_handshaking(&self) -> bool {
        self.handshaking
    }

    pub fn is_reconnecting(&self) -> bool {
        self.reconnect.is_some()
    }

    /// Session id assigned by the last successful handshake.
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    /// Name of the current transport instance, if one was constructed.
    pub fn transport_name(&self) -> Option<&str> {
        self.transport.as_ref().map(|t| t.name())
    }

    // ---------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------

    /// Registers a listener for every socket-level event.
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

    /// Removes a socket-level listener.
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.emitter.off(id)
    }

    // ---------------------------------------------------------------------
    // Namespaces
    // ---------------------------------------------------------------------

    /// Returns the namespace at `path`, creating it on first use.
    ///
    /// A non-root namespace is announced to the server with a connect
    /// packet: immediately when the socket is up, otherwise as part of
    /// the connect acknowledgment.
    pub fn of(&mut self, path: &str) -> &mut Namespace {
        if !self.namespaces.contains_key(path) {
            tracing::debug!(path, "creating namespace");
            self.namespaces
                .insert(path.to_string(), Namespace::new(path));
            if !path.is_empty() && self.connected {
                self.packet(Packet::Connect {
                    path: path.to_string(),
                    session: None,
                });
            }
        }
        self.namespaces.get_mut(path).expect("just inserted")
    }

    // ---------------------------------------------------------------------
    // Outbound path
    // ---------------------------------------------------------------------

    /// Sends `payload` to the namespace at `path`, creating it first if
    /// needed. Buffered until the socket can deliver it.
    pub fn send(&mut self, path: &str, payload: Payload) {
        self.of(path);
        self.packet(Packet::Message {
            path: path.to_string(),
            payload,
        });
    }

    /// Queues or transmits one packet, depending on connection state and
    /// the buffering switch.
    pub fn packet(&mut self, packet: Packet) {
        if self.connected && !self.do_buffer {
            self.send_frame(packet);
        } else {
            self.buffer.push_back(packet);
        }
    }

    /// Toggles outbound buffering. Turning it off on a live connection
    /// flushes everything held back, in order, as one batch.
    pub fn set_buffer(&mut self, buffering: bool) {
        self.do_buffer = buffering;
        if !buffering && self.connected {
            self.flush_buffer();
        }
    }

    fn send_frame(&mut self, packet: Packet) {
        let frame = match packet.encode() {
            Ok(frame) => frame,
            Err(error) => {
                self.on_error(SocketError::Protocol(error));
                return;
            }
        };
        let result = match self.transport.as_mut() {
            Some(transport) => transport.send(&frame),
            None => Err(TransportError::NotConnected),
        };
        if let Err(error) = result {
            self.on_error(SocketError::transport(error));
        }
    }

    fn flush_buffer(&mut self) {
        if self.buffer.is_empty() || self.transport.is_none() {
            return;
        }
        let packets: Vec<Packet> = self.buffer.drain(..).collect();
        let mut frames = Vec::with_capacity(packets.len());
        let mut encode_errors = Vec::new();
        for packet in &packets {
            match packet.encode() {
                Ok(frame) => frames.push(frame),
                Err(error) => encode_errors.push(error),
            }
        }
        tracing::debug!(frames = frames.len(), "flushing buffered packets");
        let sent = match self.transport.as_mut() {
            Some(transport) => transport.send_batch(&frames),
            None => Ok(()),
        };
        for error in encode_errors {
            self.on_error(SocketError::Protocol(error));
        }
        if let Err(error) = sent {
            self.on_error(SocketError::transport(error));
        }
    }

    // ---------------------------------------------------------------------
    // Connecting
    // ---------------------------------------------------------------------

    /// Starts the handshake using the configured transports. Returns
    /// `false` (and does nothing) if a connect is already under way.
    pub fn connect(&mut self) -> bool {
        self.connect_with(None)
    }

    /// Starts the handshake, optionally restricting which transports may
    /// be negotiated.
    pub fn connect_with(&mut self, transports: Option<Vec<String>>) -> bool {
        if self.connecting || self.handshaking {
            return false;
        }
        self.handshaking = true;
        self.requested = transports;
        let request = HandshakeRequest {
            secure: self.config.secure,
            host: self.config.host.clone(),
            port: self.config.port,
            resource: self.config.resource.clone(),
            timestamp_ms: unix_millis(),
            query: self.config.query.clone(),
        };
        tracing::info!(url = %request.url(), "starting handshake");
        self.staged_handshake = Some(request);
        true
    }

    /// Hands the embedder the handshake request staged by the last
    /// [`Socket::connect`] call, if one is pending.
    pub fn take_handshake_request(&mut self) -> Option<HandshakeRequest> {
        self.staged_handshake.take()
    }

    /// Feeds back a successful handshake response body.
    pub fn on_handshake_response(&mut self, body: &str) {
        self.handshaking = false;
        let handshake = match Handshake::decode(body) {
            Ok(handshake) => handshake,
            Err(error) => {
                self.on_error(SocketError::Handshake(error.to_string()));
                return;
            }
        };
        let offered = self
            .requested
            .take()
            .unwrap_or_else(|| self.config.transports.clone());
        // Keep the offered order: preference comes from the client, the
        // server only vetoes.
        self.transports = offered
            .into_iter()
            .filter(|name| handshake.transports.contains(name))
            .collect();
        tracing::info!(
            session = %handshake.session_id,
            transports = ?self.transports,
            "handshake complete"
        );
        self.session = Some(handshake);
        self.do_connect(None);
    }

    /// Feeds back a failed handshake request.
    pub fn on_handshake_error(&mut self, message: &str) {
        self.handshaking = false;
        tracing::warn!(message, "handshake failed");
        self.on_error(SocketError::Handshake(message.to_string()));
    }

    /// Picks the first usable transport from `override_list` (or the
    /// negotiated list) and opens it.
    fn do_connect(&mut self, override_list: Option<Vec<String>>) {
        let candidates = override_list.unwrap_or_else(|| self.transports.clone());
        let cross_origin = self.is_cross_origin();
        let selected = candidates
            .iter()
            .find(|name| {
                self.registry.get(name.as_str()).is_some_and(|factory| {
                    factory.is_supported(&self.environment)
                        && (!cross_origin || factory.supports_cross_domain())
                })
            })
            .cloned();

        let Some(name) = selected else {
            tracing::warn!(?candidates, "no usable transport");
            self.give_up_connecting();
            return;
        };
        let Some(session) = &self.session else {
            // Transport selection only happens after a handshake.
            return;
        };

        let context = TransportContext {
            url: transport_url(
                self.config.secure,
                &self.config.host,
                self.config.port,
                &self.config.resource,
                &name,
                &session.session_id,
            ),
            session_id: session.session_id.clone(),
        };
        let factory = self.registry.get(&name).expect("probed above");
        let mut transport = factory.create(&context);

        // One live instance at a time: close out the previous one before
        // opening its replacement.
        if let Some(mut old) = self.transport.take() {
            old.disconnect();
        }

        self.connecting = true;
        if let Some(timeout) = self.config.connect_timeout {
            self.timers.arm_connect(Instant::now() + timeout);
        }
        tracing::info!(transport = %name, url = %context.url, "opening transport");
        let result = transport.connect();
        self.transport = Some(transport);
        self.publish(Event::Connecting { transport: name });
        if let Err(error) = result {
            self.on_error(SocketError::transport(error));
            self.transport_failed();
        }
    }

    fn is_cross_origin(&self) -> bool {
        match self.origin.current() {
            Some(origin) => origin.is_cross_origin(&self.config.host, self.config.port),
            None => false,
        }
    }

    /// The current transport did not come up. Walk down the remaining
    /// negotiated transports, or give up when the list is spent.
    fn transport_failed(&mut self) {
        self.connecting = false;
        self.timers.clear_connect();

        if !self.config.try_multiple_transports {
            self.give_up_connecting();
            return;
        }

        if self.remaining.is_none() {
            self.remaining = Some(self.transports.clone());
        }
        let current = self.transport.as_ref().map(|t| t.name().to_string());
        if let Some(remaining) = self.remaining.as_mut() {
            match current.and_then(|name| remaining.iter().position(|n| *n == name)) {
                // Drop everything up to and including the transport that
                // just failed.
                Some(position) => {
                    remaining.drain(..=position);
                }
                None => remaining.clear(),
            }
        }

        let rest = self.remaining.clone().unwrap_or_default();
        if rest.is_empty() {
            self.give_up_connecting();
        } else {
            tracing::info!(?rest, "falling back to next transport");
            self.do_connect(Some(rest));
        }
    }

    fn give_up_connecting(&mut self) {
        self.connecting = false;
        self.timers.clear_connect();
        if let Some(mut transport) = self.transport.take() {
            transport.disconnect();
        }
        self.publish(Event::ConnectFailed);
        self.signal_failure();
    }

    // ---------------------------------------------------------------------
    // Transport feedback
    // ---------------------------------------------------------------------

    /// The transport's carrier opened.
    pub fn on_transport_open(&mut self) {
        self.open = true;
        tracing::debug!("transport open");
        if !self.do_buffer {
            self.flush_buffer();
        }
        self.publish(Event::Open);
    }

    /// One inbound frame arrived. Any traffic counts as server liveness,
    /// so the heartbeat window restarts here.
    pub fn on_transport_data(&mut self, raw: &str) {
        if self.open || self.connected {
            if let Some(session) = &self.session {
                self.timers
                    .arm_heartbeat(Instant::now() + session.heartbeat_timeout);
            }
        }
        match Packet::decode(raw) {
            Ok(packet) => self.on_packet(packet),
            Err(error) => {
                tracing::warn!(error = %error, frame = raw, "dropping malformed frame");
                self.on_error(SocketError::Protocol(error));
            }
        }
    }

    /// The transport's carrier closed.
    pub fn on_transport_close(&mut self) {
        self.on_disconnect(None);
    }

    /// Routes one decoded packet.
    pub fn on_packet(&mut self, packet: Packet) {
        match &packet {
            Packet::Heartbeat { token } => {
                // Echo the token verbatim; the server matches on it.
                tracing::trace!(token, "heartbeat");
                let token = token.clone();
                self.packet(Packet::Heartbeat { token });
                return;
            }
            Packet::Connect { path, .. } if path.is_empty() => {
                self.handle_connect_ack();
            }
            Packet::Disconnect { path } if path.is_empty() => {
                // A root disconnect is the server kicking us out, not a
                // network failure. No automatic reconnect.
                self.on_disconnect(Some("booted"));
                return;
            }
            _ => {}
        }
        let path = packet.path().to_string();
        self.of(&path).handle_packet(&packet);
    }

    /// The server acknowledged the session on the root namespace.
    fn handle_connect_ack(&mut self) {
        if self.connected {
            return;
        }
        self.connected = true;
        self.connecting = false;
        self.handshaking = false;
        self.remaining = None;
        self.requested = None;
        self.timers.clear_connect();
        if let Some(session) = &self.session {
            self.timers
                .arm_heartbeat(Instant::now() + session.heartbeat_timeout);
        }
        tracing::info!(session = ?self.session_id(), "connected");
        self.emitter.emit(&Event::Connect);
        if !self.do_buffer {
            self.flush_buffer();
        }
        if self.reconnect.is_some() {
            self.finish_reconnect(true);
        }
        // Re-announce namespaces the server has not acknowledged, e.g.
        // after a reconnect on a fresh session.
        let pending: Vec<String> = self
            .namespaces
            .iter()
            .filter(|(path, ns)| !path.is_empty() && !ns.is_connected())
            .map(|(path, _)| path.clone())
            .collect();
        for path in pending {
            self.packet(Packet::Connect {
                path,
                session: None,
            });
        }
    }

    // ---------------------------------------------------------------------
    // Disconnecting
    // ---------------------------------------------------------------------

    /// Closes the connection deliberately. Cancels any reconnection
    /// campaign; a deliberate close is never retried.
    pub fn disconnect(&mut self) {
        self.cancel_reconnect();
        if self.connected {
            if self.open {
                // Best effort: tell the server before tearing down.
                self.packet(Packet::Disconnect {
                    path: String::new(),
                });
            }
            self.on_disconnect(Some("booted"));
        }
    }

    /// The connection ended. `None` means the carrier or heartbeat
    /// failed ("connection lost"); `"booted"` marks a deliberate close.
    pub fn on_disconnect(&mut self, reason: Option<&str>) {
        let was_active = self.connected || self.open || self.connecting;
        self.connected = false;
        self.connecting = false;
        self.open = false;
        if !was_active {
            return;
        }

        if let Some(transport) = self.transport.as_mut() {
            transport.disconnect();
        }
        self.timers.clear_connect();
        self.timers.clear_heartbeat();

        let reason = reason.unwrap_or("connection lost");
        if reason != "booted" && self.config.reconnect && self.reconnect.is_none() {
            self.begin_reconnect();
        }

        tracing::info!(reason, "disconnected");
        for namespace in self.namespaces.values_mut() {
            namespace.on_disconnect(reason);
        }
        self.emitter.emit(&Event::Disconnect {
            reason: reason.to_string(),
        });
    }

    // ---------------------------------------------------------------------
    // Errors
    // ---------------------------------------------------------------------

    /// Reports an error. Transport errors carrying reconnect advice tear
    /// down the live connection and start a retry campaign; everything
    /// else is published as-is. While a campaign is active, any error
    /// schedules the next attempt.
    pub fn on_error(&mut self, error: SocketError) {
        if error.advice() == Some(Advice::Reconnect) && self.connected && self.reconnect.is_none()
        {
            tracing::warn!(error = %error, "server advised reconnect");
            if self.open {
                self.packet(Packet::Disconnect {
                    path: String::new(),
                });
            }
            // Tear down as a loss, not a boot, so the campaign starts.
            self.on_disconnect(None);
            self.publish(Event::Error(error));
            return;
        }
        self.publish(Event::Error(error));
        self.signal_failure();
    }

    /// A connect attempt ended in failure. Keeps an active retry
    /// campaign moving, consuming at most one attempt per failure.
    fn signal_failure(&mut self) {
        if self.reconnect.is_some() && !self.connected && !self.retry_scheduled {
            self.schedule_retry();
        }
    }

    // ---------------------------------------------------------------------
    // Reconnection
    // ---------------------------------------------------------------------

    fn begin_reconnect(&mut self) {
        if self.reconnect.is_some() {
            return;
        }
        let transport_name = self.transport.as_ref().map(|t| t.name().to_string());
        let saved_multiple = self.config.try_multiple_transports;
        // Retries stick to the last transport; the trial comes back for
        // the final cycling pass (and on termination).
        self.config.try_multiple_transports = false;
        tracing::info!(transport = ?transport_name, "starting reconnection campaign");
        self.reconnect = Some(ReconnectSession::new(transport_name, saved_multiple));
        self.schedule_retry();
    }

    fn schedule_retry(&mut self) {
        let attempt = match self.reconnect.as_mut() {
            Some(session) => session.next_attempt(),
            None => return,
        };
        let delay = self.config.retry.delay_with(attempt, &mut rand::rng());
        self.timers.arm_retry(Instant::now() + delay);
        self.retry_scheduled = true;
        tracing::info!(attempt, ?delay, "reconnect attempt scheduled");
        self.publish(Event::Reconnecting { delay, attempt });
    }

    /// The retry timer fired: ask the session what to do and do it.
    fn retry_step(&mut self) {
        self.retry_scheduled = false;
        let (action, transport_name, saved_multiple) = match self.reconnect.as_ref() {
            Some(session) => {
                let view = ConnectionView {
                    connected: self.connected,
                    busy: self.connecting || self.handshaking,
                };
                (
                    step(session, &self.config.retry, view),
                    session.transport_name.clone(),
                    session.saved_multiple,
                )
            }
            None => return,
        };

        match action {
            RetryAction::Succeeded => self.finish_reconnect(true),
            RetryAction::Defer => {
                tracing::debug!("attempt in flight, deferring retry poll");
                self.timers.arm_retry(Instant::now() + DEFER_POLL);
            }
            RetryAction::Retry => {
                let restricted = transport_name.map(|name| vec![name]);
                self.connect_with(restricted);
            }
            RetryAction::CycleAll => {
                tracing::info!("retry ceiling reached, cycling through all transports");
                if let Some(session) = self.reconnect.as_mut() {
                    session.cycling_engaged = true;
                }
                self.config.try_multiple_transports = saved_multiple;
                self.connect_with(Some(self.config.transports.clone()));
            }
            RetryAction::GiveUp => self.finish_reconnect(false),
        }
    }

    /// Ends the campaign, restoring the saved transport-trial flag.
    fn finish_reconnect(&mut self, success: bool) {
        let Some(session) = self.reconnect.take() else {
            return;
        };
        self.config.try_multiple_transports = session.saved_multiple;
        self.timers.clear_retry();
        self.retry_scheduled = false;
        if success {
            let transport = self
                .transport_name()
                .unwrap_or_default()
                .to_string();
            tracing::info!(attempt = session.attempt, %transport, "reconnected");
            self.publish(Event::Reconnect {
                transport,
                attempt: session.attempt,
            });
        } else {
            tracing::warn!(attempt = session.attempt, "reconnection failed, giving up");
            self.publish(Event::ReconnectFailed);
        }
    }

    fn cancel_reconnect(&mut self) {
        if let Some(session) = self.reconnect.take() {
            tracing::debug!("reconnection campaign cancelled");
            self.config.try_multiple_transports = session.saved_multiple;
            self.timers.clear_retry();
            self.retry_scheduled = false;
        }
    }

    // ---------------------------------------------------------------------
    // Timers
    // ---------------------------------------------------------------------

    /// The earliest pending deadline. The embedder sleeps until it, then
    /// calls [`Socket::poll_timers`].
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Fires every timer whose deadline is at or before `now`.
    pub fn poll_timers(&mut self, now: Instant) {
        for kind in self.timers.take_due(now) {
            match kind {
                TimerKind::Connect => {
                    if !self.connected {
                        tracing::warn!("transport did not open in time");
                        self.transport_failed();
                    }
                }
                TimerKind::Heartbeat => {
                    tracing::warn!("heartbeat window elapsed with no traffic");
                    self.on_disconnect(None);
                }
                TimerKind::Retry => self.retry_step(),
            }
        }
    }

    // ---------------------------------------------------------------------
    // Event fan-out
    // ---------------------------------------------------------------------

    /// Emits to the socket's listeners and to every namespace.
    fn publish(&mut self, event: Event) {
        self.emitter.emit(&event);
        for namespace in self.namespaces.values_mut() {
            namespace.emit(&event);
        }
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("connected", &self.connected)
            .field("connecting", &self.connecting)
            .field("open", &self.open)
            .field("handshaking", &self.handshaking)
            .field("session", &self.session_id())
            .field("transport", &self.transport_name())
            .field("buffered", &self.buffer.len())
            .field("namespaces", &self.namespaces.len())
            .field("reconnecting", &self.is_reconnecting())
            .finish()
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
