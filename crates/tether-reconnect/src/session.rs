//! The reconnection session value object and its pure step function.
//!
//! A session is created once per unexpected loss of connection and holds
//! *all* retry state explicitly — attempt counter, the transport being
//! retried, whether the final cycle through every transport has been
//! engaged — instead of scattering it across timer closures. The step
//! function is pure: given the session and a snapshot of the connection,
//! it says what to do next. The connection manager owns the side effects.

use std::time::Duration;

use crate::RetryPolicy;

/// How long to wait before polling again when a connect or handshake
/// attempt is already in flight. Fixed, not subject to backoff.
pub const DEFER_POLL: Duration = Duration::from_secs(1);

/// State of one bounded retry campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectSession {
    /// Attempts scheduled so far. Incremented *before* each delay
    /// computation, so the first scheduled retry is attempt 1.
    pub attempt: u32,

    /// The transport that was active when the connection was lost.
    /// Retries use only this transport until the ceiling is reached.
    pub transport_name: Option<String>,

    /// The final full-transport-list attempt has been issued.
    pub cycling_engaged: bool,

    /// The configured multiple-transport-trial flag, saved so it can be
    /// restored when the session ends. Retrying suppresses the trial so
    /// attempts stay on the last known-good transport.
    pub saved_multiple: bool,
}

impl ReconnectSession {
    /// Starts a session for the given last-active transport.
    pub fn new(transport_name: Option<String>, saved_multiple: bool) -> Self {
        Self {
            attempt: 0,
            transport_name,
            cycling_engaged: false,
            saved_multiple,
        }
    }

    /// Increments and returns the attempt counter. Called once per
    /// scheduled retry, before computing its delay.
    pub fn next_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }
}

/// A snapshot of the connection the step function decides against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionView {
    /// The protocol-level connect acknowledgment has been received.
    pub connected: bool,
    /// A connect or handshake attempt is currently in flight.
    pub busy: bool,
}

/// What the connection manager should do when a retry timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Already connected: report success and end the session.
    Succeeded,
    /// An attempt is in flight: poll again after [`DEFER_POLL`] instead
    /// of starting a concurrent attempt.
    Defer,
    /// Issue a connect attempt restricted to the session's transport.
    Retry,
    /// Ceiling reached with the multi-transport trial still unspent:
    /// re-enable it, mark cycling engaged, and issue one attempt across
    /// the full configured transport list.
    CycleAll,
    /// Ceiling reached and nothing left to try: report failure and end
    /// the session.
    GiveUp,
}

/// Decides the next retry action. Pure — no clocks, no side effects.
pub fn step(session: &ReconnectSession, policy: &RetryPolicy, view: ConnectionView) -> RetryAction {
    if view.connected {
        return RetryAction::Succeeded;
    }
    if view.busy {
        return RetryAction::Defer;
    }
    if session.attempt <= policy.max_attempts {
        return RetryAction::Retry;
    }
    if !session.saved_multiple || session.cycling_engaged {
        return RetryAction::GiveUp;
    }
    RetryAction::CycleAll
}

// =========================================================================
// Tests
// =========================================================================
