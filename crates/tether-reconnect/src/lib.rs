//! Reconnection control for Tether.
//!
//! Two pieces, both deliberately free of I/O and clocks:
//!
//! - [`RetryPolicy`] — the backoff law: `min(max, round(base * factor^n
//!   * jitter))`, jitter from `[1, 2)` when randomization is on.
//! - [`ReconnectSession`] + [`step`] — an explicit value object holding
//!   the attempt counter, the transport under retry, and whether the
//!   final transport-cycling pass has been engaged, with a pure step
//!   function deciding the next [`RetryAction`].
//!
//! The connection manager owns the timers and side effects; this crate
//! only answers "what now?" — which is what makes the retry ceiling and
//! backoff schedule unit-testable without a single sleep.

mod policy;
mod session;

pub use policy::{draw_jitter, RetryPolicy};
pub use session::{step, ConnectionView, ReconnectSession, RetryAction, DEFER_POLL};
