//! The backoff law: how long to wait before retry attempt *n*.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for the reconnection backoff schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Base delay before the first retry.
    pub base_delay: Duration,

    /// Multiplier applied per attempt. Must be ≥ 1 for the schedule to
    /// be non-decreasing.
    pub factor: f64,

    /// Ceiling on any single delay. `None` = unbounded.
    pub max_delay: Option<Duration>,

    /// Multiply each delay by a jitter drawn from `[1, 2)` to spread
    /// reconnect storms from many clients losing the same server.
    pub randomize: bool,

    /// How many single-transport retries before giving up (or cycling
    /// through the full transport list, when that trial is enabled).
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            factor: 2.0,
            max_delay: None,
            randomize: false,
            max_attempts: 10,
        }
    }
}

impl RetryPolicy {
    /// Computes the delay before attempt `attempt` (1-indexed) with an
    /// explicit jitter factor:
    ///
    /// ```text
    /// delay = min(max_delay, round(base * factor^attempt * jitter))
    /// ```
    ///
    /// Pure — callers draw the jitter, so tests can pin it to 1.0.
    pub fn delay_for(&self, attempt: u32, jitter: f64) -> Duration {
        let base = self.base_delay.as_millis() as f64;
        let raw = (base * self.factor.powi(attempt as i32) * jitter).round();
        // `as` saturates, so an overflowing schedule pins at the ceiling
        // (or u64::MAX when unbounded) instead of wrapping.
        let mut millis = raw as u64;
        if let Some(max) = self.max_delay {
            millis = millis.min(max.as_millis() as u64);
        }
        Duration::from_millis(millis)
    }

    /// [`RetryPolicy::delay_for`] with the jitter drawn from `rng` when
    /// randomization is enabled, pinned to 1 otherwise.
    pub fn delay_with<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter = if self.randomize {
            draw_jitter(rng)
        } else {
            1.0
        };
        self.delay_for(attempt, jitter)
    }
}

/// Draws a jitter factor from `[1, 2)`.
pub fn draw_jitter<R: Rng>(rng: &mut R) -> f64 {
    rng.random_range(1.0..2.0)
}

// =========================================================================
// Tests
// =========================================================================
