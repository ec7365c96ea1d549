//! Deadline bookkeeping for the socket's three timers.
//!
//! The socket never sleeps. It records deadlines here, the embedder asks
//! for the nearest one via `next_deadline`, sleeps on its own clock, and
//! calls back into `poll_timers` with the current instant. That keeps
//! every timeout path testable by passing a fabricated "now".

use std::time::Instant;

/// Which timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// The current transport did not open in time.
    Connect,
    /// No server activity within the heartbeat window.
    Heartbeat,
    /// A scheduled reconnection attempt is due.
    Retry,
}

/// The socket's pending deadlines. At most one of each kind.
#[derive(Debug, Default)]
pub(crate) struct TimerSet {
    connect: Option<Instant>,
    heartbeat: Option<Instant>,
    retry: Option<Instant>,
}

impl TimerSet {
    pub(crate) fn arm_connect(&mut self, deadline: Instant) {
        self.connect = Some(deadline);
    }

    pub(crate) fn arm_heartbeat(&mut self, deadline: Instant) {
        self.heartbeat = Some(deadline);
    }

    pub(crate) fn arm_retry(&mut self, deadline: Instant) {
        self.retry = Some(deadline);
    }

    pub(crate) fn clear_connect(&mut self) {
        self.connect = None;
    }

    pub(crate) fn clear_heartbeat(&mut self) {
        self.heartbeat = None;
    }

    pub(crate) fn clear_retry(&mut self) {
        self.retry = None;
    }

    /// The earliest pending deadline, if any timer is armed.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        [self.connect, self.heartbeat, self.retry]
            .into_iter()
            .flatten()
            .min()
    }

    /// Clears and returns every timer whose deadline has passed.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut due = Vec::new();
        if self.connect.is_some_and(|d| d <= now) {
            self.connect = None;
            due.push(TimerKind::Connect);
        }
        if self.heartbeat.is_some_and(|d| d <= now) {
            self.heartbeat = None;
            due.push(TimerKind::Heartbeat);
        }
        if self.retry.is_some_and(|d| d <= now) {
            self.retry = None;
            due.push(TimerKind::Retry);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_next_deadline_picks_earliest() {
        let now = Instant::now();
        let mut timers = TimerSet::default();
        assert_eq!(timers.next_deadline(), None);

        timers.arm_connect(now + Duration::from_secs(10));
        timers.arm_heartbeat(now + Duration::from_secs(2));
        timers.arm_retry(now + Duration::from_secs(5));
        assert_eq!(timers.next_deadline(), Some(now + Duration::from_secs(2)));
    }

    #[test]
    fn test_take_due_clears_only_elapsed_timers() {
        let now = Instant::now();
        let mut timers = TimerSet::default();
        timers.arm_connect(now);
        timers.arm_heartbeat(now + Duration::from_secs(60));

        let due = timers.take_due(now);
        assert_eq!(due, vec![TimerKind::Connect]);
        // The heartbeat deadline is untouched.
        assert_eq!(
            timers.next_deadline(),
            Some(now + Duration::from_secs(60))
        );
        assert!(timers.take_due(now).is_empty());
    }

    #[test]
    fn test_rearming_replaces_the_deadline() {
        let now = Instant::now();
        let mut timers = TimerSet::default();
        timers.arm_retry(now + Duration::from_secs(1));
        timers.arm_retry(now + Duration::from_secs(9));
        assert!(timers.take_due(now + Duration::from_secs(2)).is_empty());
    }
}
