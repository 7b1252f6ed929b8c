//! Publish throttle shared by every outbound task and the command
//! dispatcher.
//!
//! Before an attempt, if the previous attempt was at most
//! `min_spacing_ms` ago, the caller blocks for `settle_ms − elapsed`.
//! After the attempt the timestamp is recorded whether or not it
//! succeeded.  The state is owned by the dispatch thread and only ever
//! touched through `&mut`.

use log::debug;

use crate::app::ports::ClockPort;

/// Default minimum spacing between two transport attempts.
pub const DEFAULT_MIN_SPACING_MS: u32 = 1_000;
/// Default pause target once the spacing is violated.
pub const DEFAULT_SETTLE_MS: u32 = 1_200;

#[derive(Debug, Clone)]
pub struct PublishThrottle {
    last_attempt_ms: Option<u64>,
    min_spacing_ms: u64,
    settle_ms: u64,
}

impl Default for PublishThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SPACING_MS, DEFAULT_SETTLE_MS)
    }
}

impl PublishThrottle {
    pub const fn new(min_spacing_ms: u32, settle_ms: u32) -> Self {
        Self {
            last_attempt_ms: None,
            min_spacing_ms: min_spacing_ms as u64,
            settle_ms: settle_ms as u64,
        }
    }

    /// Timestamp of the last recorded attempt, if any.
    pub fn last_attempt_ms(&self) -> Option<u64> {
        self.last_attempt_ms
    }

    /// How long a caller arriving at `now_ms` would have to wait.
    pub fn pending_wait_ms(&self, now_ms: u64) -> u64 {
        let Some(last) = self.last_attempt_ms else {
            return 0;
        };
        let elapsed = now_ms.saturating_sub(last);
        if elapsed <= self.min_spacing_ms {
            self.settle_ms.saturating_sub(elapsed)
        } else {
            0
        }
    }

    /// Block until this caller may talk to the transport.  Returns the
    /// number of milliseconds slept.
    pub fn wait_turn(&self, clock: &mut impl ClockPort) -> u64 {
        let wait = self.pending_wait_ms(clock.now_ms());
        if wait > 0 {
            debug!("throttle: holding {} ms", wait);
            clock.sleep_ms(wait);
        }
        wait
    }

    /// Record an attempt at the current time.
    pub fn mark_attempt(&mut self, clock: &impl ClockPort) {
        self.last_attempt_ms = Some(clock.now_ms());
    }

    /// Wait for our turn, run `attempt`, then record the attempt.
    pub fn gate<C: ClockPort, T>(&mut self, clock: &mut C, attempt: impl FnOnce() -> T) -> T {
        self.wait_turn(clock);
        let out = attempt();
        self.mark_attempt(clock);
        out
    }
}
