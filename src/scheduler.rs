//! Periodic timer engine.
//!
//! The scheduler notifies a [`SchedulerDelegate`] when schedules come
//! due; the dispatch loop implements the delegate to push events into
//! the event queue.
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐  │
//! │  │ keep-alive │   │ telemetry  │   │ button ISR │  │
//! │  │  (1 s)     │   │  (10 s)    │   │  (edge)    │  │
//! │  └─────┬──────┘   └─────┬──────┘   └─────┬──────┘  │
//! │        ▼                ▼                │         │
//! │  ┌──────────────────────────────┐        │         │
//! │  │      SchedulerDelegate       │        │         │
//! │  └──────────────┬───────────────┘        │         │
//! │                 ▼                        ▼         │
//! │               Event Queue  ──▶  dispatch loop      │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! Schedules are driven by absolute due times rather than tick counts.
//! If the loop was blocked past one or more due times (a throttle wait,
//! a slow service call), `poll` fires once per elapsed interval so the
//! missed runs are deferred.  A stall longer than [`MAX_CATCH_UP`]
//! intervals fires only that many; the rest are skipped and the schedule
//! keeps its phase.

use log::{info, warn};

use crate::app::ports::SchedulerDelegate;
use crate::events::Event;

/// A single periodic schedule.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Human-readable label (e.g. "keep-alive").
    pub label: &'static str,
    /// Event pushed each time the schedule comes due.
    pub event: Event,
    /// Period in milliseconds.  Must be non-zero.
    pub interval_ms: u32,
    pub enabled: bool,
}

/// Maximum number of concurrent schedules (stack-allocated).
const MAX_SCHEDULES: usize = 4;

/// Upper bound on catch-up fires per schedule per poll.
pub const MAX_CATCH_UP: u64 = 16;

pub struct Scheduler {
    schedules: [Option<ScheduleEntry>; MAX_SCHEDULES],
}

#[derive(Debug, Clone)]
struct ScheduleEntry {
    schedule: Schedule,
    next_due_ms: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            schedules: [None, None, None, None],
        }
    }

    /// Add a schedule whose first fire is one interval after `now_ms`.
    /// Returns the slot index, or `None` if full or the interval is zero.
    pub fn add(&mut self, schedule: Schedule, now_ms: u64) -> Option<usize> {
        if schedule.interval_ms == 0 {
            return None;
        }
        let (i, slot) = self.schedules.iter_mut().enumerate().find(|(_, s)| s.is_none())?;
        info!(
            "Scheduler: added '{}' every {} ms at slot {}",
            schedule.label, schedule.interval_ms, i
        );
        let next_due_ms = now_ms + u64::from(schedule.interval_ms);
        *slot = Some(ScheduleEntry { schedule, next_due_ms });
        Some(i)
    }

    /// Cancel a schedule by slot index.  Returns `true` if a schedule was
    /// actually removed.
    pub fn cancel(&mut self, slot: usize) -> bool {
        match self.schedules.get_mut(slot).and_then(Option::take) {
            Some(entry) => {
                info!("Scheduler: cancelled '{}' (slot {})", entry.schedule.label, slot);
                true
            }
            None => false,
        }
    }

    /// Fire every schedule that is due at `now_ms`, once per elapsed
    /// interval, in slot order.
    pub fn poll(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        for entry in self.schedules.iter_mut().flatten() {
            if !entry.schedule.enabled || entry.next_due_ms > now_ms {
                continue;
            }
            let interval = u64::from(entry.schedule.interval_ms);
            let elapsed = (now_ms - entry.next_due_ms) / interval + 1;
            for _ in 0..elapsed.min(MAX_CATCH_UP) {
                delegate.on_schedule_fired(entry.schedule.label, entry.schedule.event);
            }
            if elapsed > MAX_CATCH_UP {
                warn!(
                    "Scheduler: '{}' skipped {} runs after a stall",
                    entry.schedule.label,
                    elapsed - MAX_CATCH_UP
                );
            }
            entry.next_due_ms += interval * elapsed;
        }
    }

    /// Milliseconds until the earliest enabled schedule is due.
    pub fn next_due_in(&self, now_ms: u64) -> Option<u64> {
        self.schedules
            .iter()
            .flatten()
            .filter(|e| e.schedule.enabled)
            .map(|e| e.next_due_ms.saturating_sub(now_ms))
            .min()
    }

    /// Number of enabled schedules.
    pub fn active_count(&self) -> usize {
        self.schedules
            .iter()
            .flatten()
            .filter(|e| e.schedule.enabled)
            .count()
    }
}
