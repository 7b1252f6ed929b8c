//! Interrupt-safe event queue.
//!
//! Events are produced by:
//! - the button GPIO ISR (falling edge → pressure publish)
//! - the scheduler, when a periodic schedule comes due
//!
//! and consumed one at a time, FIFO, by the dispatch loop.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Button ISR  │────▶│  Event Queue │────▶│ Dispatch loop │
//! │ Scheduler   │────▶│  (bounded)   │     │  (consumer)   │
//! └─────────────┘     └──────────────┘     └───────────────┘
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// Keep-alive service tick (every second).
    KeepAliveTick = 0,
    /// Telemetry publish tick.
    TelemetryTick = 1,
    /// Button falling edge: publish the current pressure.
    PressureRequested = 2,
}

/// Bounded MPSC queue safe to push from interrupt context.
///
/// On device there is exactly one, in a `static`, so the ISR can reach
/// it without a handle.  Pushes never log; drops are counted and the
/// consumer reports them via [`EventQueue::take_dropped`].
pub struct EventQueue {
    inner: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP>,
    dropped: AtomicU32,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            inner: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Non-blocking push.  Returns `false` if the queue was full and the
    /// event was dropped.
    pub fn push(&self, event: Event) -> bool {
        if self.inner.try_send(event).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Number of events dropped since the last call.
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    /// Pop the oldest pending event.
    pub fn pop(&self) -> Option<Event> {
        self.inner.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
