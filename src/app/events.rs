//! Outbound application events.
//!
//! The [`RelayService`](super::service::RelayService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, counters in tests).

use crate::error::{FatalError, SensorError, TransportError};

use super::commands::Command;
use super::lifecycle::Phase;

/// Which outbound task produced a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishKind {
    Telemetry,
    Pressure,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Start-up finished; the dispatch loop is about to run.
    Started,

    PhaseChanged { from: Phase, to: Phase },

    /// A subscription request failed; start-up continues without it.
    SubscribeFailed { topic: heapless::String<64>, error: TransportError },

    Published { kind: PublishKind, bytes: usize },

    PublishFailed { kind: PublishKind, error: TransportError },

    SensorReadFailed { kind: PublishKind, error: SensorError },

    /// A recognised command was applied.
    CommandApplied(Command),

    /// An inbound payload matched no command and was dropped.
    CommandIgnored { len: usize },

    KeepAliveFailed(FatalError),

    /// The keep-alive schedule was cancelled after a fatal failure.
    KeepAliveCancelled,

    /// The dispatch loop returned.
    DispatchStopped,

    /// The ISR queue overflowed and `dropped` events were lost.
    QueueOverflow { dropped: u32 },
}
