//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ RelayService (domain)
//! ```
//!
//! Driven adapters (sensor, LED, button, broker, clock, storage) implement
//! these traits.  The [`RelayService`](super::service::RelayService)
//! consumes them via generics, so the domain core never touches hardware
//! or the network directly.

use crate::config::RelayConfig;
use crate::error::{SensorError, TransportError};
use crate::events::Event;
use crate::message::{Message, QoS};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain environmental readings.
pub trait SensorPort {
    /// Probe and configure the sensor.  Must succeed before any read.
    fn init(&mut self) -> Result<(), SensorError>;

    /// Degrees Celsius.
    fn temperature(&mut self) -> Result<f32, SensorError>;

    /// Relative humidity, percent.
    fn humidity(&mut self) -> Result<f32, SensorError>;

    /// Hectopascals.
    fn pressure(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Output / input / restart ports (domain ↔ board)
// ───────────────────────────────────────────────────────────────

/// Binary output (the status LED).
pub trait OutputPort {
    fn set_output(&mut self, on: bool);
    fn output(&self) -> bool;
}

/// Edge-triggered input.  The ISR side lives in the button driver; the
/// domain only needs to re-arm the edge once a press has been handled.
pub trait ButtonPort {
    fn rearm(&mut self);
}

/// Why a restart was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// An inbound `RESET` command.
    Command,
    /// The keep-alive service call failed.
    KeepAliveFailed,
}

/// Whole-device restart.  On hardware this does not return.
pub trait RestartPort {
    fn restart(&mut self, reason: RestartReason);
}

/// Everything the service needs from the board, as one borrow.
pub trait BoardPort: SensorPort + OutputPort + ButtonPort + RestartPort {}

impl<T: SensorPort + OutputPort + ButtonPort + RestartPort> BoardPort for T {}

// ───────────────────────────────────────────────────────────────
// Broker port (driven adapter: domain ↔ pub/sub transport)
// ───────────────────────────────────────────────────────────────

/// Session with a pub/sub broker.
///
/// Every method is synchronous and bounded; none of them retries.
pub trait BrokerPort {
    /// Open the session using the adapter's configured identity.
    fn connect(&mut self) -> Result<(), TransportError>;

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), TransportError>;

    fn publish(&mut self, msg: &Message<'_>) -> Result<(), TransportError>;

    /// Keep the session alive and deliver inbound traffic.
    ///
    /// Blocks for at most `timeout_ms`.  Each inbound message is handed to
    /// `on_message` before this returns; the borrowed payload is only
    /// valid for the duration of that call.
    fn service(
        &mut self,
        timeout_ms: u32,
        on_message: &mut dyn FnMut(&Message<'_>),
    ) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time and the one blocking wait the domain is allowed.
pub trait ClockPort {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Block the calling thread for `ms` milliseconds.  Interrupts keep
    /// running and may enqueue events meanwhile.
    fn sleep_ms(&mut self, ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists relay configuration.
///
/// Implementations MUST validate before persisting.  Invalid values are
/// rejected with [`ConfigError::ValidationFailed`], never clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`RelayConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<RelayConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &RelayConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from event system)
// ───────────────────────────────────────────────────────────────

/// Callback the [`Scheduler`](crate::scheduler::Scheduler) invokes when a
/// schedule comes due.  The dispatch loop implements it by pushing onto
/// the [`EventQueue`](crate::events::EventQueue); the scheduler itself
/// knows nothing about queues or ISRs.
pub trait SchedulerDelegate {
    fn on_schedule_fired(&mut self, label: &'static str, event: Event);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Config could not be serialized or does not fit the storage blob.
    Encoding,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Encoding => write!(f, "config encoding failed"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::error::Error for ConfigError {}
