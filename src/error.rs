//! Unified error types for the relay firmware.
//!
//! Every variant is `Copy` so errors can be handed to the event sink and
//! logged without allocation.  The split mirrors how far an error is
//! allowed to travel:
//!
//! - [`TransientError`] stays inside the task that produced it (logged,
//!   early return, retried on the next occurrence).
//! - [`FatalError`] unwinds the dispatch loop and ends in a restart.
//! - [`StartupError`] aborts bring-up before the loop is ever entered.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Sensor(SensorError),
    Transport(TransportError),
    Startup(StartupError),
    Fatal(FatalError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Startup(e) => write!(f, "startup: {e}"),
            Self::Fatal(e) => write!(f, "fatal: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The I²C transaction failed (NACK, arbitration loss, bus error).
    Bus,
    /// A device answered but its chip-ID register holds the wrong value.
    UnexpectedChipId(u8),
    /// A measurement was requested before `init()` succeeded.
    NotInitialised,
    /// The sensor reported its "measurement skipped" sentinel.
    NoData,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "I2C bus error"),
            Self::UnexpectedChipId(id) => write!(f, "unexpected chip id 0x{id:02X}"),
            Self::NotInitialised => write!(f, "sensor not initialised"),
            Self::NoData => write!(f, "measurement skipped"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failure reported by the broker transport.
///
/// `Status` carries the raw non-zero status code of the underlying client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    Status(i32),
    NotConnected,
    PayloadTooLarge,
    Timeout,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(rc) => write!(f, "status {rc}"),
            Self::NotConnected => write!(f, "not connected"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Recoverable task errors
// ---------------------------------------------------------------------------

/// Error that ends one task run early.  The next scheduled occurrence
/// tries again; there is no retry in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    Sensor(SensorError),
    Publish(TransportError),
}

impl fmt::Display for TransientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor read failed: {e}"),
            Self::Publish(e) => write!(f, "publish failed: {e}"),
        }
    }
}

impl From<SensorError> for TransientError {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Fatal runtime errors
// ---------------------------------------------------------------------------

/// Unrecoverable runtime failure.  Unwinds the dispatch loop and ends in
/// a device restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalError {
    /// The keep-alive service call reported a non-zero status.
    KeepAlive(TransportError),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepAlive(e) => write!(f, "keep-alive failed: {e}"),
        }
    }
}

impl From<FatalError> for Error {
    fn from(e: FatalError) -> Self {
        Self::Fatal(e)
    }
}

// ---------------------------------------------------------------------------
// Start-up errors
// ---------------------------------------------------------------------------

/// Bring-up failure.  The process returns with a non-zero status instead
/// of entering the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupError {
    Sensor(SensorError),
    NoNetwork,
    Connect(TransportError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor init failed: {e}"),
            Self::NoNetwork => write!(f, "no network interface"),
            Self::Connect(e) => write!(f, "broker connect failed: {e}"),
        }
    }
}

impl From<StartupError> for Error {
    fn from(e: StartupError) -> Self {
        Self::Startup(e)
    }
}

impl core::error::Error for StartupError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
