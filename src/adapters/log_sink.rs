//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (UART / USB-CDC in production, stderr in tests).

use log::{debug, error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | dispatch loop starting"),
            AppEvent::PhaseChanged { from, to } => {
                info!("PHASE | {} -> {}", from.name(), to.name());
            }
            AppEvent::SubscribeFailed { topic, error } => {
                warn!("SUB   | '{}' failed: {}", topic, error);
            }
            AppEvent::Published { kind, bytes } => {
                info!("PUB   | {:?} ok ({} bytes)", kind, bytes);
            }
            AppEvent::PublishFailed { kind, error } => {
                warn!("PUB   | {:?} failed: {}", kind, error);
            }
            AppEvent::SensorReadFailed { kind, error } => {
                warn!("SENS  | {:?} read failed: {}", kind, error);
            }
            AppEvent::CommandApplied(cmd) => info!("CMD   | {:?}", cmd),
            AppEvent::CommandIgnored { len } => debug!("CMD   | ignored {}-byte payload", len),
            AppEvent::KeepAliveFailed(e) => error!("KEEPALIVE | {}", e),
            AppEvent::KeepAliveCancelled => warn!("KEEPALIVE | schedule cancelled"),
            AppEvent::DispatchStopped => warn!("LOOP  | dispatch stopped"),
            AppEvent::QueueOverflow { dropped } => {
                warn!("QUEUE | full, {} event(s) dropped", dropped);
            }
        }
    }
}
