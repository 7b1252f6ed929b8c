//! Connection keeper: the periodic transport service call.

use log::error;

use crate::error::FatalError;
use crate::message::Message;

use super::ports::BrokerPort;

/// Default bound on one service call.
pub const DEFAULT_SERVICE_TIMEOUT_MS: u32 = 100;

#[derive(Debug, Clone)]
pub struct ConnectionKeeper {
    service_timeout_ms: u32,
    ticks: u64,
}

impl Default for ConnectionKeeper {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_TIMEOUT_MS)
    }
}

impl ConnectionKeeper {
    pub const fn new(service_timeout_ms: u32) -> Self {
        Self {
            service_timeout_ms,
            ticks: 0,
        }
    }

    /// Service the transport once, delivering inbound messages to
    /// `on_message`.  Any transport error is fatal; there is no retry.
    pub fn tick(
        &mut self,
        broker: &mut impl BrokerPort,
        on_message: &mut dyn FnMut(&Message<'_>),
    ) -> Result<(), FatalError> {
        self.ticks += 1;
        broker
            .service(self.service_timeout_ms, on_message)
            .map_err(|e| {
                error!("keep-alive #{} failed: {}", self.ticks, e);
                FatalError::KeepAlive(e)
            })
    }

    /// Service calls made so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
