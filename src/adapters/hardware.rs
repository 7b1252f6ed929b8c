//! Hardware adapter: bridges board peripherals to domain port traits.
//!
//! Owns the BME280, the status LED and the button, exposing them through
//! [`SensorPort`], [`OutputPort`], [`ButtonPort`] and [`RestartPort`].
//! This is the only module in the system that touches the board.  On
//! non-espidf targets the restart is simulated and only recorded.

use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::{ButtonPort, OutputPort, RestartPort, RestartReason, SensorPort};
use crate::drivers::bme280::Bme280;
use crate::drivers::button::ButtonDriver;
use crate::drivers::status_led::StatusLed;
use crate::error::SensorError;

pub struct HardwareAdapter<I2C, P> {
    sensor: Bme280<I2C>,
    led: StatusLed<P>,
    button: ButtonDriver,
    last_restart: Option<RestartReason>,
}

impl<I2C: I2c, P: OutputPin> HardwareAdapter<I2C, P> {
    pub fn new(sensor: Bme280<I2C>, led: StatusLed<P>, button: ButtonDriver) -> Self {
        Self {
            sensor,
            led,
            button,
            last_restart: None,
        }
    }

    /// Reason passed to the most recent restart request (host only ever
    /// observes this; on device the restart does not return).
    pub fn last_restart(&self) -> Option<RestartReason> {
        self.last_restart
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I2C: I2c, P: OutputPin> SensorPort for HardwareAdapter<I2C, P> {
    fn init(&mut self) -> Result<(), SensorError> {
        self.sensor.init()
    }

    fn temperature(&mut self) -> Result<f32, SensorError> {
        self.sensor.measure().map(|m| m.temperature_c)
    }

    fn humidity(&mut self) -> Result<f32, SensorError> {
        self.sensor.measure().map(|m| m.humidity_pct)
    }

    fn pressure(&mut self) -> Result<f32, SensorError> {
        self.sensor.measure().map(|m| m.pressure_hpa)
    }
}

// ── Output / button ───────────────────────────────────────────

impl<I2C: I2c, P: OutputPin> OutputPort for HardwareAdapter<I2C, P> {
    fn set_output(&mut self, on: bool) {
        self.led.set(on);
    }

    fn output(&self) -> bool {
        self.led.is_on()
    }
}

impl<I2C: I2c, P: OutputPin> ButtonPort for HardwareAdapter<I2C, P> {
    fn rearm(&mut self) {
        self.button.rearm();
    }
}

// ── RestartPort implementation ────────────────────────────────

impl<I2C: I2c, P: OutputPin> RestartPort for HardwareAdapter<I2C, P> {
    fn restart(&mut self, reason: RestartReason) {
        warn!("restarting device: {:?}", reason);
        self.last_restart = Some(reason);
        #[cfg(target_os = "espidf")]
        // SAFETY: esp_restart has no preconditions and never returns.
        unsafe {
            esp_idf_svc::sys::esp_restart();
        }
        #[cfg(not(target_os = "espidf"))]
        warn!("restart simulated on host");
    }
}
