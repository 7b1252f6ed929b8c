//! Single-colour status LED driver.
//!
//! Generic over [`OutputPin`] so the same driver runs on an ESP-IDF
//! `PinDriver` and on a host test double.  The last commanded level is
//! cached so reads never touch the pin.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct StatusLed<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> StatusLed<P> {
    /// Take the pin and drive it low.
    pub fn new(mut pin: P) -> Self {
        if pin.set_low().is_err() {
            warn!("status LED: initial set_low failed");
        }
        Self { pin, on: false }
    }

    pub fn set(&mut self, on: bool) {
        let res = if on { self.pin.set_high() } else { self.pin.set_low() };
        match res {
            Ok(()) => self.on = on,
            Err(_) => warn!("status LED: pin write failed"),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
