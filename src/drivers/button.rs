//! Push-button driver.
//!
//! ## Hardware
//!
//! Active-low momentary switch on [`BUTTON_GPIO`](crate::pins::BUTTON_GPIO)
//! with the internal pull-up enabled.  A falling edge fires the ISR, which
//! does nothing but push [`Event::PressureRequested`] onto the event queue
//! and bump a counter.  ESP-IDF disables a GPIO interrupt after it fires,
//! so the dispatch loop calls [`ButtonDriver::rearm`] once the press has
//! been handled, and again whenever the queue reports dropped events.
//!
//! On host builds there is no pin; tests call [`on_falling_edge`]
//! directly.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::events::{Event, EventQueue};

/// Presses seen by the ISR since boot, including dropped ones.
static PRESS_COUNT: AtomicU32 = AtomicU32::new(0);

/// ISR body.  Lock-free, never blocks, never logs.
/// Returns `false` if the queue was full and the press was dropped.
pub fn on_falling_edge(queue: &EventQueue) -> bool {
    PRESS_COUNT.fetch_add(1, Ordering::Relaxed);
    queue.push(Event::PressureRequested)
}

/// Total presses seen by the ISR.
pub fn press_count() -> u32 {
    PRESS_COUNT.load(Ordering::Relaxed)
}

#[cfg(target_os = "espidf")]
pub struct ButtonDriver {
    pin: esp_idf_hal::gpio::PinDriver<'static, esp_idf_hal::gpio::AnyIOPin, esp_idf_hal::gpio::Input>,
}

#[cfg(target_os = "espidf")]
impl ButtonDriver {
    /// Configure the pin (pull-up, negative edge) and attach the ISR.
    pub fn new(
        pin: esp_idf_hal::gpio::AnyIOPin,
        queue: &'static EventQueue,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        use esp_idf_hal::gpio::{InterruptType, PinDriver, Pull};

        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Up)?;
        pin.set_interrupt_type(InterruptType::NegEdge)?;
        // SAFETY: the callback only touches a static queue and an atomic.
        unsafe {
            pin.subscribe(move || {
                on_falling_edge(queue);
            })?;
        }
        pin.enable_interrupt()?;
        log::info!("button: armed on GPIO{}", crate::pins::BUTTON_GPIO);
        Ok(Self { pin })
    }

    pub fn rearm(&mut self) {
        if let Err(e) = self.pin.enable_interrupt() {
            log::warn!("button: re-arm failed: {}", e);
        }
    }
}

/// Host stand-in: the edge is always armed.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct ButtonDriver {
    rearms: u32,
}

#[cfg(not(target_os = "espidf"))]
impl ButtonDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rearm(&mut self) {
        self.rearms += 1;
    }

    /// Times [`rearm`](Self::rearm) has been called.
    pub fn rearms(&self) -> u32 {
        self.rearms
    }
}
