//! GPIO / peripheral pin assignments for the relay board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Status LED (driven by the ON / OFF commands)
// ---------------------------------------------------------------------------

/// Digital output, active HIGH.
pub const LED_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// User button (active-low, internal pull-up, falling-edge interrupt)
// ---------------------------------------------------------------------------

/// Momentary push-button; each press publishes the current pressure.
pub const BUTTON_GPIO: i32 = 0;

// ---------------------------------------------------------------------------
// I²C bus (BME280)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// Standard-mode bus clock.
pub const I2C_BAUDRATE_HZ: u32 = 100_000;
