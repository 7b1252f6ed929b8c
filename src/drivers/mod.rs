//! Peripheral drivers: BME280 sensor, status LED and user button.

pub mod bme280;
pub mod button;
pub mod status_led;
