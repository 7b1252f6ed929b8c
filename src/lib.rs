//! EnvRelay firmware library.
//!
//! Exposes the relay core (throttle, dispatcher, connection keeper,
//! scheduler) together with its adapters and drivers so the whole
//! dispatch path can be exercised on the host.  All ESP-IDF-specific code
//! is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod message;
pub mod scheduler;
pub mod throttle;

pub mod adapters;
pub mod drivers;
pub mod pins;
