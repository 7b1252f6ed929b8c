//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the rules of the relay: lifecycle, command
//! dispatch, connection keeping and the dispatch loop.  All interaction
//! with hardware and the network happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real
//! peripherals.

pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod keeper;
pub mod lifecycle;
pub mod ports;
pub mod service;
