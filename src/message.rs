//! Pub/sub message envelope and the fixed payload formats.
//!
//! A [`Message`] only borrows its topic and payload: outbound payloads
//! are formatted into a stack buffer right before the publish, and
//! inbound payloads point straight into the transport's receive buffer.
//! Nothing here allocates.

use core::fmt::{self, Write};

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Upper bound on any payload the relay sends or accepts.
pub const MAX_PAYLOAD_LEN: usize = 128;

/// Longest pressure payload (`%.2f` into a 16-byte, NUL-terminated buffer).
pub const PRESSURE_PAYLOAD_LEN: usize = 15;

/// Longest telemetry payload (128-byte buffer, NUL-terminated).
pub const TELEMETRY_PAYLOAD_LEN: usize = MAX_PAYLOAD_LEN - 1;

/// Delivery guarantee for a publish or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
}

impl QoS {
    pub const fn level(self) -> u8 {
        self as u8
    }
}

/// Which way traffic flows on a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Publish,
    Subscribe,
    Both,
}

impl Direction {
    pub const fn publishes(self) -> bool {
        matches!(self, Self::Publish | Self::Both)
    }

    pub const fn subscribes(self) -> bool {
        matches!(self, Self::Subscribe | Self::Both)
    }
}

/// Maximum length of a topic name.
pub const MAX_TOPIC_LEN: usize = 64;

/// A hierarchical topic fixed at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String<MAX_TOPIC_LEN>,
    pub direction: Direction,
    /// QoS used when publishing to this topic.
    pub publish_qos: QoS,
    /// QoS requested when subscribing to this topic.
    pub subscribe_qos: QoS,
}

impl Topic {
    /// Build a topic; names longer than [`MAX_TOPIC_LEN`] are rejected.
    pub fn new(name: &str, direction: Direction, publish_qos: QoS, subscribe_qos: QoS) -> Option<Self> {
        let mut owned = String::new();
        owned.push_str(name).ok()?;
        Some(Self {
            name: owned,
            direction,
            publish_qos,
            subscribe_qos,
        })
    }

    pub fn as_str(&self) -> &str {
        self.name.as_str()
    }
}

/// One unit of pub/sub traffic, in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    pub retained: bool,
    pub duplicate: bool,
}

impl<'a> Message<'a> {
    /// Outbound message, not retained, not a duplicate.
    pub fn outbound(topic: &'a str, payload: &'a [u8], qos: QoS) -> Result<Self, TransportError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(TransportError::PayloadTooLarge);
        }
        Ok(Self {
            topic,
            payload,
            qos,
            retained: false,
            duplicate: false,
        })
    }

    /// Payload as text, if it is valid UTF-8.
    pub fn payload_str(&self) -> Option<&'a str> {
        core::str::from_utf8(self.payload).ok()
    }
}

// ── Payload formatting ────────────────────────────────────────

/// `fmt::Write` sink that silently truncates at capacity, like
/// `snprintf` into a fixed buffer.
struct Truncating<'b, const N: usize>(&'b mut String<N>);

impl<const N: usize> Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Grouped telemetry payload:
/// `{"feeds":{"temperature":21.50,"humidity":48.30}}`.
pub fn telemetry_payload(temperature_c: f32, humidity_pct: f32) -> String<TELEMETRY_PAYLOAD_LEN> {
    let mut out = String::new();
    let _ = write!(
        Truncating(&mut out),
        "{{\"feeds\":{{\"temperature\":{:.2},\"humidity\":{:.2}}}}}",
        temperature_c, humidity_pct
    );
    out
}

/// Plain-text pressure payload, two decimals, at most 15 characters.
pub fn pressure_payload(pressure_hpa: f32) -> String<PRESSURE_PAYLOAD_LEN> {
    let mut out = String::new();
    let _ = write!(Truncating(&mut out), "{:.2}", pressure_hpa);
    out
}
