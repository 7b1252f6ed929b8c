//! Relay configuration parameters
//!
//! Broker identity, Wi-Fi credentials, topics, timing and sensor wiring.
//! Defaults can be overridden from NVS or a JSON document supplied at
//! build time.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::message::{Direction, MAX_TOPIC_LEN, QoS, Topic};

/// Default topic namespace.
pub const DEFAULT_NAMESPACE: &str = "relay";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub broker: BrokerConfig,
    pub network: NetworkConfig,
    pub topics: TopicConfig,
    pub timing: TimingConfig,
    pub sensor: SensorConfig,
}

/// Broker session identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String<64>,
    pub port: u16,
    pub client_id: String<32>,
    pub username: String<32>,
    /// Broker password / API key.
    pub auth_token: String<64>,
    pub keep_alive_secs: u16,
    /// 3 = MQTT 3.1, 4 = MQTT 3.1.1, 5 = MQTT 5.
    pub protocol_version: u8,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: heapless_str("broker.local"),
            port: 1883,
            client_id: heapless_str("envrelay"),
            username: String::new(),
            auth_token: String::new(),
            keep_alive_secs: 25,
            protocol_version: 4,
        }
    }
}

/// Station-mode Wi-Fi credentials.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub wifi_ssid: String<32>,
    pub wifi_password: String<64>,
}

/// The three topics the relay talks on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Inbound `ON` / `OFF` / `RESET`.
    pub command: Topic,
    /// Button-triggered pressure readings.
    pub pressure: Topic,
    /// Grouped temperature + humidity feed.
    pub telemetry: Topic,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self::build(DEFAULT_NAMESPACE)
    }
}

impl TopicConfig {
    /// Topic layout under `namespace`:
    /// `<ns>/led`, `<ns>/pressure`, `<ns>/groups/default/json`.
    pub fn for_namespace(namespace: &str) -> Result<Self, ConfigError> {
        if namespace.is_empty() {
            return Err(ConfigError::ValidationFailed("topic namespace must not be empty"));
        }
        if namespace.len() + "/groups/default/json".len() > MAX_TOPIC_LEN {
            return Err(ConfigError::ValidationFailed("topic namespace too long"));
        }
        Ok(Self::build(namespace))
    }

    fn build(namespace: &str) -> Self {
        let topic = |suffix: &str, direction: Direction, publish_qos: QoS, subscribe_qos: QoS| Topic {
            name: joined(namespace, suffix),
            direction,
            publish_qos,
            subscribe_qos,
        };
        Self {
            command: topic("/led", Direction::Subscribe, QoS::AtMostOnce, QoS::AtMostOnce),
            pressure: topic("/pressure", Direction::Publish, QoS::AtLeastOnce, QoS::AtMostOnce),
            telemetry: topic(
                "/groups/default/json",
                Direction::Both,
                QoS::AtLeastOnce,
                QoS::AtMostOnce,
            ),
        }
    }

    /// All topics, in subscription order.
    pub fn all(&self) -> [&Topic; 3] {
        [&self.command, &self.pressure, &self.telemetry]
    }

    /// Topics the relay subscribes to at start-up.
    pub fn subscriptions(&self) -> impl Iterator<Item = &Topic> {
        self.all().into_iter().filter(|t| t.direction.subscribes())
    }
}

/// Scheduling and throttling parameters, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub keep_alive_interval_ms: u32,
    pub telemetry_interval_ms: u32,
    /// Upper bound on one transport service call.
    pub service_timeout_ms: u32,
    pub throttle_min_spacing_ms: u32,
    pub throttle_settle_ms: u32,
    /// Longest the dispatch loop sleeps while the queue is empty, so
    /// ISR events are picked up promptly.
    pub idle_poll_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            keep_alive_interval_ms: 1_000,
            telemetry_interval_ms: 10_000,
            service_timeout_ms: 100,
            throttle_min_spacing_ms: 1_000,
            throttle_settle_ms: 1_200,
            idle_poll_ms: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// BME280 address: 0x76 (SDO low) or 0x77 (SDO high).
    pub i2c_address: u8,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { i2c_address: 0x76 }
    }
}

impl RelayConfig {
    /// Parse a (possibly partial) JSON document; missing fields keep
    /// their defaults.  The result is validated.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range-check every field.  Rejects, never clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.broker;
        if b.host.is_empty() {
            return Err(ConfigError::ValidationFailed("broker.host must not be empty"));
        }
        if b.port == 0 {
            return Err(ConfigError::ValidationFailed("broker.port must be non-zero"));
        }
        if b.client_id.is_empty() {
            return Err(ConfigError::ValidationFailed("broker.client_id must not be empty"));
        }
        if b.keep_alive_secs == 0 {
            return Err(ConfigError::ValidationFailed("broker.keep_alive_secs must be non-zero"));
        }
        if !(3..=5).contains(&b.protocol_version) {
            return Err(ConfigError::ValidationFailed("broker.protocol_version must be 3–5"));
        }

        let t = &self.timing;
        if t.keep_alive_interval_ms == 0 || t.telemetry_interval_ms == 0 || t.idle_poll_ms == 0 {
            return Err(ConfigError::ValidationFailed("timing intervals must be non-zero"));
        }
        if t.service_timeout_ms == 0 || t.service_timeout_ms >= t.keep_alive_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "timing.service_timeout_ms must be 1..keep_alive_interval_ms",
            ));
        }
        if t.throttle_settle_ms < t.throttle_min_spacing_ms {
            return Err(ConfigError::ValidationFailed(
                "timing.throttle_settle_ms must be >= throttle_min_spacing_ms",
            ));
        }

        for topic in self.topics.all() {
            if topic.name.is_empty() {
                return Err(ConfigError::ValidationFailed("topic name must not be empty"));
            }
            if topic.direction.publishes() && topic.name.contains(|c| c == '+' || c == '#') {
                return Err(ConfigError::ValidationFailed(
                    "publish topic must not contain wildcards",
                ));
            }
        }
        if !self.topics.command.direction.subscribes() {
            return Err(ConfigError::ValidationFailed("command topic must be subscribed"));
        }
        if !self.topics.pressure.direction.publishes() || !self.topics.telemetry.direction.publishes() {
            return Err(ConfigError::ValidationFailed(
                "pressure and telemetry topics must be published",
            ));
        }

        if !matches!(self.sensor.i2c_address, 0x76 | 0x77) {
            return Err(ConfigError::ValidationFailed("sensor.i2c_address must be 0x76 or 0x77"));
        }
        Ok(())
    }
}

fn heapless_str<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

fn joined(namespace: &str, suffix: &str) -> String<MAX_TOPIC_LEN> {
    let mut out: String<MAX_TOPIC_LEN> = heapless_str(namespace);
    for c in suffix.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
