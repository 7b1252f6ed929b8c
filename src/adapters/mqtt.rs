//! MQTT broker adapter.
//!
//! Implements [`BrokerPort`].
//!
//! - **`target_os = "espidf"`**: wraps `EspMqttClient`.  A receiver
//!   thread drains the client connection, tracks session health and moves
//!   complete inbound frames into a bounded static inbox.  `service()`
//!   hands those frames to the dispatcher on the calling thread, so
//!   command handling stays on the dispatch loop.
//! - **`not(target_os = "espidf")`**: an in-process simulation that logs
//!   publishes and lets tests inject inbound frames.

use heapless::{String, Vec};
use log::debug;

use crate::app::ports::BrokerPort;
use crate::config::BrokerConfig;
use crate::error::TransportError;
use crate::message::{MAX_PAYLOAD_LEN, MAX_TOPIC_LEN, Message, QoS};

/// Inbound frames buffered between two service calls.
pub const INBOX_CAP: usize = 8;

/// One inbound publish, copied off the client's receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
    pub qos: QoS,
    pub retained: bool,
    pub duplicate: bool,
}

impl InboundFrame {
    /// `None` if the topic or payload does not fit.
    pub fn new(topic: &str, payload: &[u8], qos: QoS) -> Option<Self> {
        let mut t = String::new();
        t.push_str(topic).ok()?;
        Some(Self {
            topic: t,
            payload: Vec::from_slice(payload).ok()?,
            qos,
            retained: false,
            duplicate: false,
        })
    }

    pub fn as_message(&self) -> Message<'_> {
        Message {
            topic: self.topic.as_str(),
            payload: &self.payload,
            qos: self.qos,
            retained: self.retained,
            duplicate: self.duplicate,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  ESP-IDF client
// ═══════════════════════════════════════════════════════════════

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::channel::Channel;
    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration,
        MqttProtocolVersion, QoS as EspQoS,
    };
    use log::{info, warn};

    use super::*;

    static INBOX: Channel<CriticalSectionRawMutex, InboundFrame, INBOX_CAP> = Channel::new();

    /// How long `connect()` waits for the broker's CONNACK.
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Poll granularity inside `service()` and `connect()`.
    const POLL: Duration = Duration::from_millis(10);

    fn esp_qos(qos: QoS) -> EspQoS {
        match qos {
            QoS::AtMostOnce => EspQoS::AtMostOnce,
            QoS::AtLeastOnce => EspQoS::AtLeastOnce,
        }
    }

    pub struct MqttBroker {
        url: std::string::String,
        config: BrokerConfig,
        client: Option<EspMqttClient<'static>>,
        connected: Arc<AtomicBool>,
    }

    impl MqttBroker {
        pub fn new(config: &BrokerConfig) -> Self {
            Self {
                url: format!("mqtt://{}:{}", config.host, config.port),
                config: config.clone(),
                client: None,
                connected: Arc::new(AtomicBool::new(false)),
            }
        }

        fn spawn_receiver(&self, mut conn: EspMqttConnection) -> Result<(), TransportError> {
            let connected = self.connected.clone();
            std::thread::Builder::new()
                .name("mqtt-rx".into())
                .stack_size(6 * 1024)
                .spawn(move || {
                    loop {
                        let event = match conn.next() {
                            Ok(event) => event,
                            Err(err) => {
                                connected.store(false, Ordering::Release);
                                warn!("mqtt receive loop ended: {err:?}");
                                break;
                            }
                        };
                        match event.payload() {
                            EventPayload::Connected(_) => {
                                connected.store(true, Ordering::Release);
                                info!("mqtt: session up");
                            }
                            EventPayload::Disconnected => {
                                connected.store(false, Ordering::Release);
                                warn!("mqtt: session lost");
                            }
                            EventPayload::Received {
                                topic: Some(topic),
                                data,
                                details: Details::Complete,
                                ..
                            } => match InboundFrame::new(topic, data, QoS::AtMostOnce) {
                                Some(frame) => {
                                    if INBOX.try_send(frame).is_err() {
                                        warn!("mqtt: inbox full, dropping frame on '{}'", topic);
                                    }
                                }
                                None => debug!("mqtt: dropping oversized frame on '{}'", topic),
                            },
                            _ => {}
                        }
                    }
                })
                .map(|_| ())
                .map_err(|_| TransportError::Status(-1))
        }
    }

    impl BrokerPort for MqttBroker {
        fn connect(&mut self) -> Result<(), TransportError> {
            let protocol_version = match self.config.protocol_version {
                3 => MqttProtocolVersion::V3_1,
                5 => MqttProtocolVersion::V5,
                _ => MqttProtocolVersion::V3_1_1,
            };
            let conf = MqttClientConfiguration {
                client_id: Some(self.config.client_id.as_str()),
                username: (!self.config.username.is_empty()).then_some(self.config.username.as_str()),
                password: (!self.config.auth_token.is_empty()).then_some(self.config.auth_token.as_str()),
                keep_alive_interval: Some(Duration::from_secs(u64::from(self.config.keep_alive_secs))),
                protocol_version: Some(protocol_version),
                ..Default::default()
            };
            let (client, conn) =
                EspMqttClient::new(&self.url, &conf).map_err(|e| TransportError::Status(e.code()))?;
            self.spawn_receiver(conn)?;
            self.client = Some(client);

            let deadline = Instant::now() + CONNECT_TIMEOUT;
            while !self.connected.load(Ordering::Acquire) {
                if Instant::now() >= deadline {
                    return Err(TransportError::Timeout);
                }
                std::thread::sleep(POLL);
            }
            info!("mqtt: connected to {} as '{}'", self.url, self.config.client_id);
            Ok(())
        }

        fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), TransportError> {
            let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
            client
                .subscribe(topic, esp_qos(qos))
                .map(|_| ())
                .map_err(|e| TransportError::Status(e.code()))
        }

        fn publish(&mut self, msg: &Message<'_>) -> Result<(), TransportError> {
            if !self.connected.load(Ordering::Acquire) {
                return Err(TransportError::NotConnected);
            }
            let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
            client
                .publish(msg.topic, esp_qos(msg.qos), msg.retained, msg.payload)
                .map(|_| ())
                .map_err(|e| TransportError::Status(e.code()))
        }

        fn service(
            &mut self,
            timeout_ms: u32,
            on_message: &mut dyn FnMut(&Message<'_>),
        ) -> Result<(), TransportError> {
            let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
            loop {
                if !self.connected.load(Ordering::Acquire) {
                    return Err(TransportError::NotConnected);
                }
                while let Ok(frame) = INBOX.try_receive() {
                    on_message(&frame.as_message());
                }
                if Instant::now() >= deadline {
                    return Ok(());
                }
                std::thread::sleep(POLL);
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::MqttBroker;

// ═══════════════════════════════════════════════════════════════
//  Host simulation
// ═══════════════════════════════════════════════════════════════

/// In-process broker stand-in for host runs.
#[cfg(not(target_os = "espidf"))]
pub struct MqttBroker {
    client_id: String<32>,
    connected: bool,
    inbox: heapless::Deque<InboundFrame, INBOX_CAP>,
    published: std::vec::Vec<(std::string::String, std::vec::Vec<u8>, QoS)>,
    subscriptions: std::vec::Vec<std::string::String>,
}

#[cfg(not(target_os = "espidf"))]
impl MqttBroker {
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            connected: false,
            inbox: heapless::Deque::new(),
            published: std::vec::Vec::new(),
            subscriptions: std::vec::Vec::new(),
        }
    }

    /// Queue an inbound frame for the next `service()` call.  Frames on
    /// topics with no subscription, or that do not fit, are dropped.
    pub fn inject(&mut self, topic: &str, payload: &[u8]) -> bool {
        if !self.subscriptions.iter().any(|s| s == topic) {
            return false;
        }
        match InboundFrame::new(topic, payload, QoS::AtMostOnce) {
            Some(frame) => self.inbox.push_back(frame).is_ok(),
            None => false,
        }
    }

    /// Drop the session; the next `service()` reports it.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn published(&self) -> &[(std::string::String, std::vec::Vec<u8>, QoS)] {
        &self.published
    }
}

#[cfg(not(target_os = "espidf"))]
impl BrokerPort for MqttBroker {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        log::info!("mqtt(sim): connected as '{}'", self.client_id);
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, _qos: QoS) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn publish(&mut self, msg: &Message<'_>) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        log::info!(
            "mqtt(sim): publish '{}' qos{} {:?}",
            msg.topic,
            msg.qos.level(),
            msg.payload_str().unwrap_or("<binary>")
        );
        self.published.push((msg.topic.into(), msg.payload.to_vec(), msg.qos));
        // Loop back to our own subscriptions, like a real broker.
        if self.subscriptions.iter().any(|s| s == msg.topic) {
            if let Some(frame) = InboundFrame::new(msg.topic, msg.payload, msg.qos) {
                let _ = self.inbox.push_back(frame);
            }
        }
        Ok(())
    }

    fn service(
        &mut self,
        _timeout_ms: u32,
        on_message: &mut dyn FnMut(&Message<'_>),
    ) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        while let Some(frame) = self.inbox.pop_front() {
            debug!("mqtt(sim): deliver on '{}'", frame.topic);
            on_message(&frame.as_message());
        }
        Ok(())
    }
}
