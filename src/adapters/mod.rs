//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements            | Connects to                 |
//! |-------------|-----------------------|-----------------------------|
//! | `hardware`  | SensorPort            | BME280 over I²C             |
//! |             | OutputPort, ButtonPort| GPIO                        |
//! |             | RestartPort           | `esp_restart()`             |
//! | `log_sink`  | EventSink             | Serial log output           |
//! | `mqtt`      | BrokerPort            | ESP-IDF MQTT client / sim   |
//! | `nvs`       | ConfigPort            | NVS / in-memory store       |
//! | `time`      | ClockPort             | ESP32 system timer          |

pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
