//! EnvRelay firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    MqttBroker    LogEventSink   SystemClock   │
//! │  (Sensor+Output     (BrokerPort)  (EventSink)    (ClockPort)   │
//! │   +Button+Restart)  NvsConfigStore (ConfigPort)                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             RelayService (pure logic)                  │    │
//! │  │  Throttle · Dispatcher · Keeper · Lifecycle            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (delegate-driven) · EventQueue (ISR hand-off)       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::gpio::{IOPin, OutputPin, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::modem::Modem;
use esp_idf_hal::prelude::Peripherals;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use envrelay::adapters::hardware::HardwareAdapter;
use envrelay::adapters::log_sink::LogEventSink;
use envrelay::adapters::mqtt::MqttBroker;
use envrelay::adapters::nvs::NvsConfigStore;
use envrelay::adapters::time::SystemClock;
use envrelay::app::ports::ConfigPort;
use envrelay::app::service::RelayService;
use envrelay::config::{NetworkConfig, RelayConfig};
use envrelay::drivers::bme280::Bme280;
use envrelay::drivers::button::ButtonDriver;
use envrelay::drivers::status_led::StatusLed;
use envrelay::error::{Error, StartupError};
use envrelay::events::EventQueue;
use envrelay::pins;

/// ISR → dispatch loop hand-off.  Static so the button interrupt can hold
/// a `'static` reference.
static EVENT_QUEUE: EventQueue = EventQueue::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  EnvRelay v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (NVS, optional build-time overlay) ───
    let config = load_config()?;
    info!(
        "Broker {}:{} as '{}', telemetry on '{}'",
        config.broker.host,
        config.broker.port,
        config.broker.client_id,
        config.topics.telemetry.as_str()
    );

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;

    // ── 3. Peripherals ────────────────────────────────────────
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_BAUDRATE_HZ)),
    )?;
    let sensor = Bme280::new(i2c, config.sensor.i2c_address);
    let led = StatusLed::new(PinDriver::output(peripherals.pins.gpio2.downgrade_output())?);
    let button = ButtonDriver::new(peripherals.pins.gpio0.downgrade(), &EVENT_QUEUE)?;
    info!(
        "Pins: LED=GPIO{} BUTTON=GPIO{} SDA=GPIO{} SCL=GPIO{}",
        pins::LED_GPIO,
        pins::BUTTON_GPIO,
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO
    );
    let mut hw = HardwareAdapter::new(sensor, led, button);

    // ── 4. Sensor (before any networking) ─────────────────────
    let mut service = RelayService::new(config);
    if let Err(e) = service.init_sensor(&mut hw) {
        error!("Start-up failed: {}", e);
        return Err(Error::from(e).into());
    }

    // ── 5. Network ────────────────────────────────────────────
    // Bound for the lifetime of `main`; dropping it tears the link down.
    let _wifi = connect_wifi(peripherals.modem, sys_loop, &service.config().network)
        .map_err(Error::from)?;

    let mut broker = MqttBroker::new(&service.config().broker);
    let mut clock = SystemClock::new();
    let mut sink = LogEventSink::new();

    // ── 6. Broker session ─────────────────────────────────────
    if let Err(e) = service.connect(&mut broker, &mut sink) {
        error!("Start-up failed: {}", e);
        return Err(Error::from(e).into());
    }

    info!("System ready. Entering dispatch loop.");

    // ── 7. Dispatch loop (returns only after a restart request) ─
    let fatal = service.run(&EVENT_QUEUE, &mut hw, &mut broker, &mut clock, &mut sink);
    Err(Error::from(fatal).into())
}

/// Stored config, replaced by `RELAY_CONFIG_JSON` when set at build time.
fn load_config() -> Result<RelayConfig> {
    let store = match NvsConfigStore::new() {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            None
        }
    };

    if let Some(json) = option_env!("RELAY_CONFIG_JSON") {
        let config = RelayConfig::from_json(json).map_err(Error::from)?;
        info!("Config: applied build-time overlay");
        if let Some(store) = &store {
            if let Err(e) = store.save(&config) {
                warn!("Config: overlay not persisted ({})", e);
            }
        }
        return Ok(config);
    }

    let config = match store.as_ref().map(|s| s.load()) {
        Some(Ok(cfg)) => cfg,
        Some(Err(e)) => {
            warn!("NVS config load failed ({}), using defaults", e);
            RelayConfig::default()
        }
        None => RelayConfig::default(),
    };
    config.validate().map_err(Error::from)?;
    Ok(config)
}

/// Join the configured access point in station mode.
fn connect_wifi(
    modem: Modem,
    sys_loop: EspSystemEventLoop,
    network: &NetworkConfig,
) -> core::result::Result<BlockingWifi<EspWifi<'static>>, StartupError> {
    let no_network = |e: esp_idf_svc::sys::EspError| {
        error!("Wi-Fi: {}", e);
        StartupError::NoNetwork
    };

    if network.wifi_ssid.is_empty() {
        error!("Wi-Fi: no SSID configured");
        return Err(StartupError::NoNetwork);
    }

    let esp_wifi = EspWifi::new(modem, sys_loop.clone(), None).map_err(no_network)?;
    let mut wifi = BlockingWifi::wrap(esp_wifi, sys_loop).map_err(no_network)?;

    let auth_method = if network.wifi_password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPAWPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: network.wifi_ssid.as_str().try_into().map_err(|_| StartupError::NoNetwork)?,
        password: network.wifi_password.as_str().try_into().map_err(|_| StartupError::NoNetwork)?,
        auth_method,
        ..Default::default()
    }))
    .map_err(no_network)?;

    wifi.start().map_err(no_network)?;
    info!("Wi-Fi: connecting to '{}'", network.wifi_ssid);
    wifi.connect().map_err(no_network)?;
    wifi.wait_netif_up().map_err(no_network)?;
    info!("Wi-Fi: connected");
    Ok(wifi)
}
