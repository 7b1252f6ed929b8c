//! Relay service, the hexagonal core.
//!
//! [`RelayService`] owns the publish throttle, the connection keeper, the
//! command dispatcher and the scheduler.  All I/O flows through port
//! traits injected at call sites, so the whole service runs against mock
//! adapters in tests.
//!
//! ```text
//!  BoardPort  ──▶ ┌───────────────────────────┐ ──▶ EventSink
//!                 │       RelayService         │
//!  BrokerPort ◀──▶│ throttle · keeper ·        │
//!                 │ dispatcher · scheduler     │
//!  EventQueue ──▶ └───────────────────────────┘ ◀── ClockPort
//! ```
//!
//! Everything runs on one thread.  Throttle waits and the keep-alive's
//! bounded service call block it; the button ISR keeps pushing onto the
//! queue meanwhile and those events are handled afterwards, in order.

use log::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::{FatalError, StartupError, TransientError};
use crate::events::{Event, EventQueue};
use crate::message::{Message, QoS, pressure_payload, telemetry_payload};
use crate::scheduler::{Schedule, Scheduler};
use crate::throttle::PublishThrottle;

use super::dispatcher::CommandDispatcher;
use super::events::{AppEvent, PublishKind};
use super::keeper::ConnectionKeeper;
use super::lifecycle::Phase;
use super::ports::{
    BoardPort, BrokerPort, ClockPort, EventSink, RestartReason, SchedulerDelegate, SensorPort,
};

const KEEP_ALIVE_LABEL: &str = "keep-alive";
const TELEMETRY_LABEL: &str = "telemetry";

// ───────────────────────────────────────────────────────────────
// RelayService
// ───────────────────────────────────────────────────────────────

pub struct RelayService {
    config: RelayConfig,
    phase: Phase,
    throttle: PublishThrottle,
    keeper: ConnectionKeeper,
    dispatcher: CommandDispatcher,
    scheduler: Scheduler,
    keep_alive_slot: Option<usize>,
    published: u32,
    publish_failures: u32,
}

impl RelayService {
    /// Construct the service from configuration.
    ///
    /// Does **not** touch any port; call [`start`](Self::start) next.
    pub fn new(config: RelayConfig) -> Self {
        let t = &config.timing;
        let throttle = PublishThrottle::new(t.throttle_min_spacing_ms, t.throttle_settle_ms);
        let keeper = ConnectionKeeper::new(t.service_timeout_ms);
        Self {
            config,
            phase: Phase::Init,
            throttle,
            keeper,
            dispatcher: CommandDispatcher::new(),
            scheduler: Scheduler::new(),
            keep_alive_slot: None,
            published: 0,
            publish_failures: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring the relay up: sensor, broker session, subscriptions.
    ///
    /// Sensor and connect failures abort; a failed subscription is only
    /// logged and start-up carries on.
    pub fn start(
        &mut self,
        hw: &mut impl SensorPort,
        broker: &mut impl BrokerPort,
        sink: &mut impl EventSink,
    ) -> Result<(), StartupError> {
        self.init_sensor(hw)?;
        self.connect(broker, sink)
    }

    /// `Init` phase work.  On the board this runs before the network is
    /// brought up, so a missing sensor is reported first.
    pub fn init_sensor(&mut self, hw: &mut impl SensorPort) -> Result<(), StartupError> {
        hw.init().map_err(|e| {
            error!("sensor init failed: {}", e);
            StartupError::Sensor(e)
        })
    }

    /// Open the broker session and subscribe, ending in `Running`.
    pub fn connect(
        &mut self,
        broker: &mut impl BrokerPort,
        sink: &mut impl EventSink,
    ) -> Result<(), StartupError> {
        self.transition(Phase::Connecting, sink);
        broker.connect().map_err(|e| {
            error!("broker connect failed: {}", e);
            StartupError::Connect(e)
        })?;

        self.transition(Phase::Subscribing, sink);
        for topic in self.config.topics.subscriptions() {
            match broker.subscribe(topic.as_str(), topic.subscribe_qos) {
                Ok(()) => info!("subscribed to '{}' (qos {})", topic.as_str(), topic.subscribe_qos.level()),
                Err(e) => {
                    warn!("subscribe to '{}' failed: {}", topic.as_str(), e);
                    sink.emit(&AppEvent::SubscribeFailed {
                        topic: topic.name.clone(),
                        error: e,
                    });
                }
            }
        }

        self.transition(Phase::Running, sink);
        sink.emit(&AppEvent::Started);
        Ok(())
    }

    /// Run the dispatch loop until a fatal failure, then restart.
    ///
    /// Order on failure: keep-alive schedule cancelled, loop stopped,
    /// restart requested.  On hardware the restart does not return; the
    /// returned error is only observable on the host.
    pub fn run(
        &mut self,
        queue: &EventQueue,
        hw: &mut impl BoardPort,
        broker: &mut impl BrokerPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> FatalError {
        let fatal = self.dispatch_forever(queue, hw, broker, clock, sink);
        sink.emit(&AppEvent::DispatchStopped);
        self.transition(Phase::Restarting, sink);
        hw.restart(RestartReason::KeepAliveFailed);
        fatal
    }

    /// The event loop proper.
    ///
    /// Runs the keep-alive once, registers the periodic schedules, then
    /// handles queued events one at a time in FIFO order.  Returns only on
    /// a fatal keep-alive failure, after cancelling the keep-alive
    /// schedule.
    pub fn dispatch_forever(
        &mut self,
        queue: &EventQueue,
        hw: &mut impl BoardPort,
        broker: &mut impl BrokerPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> FatalError {
        if let Err(fatal) = self.keep_alive(hw, broker, clock, sink) {
            return fatal;
        }

        let now = clock.now_ms();
        let timing = &self.config.timing;
        self.keep_alive_slot = self.scheduler.add(
            Schedule {
                label: KEEP_ALIVE_LABEL,
                event: Event::KeepAliveTick,
                interval_ms: timing.keep_alive_interval_ms,
                enabled: true,
            },
            now,
        );
        self.scheduler.add(
            Schedule {
                label: TELEMETRY_LABEL,
                event: Event::TelemetryTick,
                interval_ms: timing.telemetry_interval_ms,
                enabled: true,
            },
            now,
        );
        let idle_poll_ms = u64::from(timing.idle_poll_ms);

        loop {
            self.scheduler.poll(clock.now_ms(), &mut QueueFeeder(queue));

            let dropped = queue.take_dropped();
            if dropped > 0 {
                sink.emit(&AppEvent::QueueOverflow { dropped });
                // A dropped press never reaches handle_event; the edge
                // interrupt stays disabled until re-armed here.
                hw.rearm();
            }

            match queue.pop() {
                Some(event) => {
                    if let Err(fatal) = self.handle_event(event, hw, broker, clock, sink) {
                        self.cancel_keep_alive(sink);
                        return fatal;
                    }
                }
                None => {
                    let now = clock.now_ms();
                    let wait = self
                        .scheduler
                        .next_due_in(now)
                        .map_or(idle_poll_ms, |due| due.min(idle_poll_ms));
                    if wait > 0 {
                        clock.sleep_ms(wait);
                    }
                }
            }
        }
    }

    /// Run the task behind one queued event.
    ///
    /// Transient task failures are logged and swallowed; only the
    /// keep-alive can fail the loop.
    pub fn handle_event(
        &mut self,
        event: Event,
        hw: &mut impl BoardPort,
        broker: &mut impl BrokerPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<(), FatalError> {
        debug!("dispatch {:?}", event);
        match event {
            Event::KeepAliveTick => self.keep_alive(hw, broker, clock, sink)?,
            Event::TelemetryTick => {
                if let Err(e) = self.publish_telemetry(hw, broker, clock, sink) {
                    warn!("telemetry: {}", e);
                }
            }
            Event::PressureRequested => {
                hw.rearm();
                if let Err(e) = self.publish_pressure(hw, broker, clock, sink) {
                    warn!("pressure: {}", e);
                }
            }
        }
        Ok(())
    }

    // ── Tasks ─────────────────────────────────────────────────

    /// Service the broker once; inbound commands are dispatched inline.
    pub fn keep_alive(
        &mut self,
        hw: &mut impl BoardPort,
        broker: &mut impl BrokerPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<(), FatalError> {
        let Self {
            keeper,
            dispatcher,
            throttle,
            ..
        } = self;
        let result = keeper.tick(broker, &mut |msg: &Message<'_>| {
            dispatcher.on_message(msg, throttle, clock, hw, sink);
        });
        if let Err(fatal) = result {
            sink.emit(&AppEvent::KeepAliveFailed(fatal));
        }
        result
    }

    /// Read temperature and humidity and publish the grouped feed.
    pub fn publish_telemetry(
        &mut self,
        hw: &mut impl SensorPort,
        broker: &mut impl BrokerPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<(), TransientError> {
        let kind = PublishKind::Telemetry;
        let readings = hw.temperature().and_then(|t| Ok((t, hw.humidity()?)));
        let (temperature, humidity) = readings.map_err(|error| {
            sink.emit(&AppEvent::SensorReadFailed { kind, error });
            TransientError::Sensor(error)
        })?;

        let payload = telemetry_payload(temperature, humidity);
        let topic = self.config.topics.telemetry.clone();
        self.publish(kind, topic.as_str(), payload.as_bytes(), topic.publish_qos, broker, clock, sink)
    }

    /// Read the pressure and publish it as plain text.
    pub fn publish_pressure(
        &mut self,
        hw: &mut impl SensorPort,
        broker: &mut impl BrokerPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<(), TransientError> {
        let kind = PublishKind::Pressure;
        let pressure = hw.pressure().map_err(|error| {
            sink.emit(&AppEvent::SensorReadFailed { kind, error });
            TransientError::Sensor(error)
        })?;

        let payload = pressure_payload(pressure);
        let topic = self.config.topics.pressure.clone();
        self.publish(kind, topic.as_str(), payload.as_bytes(), topic.publish_qos, broker, clock, sink)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn throttle(&self) -> &PublishThrottle {
        &self.throttle
    }

    /// Successful publishes since start.
    pub fn published(&self) -> u32 {
        self.published
    }

    /// Failed publish attempts since start.
    pub fn publish_failures(&self) -> u32 {
        self.publish_failures
    }

    /// Recognised inbound commands applied since start.
    pub fn commands_applied(&self) -> u32 {
        self.dispatcher.applied()
    }

    /// Keep-alive service calls made since start.
    pub fn keep_alive_ticks(&self) -> u64 {
        self.keeper.ticks()
    }

    /// Enabled schedules.
    pub fn active_schedules(&self) -> usize {
        self.scheduler.active_count()
    }

    // ── Internal ──────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn publish(
        &mut self,
        kind: PublishKind,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        broker: &mut impl BrokerPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<(), TransientError> {
        let msg = Message::outbound(topic, payload, qos).map_err(TransientError::Publish)?;
        match self.throttle.gate(clock, || broker.publish(&msg)) {
            Ok(()) => {
                self.published += 1;
                sink.emit(&AppEvent::Published {
                    kind,
                    bytes: payload.len(),
                });
                Ok(())
            }
            Err(error) => {
                self.publish_failures += 1;
                sink.emit(&AppEvent::PublishFailed { kind, error });
                Err(TransientError::Publish(error))
            }
        }
    }

    fn cancel_keep_alive(&mut self, sink: &mut impl EventSink) {
        if let Some(slot) = self.keep_alive_slot.take() {
            if self.scheduler.cancel(slot) {
                sink.emit(&AppEvent::KeepAliveCancelled);
            }
        }
    }

    fn transition(&mut self, to: Phase, sink: &mut impl EventSink) {
        if self.phase.can_transition_to(to) {
            info!("phase {} -> {}", self.phase.name(), to.name());
            sink.emit(&AppEvent::PhaseChanged {
                from: self.phase,
                to,
            });
            self.phase = to;
        } else {
            warn!("ignoring phase change {} -> {}", self.phase.name(), to.name());
        }
    }
}

/// Scheduler delegate that feeds due schedules into the event queue.
struct QueueFeeder<'q>(&'q EventQueue);

impl SchedulerDelegate for QueueFeeder<'_> {
    fn on_schedule_fired(&mut self, label: &'static str, event: Event) {
        if !self.0.push(event) {
            debug!("'{}' fire dropped, queue full", label);
        }
    }
}
