//! Mock adapters for integration tests.
//!
//! Every mock appends to one shared [`Journal`] so tests can assert on the
//! relative order of board calls, broker traffic and emitted events.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use envrelay::app::events::AppEvent;
use envrelay::app::ports::{
    BrokerPort, ButtonPort, ClockPort, EventSink, OutputPort, RestartPort, RestartReason, SensorPort,
};
use envrelay::error::{SensorError, TransportError};
use envrelay::message::{Message, QoS};

// ── Journal ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Event(AppEvent),
    Output(bool),
    Rearm,
    Restart(RestartReason),
    Serviced { at_ms: u64 },
    Published { at_ms: u64, topic: String, payload: Vec<u8>, qos: QoS },
}

#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Record>>>);

impl Journal {
    pub fn push(&self, record: Record) {
        self.0.borrow_mut().push(record);
    }

    pub fn records(&self) -> Vec<Record> {
        self.0.borrow().clone()
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.0
            .borrow()
            .iter()
            .filter_map(|r| match r {
                Record::Event(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(at_ms, topic, payload)` for every successful publish.
    pub fn publishes(&self) -> Vec<(u64, String, String)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|r| match r {
                Record::Published { at_ms, topic, payload, .. } => {
                    Some((*at_ms, topic.clone(), String::from_utf8_lossy(payload).into_owned()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn service_times(&self) -> Vec<u64> {
        self.0
            .borrow()
            .iter()
            .filter_map(|r| match r {
                Record::Serviced { at_ms } => Some(*at_ms),
                _ => None,
            })
            .collect()
    }

    pub fn restarts(&self) -> Vec<RestartReason> {
        self.0
            .borrow()
            .iter()
            .filter_map(|r| match r {
                Record::Restart(reason) => Some(*reason),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Record) -> usize {
        self.0.borrow().iter().filter(|r| *r == wanted).count()
    }

    /// Index of the first record matching `pred`.
    pub fn position(&self, pred: impl Fn(&Record) -> bool) -> Option<usize> {
        self.0.borrow().iter().position(pred)
    }
}

// ── ManualClock ───────────────────────────────────────────────

/// Clock that only moves when slept.  `sleep_ms` advances time and then
/// runs the optional hook, standing in for interrupts that fire while the
/// main task is blocked.
pub struct ManualClock {
    now: Rc<Cell<u64>>,
    on_sleep: Option<Box<dyn FnMut(u64)>>,
    pub sleeps: Vec<u64>,
}

impl ManualClock {
    pub fn new(now: Rc<Cell<u64>>) -> Self {
        Self {
            now,
            on_sleep: None,
            sleeps: Vec::new(),
        }
    }

    /// `hook(now_ms)` runs after every sleep.
    pub fn with_hook(mut self, hook: impl FnMut(u64) + 'static) -> Self {
        self.on_sleep = Some(Box::new(hook));
        self
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    /// Total time spent blocked in `sleep_ms`.
    pub fn slept(&self) -> u64 {
        self.sleeps.iter().sum()
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.sleeps.push(ms);
        self.now.set(self.now.get() + ms);
        if let Some(hook) = self.on_sleep.as_mut() {
            hook(self.now.get());
        }
    }
}

// ── MockBroker ────────────────────────────────────────────────

pub struct MockBroker {
    journal: Journal,
    now: Rc<Cell<u64>>,
    pub connect_result: Result<(), TransportError>,
    /// Topics whose subscribe call fails.
    pub failing_subscriptions: Vec<String>,
    pub subscriptions: Vec<(String, QoS)>,
    /// One entry per `service` call; `Err(Timeout)` once exhausted.
    pub service_script: VecDeque<Result<(), TransportError>>,
    /// Delivered in full on the next successful `service` call.
    pub inbound: VecDeque<(String, Vec<u8>)>,
    /// One entry per `publish` call; `Ok` once exhausted.
    pub publish_script: VecDeque<Result<(), TransportError>>,
    /// Simulated time each publish takes.
    pub publish_cost_ms: u64,
    pub connects: u32,
}

impl MockBroker {
    pub fn new(journal: Journal, now: Rc<Cell<u64>>) -> Self {
        Self {
            journal,
            now,
            connect_result: Ok(()),
            failing_subscriptions: Vec::new(),
            subscriptions: Vec::new(),
            service_script: VecDeque::new(),
            inbound: VecDeque::new(),
            publish_script: VecDeque::new(),
            publish_cost_ms: 0,
            connects: 0,
        }
    }

    /// `ok` healthy service calls, then a failure.
    pub fn healthy_for(&mut self, ok: usize, then: TransportError) {
        self.service_script = std::iter::repeat_n(Ok(()), ok).chain([Err(then)]).collect();
    }

    pub fn deliver(&mut self, topic: &str, payload: &[u8]) {
        self.inbound.push_back((topic.to_owned(), payload.to_vec()));
    }
}

impl BrokerPort for MockBroker {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.connects += 1;
        self.connect_result
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), TransportError> {
        if self.failing_subscriptions.iter().any(|t| t == topic) {
            return Err(TransportError::Status(-1));
        }
        self.subscriptions.push((topic.to_owned(), qos));
        Ok(())
    }

    fn publish(&mut self, msg: &Message<'_>) -> Result<(), TransportError> {
        self.now.set(self.now.get() + self.publish_cost_ms);
        let result = self.publish_script.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.journal.push(Record::Published {
                at_ms: self.now.get(),
                topic: msg.topic.to_owned(),
                payload: msg.payload.to_vec(),
                qos: msg.qos,
            });
        }
        result
    }

    fn service(
        &mut self,
        _timeout_ms: u32,
        on_message: &mut dyn FnMut(&Message<'_>),
    ) -> Result<(), TransportError> {
        self.journal.push(Record::Serviced { at_ms: self.now.get() });
        self.service_script.pop_front().unwrap_or(Err(TransportError::Timeout))?;
        while let Some((topic, payload)) = self.inbound.pop_front() {
            on_message(&Message {
                topic: &topic,
                payload: &payload,
                qos: QoS::AtMostOnce,
                retained: false,
                duplicate: false,
            });
        }
        Ok(())
    }
}

// ── MockHw ────────────────────────────────────────────────────

pub struct MockHw {
    journal: Journal,
    pub init_result: Result<(), SensorError>,
    pub temperature: Result<f32, SensorError>,
    pub humidity: Result<f32, SensorError>,
    pub pressure: Result<f32, SensorError>,
    pub output: bool,
    pub inits: u32,
}

impl MockHw {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            init_result: Ok(()),
            temperature: Ok(21.5),
            humidity: Ok(48.3),
            pressure: Ok(1013.25),
            output: false,
            inits: 0,
        }
    }
}

impl SensorPort for MockHw {
    fn init(&mut self) -> Result<(), SensorError> {
        self.inits += 1;
        self.init_result
    }

    fn temperature(&mut self) -> Result<f32, SensorError> {
        self.temperature
    }

    fn humidity(&mut self) -> Result<f32, SensorError> {
        self.humidity
    }

    fn pressure(&mut self) -> Result<f32, SensorError> {
        self.pressure
    }
}

impl OutputPort for MockHw {
    fn set_output(&mut self, on: bool) {
        self.output = on;
        self.journal.push(Record::Output(on));
    }

    fn output(&self) -> bool {
        self.output
    }
}

impl ButtonPort for MockHw {
    fn rearm(&mut self) {
        self.journal.push(Record::Rearm);
    }
}

impl RestartPort for MockHw {
    fn restart(&mut self, reason: RestartReason) {
        self.journal.push(Record::Restart(reason));
    }
}

// ── JournalSink ───────────────────────────────────────────────

pub struct JournalSink(pub Journal);

impl EventSink for JournalSink {
    fn emit(&mut self, event: &AppEvent) {
        self.0.push(Record::Event(event.clone()));
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// All mocks wired to one journal and one time source.
pub struct Rig {
    pub journal: Journal,
    pub now: Rc<Cell<u64>>,
    pub hw: MockHw,
    pub broker: MockBroker,
    pub clock: ManualClock,
    pub sink: JournalSink,
}

impl Rig {
    pub fn new() -> Self {
        let journal = Journal::default();
        let now = Rc::new(Cell::new(0));
        Self {
            hw: MockHw::new(journal.clone()),
            broker: MockBroker::new(journal.clone(), now.clone()),
            clock: ManualClock::new(now.clone()),
            sink: JournalSink(journal.clone()),
            journal,
            now,
        }
    }
}
