//! The dispatch loop end to end: schedules, ISR events, throttling and
//! the fatal keep-alive path.

use std::rc::Rc;

use crate::mock_hw::{ManualClock, Record, Rig};

use envrelay::app::events::{AppEvent, PublishKind};
use envrelay::app::lifecycle::Phase;
use envrelay::app::ports::RestartReason;
use envrelay::app::service::RelayService;
use envrelay::config::RelayConfig;
use envrelay::drivers::button::on_falling_edge;
use envrelay::error::{FatalError, SensorError, TransportError};
use envrelay::events::{EVENT_QUEUE_CAP, Event, EventQueue};
use envrelay::message::QoS;

const TELEMETRY: &str = r#"{"feeds":{"temperature":21.50,"humidity":48.30}}"#;

fn running(rig: &mut Rig) -> RelayService {
    let mut relay = RelayService::new(RelayConfig::default());
    relay.start(&mut rig.hw, &mut rig.broker, &mut rig.sink).unwrap();
    relay
}

fn run(relay: &mut RelayService, rig: &mut Rig, queue: &EventQueue) -> FatalError {
    relay.run(queue, &mut rig.hw, &mut rig.broker, &mut rig.clock, &mut rig.sink)
}

// ── Fatal path ────────────────────────────────────────────────

#[test]
fn keep_alive_failure_cancels_stops_then_restarts_once() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.healthy_for(2, TransportError::NotConnected);
    let queue = EventQueue::new();

    let fatal = run(&mut relay, &mut rig, &queue);

    assert_eq!(fatal, FatalError::KeepAlive(TransportError::NotConnected));
    assert_eq!(rig.journal.service_times(), vec![0, 1000, 2000]);
    assert_eq!(rig.journal.restarts(), vec![RestartReason::KeepAliveFailed]);
    assert_eq!(relay.phase(), Phase::Restarting);
    assert_eq!(relay.active_schedules(), 1, "only telemetry remains scheduled");

    let at = |wanted: Record| rig.journal.position(|r| *r == wanted).unwrap();
    let failed = at(Record::Event(AppEvent::KeepAliveFailed(fatal)));
    let cancelled = at(Record::Event(AppEvent::KeepAliveCancelled));
    let stopped = at(Record::Event(AppEvent::DispatchStopped));
    let restarted = at(Record::Restart(RestartReason::KeepAliveFailed));
    assert!(failed < cancelled && cancelled < stopped && stopped < restarted);
}

#[test]
fn initial_keep_alive_failure_never_schedules() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.healthy_for(0, TransportError::Timeout);
    let queue = EventQueue::new();

    let fatal = run(&mut relay, &mut rig, &queue);

    assert_eq!(fatal, FatalError::KeepAlive(TransportError::Timeout));
    assert_eq!(rig.journal.service_times(), vec![0]);
    assert_eq!(relay.active_schedules(), 0);
    assert!(!rig.journal.events().contains(&AppEvent::KeepAliveCancelled));
    assert_eq!(rig.journal.restarts(), vec![RestartReason::KeepAliveFailed]);
}

// ── Periodic tasks ────────────────────────────────────────────

#[test]
fn telemetry_publishes_on_its_interval() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.healthy_for(11, TransportError::Timeout);
    let queue = EventQueue::new();

    run(&mut relay, &mut rig, &queue);

    assert_eq!(
        rig.journal.publishes(),
        vec![(10_000, "relay/groups/default/json".to_owned(), TELEMETRY.to_owned())]
    );
    assert!(rig.journal.records().iter().any(|r| matches!(
        r,
        Record::Published { qos: QoS::AtLeastOnce, .. }
    )));
    assert_eq!(rig.journal.service_times().len(), 12);
    assert_eq!(rig.journal.service_times().last(), Some(&11_000));
    assert_eq!(relay.published(), 1);
}

#[test]
fn overdue_schedules_catch_up_once_per_interval() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.healthy_for(3, TransportError::Timeout);
    rig.broker.publish_cost_ms = 3_500;
    let queue = EventQueue::new();
    queue.push(Event::PressureRequested);

    run(&mut relay, &mut rig, &queue);

    assert_eq!(
        rig.journal.publishes(),
        vec![(3_500, "relay/pressure".to_owned(), "1013.25".to_owned())]
    );
    // Due at 1000, 2000 and 3000; all three run once the publish returns.
    assert_eq!(rig.journal.service_times(), vec![0, 3_500, 3_500, 3_500]);
}

// ── ISR events ────────────────────────────────────────────────

#[test]
fn press_during_throttle_wait_is_queued_not_dropped() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.healthy_for(1, TransportError::Timeout);
    rig.broker.deliver("relay/led", b"ON");
    rig.broker.deliver("relay/led", b"OFF");

    let queue = Rc::new(EventQueue::new());
    let isr_queue = Rc::clone(&queue);
    let mut pressed = false;
    rig.clock = ManualClock::new(Rc::clone(&rig.now)).with_hook(move |_| {
        if !pressed {
            pressed = isr_queue.push(Event::PressureRequested);
        }
    });

    run(&mut relay, &mut rig, &queue);

    // OFF settles at 1200, the press then waits out its own 1200.
    assert_eq!(
        rig.journal.publishes(),
        vec![(2_400, "relay/pressure".to_owned(), "1013.25".to_owned())]
    );
    assert_eq!(rig.journal.count(&Record::Rearm), 1);
    let off = rig.journal.position(|r| *r == Record::Output(false)).unwrap();
    let rearm = rig.journal.position(|r| *r == Record::Rearm).unwrap();
    assert!(off < rearm, "press is handled after the keep-alive finishes");
    assert!(!rig
        .journal
        .events()
        .iter()
        .any(|e| matches!(e, AppEvent::QueueOverflow { .. })));
    assert_eq!(rig.journal.service_times(), vec![0, 2_400]);
}

#[test]
fn queue_overflow_is_reported() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.healthy_for(1, TransportError::Timeout);
    let queue = EventQueue::new();
    for _ in 0..=EVENT_QUEUE_CAP {
        queue.push(Event::KeepAliveTick);
    }

    run(&mut relay, &mut rig, &queue);

    let overflow = rig
        .journal
        .position(|r| *r == Record::Event(AppEvent::QueueOverflow { dropped: 1 }))
        .unwrap();
    let failed = rig
        .journal
        .position(|r| matches!(r, Record::Event(AppEvent::KeepAliveFailed(_))))
        .unwrap();
    assert!(overflow < failed);
}

#[test]
fn press_dropped_on_full_queue_still_rearms_button() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.healthy_for(1, TransportError::NotConnected);
    let queue = EventQueue::new();
    for _ in 0..EVENT_QUEUE_CAP {
        assert!(queue.push(Event::KeepAliveTick));
    }
    assert!(!on_falling_edge(&queue));

    run(&mut relay, &mut rig, &queue);

    assert_eq!(rig.journal.count(&Record::Rearm), 1);
    let overflow = rig
        .journal
        .position(|r| *r == Record::Event(AppEvent::QueueOverflow { dropped: 1 }))
        .unwrap();
    let rearm = rig.journal.position(|r| *r == Record::Rearm).unwrap();
    let failed = rig
        .journal
        .position(|r| matches!(r, Record::Event(AppEvent::KeepAliveFailed(_))))
        .unwrap();
    assert!(overflow < rearm && rearm < failed);
    assert!(rig.journal.publishes().is_empty());
}

// ── Transient failures ────────────────────────────────────────

#[test]
fn sensor_failure_skips_publish_and_loop_continues() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.hw.pressure = Err(SensorError::NoData);
    rig.broker.healthy_for(1, TransportError::Timeout);
    let queue = EventQueue::new();
    queue.push(Event::PressureRequested);

    run(&mut relay, &mut rig, &queue);

    assert!(rig.journal.publishes().is_empty());
    assert!(rig.journal.events().contains(&AppEvent::SensorReadFailed {
        kind: PublishKind::Pressure,
        error: SensorError::NoData,
    }));
    assert_eq!(rig.journal.service_times(), vec![0, 1000]);
}

#[test]
fn publish_failure_is_counted_and_loop_continues() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.publish_script.push_back(Err(TransportError::Status(-1)));
    rig.broker.healthy_for(1, TransportError::Timeout);
    let queue = EventQueue::new();
    queue.push(Event::PressureRequested);

    run(&mut relay, &mut rig, &queue);

    assert_eq!(relay.publish_failures(), 1);
    assert_eq!(relay.published(), 0);
    assert!(rig.journal.events().contains(&AppEvent::PublishFailed {
        kind: PublishKind::Pressure,
        error: TransportError::Status(-1),
    }));
    assert_eq!(rig.journal.service_times(), vec![0, 1000]);
}
