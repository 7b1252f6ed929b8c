//! Inbound command path: broker service → dispatcher → board.

use crate::mock_hw::{Record, Rig};

use envrelay::app::commands::Command;
use envrelay::app::events::AppEvent;
use envrelay::app::lifecycle::Phase;
use envrelay::app::ports::RestartReason;
use envrelay::app::service::RelayService;
use envrelay::config::RelayConfig;
use envrelay::error::{FatalError, TransportError};

fn running(rig: &mut Rig) -> RelayService {
    let mut relay = RelayService::new(RelayConfig::default());
    relay.start(&mut rig.hw, &mut rig.broker, &mut rig.sink).unwrap();
    relay
}

fn keep_alive(relay: &mut RelayService, rig: &mut Rig) -> Result<(), FatalError> {
    relay.keep_alive(&mut rig.hw, &mut rig.broker, &mut rig.clock, &mut rig.sink)
}

#[test]
fn on_then_off_drives_output_with_throttle_between() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.service_script.push_back(Ok(()));
    rig.broker.deliver("relay/led", b"ON");
    rig.broker.deliver("relay/led", b"OFF");

    keep_alive(&mut relay, &mut rig).unwrap();

    assert!(!rig.hw.output);
    let outputs: Vec<_> = rig
        .journal
        .records()
        .into_iter()
        .filter(|r| matches!(r, Record::Output(_)))
        .collect();
    assert_eq!(outputs, vec![Record::Output(true), Record::Output(false)]);
    assert_eq!(rig.clock.sleeps, vec![1200], "second command waits out the settle time");
    assert_eq!(relay.commands_applied(), 2);
    assert_eq!(relay.keep_alive_ticks(), 1);
}

#[test]
fn repeated_on_is_idempotent() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.service_script.push_back(Ok(()));
    rig.broker.deliver("relay/led", b"ON");
    rig.broker.deliver("relay/led", b"ON");

    keep_alive(&mut relay, &mut rig).unwrap();

    assert!(rig.hw.output);
    assert_eq!(rig.journal.count(&Record::Output(true)), 2);
    assert_eq!(rig.journal.count(&Record::Event(AppEvent::CommandApplied(Command::TurnOn))), 2);
}

#[test]
fn only_exact_literals_are_commands() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.service_script.push_back(Ok(()));
    for payload in [&b"on"[..], b"ON\n", b"ONN", b"", b"RESET ", b"\x00ON"] {
        rig.broker.deliver("relay/led", payload);
    }

    keep_alive(&mut relay, &mut rig).unwrap();

    assert!(!rig.hw.output);
    assert!(rig.journal.restarts().is_empty());
    assert_eq!(relay.commands_applied(), 0);
    let ignored = rig
        .journal
        .events()
        .into_iter()
        .filter(|e| matches!(e, AppEvent::CommandIgnored { .. }))
        .count();
    assert_eq!(ignored, 6);
    // Ignored payloads still consume throttle slots.
    assert_eq!(rig.clock.sleeps, vec![1200; 5]);
}

#[test]
fn reset_requests_restart_after_announcing_it() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.service_script.push_back(Ok(()));
    rig.broker.deliver("relay/led", b"RESET");

    keep_alive(&mut relay, &mut rig).unwrap();

    assert_eq!(rig.journal.restarts(), vec![RestartReason::Command]);
    let applied = rig
        .journal
        .position(|r| *r == Record::Event(AppEvent::CommandApplied(Command::Reset)))
        .unwrap();
    let restart = rig
        .journal
        .position(|r| *r == Record::Restart(RestartReason::Command))
        .unwrap();
    assert!(applied < restart);
    assert_eq!(relay.phase(), Phase::Running);
}

#[test]
fn own_telemetry_echo_is_ignored() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.service_script.push_back(Ok(()));
    rig.broker.deliver(
        "relay/groups/default/json",
        br#"{"feeds":{"temperature":21.50,"humidity":48.30}}"#,
    );

    keep_alive(&mut relay, &mut rig).unwrap();

    assert!(!rig.hw.output);
    assert_eq!(
        rig.journal.events().last(),
        Some(&AppEvent::CommandIgnored { len: 48 })
    );
}

#[test]
fn failed_service_is_fatal_and_delivers_nothing() {
    let mut rig = Rig::new();
    let mut relay = running(&mut rig);
    rig.broker.service_script.push_back(Err(TransportError::NotConnected));
    rig.broker.deliver("relay/led", b"ON");

    let err = keep_alive(&mut relay, &mut rig).unwrap_err();

    assert_eq!(err, FatalError::KeepAlive(TransportError::NotConnected));
    assert!(!rig.hw.output);
    assert_eq!(
        rig.journal.events().last(),
        Some(&AppEvent::KeepAliveFailed(FatalError::KeepAlive(TransportError::NotConnected)))
    );
}
