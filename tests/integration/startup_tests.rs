//! Start-up sequence: sensor → connect → subscribe → running.

use crate::mock_hw::{Record, Rig};

use envrelay::app::events::AppEvent;
use envrelay::app::lifecycle::Phase;
use envrelay::app::service::RelayService;
use envrelay::config::{RelayConfig, TopicConfig};
use envrelay::error::{SensorError, StartupError, TransportError};
use envrelay::message::QoS;

#[test]
fn happy_path_subscribes_command_and_telemetry_topics() {
    let mut rig = Rig::new();
    let mut relay = RelayService::new(RelayConfig::default());

    relay.start(&mut rig.hw, &mut rig.broker, &mut rig.sink).unwrap();

    assert_eq!(relay.phase(), Phase::Running);
    assert_eq!(rig.hw.inits, 1);
    assert_eq!(rig.broker.connects, 1);
    assert_eq!(
        rig.broker.subscriptions,
        vec![
            ("relay/led".to_owned(), QoS::AtMostOnce),
            ("relay/groups/default/json".to_owned(), QoS::AtMostOnce),
        ]
    );
    assert_eq!(
        rig.journal.events(),
        vec![
            AppEvent::PhaseChanged { from: Phase::Init, to: Phase::Connecting },
            AppEvent::PhaseChanged { from: Phase::Connecting, to: Phase::Subscribing },
            AppEvent::PhaseChanged { from: Phase::Subscribing, to: Phase::Running },
            AppEvent::Started,
        ]
    );
}

#[test]
fn sensor_failure_aborts_before_connecting() {
    let mut rig = Rig::new();
    rig.hw.init_result = Err(SensorError::UnexpectedChipId(0x58));
    let mut relay = RelayService::new(RelayConfig::default());

    let err = relay.start(&mut rig.hw, &mut rig.broker, &mut rig.sink).unwrap_err();

    assert_eq!(err, StartupError::Sensor(SensorError::UnexpectedChipId(0x58)));
    assert_eq!(rig.broker.connects, 0, "no network traffic after a sensor failure");
    assert_eq!(relay.phase(), Phase::Init);
    assert!(rig.journal.events().is_empty());
}

#[test]
fn sensor_check_runs_on_its_own_before_the_session() {
    let mut rig = Rig::new();
    let mut relay = RelayService::new(RelayConfig::default());

    rig.hw.init_result = Err(SensorError::NoData);
    assert_eq!(relay.init_sensor(&mut rig.hw), Err(StartupError::Sensor(SensorError::NoData)));
    assert_eq!(relay.phase(), Phase::Init);
    assert_eq!(rig.broker.connects, 0);

    rig.hw.init_result = Ok(());
    relay.init_sensor(&mut rig.hw).unwrap();
    assert_eq!(relay.phase(), Phase::Init);
    assert!(rig.journal.events().is_empty());

    relay.connect(&mut rig.broker, &mut rig.sink).unwrap();
    assert_eq!(relay.phase(), Phase::Running);
    assert_eq!(rig.hw.inits, 2);
    assert_eq!(rig.broker.connects, 1);
    assert_eq!(rig.journal.events().last(), Some(&AppEvent::Started));
}

#[test]
fn connect_failure_is_a_startup_error() {
    let mut rig = Rig::new();
    rig.broker.connect_result = Err(TransportError::Status(-3));
    let mut relay = RelayService::new(RelayConfig::default());

    let err = relay.start(&mut rig.hw, &mut rig.broker, &mut rig.sink).unwrap_err();

    assert_eq!(err, StartupError::Connect(TransportError::Status(-3)));
    assert_eq!(relay.phase(), Phase::Connecting);
    assert!(rig.broker.subscriptions.is_empty());
    assert!(!rig.journal.events().contains(&AppEvent::Started));
}

#[test]
fn failed_subscription_is_reported_and_startup_continues() {
    let mut rig = Rig::new();
    rig.broker.failing_subscriptions.push("relay/led".to_owned());
    let mut relay = RelayService::new(RelayConfig::default());

    relay.start(&mut rig.hw, &mut rig.broker, &mut rig.sink).unwrap();

    assert_eq!(relay.phase(), Phase::Running);
    assert_eq!(rig.broker.subscriptions.len(), 1);
    let failed = rig
        .journal
        .events()
        .into_iter()
        .find_map(|e| match e {
            AppEvent::SubscribeFailed { topic, error } => Some((topic, error)),
            _ => None,
        })
        .expect("SubscribeFailed emitted");
    assert_eq!(failed.0.as_str(), "relay/led");
    assert_eq!(failed.1, TransportError::Status(-1));
    assert_eq!(rig.journal.count(&Record::Event(AppEvent::Started)), 1);
}

#[test]
fn custom_namespace_changes_every_subscription() {
    let mut rig = Rig::new();
    let mut config = RelayConfig::default();
    config.topics = TopicConfig::for_namespace("lab").unwrap();
    let mut relay = RelayService::new(config);

    relay.start(&mut rig.hw, &mut rig.broker, &mut rig.sink).unwrap();

    let topics: Vec<&str> = rig.broker.subscriptions.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(topics, ["lab/led", "lab/groups/default/json"]);
}
