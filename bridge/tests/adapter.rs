use std::thread;
use std::time::{Duration, Instant};

use bridge::{Bridge, BridgeSettings, BridgeState, Flow};
use crossbeam_channel::Receiver;
use network_rust::bus::{BusConnector, BusEvent};
use network_rust::local::{LocalBroker, LocalBus};
use shared_resources::fake::{FakeConnector, FakePlant};
use shared_resources::shutdown::{self, ShutdownTrigger};

const HEARTBEAT: &str = "elevator_control/connection_status";

fn settings() -> BridgeSettings {
    BridgeSettings {
        poll_interval: Duration::from_millis(10),
        heartbeat_timeout: Duration::from_secs(2),
        reconnect_backoff: Duration::from_millis(10),
        connect_timeout: Duration::from_millis(100),
    }
}

struct Harness {
    connector: FakeConnector,
    broker: LocalBroker,
    bridge: Bridge<FakeConnector>,
    bus: LocalBus,
    events: Receiver<BusEvent>,
    trigger: ShutdownTrigger,
}

impl Harness {
    fn new() -> Self {
        Harness::with_broker(LocalBroker::new())
    }

    fn with_broker(broker: LocalBroker) -> Self {
        let connector = FakeConnector::new(FakePlant::new(4, 3, &[800, 1000]));
        let (trigger, shutdown) = shutdown::channel();
        let mut bridge = Bridge::new(connector.clone(), settings(), shutdown).unwrap();
        let (bus, events) = broker.connect(Duration::from_secs(1)).unwrap();
        bridge.bootstrap(&bus).unwrap();
        Harness { connector, broker, bridge, bus, events, trigger }
    }

    /// Feeds every queued bus event to the bridge.
    fn pump(&mut self) {
        let pending: Vec<BusEvent> = self.events.try_iter().collect();
        for event in pending {
            let flow = self.bridge.handle_event(&self.bus, &self.events, event).unwrap();
            assert_eq!(flow, Flow::Continue);
        }
    }

    fn tick(&mut self) -> Flow {
        self.bridge.handle_tick(&self.bus, &self.events, Instant::now()).unwrap()
    }

    fn heartbeat(&mut self, alive: bool) {
        self.broker.inject(HEARTBEAT, &alive.to_string(), true);
        self.pump();
    }

    /// Heartbeat plus the first, full poll.
    fn ready(mut self) -> Self {
        self.heartbeat(true);
        self.tick();
        assert_eq!(self.bridge.state(), BridgeState::Ready);
        self.broker.clear_history();
        self
    }

    /// What the bridge itself published since the last `clear_history`.
    fn published(&self) -> Vec<(String, String)> {
        self.broker
            .history()
            .into_iter()
            .filter(|p| !p.topic.starts_with("elevator_control/"))
            .map(|p| (p.topic, p.payload))
            .collect()
    }
}

#[test]
fn bootstrap_publishes_retained_layout() {
    let harness = Harness::new();
    assert_eq!(harness.bridge.state(), BridgeState::Bootstrapped);
    assert_eq!(harness.broker.retained("info/num_of_elevators").as_deref(), Some("2"));
    assert_eq!(harness.broker.retained("info/num_of_floors").as_deref(), Some("4"));
    assert_eq!(harness.broker.retained("info/floor_height").as_deref(), Some("3"));
    assert_eq!(harness.broker.retained("elevator/1/capacity").as_deref(), Some("1000"));
    assert!(harness.broker.history().iter().all(|p| p.retain));
}

#[test]
fn polling_waits_for_the_dispatcher() {
    let mut harness = Harness::new();
    harness.tick();
    harness.tick();
    assert_eq!(harness.bridge.state(), BridgeState::Bootstrapped);
    assert_eq!(harness.bridge.stats().full_polls, 0);
    assert_eq!(harness.broker.history().len(), 5);
}

#[test]
fn first_poll_is_full_then_deltas() {
    let mut harness = Harness::new();
    harness.heartbeat(true);
    harness.broker.clear_history();

    harness.tick();
    assert_eq!(harness.bridge.state(), BridgeState::Ready);
    assert_eq!(harness.bridge.stats().full_polls, 1);
    let published = harness.published();
    assert_eq!(published.len(), 2 * (7 + 2 * 4) + 2 * 4);
    assert!(published.contains(&("elevator/0/door_status".to_string(), "2".to_string())));
    assert!(published.contains(&("floor/3/button_up".to_string(), "false".to_string())));

    harness.broker.clear_history();
    harness.tick();
    assert_eq!(harness.bridge.stats().delta_polls, 1);
    assert!(harness.published().is_empty());

    harness.connector.plant().cars[1].speed = 4;
    harness.tick();
    assert_eq!(harness.published(), vec![("elevator/1/speed".to_string(), "4".to_string())]);
}

#[test]
fn stale_heartbeat_pauses_polling_until_a_fresh_one() {
    let mut harness = Harness::new().ready();

    let later = Instant::now() + Duration::from_secs(3);
    for _ in 0..2 {
        harness.bridge.handle_tick(&harness.bus, &harness.events, later).unwrap();
        assert_eq!(harness.bridge.state(), BridgeState::Bootstrapped);
    }
    assert!(harness.published().is_empty());

    harness.heartbeat(true);
    harness.tick();
    assert_eq!(harness.bridge.state(), BridgeState::Ready);
    assert_eq!(harness.bridge.stats().full_polls, 2);
}

#[test]
fn leftover_retained_heartbeat_does_not_start_polling() {
    let broker = LocalBroker::new();
    broker.inject(HEARTBEAT, "true", true);
    let mut harness = Harness::with_broker(broker);
    harness.pump();
    harness.tick();
    assert_eq!(harness.bridge.state(), BridgeState::Bootstrapped);
    assert_eq!(harness.bridge.stats().full_polls, 0);

    harness.heartbeat(true);
    harness.tick();
    assert_eq!(harness.bridge.state(), BridgeState::Ready);
    assert_eq!(harness.bridge.stats().full_polls, 1);
}

#[test]
fn rejoining_dispatcher_gets_a_full_poll() {
    let mut harness = Harness::new().ready();
    harness.tick();
    assert_eq!(harness.bridge.stats().delta_polls, 1);

    // Withdrawn and renewed between two ticks.
    harness.heartbeat(false);
    harness.heartbeat(true);
    harness.tick();
    assert_eq!(harness.bridge.state(), BridgeState::Ready);
    assert_eq!(harness.bridge.stats().full_polls, 2);
    assert!(harness.published().contains(&("floor/3/button_up".to_string(), "false".to_string())));
}

#[test]
fn withdrawn_heartbeat_stops_polling_at_once() {
    let mut harness = Harness::new().ready();
    harness.heartbeat(false);
    harness.tick();
    assert_eq!(harness.bridge.state(), BridgeState::Bootstrapped);
    assert!(harness.published().is_empty());
}

#[test]
fn commands_are_forwarded_to_the_controller() {
    let mut harness = Harness::new().ready();
    harness.broker.inject("elevator_control/1/target_floor", "3", false);
    harness.broker.inject("elevator_control/1/direction", "0", false);
    harness.pump();

    {
        let plant = harness.connector.plant();
        assert_eq!(plant.cars[1].target_floor, 3);
        assert_eq!(plant.cars[1].direction, shared_resources::direction::Direction::Up);
    }
    assert_eq!(harness.bridge.stats().commands_forwarded, 2);

    harness.tick();
    let published = harness.published();
    assert!(published.contains(&("elevator/1/target_floor".to_string(), "3".to_string())));
    assert!(published.contains(&("elevator/1/direction".to_string(), "0".to_string())));
}

#[test]
fn malformed_commands_are_discarded() {
    let mut harness = Harness::new().ready();
    harness.broker.inject("elevator_control/0/target_floor", "4", false);
    harness.broker.inject("elevator_control/7/target_floor", "1", false);
    harness.broker.inject("elevator_control/0/direction", "9", false);
    harness.broker.inject("elevator_control/0/direction", "up", false);
    harness.pump();

    assert_eq!(harness.bridge.stats().commands_discarded, 4);
    assert_eq!(harness.bridge.stats().commands_forwarded, 0);
    assert_eq!(harness.bridge.state(), BridgeState::Ready);
}

#[test]
fn one_fault_seen_by_poll_and_command_paths_reconnects_once() {
    let mut harness = Harness::new().ready();
    harness.connector.plant().online = false;
    // Queued behind the failing tick.
    harness.broker.inject("elevator_control/0/target_floor", "2", false);

    assert_eq!(harness.tick(), Flow::Continue);
    harness.pump();

    let stats = harness.bridge.stats();
    assert_eq!(stats.controller_reconnects, 1);
    assert_eq!(stats.commands_forwarded, 0);
    assert_eq!(stats.commands_discarded, 1);
    assert_eq!(stats.full_polls, 2);
    assert_eq!(harness.bridge.state(), BridgeState::Ready);
    assert_eq!(harness.connector.plant().connects, 2);
    assert_eq!(harness.connector.plant().cars[0].target_floor, 0);
}

#[test]
fn command_path_fault_reconnects() {
    let mut harness = Harness::new().ready();
    harness.connector.plant().online = false;
    harness.broker.inject("elevator_control/1/direction", "1", false);
    harness.pump();

    assert_eq!(harness.bridge.stats().controller_reconnects, 1);
    assert_eq!(harness.bridge.state(), BridgeState::Ready);
    assert!(harness.broker.history().iter().any(|p| p.topic == "info/num_of_elevators"));

    // Commands flow again once resubscribed.
    harness.broker.inject("elevator_control/1/direction", "1", false);
    harness.pump();
    assert_eq!(harness.bridge.stats().commands_forwarded, 1);
}

#[test]
fn refused_reconnects_back_off_and_retry() {
    let mut harness = Harness::new().ready();
    {
        let mut plant = harness.connector.plant();
        plant.online = false;
        plant.refuse_connects = 3;
    }
    harness.tick();

    assert_eq!(harness.bridge.stats().controller_reconnects, 1);
    assert_eq!(harness.connector.plant().refuse_connects, 0);
    assert_eq!(harness.bridge.state(), BridgeState::Ready);
}

#[test]
fn shutdown_interrupts_the_reconnect_backoff() {
    let mut harness = Harness::new().ready();
    {
        let mut plant = harness.connector.plant();
        plant.online = false;
        plant.refuse_connects = usize::MAX;
    }
    harness.trigger.trigger();

    assert_eq!(harness.tick(), Flow::Stop);
    assert_eq!(harness.bridge.stats().controller_reconnects, 0);
}

#[test]
fn validation_fault_makes_the_next_poll_full() {
    let mut harness = Harness::new().ready();
    harness.connector.plant().cars[0].weight = -5;
    harness.tick();
    assert!(harness.published().is_empty());

    harness.connector.plant().cars[0].weight = 90;
    harness.tick();
    assert_eq!(harness.bridge.stats().full_polls, 2);
    assert!(harness.published().len() > 1);
}

#[test]
fn broker_outage_pauses_polls_and_rebootstraps() {
    let mut harness = Harness::new().ready();
    harness.broker.set_online(false);
    harness.pump();
    assert_eq!(harness.bridge.state(), BridgeState::Disconnected);
    harness.tick();
    assert!(harness.published().is_empty());

    harness.broker.set_online(true);
    // Connected, then the retained heartbeat from the renewed subscription,
    // which does not count as a live one.
    harness.pump();
    harness.pump();
    assert_eq!(harness.bridge.state(), BridgeState::Bootstrapped);

    harness.tick();
    assert_eq!(harness.bridge.state(), BridgeState::Ready);
    assert_eq!(harness.bridge.stats().full_polls, 2);
}

#[test]
fn run_serves_sessions_until_shutdown() {
    let connector = FakeConnector::new(FakePlant::new(3, 3, &[800]));
    let broker = LocalBroker::new();
    broker.inject(HEARTBEAT, "true", true);
    let (trigger, shutdown) = shutdown::channel();

    let handle = {
        let connector = connector.clone();
        let broker = broker.clone();
        thread::spawn(move || bridge::run(connector, broker, settings(), shutdown, false))
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while !broker.history().iter().any(|p| p.topic == "elevator/0/door_status") {
        assert!(Instant::now() < deadline, "bridge never published state");
        broker.inject(HEARTBEAT, "true", true);
        thread::sleep(Duration::from_millis(10));
    }

    // A closed session is reopened.
    broker.drop_sessions();
    while broker.session_count() == 0 {
        assert!(Instant::now() < deadline, "bridge never reconnected");
        thread::sleep(Duration::from_millis(10));
    }

    trigger.trigger();
    assert!(handle.join().unwrap().is_ok());
}
