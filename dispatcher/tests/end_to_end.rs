use std::thread;
use std::time::{Duration, Instant};

use bridge::{Bridge, BridgeSettings, BridgeState, Flow};
use crossbeam_channel::Receiver;
use dispatcher::{Dispatcher, DispatcherSettings, DispatcherState};
use network_rust::bus::{BusConnector, BusEvent};
use network_rust::local::{LocalBroker, LocalBus};
use shared_resources::direction::DoorStatus;
use shared_resources::fake::{FakeConnector, FakePlant};
use shared_resources::shutdown;

fn bridge_settings() -> BridgeSettings {
    BridgeSettings {
        poll_interval: Duration::from_millis(10),
        heartbeat_timeout: Duration::from_secs(2),
        reconnect_backoff: Duration::from_millis(10),
        connect_timeout: Duration::from_millis(100),
    }
}

fn dispatcher_settings() -> DispatcherSettings {
    DispatcherSettings {
        tick: Duration::from_millis(10),
        connect_timeout: Duration::from_millis(100),
        reconnect_backoff: Duration::from_millis(10),
    }
}

/// Both processes on one broker, driven by hand.
struct Pair {
    connector: FakeConnector,
    broker: LocalBroker,
    bridge: Bridge<FakeConnector>,
    bridge_bus: LocalBus,
    bridge_events: Receiver<BusEvent>,
    dispatcher: Dispatcher,
    dispatcher_bus: LocalBus,
    dispatcher_events: Receiver<BusEvent>,
}

impl Pair {
    fn new() -> Self {
        let connector = FakeConnector::new(FakePlant::new(5, 3, &[800]));
        let broker = LocalBroker::new();
        let (_trigger, shutdown) = shutdown::channel();

        let mut bridge = Bridge::new(connector.clone(), bridge_settings(), shutdown.clone()).unwrap();
        let (bridge_bus, bridge_events) = broker.connect(Duration::from_secs(1)).unwrap();
        bridge.bootstrap(&bridge_bus).unwrap();

        let mut dispatcher = Dispatcher::new(dispatcher_settings(), shutdown);
        let (dispatcher_bus, dispatcher_events) = broker.connect(Duration::from_secs(1)).unwrap();
        dispatcher.bootstrap(&dispatcher_bus).unwrap();

        let mut pair = Pair {
            connector,
            broker,
            bridge,
            bridge_bus,
            bridge_events,
            dispatcher,
            dispatcher_bus,
            dispatcher_events,
        };
        pair.settle();
        pair
    }

    /// Hands queued events to both sides until neither has anything left.
    fn settle(&mut self) {
        loop {
            let for_bridge: Vec<BusEvent> = self.bridge_events.try_iter().collect();
            let for_dispatcher: Vec<BusEvent> = self.dispatcher_events.try_iter().collect();
            if for_bridge.is_empty() && for_dispatcher.is_empty() {
                return;
            }
            for event in for_bridge {
                let flow = self.bridge.handle_event(&self.bridge_bus, &self.bridge_events, event).unwrap();
                assert_eq!(flow, Flow::Continue);
            }
            for event in for_dispatcher {
                self.dispatcher.handle_event(&self.dispatcher_bus, event).unwrap();
            }
        }
    }

    fn tick_dispatcher(&mut self) {
        self.dispatcher.handle_tick(&self.dispatcher_bus).unwrap();
        self.settle();
    }

    fn tick_bridge(&mut self) {
        let flow = self
            .bridge
            .handle_tick(&self.bridge_bus, &self.bridge_events, Instant::now())
            .unwrap();
        assert_eq!(flow, Flow::Continue);
        self.settle();
    }

    fn mirrored_call_up(&self, floor: usize) -> bool {
        self.dispatcher.mirror().building().unwrap().floors()[floor].button_up_pressed()
    }
}

#[test]
fn calls_made_while_only_the_dispatcher_was_away_reach_it() {
    let mut pair = Pair::new();
    assert_eq!(pair.dispatcher.state(), DispatcherState::Dispatching);
    pair.tick_dispatcher();
    pair.tick_bridge();
    assert_eq!(pair.bridge.state(), BridgeState::Ready);
    assert!(!pair.mirrored_call_up(3));

    pair.broker.set_session_online(&pair.dispatcher_bus, false);
    pair.settle();
    assert_eq!(pair.dispatcher.state(), DispatcherState::Disconnected);

    // The bridge keeps polling; this delta never reaches the dispatcher.
    pair.connector.plant().calls_up[3] = true;
    pair.tick_bridge();
    assert_eq!(pair.bridge.state(), BridgeState::Ready);

    pair.broker.set_session_online(&pair.dispatcher_bus, true);
    pair.settle();
    assert_eq!(pair.dispatcher.state(), DispatcherState::Dispatching);
    assert!(!pair.mirrored_call_up(3));

    let full_polls = pair.bridge.stats().full_polls;
    pair.tick_dispatcher();
    pair.tick_bridge();
    assert_eq!(pair.bridge.stats().full_polls, full_polls + 1);
    assert!(pair.mirrored_call_up(3));
}

#[test]
fn a_hall_call_is_served_through_the_bus() {
    let mut plant = FakePlant::new(5, 3, &[800, 800]);
    for car in plant.cars.iter_mut() {
        car.door_status = DoorStatus::Open;
    }
    let connector = FakeConnector::new(plant);
    let broker = LocalBroker::new();
    let (trigger, shutdown) = shutdown::channel();

    let bridge_settings = bridge_settings();
    let dispatcher_settings = dispatcher_settings();

    let bridge = {
        let (connector, broker, shutdown) = (connector.clone(), broker.clone(), shutdown.clone());
        thread::spawn(move || bridge::run(connector, broker, bridge_settings, shutdown, false))
    };
    let dispatcher = {
        let broker = broker.clone();
        thread::spawn(move || dispatcher::run(broker, dispatcher_settings, shutdown, false))
    };

    connector.plant().calls_up[3] = true;

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        {
            let mut plant = connector.plant();
            if !plant.calls_up[3] {
                assert!(plant.cars.iter().any(|car| car.current_floor == 3));
                break;
            }
            plant.step();
        }
        assert!(Instant::now() < deadline, "the call at floor 3 was never served");
        thread::sleep(Duration::from_millis(30));
    }

    trigger.trigger();
    assert!(bridge.join().unwrap().is_ok());
    assert!(dispatcher.join().unwrap().is_ok());
    assert_eq!(
        broker.retained("elevator_control/connection_status").as_deref(),
        Some("false")
    );
}
