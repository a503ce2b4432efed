/// ----- ADAPTER MODULE -----
/// Keeps the controller mirrored onto the bus across broker and controller
/// outages. One event loop owns the mirror: bus events, the poll timer and
/// the shutdown signal are all served from the same `select!`, so the poll
/// path and the command path never run at the same time.

use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick, Receiver};
use log::{debug, error, info, warn};
use network_rust::bus::{connect_with_retry, BusConnector, BusError, BusEvent, BusMessage, MessageBus};
use shared_resources::command::Command;
use shared_resources::config::Config;
use shared_resources::controller::{Connector, ControllerError};
use shared_resources::fact;
use shared_resources::shutdown::Shutdown;
use shared_resources::status::StatusDisplay;
use shared_resources::topic::{filter, Topic};
use thiserror::Error;

use crate::control_system::{ControlSystem, ReplicationError};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("controller unavailable at startup: {0}")]
    Startup(#[from] ReplicationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// No broker session.
    Disconnected,
    /// Retained facts are out and subscriptions are in place; waiting for a
    /// fresh dispatcher heartbeat.
    Bootstrapped,
    /// Polling and publishing.
    Ready,
    ReconnectingController,
}

/// Whether the event loop keeps going after handling something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSettings {
    pub poll_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub reconnect_backoff: Duration,
    pub connect_timeout: Duration,
}

impl From<&Config> for BridgeSettings {
    fn from(config: &Config) -> Self {
        BridgeSettings {
            poll_interval: config.poll_interval(),
            heartbeat_timeout: config.heartbeat_timeout(),
            reconnect_backoff: config.reconnect_backoff(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub full_polls: usize,
    pub delta_polls: usize,
    pub controller_reconnects: usize,
    pub commands_forwarded: usize,
    pub commands_discarded: usize,
}

/// Last liveness fact seen from the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    alive: bool,
    last_seen: Option<Instant>,
    timeout: Duration,
}

impl Heartbeat {
    pub fn new(timeout: Duration) -> Self {
        Heartbeat { alive: false, last_seen: None, timeout }
    }

    /// Records a live heartbeat. Returns whether the dispatcher just came
    /// (back) alive.
    pub fn observe(&mut self, alive: bool, now: Instant) -> bool {
        let revived = alive && !self.alive;
        self.alive = alive;
        self.last_seen = Some(now);
        revived
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        match self.last_seen {
            Some(seen) => self.alive && now.saturating_duration_since(seen) < self.timeout,
            None => false,
        }
    }
}

pub struct Bridge<K: Connector> {
    connector: K,
    control: ControlSystem<K::Controller>,
    state: BridgeState,
    heartbeat: Heartbeat,
    /// Next poll must be a full one.
    baseline_pending: bool,
    settings: BridgeSettings,
    shutdown: Shutdown,
    stats: BridgeStats,
    status: Option<StatusDisplay>,
}

impl<K: Connector> Bridge<K> {
    /// Connects to the controller and reads its layout. Failing here is fatal.
    pub fn new(connector: K, settings: BridgeSettings, shutdown: Shutdown) -> Result<Self, BridgeError> {
        let controller = connector.connect().map_err(ReplicationError::from)?;
        let control = ControlSystem::initialize(controller)?;
        info!(
            "Controller has {} elevators and {} floors",
            control.building().num_elevators(),
            control.building().num_floors()
        );

        Ok(Bridge {
            connector,
            control,
            state: BridgeState::Disconnected,
            heartbeat: Heartbeat::new(settings.heartbeat_timeout),
            baseline_pending: true,
            settings,
            shutdown,
            stats: BridgeStats::default(),
            status: None,
        })
    }

    pub fn with_status_display(mut self) -> Self {
        self.status = Some(StatusDisplay::new());
        self
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn control(&self) -> &ControlSystem<K::Controller> {
        &self.control
    }

    /// Publishes the retained layout facts and subscribes to commands and the
    /// heartbeat.
    pub fn bootstrap<B: MessageBus>(&mut self, bus: &B) -> Result<(), BusError> {
        for (topic, value) in self.control.retained_facts() {
            bus.publish_topic(&topic, &value.to_string())?;
        }
        for command_filter in filter::COMMANDS {
            bus.subscribe(command_filter)?;
        }
        bus.subscribe(filter::CONNECTION_STATUS)?;
        self.state = BridgeState::Bootstrapped;
        self.baseline_pending = true;
        debug!("Bootstrapped broker session");
        Ok(())
    }

    pub fn handle_event<B: MessageBus>(
        &mut self,
        bus: &B,
        events: &Receiver<BusEvent>,
        event: BusEvent,
    ) -> Result<Flow, BusError> {
        match event {
            BusEvent::Connected => {
                if self.state == BridgeState::ReconnectingController {
                    debug!("Broker reconnected during controller reconnect, bootstrap follows");
                    return Ok(Flow::Continue);
                }
                info!("Broker connection restored");
                self.bootstrap(bus)?;
            }
            BusEvent::ConnectionLost(reason) => {
                if self.state != BridgeState::Disconnected {
                    warn!("Lost broker connection: {}", reason);
                }
                self.state = BridgeState::Disconnected;
            }
            BusEvent::Message(message) => return self.handle_message(bus, events, message),
        }
        Ok(Flow::Continue)
    }

    fn handle_message<B: MessageBus>(
        &mut self,
        bus: &B,
        events: &Receiver<BusEvent>,
        message: BusMessage,
    ) -> Result<Flow, BusError> {
        let topic: Topic = match message.topic.parse() {
            Ok(topic) => topic,
            Err(e) => {
                warn!("Ignoring message: {}", e);
                return Ok(Flow::Continue);
            }
        };
        match topic {
            Topic::ConnectionStatus => match fact::parse_bool(&message.payload) {
                // A retained `true` may be left over from a dispatcher that is gone.
                Ok(true) if message.retained => debug!("Waiting for a live heartbeat"),
                Ok(alive) => {
                    if self.heartbeat.observe(alive, Instant::now()) {
                        debug!("Dispatcher (re)joined, next poll is full");
                        self.baseline_pending = true;
                    }
                }
                Err(e) => warn!("Ignoring heartbeat: {}", e),
            },
            Topic::Control(elevator, subtopic) => {
                let command = match Command::parse(subtopic, &message.payload) {
                    Ok(command) => command,
                    Err(e) => {
                        warn!("Discarding command on `{}`: {}", message.topic, e);
                        self.stats.commands_discarded += 1;
                        return Ok(Flow::Continue);
                    }
                };
                return self.forward_command(bus, events, elevator, command);
            }
            other => debug!("Ignoring fact on `{}`", other),
        }
        Ok(Flow::Continue)
    }

    fn forward_command<B: MessageBus>(
        &mut self,
        bus: &B,
        events: &Receiver<BusEvent>,
        elevator: usize,
        command: Command,
    ) -> Result<Flow, BusError> {
        match self.state {
            BridgeState::Bootstrapped | BridgeState::Ready => {}
            state => {
                info!("Discarding {:?} for elevator {} while {:?}", command, elevator, state);
                self.stats.commands_discarded += 1;
                return Ok(Flow::Continue);
            }
        }
        match self.control.apply_command(elevator, command) {
            Ok(()) => {
                self.stats.commands_forwarded += 1;
                Ok(Flow::Continue)
            }
            Err(ReplicationError::Validation(e)) => {
                warn!("Discarding {:?} for elevator {}: {}", command, elevator, e);
                self.stats.commands_discarded += 1;
                Ok(Flow::Continue)
            }
            Err(ReplicationError::Controller(e)) => {
                self.stats.commands_discarded += 1;
                self.controller_fault(bus, events, e)
            }
        }
    }

    /// One timer tick: gate on the heartbeat, then poll and publish.
    pub fn handle_tick<B: MessageBus>(
        &mut self,
        bus: &B,
        events: &Receiver<BusEvent>,
        now: Instant,
    ) -> Result<Flow, BusError> {
        match self.state {
            BridgeState::Disconnected | BridgeState::ReconnectingController => return Ok(Flow::Continue),
            BridgeState::Bootstrapped => {
                if !self.heartbeat.is_fresh(now) {
                    return Ok(Flow::Continue);
                }
                info!("Dispatcher is alive, starting to poll");
                self.state = BridgeState::Ready;
                self.baseline_pending = true;
            }
            BridgeState::Ready => {
                if !self.heartbeat.is_fresh(now) {
                    warn!("Dispatcher heartbeat is stale, pausing polls");
                    self.state = BridgeState::Bootstrapped;
                    return Ok(Flow::Continue);
                }
            }
        }
        match self.poll_and_publish(bus)? {
            None => Ok(Flow::Continue),
            Some(e) => self.controller_fault(bus, events, e),
        }
    }

    /// Publishes one poll. A controller fault is handed back to the caller.
    fn poll_and_publish<B: MessageBus>(&mut self, bus: &B) -> Result<Option<ControllerError>, BusError> {
        let full = self.baseline_pending;
        let polled = if full { self.control.poll_full() } else { self.control.poll_delta() };
        let facts = match polled {
            Ok(facts) => facts,
            Err(ReplicationError::Validation(e)) => {
                warn!("Poll aborted: {}", e);
                self.baseline_pending = true;
                return Ok(None);
            }
            Err(ReplicationError::Controller(e)) => return Ok(Some(e)),
        };

        // The mirror already moved on; until every fact is out only a full
        // poll can catch subscribers up.
        self.baseline_pending = true;
        for (topic, value) in facts.iter() {
            bus.publish_topic(topic, &value.to_string())?;
        }
        self.baseline_pending = false;

        if full {
            self.stats.full_polls += 1;
            debug!("Published full state, {} facts", facts.len());
        } else {
            self.stats.delta_polls += 1;
        }
        if let Some(status) = self.status.as_mut() {
            if let Err(e) = status.print(self.control.building()) {
                warn!("Status display failed: {}", e);
            }
        }
        Ok(None)
    }

    /// Entry point for controller faults from both the poll and the command
    /// path. The `ReconnectingController` state makes this a no-op while a
    /// reconnect is already under way.
    fn controller_fault<B: MessageBus>(
        &mut self,
        bus: &B,
        events: &Receiver<BusEvent>,
        fault: ControllerError,
    ) -> Result<Flow, BusError> {
        if self.state == BridgeState::ReconnectingController {
            debug!("Controller fault during reconnect: {}", fault);
            return Ok(Flow::Continue);
        }
        error!("Controller fault: {}", fault);
        self.state = BridgeState::ReconnectingController;
        self.reconnect_controller(bus, events)
    }

    fn reconnect_controller<B: MessageBus>(&mut self, bus: &B, events: &Receiver<BusEvent>) -> Result<Flow, BusError> {
        let mut attempt: u32 = 1;
        loop {
            for command_filter in filter::COMMANDS {
                if let Err(e) = bus.unsubscribe(command_filter) {
                    warn!("{}", e);
                }
            }
            info!("Reconnecting to controller, attempt {}", attempt);
            let reacquired = self
                .connector
                .connect()
                .map_err(ReplicationError::from)
                .and_then(ControlSystem::initialize);
            match reacquired {
                Ok(control) => {
                    self.control = control;
                    self.stats.controller_reconnects += 1;
                    if let Flow::Stop = self.resume(bus, events)? {
                        return Ok(Flow::Stop);
                    }
                    if self.state != BridgeState::ReconnectingController {
                        info!("Reconnected to controller");
                        return Ok(Flow::Continue);
                    }
                }
                Err(e) => warn!("Failed to reconnect to controller: {}", e),
            }
            if self.shutdown.wait(self.settings.reconnect_backoff) {
                info!("Shutdown requested, controller reconnect aborted");
                return Ok(Flow::Stop);
            }
            attempt += 1;
        }
    }

    /// After a new controller handle: drop queued commands, bootstrap again
    /// and publish a baseline. Leaves the state at `ReconnectingController`
    /// if the new handle fails right away.
    fn resume<B: MessageBus>(&mut self, bus: &B, events: &Receiver<BusEvent>) -> Result<Flow, BusError> {
        let queued: Vec<BusEvent> = events.try_iter().collect();
        for event in queued {
            if let Flow::Stop = self.handle_event(bus, events, event)? {
                return Ok(Flow::Stop);
            }
        }
        if self.state == BridgeState::Disconnected {
            return Ok(Flow::Continue);
        }

        self.bootstrap(bus)?;
        if !self.heartbeat.is_fresh(Instant::now()) {
            return Ok(Flow::Continue);
        }
        self.state = BridgeState::Ready;
        if let Some(e) = self.poll_and_publish(bus)? {
            warn!("Controller failed again after reconnect: {}", e);
            self.state = BridgeState::ReconnectingController;
        }
        Ok(Flow::Continue)
    }

    /// Serves one broker session until shutdown (`Ok`) or until the session
    /// breaks (`Err`).
    pub fn run_session<B: MessageBus>(&mut self, bus: &B, events: &Receiver<BusEvent>) -> Result<(), BusError> {
        self.bootstrap(bus)?;
        let ticker = tick(self.settings.poll_interval);
        let shutdown = self.shutdown.receiver().clone();

        loop {
            let flow = select! {
                recv(events) -> event => match event {
                    Ok(event) => self.handle_event(bus, events, event)?,
                    Err(_) => return Err(BusError::Closed),
                },
                recv(ticker) -> _ => self.handle_tick(bus, events, Instant::now())?,
                recv(shutdown) -> _ => Flow::Stop,
            };
            if flow == Flow::Stop {
                return Ok(());
            }
        }
    }
}

/// Runs the bridge until shutdown: connect to the controller, then keep a
/// broker session alive, reconnecting whenever it breaks.
pub fn run<K, C>(
    connector: K,
    broker: C,
    settings: BridgeSettings,
    shutdown: Shutdown,
    show_status: bool,
) -> Result<(), BridgeError>
where
    K: Connector,
    C: BusConnector,
{
    let mut bridge = Bridge::new(connector, settings, shutdown.clone())?;
    if show_status {
        bridge = bridge.with_status_display();
    }

    while let Some((bus, events)) =
        connect_with_retry(&broker, settings.connect_timeout, settings.reconnect_backoff, &shutdown)
    {
        match bridge.run_session(&bus, &events) {
            Ok(()) => break,
            Err(e) => {
                warn!("Broker session ended: {}", e);
                bridge.state = BridgeState::Disconnected;
            }
        }
        if shutdown.is_requested() {
            break;
        }
    }
    info!("Bridge stopped");
    Ok(())
}
