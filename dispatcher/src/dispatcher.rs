/// ----- DISPATCHER MODULE -----
/// Runs the dispatch algorithm against the mirrored building. Bus events, the
/// dispatch timer and the shutdown signal are served from one `select!`, so
/// the mirror is only ever touched from this loop.

use std::time::Duration;

use crossbeam_channel::{select, tick, Receiver};
use log::{debug, info, warn};
use network_rust::bus::{connect_with_retry, BusConnector, BusError, BusEvent, BusMessage, MessageBus};
use shared_resources::config::Config;
use shared_resources::shutdown::Shutdown;
use shared_resources::status::StatusDisplay;
use shared_resources::topic::{filter, Topic};
use thiserror::Error;

use crate::algorithm;
use crate::state::{Applied, Mirror};

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("could not withdraw heartbeat on shutdown: {0}")]
    Withdraw(#[source] BusError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// No broker session.
    Disconnected,
    /// Subscribed, but the building layout is not known yet.
    WaitingForLayout,
    /// Heartbeat and commands go out every tick.
    Dispatching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherSettings {
    pub tick: Duration,
    pub connect_timeout: Duration,
    pub reconnect_backoff: Duration,
}

impl From<&Config> for DispatcherSettings {
    fn from(config: &Config) -> Self {
        DispatcherSettings {
            tick: config.tick(),
            connect_timeout: config.connect_timeout(),
            reconnect_backoff: config.reconnect_backoff(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub resolutions: usize,
    pub commands_sent: usize,
    pub facts_rejected: usize,
    pub rebuilds: usize,
}

pub struct Dispatcher {
    mirror: Mirror,
    state: DispatcherState,
    settings: DispatcherSettings,
    shutdown: Shutdown,
    stats: DispatcherStats,
    status: Option<StatusDisplay>,
}

impl Dispatcher {
    pub fn new(settings: DispatcherSettings, shutdown: Shutdown) -> Self {
        Dispatcher {
            mirror: Mirror::new(),
            state: DispatcherState::Disconnected,
            settings,
            shutdown,
            stats: DispatcherStats::default(),
            status: None,
        }
    }

    pub fn with_status_display(mut self) -> Self {
        self.status = Some(StatusDisplay::new());
        self
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn stats(&self) -> DispatcherStats {
        self.stats
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// Subscribes to every fact the bridge publishes. Retained layout facts
    /// are delivered right away by the broker; state facts published while
    /// this session was down are not, so the heartbeat goes `false` until the
    /// next tick and the bridge answers the edge with a full poll.
    pub fn bootstrap<B: MessageBus>(&mut self, bus: &B) -> Result<(), BusError> {
        for fact_filter in [filter::INFO, filter::ELEVATOR, filter::FLOOR] {
            bus.subscribe(fact_filter)?;
        }
        bus.publish_topic(&Topic::ConnectionStatus, "false")?;
        self.state = if self.mirror.building().is_some() {
            DispatcherState::Dispatching
        } else {
            DispatcherState::WaitingForLayout
        };
        debug!("Bootstrapped broker session");
        Ok(())
    }

    pub fn handle_event<B: MessageBus>(&mut self, bus: &B, event: BusEvent) -> Result<(), BusError> {
        match event {
            BusEvent::Connected => {
                info!("Broker connection restored");
                self.bootstrap(bus)?;
            }
            BusEvent::ConnectionLost(reason) => {
                if self.state != DispatcherState::Disconnected {
                    warn!("Lost broker connection: {}", reason);
                }
                self.state = DispatcherState::Disconnected;
            }
            BusEvent::Message(message) => self.handle_message(message),
        }
        Ok(())
    }

    fn handle_message(&mut self, message: BusMessage) {
        let topic: Topic = match message.topic.parse() {
            Ok(topic) => topic,
            Err(e) => {
                warn!("Ignoring message: {}", e);
                return;
            }
        };
        match self.mirror.apply(topic, &message.payload) {
            Ok(Applied::Built) => {
                if self.state == DispatcherState::WaitingForLayout {
                    info!("Layout complete, dispatching");
                    self.state = DispatcherState::Dispatching;
                }
            }
            Ok(Applied::Rebuilt) => {
                warn!("Layout changed on `{}`, rebuilt the building model", message.topic);
                self.stats.rebuilds += 1;
            }
            Ok(Applied::Fact { .. }) | Ok(Applied::Ignored) => {}
            Err(e) => {
                warn!("Rejected fact on `{}`: {}", message.topic, e);
                self.stats.facts_rejected += 1;
            }
        }
    }

    /// One dispatch tick: heartbeat, then one resolution pass.
    pub fn handle_tick<B: MessageBus>(&mut self, bus: &B) -> Result<(), BusError> {
        if self.state != DispatcherState::Dispatching {
            return Ok(());
        }
        let building = match self.mirror.building() {
            Some(building) => building,
            None => return Ok(()),
        };
        bus.publish_topic(&Topic::ConnectionStatus, "true")?;

        let dispatches = algorithm::resolve(building);
        for dispatch in dispatches.iter() {
            bus.publish_topic(&dispatch.command.topic(dispatch.elevator), &dispatch.command.payload())?;
        }
        self.stats.resolutions += 1;
        self.stats.commands_sent += dispatches.len();

        if let Some(status) = self.status.as_mut() {
            if let Err(e) = status.print(building) {
                warn!("Status display failed: {}", e);
            }
        }
        Ok(())
    }

    /// Tells the bridge to stop polling without waiting for the heartbeat to
    /// go stale.
    pub fn withdraw<B: MessageBus>(&mut self, bus: &B) -> Result<(), BusError> {
        bus.publish_topic(&Topic::ConnectionStatus, "false")?;
        info!("Heartbeat withdrawn");
        Ok(())
    }

    /// Serves one broker session until shutdown (`Ok`) or until the session
    /// breaks (`Err`).
    pub fn run_session<B: MessageBus>(&mut self, bus: &B, events: &Receiver<BusEvent>) -> Result<(), BusError> {
        self.bootstrap(bus)?;
        let ticker = tick(self.settings.tick);
        let shutdown = self.shutdown.receiver().clone();

        loop {
            select! {
                recv(events) -> event => match event {
                    Ok(event) => self.handle_event(bus, event)?,
                    Err(_) => return Err(BusError::Closed),
                },
                recv(ticker) -> _ => self.handle_tick(bus)?,
                recv(shutdown) -> _ => return Ok(()),
            }
        }
    }
}

/// Runs the dispatcher until shutdown, keeping a broker session alive and
/// reconnecting whenever it breaks.
pub fn run<C: BusConnector>(
    broker: C,
    settings: DispatcherSettings,
    shutdown: Shutdown,
    show_status: bool,
) -> Result<(), DispatcherError> {
    let mut dispatcher = Dispatcher::new(settings, shutdown.clone());
    if show_status {
        dispatcher = dispatcher.with_status_display();
    }

    while let Some((bus, events)) =
        connect_with_retry(&broker, settings.connect_timeout, settings.reconnect_backoff, &shutdown)
    {
        match dispatcher.run_session(&bus, &events) {
            Ok(()) => {
                dispatcher.withdraw(&bus).map_err(DispatcherError::Withdraw)?;
                break;
            }
            Err(e) => {
                warn!("Broker session ended: {}", e);
                dispatcher.state = DispatcherState::Disconnected;
            }
        }
        if shutdown.is_requested() {
            break;
        }
    }
    info!("Dispatcher stopped");
    Ok(())
}
