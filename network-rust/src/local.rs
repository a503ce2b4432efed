/// ----- LOCAL BROKER -----
/// An in-process broker with retained messages, used to run bridge and
/// dispatcher against each other without a network. Going offline tells
/// every session `ConnectionLost` and fails publishes; coming back online
/// tells them `Connected` with their subscriptions dropped, as a broker with
/// clean sessions would. A single session can be cut off the same way.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::bus::{topic_matches, BusConnector, BusError, BusEvent, BusMessage, MessageBus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

struct Session {
    events: Sender<BusEvent>,
    filters: Vec<String>,
    online: bool,
}

#[derive(Default)]
struct BrokerState {
    online: bool,
    next_id: u64,
    connect_attempts: usize,
    sessions: HashMap<u64, Session>,
    retained: BTreeMap<String, String>,
    history: Vec<Published>,
}

#[derive(Clone)]
pub struct LocalBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl LocalBroker {
    pub fn new() -> Self {
        let state = BrokerState { online: true, ..BrokerState::default() };
        LocalBroker { state: Arc::new(Mutex::new(state)) }
    }

    pub fn set_online(&self, online: bool) {
        let mut state = self.state.lock();
        if state.online == online {
            return;
        }
        state.online = online;
        for session in state.sessions.values_mut().filter(|session| session.online) {
            let event = if online {
                session.filters.clear();
                BusEvent::Connected
            } else {
                BusEvent::ConnectionLost("broker went offline".to_string())
            };
            let _ = session.events.send(event);
        }
    }

    /// Cuts one session off, or brings it back with its subscriptions
    /// dropped. Every other session keeps running.
    pub fn set_session_online(&self, bus: &LocalBus, online: bool) {
        let mut state = self.state.lock();
        let session = match state.sessions.get_mut(&bus.id) {
            Some(session) if session.online != online => session,
            _ => return,
        };
        session.online = online;
        let event = if online {
            session.filters.clear();
            BusEvent::Connected
        } else {
            BusEvent::ConnectionLost("session dropped by broker".to_string())
        };
        let _ = session.events.send(event);
    }

    /// Closes every session's event channel, as when a client gives up.
    pub fn drop_sessions(&self) {
        self.state.lock().sessions.clear();
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().connect_attempts
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().sessions.len()
    }

    pub fn retained(&self, topic: &str) -> Option<String> {
        self.state.lock().retained.get(topic).cloned()
    }

    pub fn history(&self) -> Vec<Published> {
        self.state.lock().history.clone()
    }

    pub fn clear_history(&self) {
        self.state.lock().history.clear();
    }

    /// Publishes from outside any session, e.g. a test standing in for a peer.
    pub fn inject(&self, topic: &str, payload: &str, retain: bool) {
        self.state.lock().deliver(topic, payload, retain);
    }
}

impl Default for LocalBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerState {
    fn deliver(&mut self, topic: &str, payload: &str, retain: bool) {
        if retain {
            self.retained.insert(topic.to_string(), payload.to_string());
        }
        self.history.push(Published {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });
        for session in self.sessions.values().filter(|session| self.online && session.online) {
            if session.filters.iter().any(|filter| topic_matches(filter, topic)) {
                let _ = session.events.send(BusEvent::Message(BusMessage {
                    topic: topic.to_string(),
                    payload: payload.to_string(),
                    retained: false,
                }));
            }
        }
    }

    fn session(&mut self, id: u64) -> Option<&mut Session> {
        if !self.online {
            return None;
        }
        self.sessions.get_mut(&id).filter(|session| session.online)
    }
}

impl BusConnector for LocalBroker {
    type Bus = LocalBus;

    fn connect(&self, _timeout: Duration) -> Result<(LocalBus, Receiver<BusEvent>), BusError> {
        let mut state = self.state.lock();
        state.connect_attempts += 1;
        if !state.online {
            return Err(BusError::Connect("broker offline".to_string()));
        }
        let id = state.next_id;
        state.next_id += 1;

        let (events_tx, events_rx) = unbounded();
        state.sessions.insert(id, Session { events: events_tx, filters: Vec::new(), online: true });

        Ok((LocalBus { id, state: Arc::clone(&self.state) }, events_rx))
    }
}

pub struct LocalBus {
    id: u64,
    state: Arc<Mutex<BrokerState>>,
}

impl MessageBus for LocalBus {
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), BusError> {
        let mut state = self.state.lock();
        if state.session(self.id).is_none() {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                reason: "not connected".to_string(),
            });
        }
        state.deliver(topic, payload, retain);
        Ok(())
    }

    fn subscribe(&self, filter: &str) -> Result<(), BusError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let not_connected = || BusError::Subscribe {
            filter: filter.to_string(),
            reason: "not connected".to_string(),
        };
        if !state.online {
            return Err(not_connected());
        }
        let session = state
            .sessions
            .get_mut(&self.id)
            .filter(|session| session.online)
            .ok_or_else(not_connected)?;
        if !session.filters.iter().any(|f| f == filter) {
            session.filters.push(filter.to_string());
        }
        for (topic, payload) in state.retained.iter() {
            if topic_matches(filter, topic) {
                let _ = session.events.send(BusEvent::Message(BusMessage {
                    topic: topic.clone(),
                    payload: payload.clone(),
                    retained: true,
                }));
            }
        }
        Ok(())
    }

    fn unsubscribe(&self, filter: &str) -> Result<(), BusError> {
        let mut state = self.state.lock();
        let session = state.session(self.id).ok_or_else(|| BusError::Subscribe {
            filter: filter.to_string(),
            reason: "not connected".to_string(),
        })?;
        session.filters.retain(|f| f != filter);
        Ok(())
    }
}

impl Drop for LocalBus {
    fn drop(&mut self) {
        self.state.lock().sessions.remove(&self.id);
    }
}
