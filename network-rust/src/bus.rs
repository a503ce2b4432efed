/// ----- MESSAGE BUS -----
/// The publish/subscribe seam shared by the bridge and the dispatcher. The
/// MQTT client is the production implementation, `local::LocalBroker` the
/// in-process one used by tests.

use std::time::Duration;

use crossbeam_channel::Receiver;
use log::{info, warn};
use shared_resources::shutdown::Shutdown;
use shared_resources::topic::Topic;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
    /// Replayed from the broker's retained store on subscribe rather than
    /// forwarded from a live publish.
    pub retained: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// The broker acknowledged a (re)connection. Subscriptions do not survive
    /// a reconnect and must be renewed.
    Connected,
    ConnectionLost(String),
    Message(BusMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("could not connect to broker: {0}")]
    Connect(String),
    #[error("no answer from broker within {0:?}")]
    Timeout(Duration),
    #[error("publish to `{topic}` failed: {reason}")]
    Publish { topic: String, reason: String },
    #[error("subscription change for `{filter}` failed: {reason}")]
    Subscribe { filter: String, reason: String },
    #[error("broker session closed")]
    Closed,
}

pub trait MessageBus {
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), BusError>;
    fn subscribe(&self, filter: &str) -> Result<(), BusError>;
    fn unsubscribe(&self, filter: &str) -> Result<(), BusError>;

    /// Publishes on a typed topic, retained when the topic carries a static fact.
    fn publish_topic(&self, topic: &Topic, payload: &str) -> Result<(), BusError> {
        self.publish(&topic.to_string(), payload, topic.is_retained())
    }
}

/// Opens a bus session. `connect` returns once the broker has acknowledged
/// the connection, together with the channel every later event arrives on.
/// That first acknowledgement is not repeated on the channel.
pub trait BusConnector {
    type Bus: MessageBus;

    fn connect(&self, timeout: Duration) -> Result<(Self::Bus, Receiver<BusEvent>), BusError>;
}

/// MQTT filter matching with `+` (one level) and `#` (all remaining levels).
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Connects with a bounded timeout per attempt and a fixed backoff between
/// attempts, forever. Only shutdown ends the loop without a session.
pub fn connect_with_retry<C: BusConnector>(
    connector: &C,
    timeout: Duration,
    backoff: Duration,
    shutdown: &Shutdown,
) -> Option<(C::Bus, Receiver<BusEvent>)> {
    let mut attempt: u32 = 1;
    loop {
        if shutdown.is_requested() {
            return None;
        }
        info!("Connecting to broker, attempt {}", attempt);
        match connector.connect(timeout) {
            Ok(session) => {
                info!("Connected to broker");
                return Some(session);
            }
            Err(e) => warn!("{}, retrying in {:?}", e, backoff),
        }
        if shutdown.wait(backoff) {
            info!("Shutdown requested, stopped connecting to broker");
            return None;
        }
        attempt += 1;
    }
}
