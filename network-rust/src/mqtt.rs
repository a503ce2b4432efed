/// ----- MQTT TRANSPORT -----
/// The production `MessageBus`: a rumqttc client with its event loop driven
/// on a named thread that turns broker notifications into `BusEvent`s.

use std::thread::{self, Builder};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};
use parking_lot::Mutex;
use rumqttc::{Client, ClientError, Connection, ConnectionError, Event, MqttOptions, Packet, QoS};
use uuid::Uuid;

use crate::bus::{BusConnector, BusError, BusEvent, BusMessage, MessageBus};

const KEEP_ALIVE: Duration = Duration::from_secs(5);
/// Requests the client may queue while the event loop cannot hand them to
/// the broker. Beyond that, calls fail instead of blocking.
const REQUEST_CAPACITY: usize = 64;
/// Pause between reconnect attempts of the driver thread.
const RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct MqttConnector {
    host: String,
    port: u16,
    client_prefix: String,
}

impl MqttConnector {
    pub fn new(host: &str, port: u16, client_prefix: &str) -> Self {
        MqttConnector {
            host: host.to_string(),
            port,
            client_prefix: client_prefix.to_string(),
        }
    }
}

impl BusConnector for MqttConnector {
    type Bus = MqttBus;

    fn connect(&self, timeout: Duration) -> Result<(MqttBus, Receiver<BusEvent>), BusError> {
        let client_id = format!("{}-{}", self.client_prefix, Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);
        let (events_tx, events_rx) = unbounded();
        Builder::new()
            .name("mqtt_event_loop".into())
            .spawn(move || drive(connection, events_tx))
            .map_err(|e| BusError::Connect(e.to_string()))?;

        match events_rx.recv_timeout(timeout) {
            Ok(BusEvent::Connected) => Ok((MqttBus { client: Mutex::new(client) }, events_rx)),
            Ok(BusEvent::ConnectionLost(reason)) => Err(BusError::Connect(reason)),
            Ok(BusEvent::Message(_)) => Err(BusError::Connect("message before acknowledgement".to_string())),
            Err(RecvTimeoutError::Timeout) => Err(BusError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(BusError::Connect("event loop stopped".to_string())),
        }
    }
}

/// Forwards broker notifications until the client is dropped or nobody
/// listens anymore. Once acknowledged, the connection reconnects by itself
/// on the next poll; a failure before the first acknowledgement ends it.
fn drive(mut connection: Connection, events: Sender<BusEvent>) {
    let mut acknowledged = false;
    let mut connected = false;
    for notification in connection.iter() {
        let event = match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                acknowledged = true;
                connected = true;
                BusEvent::Connected
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => match String::from_utf8(publish.payload.to_vec()) {
                Ok(payload) => BusEvent::Message(BusMessage {
                    topic: publish.topic,
                    payload,
                    retained: publish.retain,
                }),
                Err(_) => {
                    warn!("Dropping non-UTF-8 payload on `{}`", publish.topic);
                    continue;
                }
            },
            Ok(_) => continue,
            Err(ConnectionError::RequestsDone) => break,
            Err(e) if !acknowledged => {
                let _ = events.send(BusEvent::ConnectionLost(e.to_string()));
                break;
            }
            Err(e) => {
                if connected {
                    connected = false;
                    if events.send(BusEvent::ConnectionLost(e.to_string())).is_err() {
                        break;
                    }
                }
                thread::sleep(RETRY_DELAY);
                continue;
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }
    debug!("MQTT event loop stopped");
}

pub struct MqttBus {
    client: Mutex<Client>,
}

fn refusal(e: ClientError) -> String {
    match e {
        ClientError::TryRequest(_) => format!("{} requests pending, broker unreachable", REQUEST_CAPACITY),
        other => other.to_string(),
    }
}

impl MessageBus for MqttBus {
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), BusError> {
        self.client
            .lock()
            .try_publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes().to_vec())
            .map_err(|e| BusError::Publish { topic: topic.to_string(), reason: refusal(e) })
    }

    fn subscribe(&self, filter: &str) -> Result<(), BusError> {
        self.client
            .lock()
            .try_subscribe(filter, QoS::AtLeastOnce)
            .map_err(|e| BusError::Subscribe { filter: filter.to_string(), reason: refusal(e) })
    }

    fn unsubscribe(&self, filter: &str) -> Result<(), BusError> {
        self.client
            .lock()
            .try_unsubscribe(filter)
            .map_err(|e| BusError::Subscribe { filter: filter.to_string(), reason: refusal(e) })
    }
}
