/// ----- CONTROLLER RPC -----
/// Client side of the elevator controller interface: line-delimited JSON over
/// TCP. Each request is one object tagged by `call`, each reply one line of
/// either `{"ok": <value>}` or `{"err": "<reason>"}`.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;
use shared_resources::controller::{Connector, ControllerError, ElevatorController};
use shared_resources::direction::{Direction, DoorStatus};

use crate::sock;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RemoteCall {
    ElevatorCount,
    FloorCount,
    FloorHeight,
    ElevatorCapacity { elevator: usize },
    CommittedDirection { elevator: usize },
    SetCommittedDirection { elevator: usize, direction: i32 },
    Acceleration { elevator: usize },
    DoorStatus { elevator: usize },
    SetDoorStatus { elevator: usize, door_status: i32 },
    CurrentFloor { elevator: usize },
    Position { elevator: usize },
    Speed { elevator: usize },
    Weight { elevator: usize },
    DestinationButton { elevator: usize, floor: i32 },
    FloorServiced { elevator: usize, floor: i32 },
    SetFloorServiced { elevator: usize, floor: i32, serviced: bool },
    TargetFloor { elevator: usize },
    SetTargetFloor { elevator: usize, floor: i32 },
    FloorCallUp { floor: i32 },
    FloorCallDown { floor: i32 },
    ClockTick,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    Ok(serde_json::Value),
    Err(String),
}

pub struct RpcConnector {
    address: String,
    timeout: Duration,
}

impl RpcConnector {
    pub fn new(address: &str, timeout: Duration) -> Self {
        RpcConnector { address: address.to_string(), timeout }
    }
}

impl Connector for RpcConnector {
    type Controller = RpcController;

    fn connect(&self) -> Result<RpcController, ControllerError> {
        let stream = sock::connect(&self.address, self.timeout).map_err(|e| io_fault(&e))?;
        let reader = stream.try_clone().map_err(|e| io_fault(&e))?;
        debug!("Connected to controller at {}", self.address);
        Ok(RpcController { reader: BufReader::new(reader), writer: stream })
    }
}

pub struct RpcController {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

fn io_fault(e: &io::Error) -> ControllerError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ControllerError::Timeout,
        _ => ControllerError::Unreachable(e.to_string()),
    }
}

impl RpcController {
    fn call<T: DeserializeOwned>(&mut self, call: RemoteCall) -> Result<T, ControllerError> {
        let request = serde_json::to_string(&call).map_err(|e| ControllerError::Protocol(e.to_string()))?;
        self.writer
            .write_all(format!("{}\n", request).as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| io_fault(&e))?;

        let mut line = String::new();
        let n = self.reader.read_line(&mut line).map_err(|e| io_fault(&e))?;
        if n == 0 {
            return Err(ControllerError::Unreachable("connection closed by controller".to_string()));
        }
        let reply: Reply = serde_json::from_str(line.trim_end())
            .map_err(|e| ControllerError::Protocol(format!("{}: {}", e, line.trim_end())))?;
        match reply {
            Reply::Ok(value) => serde_json::from_value(value).map_err(|e| ControllerError::Protocol(e.to_string())),
            Reply::Err(reason) => Err(ControllerError::Rejected { call: request, reason }),
        }
    }
}

impl ElevatorController for RpcController {
    fn elevator_count(&mut self) -> Result<i32, ControllerError> {
        self.call(RemoteCall::ElevatorCount)
    }

    fn floor_count(&mut self) -> Result<i32, ControllerError> {
        self.call(RemoteCall::FloorCount)
    }

    fn floor_height(&mut self) -> Result<i32, ControllerError> {
        self.call(RemoteCall::FloorHeight)
    }

    fn elevator_capacity(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        self.call(RemoteCall::ElevatorCapacity { elevator })
    }

    fn committed_direction(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        self.call(RemoteCall::CommittedDirection { elevator })
    }

    fn set_committed_direction(&mut self, elevator: usize, direction: Direction) -> Result<(), ControllerError> {
        self.call(RemoteCall::SetCommittedDirection { elevator, direction: direction.code() })
    }

    fn acceleration(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        self.call(RemoteCall::Acceleration { elevator })
    }

    fn door_status(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        self.call(RemoteCall::DoorStatus { elevator })
    }

    fn set_door_status(&mut self, elevator: usize, door_status: DoorStatus) -> Result<(), ControllerError> {
        self.call(RemoteCall::SetDoorStatus { elevator, door_status: door_status.code() })
    }

    fn current_floor(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        self.call(RemoteCall::CurrentFloor { elevator })
    }

    fn position(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        self.call(RemoteCall::Position { elevator })
    }

    fn speed(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        self.call(RemoteCall::Speed { elevator })
    }

    fn weight(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        self.call(RemoteCall::Weight { elevator })
    }

    fn destination_button(&mut self, elevator: usize, floor: i32) -> Result<bool, ControllerError> {
        self.call(RemoteCall::DestinationButton { elevator, floor })
    }

    fn floor_serviced(&mut self, elevator: usize, floor: i32) -> Result<bool, ControllerError> {
        self.call(RemoteCall::FloorServiced { elevator, floor })
    }

    fn set_floor_serviced(&mut self, elevator: usize, floor: i32, serviced: bool) -> Result<(), ControllerError> {
        self.call(RemoteCall::SetFloorServiced { elevator, floor, serviced })
    }

    fn target_floor(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        self.call(RemoteCall::TargetFloor { elevator })
    }

    fn set_target_floor(&mut self, elevator: usize, floor: i32) -> Result<(), ControllerError> {
        self.call(RemoteCall::SetTargetFloor { elevator, floor })
    }

    fn floor_call_up(&mut self, floor: i32) -> Result<bool, ControllerError> {
        self.call(RemoteCall::FloorCallUp { floor })
    }

    fn floor_call_down(&mut self, floor: i32) -> Result<bool, ControllerError> {
        self.call(RemoteCall::FloorCallDown { floor })
    }

    fn clock_tick(&mut self) -> Result<i64, ControllerError> {
        self.call(RemoteCall::ClockTick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// Serves one connection, answering each request line with `answer`.
    fn serve(answer: fn(RemoteCall) -> Option<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            for line in BufReader::new(stream).lines() {
                let call: RemoteCall = serde_json::from_str(&line.unwrap()).unwrap();
                match answer(call) {
                    Some(reply) => writeln!(writer, "{}", reply).unwrap(),
                    None => thread::sleep(Duration::from_secs(2)),
                }
            }
        });
        address
    }

    #[test]
    fn calls_are_tagged_by_name() {
        let json = serde_json::to_string(&RemoteCall::FloorCallUp { floor: 2 }).unwrap();
        assert_eq!(json, r#"{"call":"floor_call_up","floor":2}"#);
        let json = serde_json::to_string(&RemoteCall::ClockTick).unwrap();
        assert_eq!(json, r#"{"call":"clock_tick"}"#);
    }

    #[test]
    fn replies_are_decoded_into_values() {
        let address = serve(|call| {
            Some(match call {
                RemoteCall::FloorCount => r#"{"ok":6}"#.to_string(),
                RemoteCall::DestinationButton { floor, .. } => format!(r#"{{"ok":{}}}"#, floor == 3),
                RemoteCall::SetTargetFloor { .. } => r#"{"ok":null}"#.to_string(),
                _ => r#"{"err":"unsupported"}"#.to_string(),
            })
        });
        let mut controller = RpcConnector::new(&address, Duration::from_secs(1)).connect().unwrap();

        assert_eq!(controller.floor_count(), Ok(6));
        assert_eq!(controller.destination_button(0, 3), Ok(true));
        assert_eq!(controller.destination_button(0, 2), Ok(false));
        assert_eq!(controller.set_target_floor(0, 2), Ok(()));
        assert!(matches!(controller.speed(0), Err(ControllerError::Rejected { .. })));
    }

    #[test]
    fn mistyped_replies_are_protocol_faults() {
        let address = serve(|_| Some(r#"{"ok":"three"}"#.to_string()));
        let mut controller = RpcConnector::new(&address, Duration::from_secs(1)).connect().unwrap();
        assert!(matches!(controller.weight(0), Err(ControllerError::Protocol(_))));
    }

    #[test]
    fn silent_controller_times_out() {
        let address = serve(|_| None);
        let mut controller = RpcConnector::new(&address, Duration::from_millis(100)).connect().unwrap();
        assert_eq!(controller.clock_tick(), Err(ControllerError::Timeout));
    }

    #[test]
    fn refused_connection_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(matches!(
            RpcConnector::new(&address, Duration::from_millis(200)).connect(),
            Err(ControllerError::Unreachable(_))
        ));
    }
}
