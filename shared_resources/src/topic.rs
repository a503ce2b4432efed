/// ----- TOPICS -----
/// Every bus topic the bridge and dispatcher exchange, decoded once at the
/// boundary into a closed type. Formatting a `Topic` yields the exact topic
/// string; parsing is its inverse.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Subscription filters.
pub mod filter {
    pub const INFO: &str = "info/#";
    pub const ELEVATOR: &str = "elevator/#";
    pub const FLOOR: &str = "floor/#";
    pub const CONTROL_DIRECTION: &str = "elevator_control/+/direction";
    pub const CONTROL_TARGET_FLOOR: &str = "elevator_control/+/target_floor";
    pub const CONNECTION_STATUS: &str = "elevator_control/connection_status";

    /// Inbound command topics of the bridge.
    pub const COMMANDS: [&str; 2] = [CONTROL_DIRECTION, CONTROL_TARGET_FLOOR];
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("unknown topic `{0}`")]
    Unknown(String),
    #[error("bad index `{index}` in topic `{topic}`")]
    BadIndex { topic: String, index: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InfoSubtopic {
    NumOfElevators,
    NumOfFloors,
    FloorHeight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElevatorSubtopic {
    Capacity,
    Direction,
    Acceleration,
    Speed,
    DoorStatus,
    CurrentFloor,
    TargetFloor,
    Weight,
    FloorRequested(i32),
    FloorServiced(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FloorSubtopic {
    ButtonUp,
    ButtonDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlSubtopic {
    Direction,
    TargetFloor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    Info(InfoSubtopic),
    Elevator(usize, ElevatorSubtopic),
    Floor(i32, FloorSubtopic),
    Control(usize, ControlSubtopic),
    ConnectionStatus,
}

impl Topic {
    /// Static facts are published retained.
    pub fn is_retained(&self) -> bool {
        matches!(
            self,
            Topic::Info(_) | Topic::Elevator(_, ElevatorSubtopic::Capacity) | Topic::ConnectionStatus
        )
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Info(sub) => {
                let name = match sub {
                    InfoSubtopic::NumOfElevators => "num_of_elevators",
                    InfoSubtopic::NumOfFloors => "num_of_floors",
                    InfoSubtopic::FloorHeight => "floor_height",
                };
                write!(f, "info/{}", name)
            }
            Topic::Elevator(n, sub) => {
                let name = match sub {
                    ElevatorSubtopic::Capacity => "capacity",
                    ElevatorSubtopic::Direction => "direction",
                    ElevatorSubtopic::Acceleration => "acceleration",
                    ElevatorSubtopic::Speed => "speed",
                    ElevatorSubtopic::DoorStatus => "door_status",
                    ElevatorSubtopic::CurrentFloor => "current_floor",
                    ElevatorSubtopic::TargetFloor => "target_floor",
                    ElevatorSubtopic::Weight => "weight",
                    ElevatorSubtopic::FloorRequested(floor) => {
                        return write!(f, "elevator/{}/floor_requested/{}", n, floor)
                    }
                    ElevatorSubtopic::FloorServiced(floor) => {
                        return write!(f, "elevator/{}/floor_serviced/{}", n, floor)
                    }
                };
                write!(f, "elevator/{}/{}", n, name)
            }
            Topic::Floor(floor, sub) => {
                let name = match sub {
                    FloorSubtopic::ButtonUp => "button_up",
                    FloorSubtopic::ButtonDown => "button_down",
                };
                write!(f, "floor/{}/{}", floor, name)
            }
            Topic::Control(n, sub) => {
                let name = match sub {
                    ControlSubtopic::Direction => "direction",
                    ControlSubtopic::TargetFloor => "target_floor",
                };
                write!(f, "elevator_control/{}/{}", n, name)
            }
            Topic::ConnectionStatus => write!(f, "elevator_control/connection_status"),
        }
    }
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(topic: &str) -> Result<Self, Self::Err> {
        let unknown = || TopicError::Unknown(topic.to_string());
        let parts: Vec<&str> = topic.split('/').collect();

        match parts.as_slice() {
            ["info", name] => {
                let sub = match *name {
                    "num_of_elevators" => InfoSubtopic::NumOfElevators,
                    "num_of_floors" => InfoSubtopic::NumOfFloors,
                    "floor_height" => InfoSubtopic::FloorHeight,
                    _ => return Err(unknown()),
                };
                Ok(Topic::Info(sub))
            }
            ["elevator", n, name] => {
                let sub = match *name {
                    "capacity" => ElevatorSubtopic::Capacity,
                    "direction" => ElevatorSubtopic::Direction,
                    "acceleration" => ElevatorSubtopic::Acceleration,
                    "speed" => ElevatorSubtopic::Speed,
                    "door_status" => ElevatorSubtopic::DoorStatus,
                    "current_floor" => ElevatorSubtopic::CurrentFloor,
                    "target_floor" => ElevatorSubtopic::TargetFloor,
                    "weight" => ElevatorSubtopic::Weight,
                    _ => return Err(unknown()),
                };
                Ok(Topic::Elevator(index(topic, n)?, sub))
            }
            ["elevator", n, name, floor] => {
                let floor = index(topic, floor)?;
                let sub = match *name {
                    "floor_requested" => ElevatorSubtopic::FloorRequested(floor),
                    "floor_serviced" => ElevatorSubtopic::FloorServiced(floor),
                    _ => return Err(unknown()),
                };
                Ok(Topic::Elevator(index(topic, n)?, sub))
            }
            ["floor", floor, name] => {
                let sub = match *name {
                    "button_up" => FloorSubtopic::ButtonUp,
                    "button_down" => FloorSubtopic::ButtonDown,
                    _ => return Err(unknown()),
                };
                Ok(Topic::Floor(index(topic, floor)?, sub))
            }
            ["elevator_control", "connection_status"] => Ok(Topic::ConnectionStatus),
            ["elevator_control", n, name] => {
                let sub = match *name {
                    "direction" => ControlSubtopic::Direction,
                    "target_floor" => ControlSubtopic::TargetFloor,
                    _ => return Err(unknown()),
                };
                Ok(Topic::Control(index(topic, n)?, sub))
            }
            _ => Err(unknown()),
        }
    }
}

fn index<T: FromStr>(topic: &str, segment: &str) -> Result<T, TopicError> {
    segment.parse().map_err(|_| TopicError::BadIndex {
        topic: topic.to_string(),
        index: segment.to_string(),
    })
}
