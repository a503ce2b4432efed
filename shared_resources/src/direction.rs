use crate::error::ValidationError;

/// Committed travel direction, encoded on the wire and by the controller as
/// `0` (up), `1` (down) and `2` (uncommitted).
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Uncommitted,
}

impl Direction {
    pub fn from_code(code: i32) -> Result<Self, ValidationError> {
        match code {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Down),
            2 => Ok(Direction::Uncommitted),
            _ => Err(ValidationError::InvalidDirection { code }),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Uncommitted => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Uncommitted => "uncommitted",
        }
    }
}

/// Door state of a car, encoded as `1` (open) to `4` (closing).
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorStatus {
    Open,
    Closed,
    Opening,
    Closing,
}

impl DoorStatus {
    pub fn from_code(code: i32) -> Result<Self, ValidationError> {
        match code {
            1 => Ok(DoorStatus::Open),
            2 => Ok(DoorStatus::Closed),
            3 => Ok(DoorStatus::Opening),
            4 => Ok(DoorStatus::Closing),
            _ => Err(ValidationError::InvalidDoorStatus { code }),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            DoorStatus::Open => 1,
            DoorStatus::Closed => 2,
            DoorStatus::Opening => 3,
            DoorStatus::Closing => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DoorStatus::Open => "open",
            DoorStatus::Closed => "closed",
            DoorStatus::Opening => "opening",
            DoorStatus::Closing => "closing",
        }
    }
}
