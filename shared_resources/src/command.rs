use thiserror::Error;

use crate::direction::Direction;
use crate::error::ValidationError;
use crate::fact::{self, PayloadError};
use crate::topic::{ControlSubtopic, Topic};

/// A control command from the dispatcher to one car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Direction(Direction),
    TargetFloor(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Command {
    pub fn parse(subtopic: ControlSubtopic, payload: &str) -> Result<Self, CommandError> {
        let value = fact::parse_int(payload)?;
        Ok(match subtopic {
            ControlSubtopic::Direction => Command::Direction(Direction::from_code(value)?),
            ControlSubtopic::TargetFloor => Command::TargetFloor(value),
        })
    }

    pub fn topic(&self, elevator: usize) -> Topic {
        match self {
            Command::Direction(_) => Topic::Control(elevator, ControlSubtopic::Direction),
            Command::TargetFloor(_) => Topic::Control(elevator, ControlSubtopic::TargetFloor),
        }
    }

    pub fn payload(&self) -> String {
        match self {
            Command::Direction(direction) => direction.code().to_string(),
            Command::TargetFloor(floor) => floor.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_carry_integer_payloads() {
        let command = Command::Direction(Direction::Down);
        assert_eq!(command.topic(2).to_string(), "elevator_control/2/direction");
        assert_eq!(command.payload(), "1");
        assert_eq!(Command::parse(ControlSubtopic::Direction, "1"), Ok(command));
        assert_eq!(Command::parse(ControlSubtopic::TargetFloor, "4"), Ok(Command::TargetFloor(4)));
    }

    #[test]
    fn bad_direction_codes_are_rejected() {
        assert!(matches!(
            Command::parse(ControlSubtopic::Direction, "7"),
            Err(CommandError::Validation(ValidationError::InvalidDirection { code: 7 }))
        ));
        assert!(matches!(
            Command::parse(ControlSubtopic::TargetFloor, "up"),
            Err(CommandError::Payload(_))
        ));
    }
}
