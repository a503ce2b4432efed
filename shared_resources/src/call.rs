use crate::direction::Direction;

/// Floor call button at a building level.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Call {
    HallUp,
    HallDown,
}

impl Call {
    /// The call a car travelling in `direction` picks up on its way.
    pub fn for_direction(direction: Direction) -> Option<Self> {
        match direction {
            Direction::Up => Some(Call::HallUp),
            Direction::Down => Some(Call::HallDown),
            Direction::Uncommitted => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Call::HallUp => Call::HallDown,
            Call::HallDown => Call::HallUp,
        }
    }
}
