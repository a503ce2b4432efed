use thiserror::Error;

/// Rejected arguments to the state model, or values outside an enumerated
/// domain. Never retried, always handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("floor {floor} is outside 0..{num_floors}")]
    FloorOutOfRange { floor: i32, num_floors: i32 },

    #[error("elevator {elevator} is outside 0..{num_elevators}")]
    ElevatorOutOfRange { elevator: usize, num_elevators: usize },

    #[error("{code} is not a committed direction")]
    InvalidDirection { code: i32 },

    #[error("{code} is not a door status")]
    InvalidDoorStatus { code: i32 },

    #[error("number of floors must not be negative, got {0}")]
    NegativeFloorCount(i32),

    #[error("number of elevators must not be negative, got {0}")]
    NegativeElevatorCount(i32),

    #[error("capacity must not be negative, got {0}")]
    NegativeCapacity(i32),

    #[error("weight must not be negative, got {0}")]
    NegativeWeight(i32),

    #[error("{num_elevators} elevators but {num_capacities} capacities")]
    CapacityMismatch { num_elevators: usize, num_capacities: usize },
}
