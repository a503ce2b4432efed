/// ----- CONTROLLER INTERFACE -----
/// The remote elevator controller, one round trip per call. Getters hand
/// back the raw values the controller reports; validating them is up to
/// the caller. Every call may fail with a `ControllerError`, which the
/// bridge treats as a reason to reconnect.

use thiserror::Error;

use crate::direction::{Direction, DoorStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("controller unreachable: {0}")]
    Unreachable(String),
    #[error("controller call timed out")]
    Timeout,
    #[error("controller rejected `{call}`: {reason}")]
    Rejected { call: String, reason: String },
    #[error("malformed controller reply: {0}")]
    Protocol(String),
}

pub trait ElevatorController {
    fn elevator_count(&mut self) -> Result<i32, ControllerError>;
    fn floor_count(&mut self) -> Result<i32, ControllerError>;
    fn floor_height(&mut self) -> Result<i32, ControllerError>;
    fn elevator_capacity(&mut self, elevator: usize) -> Result<i32, ControllerError>;

    fn committed_direction(&mut self, elevator: usize) -> Result<i32, ControllerError>;
    fn set_committed_direction(&mut self, elevator: usize, direction: Direction) -> Result<(), ControllerError>;
    fn acceleration(&mut self, elevator: usize) -> Result<i32, ControllerError>;
    fn door_status(&mut self, elevator: usize) -> Result<i32, ControllerError>;
    fn set_door_status(&mut self, elevator: usize, door_status: DoorStatus) -> Result<(), ControllerError>;
    fn current_floor(&mut self, elevator: usize) -> Result<i32, ControllerError>;
    /// Height above ground, `current_floor * floor_height`.
    fn position(&mut self, elevator: usize) -> Result<i32, ControllerError>;
    fn speed(&mut self, elevator: usize) -> Result<i32, ControllerError>;
    fn weight(&mut self, elevator: usize) -> Result<i32, ControllerError>;
    fn destination_button(&mut self, elevator: usize, floor: i32) -> Result<bool, ControllerError>;
    fn floor_serviced(&mut self, elevator: usize, floor: i32) -> Result<bool, ControllerError>;
    fn set_floor_serviced(&mut self, elevator: usize, floor: i32, serviced: bool) -> Result<(), ControllerError>;
    fn target_floor(&mut self, elevator: usize) -> Result<i32, ControllerError>;
    fn set_target_floor(&mut self, elevator: usize, floor: i32) -> Result<(), ControllerError>;

    fn floor_call_up(&mut self, floor: i32) -> Result<bool, ControllerError>;
    fn floor_call_down(&mut self, floor: i32) -> Result<bool, ControllerError>;

    fn clock_tick(&mut self) -> Result<i64, ControllerError>;
}

/// Acquires a fresh controller handle, at startup and on every reconnect.
pub trait Connector {
    type Controller: ElevatorController;

    fn connect(&self) -> Result<Self::Controller, ControllerError>;
}
