/// ----- ELEVATOR -----
/// Mirrored state of one car. Every mutator reports whether the stored
/// value actually changed, which is what the replication engine turns into
/// delta facts.

use crate::direction::{Direction, DoorStatus};
use crate::error::ValidationError;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Elevator {
    capacity: i32,
    num_floors: i32,
    speed: i32,
    acceleration: i32,
    direction: Direction,
    door_status: DoorStatus,
    current_floor: i32,
    target_floor: i32,
    weight: i32,
    button_pressed: Vec<bool>,
    floor_serviced: Vec<bool>,
}

impl Elevator {
    pub fn new(num_floors: i32, capacity: i32) -> Result<Self, ValidationError> {
        if num_floors < 0 {
            return Err(ValidationError::NegativeFloorCount(num_floors));
        }
        if capacity < 0 {
            return Err(ValidationError::NegativeCapacity(capacity));
        }
        Ok(Elevator {
            capacity,
            num_floors,
            speed: 0,
            acceleration: 0,
            direction: Direction::Uncommitted,
            door_status: DoorStatus::Closed,
            current_floor: 0,
            target_floor: 0,
            weight: 0,
            button_pressed: vec![false; num_floors as usize],
            floor_serviced: vec![true; num_floors as usize],
        })
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    pub fn num_floors(&self) -> i32 {
        self.num_floors
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn acceleration(&self) -> i32 {
        self.acceleration
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn door_status(&self) -> DoorStatus {
        self.door_status
    }

    pub fn current_floor(&self) -> i32 {
        self.current_floor
    }

    pub fn target_floor(&self) -> i32 {
        self.target_floor
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    pub fn button_pressed(&self, floor: i32) -> Result<bool, ValidationError> {
        Ok(self.button_pressed[self.index(floor)?])
    }

    pub fn floor_serviced(&self, floor: i32) -> Result<bool, ValidationError> {
        Ok(self.floor_serviced[self.index(floor)?])
    }

    pub fn set_speed(&mut self, speed: i32) -> bool {
        replace(&mut self.speed, speed)
    }

    pub fn set_acceleration(&mut self, acceleration: i32) -> bool {
        replace(&mut self.acceleration, acceleration)
    }

    pub fn set_direction(&mut self, direction: Direction) -> bool {
        replace(&mut self.direction, direction)
    }

    pub fn set_door_status(&mut self, door_status: DoorStatus) -> bool {
        replace(&mut self.door_status, door_status)
    }

    pub fn set_current_floor(&mut self, floor: i32) -> Result<bool, ValidationError> {
        self.index(floor)?;
        Ok(replace(&mut self.current_floor, floor))
    }

    pub fn set_target_floor(&mut self, floor: i32) -> Result<bool, ValidationError> {
        self.index(floor)?;
        Ok(replace(&mut self.target_floor, floor))
    }

    pub fn set_weight(&mut self, weight: i32) -> Result<bool, ValidationError> {
        if weight < 0 {
            return Err(ValidationError::NegativeWeight(weight));
        }
        Ok(replace(&mut self.weight, weight))
    }

    pub fn set_button_pressed(&mut self, floor: i32, pressed: bool) -> Result<bool, ValidationError> {
        let index = self.index(floor)?;
        Ok(replace(&mut self.button_pressed[index], pressed))
    }

    pub fn set_floor_serviced(&mut self, floor: i32, serviced: bool) -> Result<bool, ValidationError> {
        let index = self.index(floor)?;
        Ok(replace(&mut self.floor_serviced[index], serviced))
    }

    fn index(&self, floor: i32) -> Result<usize, ValidationError> {
        if floor < 0 || floor >= self.num_floors {
            return Err(ValidationError::FloorOutOfRange { floor, num_floors: self.num_floors });
        }
        Ok(floor as usize)
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
