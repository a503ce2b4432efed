/// ----- CONTROL SYSTEM MODULE -----
/// Mirrors the controller into a `Building` and reports what changed. A poll
/// reads every value through the car and floor mutators and records a fact
/// for each one that changed, or for every one in a full poll. A poll is all
/// or nothing: on any fault the mirror stays as it was and no table is
/// returned.

use log::debug;
use shared_resources::building::Building;
use shared_resources::command::Command;
use shared_resources::controller::{ControllerError, ElevatorController};
use shared_resources::direction::{Direction, DoorStatus};
use shared_resources::error::ValidationError;
use shared_resources::fact::{FactTable, FactValue};
use shared_resources::topic::{ElevatorSubtopic, FloorSubtopic, InfoSubtopic, Topic};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub struct ControlSystem<C> {
    controller: C,
    building: Building,
}

struct Facts {
    table: FactTable,
    full: bool,
}

impl Facts {
    fn record(&mut self, topic: Topic, changed: bool, value: FactValue) {
        if changed || self.full {
            self.table.insert(topic, value);
        }
    }
}

impl<C: ElevatorController> ControlSystem<C> {
    /// Reads the static layout from the controller and allocates the mirror.
    pub fn initialize(mut controller: C) -> Result<Self, ReplicationError> {
        let num_elevators = controller.elevator_count()?;
        let num_floors = controller.floor_count()?;
        let floor_height = controller.floor_height()?;
        if num_elevators < 0 {
            return Err(ValidationError::NegativeElevatorCount(num_elevators).into());
        }
        let capacities = (0..num_elevators as usize)
            .map(|n| controller.elevator_capacity(n))
            .collect::<Result<Vec<_>, _>>()?;
        let building = Building::new(num_elevators, num_floors, floor_height, &capacities)?;
        debug!(
            "Initialized {} elevators over {} floors, floor height {}",
            num_elevators, num_floors, floor_height
        );

        Ok(ControlSystem { controller, building })
    }

    pub fn building(&self) -> &Building {
        &self.building
    }

    /// Building layout and car capacities, published retained.
    pub fn retained_facts(&self) -> FactTable {
        let mut facts = FactTable::new();
        facts.insert(
            Topic::Info(InfoSubtopic::NumOfElevators),
            FactValue::Int(self.building.num_elevators() as i32),
        );
        facts.insert(Topic::Info(InfoSubtopic::NumOfFloors), FactValue::Int(self.building.num_floors()));
        facts.insert(Topic::Info(InfoSubtopic::FloorHeight), FactValue::Int(self.building.floor_height()));
        for (n, capacity) in self.building.capacities().into_iter().enumerate() {
            facts.insert(Topic::Elevator(n, ElevatorSubtopic::Capacity), FactValue::Int(capacity));
        }
        facts
    }

    pub fn poll_delta(&mut self) -> Result<FactTable, ReplicationError> {
        self.poll(false)
    }

    pub fn poll_full(&mut self) -> Result<FactTable, ReplicationError> {
        self.poll(true)
    }

    fn poll(&mut self, full: bool) -> Result<FactTable, ReplicationError> {
        let mut next = self.building.clone();
        let mut facts = Facts { table: FactTable::new(), full };
        let num_floors = next.num_floors();
        let c = &mut self.controller;

        for n in 0..next.num_elevators() {
            let elevator = next.elevator_mut(n)?;
            let topic = |sub| Topic::Elevator(n, sub);

            let direction = Direction::from_code(c.committed_direction(n)?)?;
            let changed = elevator.set_direction(direction);
            facts.record(topic(ElevatorSubtopic::Direction), changed, FactValue::Int(direction.code()));

            let acceleration = c.acceleration(n)?;
            let changed = elevator.set_acceleration(acceleration);
            facts.record(topic(ElevatorSubtopic::Acceleration), changed, FactValue::Int(acceleration));

            let speed = c.speed(n)?;
            let changed = elevator.set_speed(speed);
            facts.record(topic(ElevatorSubtopic::Speed), changed, FactValue::Int(speed));

            let door_status = DoorStatus::from_code(c.door_status(n)?)?;
            let changed = elevator.set_door_status(door_status);
            facts.record(topic(ElevatorSubtopic::DoorStatus), changed, FactValue::Int(door_status.code()));

            let current_floor = c.current_floor(n)?;
            let changed = elevator.set_current_floor(current_floor)?;
            facts.record(topic(ElevatorSubtopic::CurrentFloor), changed, FactValue::Int(current_floor));

            let target_floor = c.target_floor(n)?;
            let changed = elevator.set_target_floor(target_floor)?;
            facts.record(topic(ElevatorSubtopic::TargetFloor), changed, FactValue::Int(target_floor));

            let weight = c.weight(n)?;
            let changed = elevator.set_weight(weight)?;
            facts.record(topic(ElevatorSubtopic::Weight), changed, FactValue::Int(weight));

            for floor in 0..num_floors {
                let pressed = c.destination_button(n, floor)?;
                let changed = elevator.set_button_pressed(floor, pressed)?;
                facts.record(topic(ElevatorSubtopic::FloorRequested(floor)), changed, FactValue::Bool(pressed));

                let serviced = c.floor_serviced(n, floor)?;
                let changed = elevator.set_floor_serviced(floor, serviced)?;
                facts.record(topic(ElevatorSubtopic::FloorServiced(floor)), changed, FactValue::Bool(serviced));
            }
        }

        for floor in 0..num_floors {
            let up = c.floor_call_up(floor)?;
            let down = c.floor_call_down(floor)?;
            let level = next.floor_mut(floor)?;

            let changed = level.set_button_up_pressed(up);
            facts.record(Topic::Floor(floor, FloorSubtopic::ButtonUp), changed, FactValue::Bool(up));
            let changed = level.set_button_down_pressed(down);
            facts.record(Topic::Floor(floor, FloorSubtopic::ButtonDown), changed, FactValue::Bool(down));
        }

        self.building = next;
        Ok(facts.table)
    }

    /// Forwards a dispatcher command to the controller. The mirror is not
    /// touched; the next poll reports the effect.
    pub fn apply_command(&mut self, elevator: usize, command: Command) -> Result<(), ReplicationError> {
        let num_elevators = self.building.num_elevators();
        if elevator >= num_elevators {
            return Err(ValidationError::ElevatorOutOfRange { elevator, num_elevators }.into());
        }
        match command {
            Command::Direction(direction) => self.controller.set_committed_direction(elevator, direction)?,
            Command::TargetFloor(floor) => {
                let num_floors = self.building.num_floors();
                if floor < 0 || floor >= num_floors {
                    return Err(ValidationError::FloorOutOfRange { floor, num_floors }.into());
                }
                self.controller.set_target_floor(elevator, floor)?
            }
        }
        Ok(())
    }
}
