/// ----- MIRRORED STATE -----
/// The dispatcher's copy of the building, rebuilt from the facts the bridge
/// publishes. Static facts arrive retained and decide the layout; state facts
/// are applied to the model once a layout is known.

use std::collections::BTreeMap;

use log::info;
use shared_resources::building::Building;
use shared_resources::direction::{Direction, DoorStatus};
use shared_resources::error::ValidationError;
use shared_resources::fact::{self, PayloadError};
use shared_resources::topic::{ElevatorSubtopic, FloorSubtopic, InfoSubtopic, Topic};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// What applying one fact did to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// First complete layout; the model now exists.
    Built,
    /// The layout changed and the model was replaced.
    Rebuilt,
    /// Recorded; `changed` tells whether the stored value moved.
    Fact { changed: bool },
    /// Nothing to apply it to yet, or not a fact at all.
    Ignored,
}

/// Static facts seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticInfo {
    num_elevators: Option<i32>,
    num_floors: Option<i32>,
    floor_height: Option<i32>,
    capacities: BTreeMap<usize, i32>,
}

impl StaticInfo {
    /// Every count is known and there is a capacity for every car.
    pub fn is_complete(&self) -> bool {
        self.layout().is_some()
    }

    fn layout(&self) -> Option<(i32, i32, i32, Vec<i32>)> {
        let num_elevators = self.num_elevators?;
        let capacities = (0..num_elevators.max(0) as usize)
            .map(|n| self.capacities.get(&n).copied())
            .collect::<Option<Vec<_>>>()?;
        Some((num_elevators, self.num_floors?, self.floor_height?, capacities))
    }

    /// Whether `building` was built from these facts.
    pub fn describes(&self, building: &Building) -> bool {
        match self.layout() {
            Some((num_elevators, num_floors, floor_height, capacities)) => {
                building.num_elevators() as i32 == num_elevators
                    && building.num_floors() == num_floors
                    && building.floor_height() == floor_height
                    && building.capacities() == capacities
            }
            None => false,
        }
    }

    pub fn build(&self) -> Option<Result<Building, ValidationError>> {
        self.layout().map(|(num_elevators, num_floors, floor_height, capacities)| {
            Building::new(num_elevators, num_floors, floor_height, &capacities)
        })
    }

    fn record(&mut self, topic: Topic, payload: &str) -> Result<bool, UpdateError> {
        let value = fact::parse_int(payload)?;
        let slot = match topic {
            Topic::Info(InfoSubtopic::NumOfElevators) => &mut self.num_elevators,
            Topic::Info(InfoSubtopic::NumOfFloors) => &mut self.num_floors,
            Topic::Info(InfoSubtopic::FloorHeight) => &mut self.floor_height,
            Topic::Elevator(n, ElevatorSubtopic::Capacity) => {
                return Ok(self.capacities.insert(n, value) != Some(value));
            }
            _ => return Ok(false),
        };
        let changed = *slot != Some(value);
        *slot = Some(value);
        Ok(changed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mirror {
    info: StaticInfo,
    building: Option<Building>,
}

impl Mirror {
    pub fn new() -> Self {
        Mirror::default()
    }

    pub fn info(&self) -> &StaticInfo {
        &self.info
    }

    pub fn building(&self) -> Option<&Building> {
        self.building.as_ref()
    }

    pub fn apply(&mut self, topic: Topic, payload: &str) -> Result<Applied, UpdateError> {
        if topic.is_retained() && topic != Topic::ConnectionStatus {
            let changed = self.info.record(topic, payload)?;
            return self.refresh_layout(changed);
        }
        match self.building.as_mut() {
            Some(building) => Ok(apply_fact(building, topic, payload)?
                .map_or(Applied::Ignored, |changed| Applied::Fact { changed })),
            None => Ok(Applied::Ignored),
        }
    }

    fn refresh_layout(&mut self, changed: bool) -> Result<Applied, UpdateError> {
        if let Some(building) = self.building.as_ref() {
            if self.info.describes(building) {
                return Ok(Applied::Fact { changed });
            }
        }
        let building = match self.info.build() {
            Some(building) => building?,
            None => return Ok(Applied::Fact { changed }),
        };
        info!(
            "Building has {} elevators and {} floors",
            building.num_elevators(),
            building.num_floors()
        );
        let applied = if self.building.is_some() { Applied::Rebuilt } else { Applied::Built };
        self.building = Some(building);
        Ok(applied)
    }
}

/// Applies one state fact. `None` means the topic carries no state.
pub fn apply_fact(building: &mut Building, topic: Topic, payload: &str) -> Result<Option<bool>, UpdateError> {
    let changed = match topic {
        Topic::Elevator(n, sub) => {
            let elevator = building.elevator_mut(n)?;
            match sub {
                ElevatorSubtopic::Capacity => return Ok(None),
                ElevatorSubtopic::Direction => {
                    elevator.set_direction(Direction::from_code(fact::parse_int(payload)?)?)
                }
                ElevatorSubtopic::Acceleration => elevator.set_acceleration(fact::parse_int(payload)?),
                ElevatorSubtopic::Speed => elevator.set_speed(fact::parse_int(payload)?),
                ElevatorSubtopic::DoorStatus => {
                    elevator.set_door_status(DoorStatus::from_code(fact::parse_int(payload)?)?)
                }
                ElevatorSubtopic::CurrentFloor => elevator.set_current_floor(fact::parse_int(payload)?)?,
                ElevatorSubtopic::TargetFloor => elevator.set_target_floor(fact::parse_int(payload)?)?,
                ElevatorSubtopic::Weight => elevator.set_weight(fact::parse_int(payload)?)?,
                ElevatorSubtopic::FloorRequested(floor) => {
                    elevator.set_button_pressed(floor, fact::parse_bool(payload)?)?
                }
                ElevatorSubtopic::FloorServiced(floor) => {
                    elevator.set_floor_serviced(floor, fact::parse_bool(payload)?)?
                }
            }
        }
        Topic::Floor(floor, sub) => {
            let pressed = fact::parse_bool(payload)?;
            let floor = building.floor_mut(floor)?;
            match sub {
                FloorSubtopic::ButtonUp => floor.set_button_up_pressed(pressed),
                FloorSubtopic::ButtonDown => floor.set_button_down_pressed(pressed),
            }
        }
        Topic::Info(_) | Topic::Control(..) | Topic::ConnectionStatus => return Ok(None),
    };
    Ok(Some(changed))
}
