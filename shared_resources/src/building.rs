use crate::elevator::Elevator;
use crate::error::ValidationError;
use crate::floor::Floor;

/// The whole replicated model owned by one process: every car, every floor
/// and the static facts they were created from.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Building {
    floor_height: i32,
    elevators: Vec<Elevator>,
    floors: Vec<Floor>,
}

impl Building {
    pub fn new(
        num_elevators: i32,
        num_floors: i32,
        floor_height: i32,
        capacities: &[i32],
    ) -> Result<Self, ValidationError> {
        if num_elevators < 0 {
            return Err(ValidationError::NegativeElevatorCount(num_elevators));
        }
        if num_floors < 0 {
            return Err(ValidationError::NegativeFloorCount(num_floors));
        }
        if capacities.len() != num_elevators as usize {
            return Err(ValidationError::CapacityMismatch {
                num_elevators: num_elevators as usize,
                num_capacities: capacities.len(),
            });
        }
        let elevators = capacities
            .iter()
            .map(|&capacity| Elevator::new(num_floors, capacity))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Building {
            floor_height,
            elevators,
            floors: vec![Floor::new(); num_floors as usize],
        })
    }

    pub fn floor_height(&self) -> i32 {
        self.floor_height
    }

    pub fn num_elevators(&self) -> usize {
        self.elevators.len()
    }

    pub fn num_floors(&self) -> i32 {
        self.floors.len() as i32
    }

    pub fn capacities(&self) -> Vec<i32> {
        self.elevators.iter().map(Elevator::capacity).collect()
    }

    pub fn elevators(&self) -> &[Elevator] {
        &self.elevators
    }

    pub fn elevators_mut(&mut self) -> &mut [Elevator] {
        &mut self.elevators
    }

    pub fn floors(&self) -> &[Floor] {
        &self.floors
    }

    pub fn floors_mut(&mut self) -> &mut [Floor] {
        &mut self.floors
    }

    pub fn elevator_mut(&mut self, elevator: usize) -> Result<&mut Elevator, ValidationError> {
        let num_elevators = self.elevators.len();
        self.elevators
            .get_mut(elevator)
            .ok_or(ValidationError::ElevatorOutOfRange { elevator, num_elevators })
    }

    pub fn floor_mut(&mut self, floor: i32) -> Result<&mut Floor, ValidationError> {
        let num_floors = self.num_floors();
        if floor < 0 || floor >= num_floors {
            return Err(ValidationError::FloorOutOfRange { floor, num_floors });
        }
        Ok(&mut self.floors[floor as usize])
    }
}
