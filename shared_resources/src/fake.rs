/// ----- FAKE CONTROLLER -----
/// An in-memory stand-in for the remote elevator controller. Tests share one
/// `FakePlant` between the connector they hand to the code under test and
/// their own assertions, and can take the plant offline to inject faults.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::controller::{Connector, ControllerError, ElevatorController};
use crate::direction::{Direction, DoorStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct FakeCar {
    pub capacity: i32,
    pub direction: Direction,
    pub acceleration: i32,
    pub door_status: DoorStatus,
    pub current_floor: i32,
    pub target_floor: i32,
    pub speed: i32,
    pub weight: i32,
    pub buttons: Vec<bool>,
    pub serviced: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakePlant {
    pub floor_height: i32,
    pub cars: Vec<FakeCar>,
    pub calls_up: Vec<bool>,
    pub calls_down: Vec<bool>,
    pub clock: i64,
    /// While false every call fails with `Unreachable`.
    pub online: bool,
    /// Number of upcoming `connect` attempts to refuse.
    pub refuse_connects: usize,
    /// Goes offline once this many further calls have succeeded.
    pub fail_after: Option<usize>,
    pub connects: usize,
    pub calls: usize,
}

impl FakePlant {
    pub fn new(num_floors: i32, floor_height: i32, capacities: &[i32]) -> Self {
        let floors = num_floors.max(0) as usize;
        let cars = capacities
            .iter()
            .map(|&capacity| FakeCar {
                capacity,
                direction: Direction::Uncommitted,
                acceleration: 0,
                door_status: DoorStatus::Closed,
                current_floor: 0,
                target_floor: 0,
                speed: 0,
                weight: 0,
                buttons: vec![false; floors],
                serviced: vec![true; floors],
            })
            .collect();

        FakePlant {
            floor_height,
            cars,
            calls_up: vec![false; floors],
            calls_down: vec![false; floors],
            clock: 0,
            online: true,
            refuse_connects: 0,
            fail_after: None,
            connects: 0,
            calls: 0,
        }
    }

    pub fn shared(self) -> Arc<Mutex<FakePlant>> {
        Arc::new(Mutex::new(self))
    }

    /// Advances the simulation by one step: a car with closed doors moves one
    /// floor toward its target and opens on arrival, clearing the requests it
    /// serves there. Doors stay open until the car is sent somewhere else.
    pub fn step(&mut self) {
        self.clock += 1;
        for car in self.cars.iter_mut() {
            match car.door_status {
                DoorStatus::Open | DoorStatus::Opening => {
                    if car.current_floor != car.target_floor {
                        car.door_status = DoorStatus::Closed;
                    }
                }
                DoorStatus::Closed | DoorStatus::Closing => {
                    if car.current_floor == car.target_floor {
                        car.speed = 0;
                        continue;
                    }
                    car.current_floor += (car.target_floor - car.current_floor).signum();
                    car.speed = 1;
                    if car.current_floor == car.target_floor {
                        let floor = car.current_floor as usize;
                        car.speed = 0;
                        car.door_status = DoorStatus::Open;
                        car.buttons[floor] = false;
                        match car.direction {
                            Direction::Up => self.calls_up[floor] = false,
                            Direction::Down => self.calls_down[floor] = false,
                            Direction::Uncommitted => {
                                self.calls_up[floor] = false;
                                self.calls_down[floor] = false;
                            }
                        }
                    }
                }
            }
        }
    }

    fn num_floors(&self) -> i32 {
        self.calls_up.len() as i32
    }

    fn call(&mut self, name: &str) -> Result<(), ControllerError> {
        if !self.online {
            return Err(ControllerError::Unreachable(format!("{} while offline", name)));
        }
        if let Some(remaining) = self.fail_after {
            if remaining == 0 {
                self.online = false;
                self.fail_after = None;
                return Err(ControllerError::Unreachable(format!("{} lost connection", name)));
            }
            self.fail_after = Some(remaining - 1);
        }
        self.calls += 1;
        Ok(())
    }

    fn car(&mut self, name: &str, elevator: usize) -> Result<&mut FakeCar, ControllerError> {
        self.call(name)?;
        self.cars.get_mut(elevator).ok_or_else(|| ControllerError::Rejected {
            call: name.to_string(),
            reason: format!("no elevator {}", elevator),
        })
    }

    fn floor(&self, name: &str, floor: i32) -> Result<usize, ControllerError> {
        if floor < 0 || floor >= self.num_floors() {
            return Err(ControllerError::Rejected {
                call: name.to_string(),
                reason: format!("no floor {}", floor),
            });
        }
        Ok(floor as usize)
    }
}

#[derive(Clone)]
pub struct FakeController {
    plant: Arc<Mutex<FakePlant>>,
}

impl FakeController {
    pub fn new(plant: Arc<Mutex<FakePlant>>) -> Self {
        FakeController { plant }
    }
}

impl ElevatorController for FakeController {
    fn elevator_count(&mut self) -> Result<i32, ControllerError> {
        let mut plant = self.plant.lock();
        plant.call("elevator_count")?;
        Ok(plant.cars.len() as i32)
    }

    fn floor_count(&mut self) -> Result<i32, ControllerError> {
        let mut plant = self.plant.lock();
        plant.call("floor_count")?;
        Ok(plant.num_floors())
    }

    fn floor_height(&mut self) -> Result<i32, ControllerError> {
        let mut plant = self.plant.lock();
        plant.call("floor_height")?;
        Ok(plant.floor_height)
    }

    fn elevator_capacity(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        Ok(self.plant.lock().car("elevator_capacity", elevator)?.capacity)
    }

    fn committed_direction(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        Ok(self.plant.lock().car("committed_direction", elevator)?.direction.code())
    }

    fn set_committed_direction(&mut self, elevator: usize, direction: Direction) -> Result<(), ControllerError> {
        self.plant.lock().car("set_committed_direction", elevator)?.direction = direction;
        Ok(())
    }

    fn acceleration(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        Ok(self.plant.lock().car("acceleration", elevator)?.acceleration)
    }

    fn door_status(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        Ok(self.plant.lock().car("door_status", elevator)?.door_status.code())
    }

    fn set_door_status(&mut self, elevator: usize, door_status: DoorStatus) -> Result<(), ControllerError> {
        self.plant.lock().car("set_door_status", elevator)?.door_status = door_status;
        Ok(())
    }

    fn current_floor(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        Ok(self.plant.lock().car("current_floor", elevator)?.current_floor)
    }

    fn position(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        let mut plant = self.plant.lock();
        let floor_height = plant.floor_height;
        Ok(plant.car("position", elevator)?.current_floor * floor_height)
    }

    fn speed(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        Ok(self.plant.lock().car("speed", elevator)?.speed)
    }

    fn weight(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        Ok(self.plant.lock().car("weight", elevator)?.weight)
    }

    fn destination_button(&mut self, elevator: usize, floor: i32) -> Result<bool, ControllerError> {
        let mut plant = self.plant.lock();
        let floor = plant.floor("destination_button", floor)?;
        Ok(plant.car("destination_button", elevator)?.buttons[floor])
    }

    fn floor_serviced(&mut self, elevator: usize, floor: i32) -> Result<bool, ControllerError> {
        let mut plant = self.plant.lock();
        let floor = plant.floor("floor_serviced", floor)?;
        Ok(plant.car("floor_serviced", elevator)?.serviced[floor])
    }

    fn set_floor_serviced(&mut self, elevator: usize, floor: i32, serviced: bool) -> Result<(), ControllerError> {
        let mut plant = self.plant.lock();
        let floor = plant.floor("set_floor_serviced", floor)?;
        plant.car("set_floor_serviced", elevator)?.serviced[floor] = serviced;
        Ok(())
    }

    fn target_floor(&mut self, elevator: usize) -> Result<i32, ControllerError> {
        Ok(self.plant.lock().car("target_floor", elevator)?.target_floor)
    }

    fn set_target_floor(&mut self, elevator: usize, floor: i32) -> Result<(), ControllerError> {
        let mut plant = self.plant.lock();
        plant.floor("set_target_floor", floor)?;
        plant.car("set_target_floor", elevator)?.target_floor = floor;
        Ok(())
    }

    fn floor_call_up(&mut self, floor: i32) -> Result<bool, ControllerError> {
        let mut plant = self.plant.lock();
        let floor = plant.floor("floor_call_up", floor)?;
        plant.call("floor_call_up")?;
        Ok(plant.calls_up[floor])
    }

    fn floor_call_down(&mut self, floor: i32) -> Result<bool, ControllerError> {
        let mut plant = self.plant.lock();
        let floor = plant.floor("floor_call_down", floor)?;
        plant.call("floor_call_down")?;
        Ok(plant.calls_down[floor])
    }

    fn clock_tick(&mut self) -> Result<i64, ControllerError> {
        let mut plant = self.plant.lock();
        plant.call("clock_tick")?;
        Ok(plant.clock)
    }
}

/// Hands out controllers bound to one shared plant. A successful connect
/// brings the plant back online.
#[derive(Clone)]
pub struct FakeConnector {
    plant: Arc<Mutex<FakePlant>>,
}

impl FakeConnector {
    pub fn new(plant: FakePlant) -> Self {
        FakeConnector { plant: plant.shared() }
    }

    pub fn plant(&self) -> MutexGuard<'_, FakePlant> {
        self.plant.lock()
    }
}

impl Connector for FakeConnector {
    type Controller = FakeController;

    fn connect(&self) -> Result<FakeController, ControllerError> {
        let mut plant = self.plant.lock();
        if plant.refuse_connects > 0 {
            plant.refuse_connects -= 1;
            return Err(ControllerError::Unreachable("connection refused".to_string()));
        }
        plant.online = true;
        plant.connects += 1;
        Ok(FakeController::new(Arc::clone(&self.plant)))
    }
}
