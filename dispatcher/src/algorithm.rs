/// ----- DISPATCH ALGORITHM -----
/// SCAN/LOOK assignment of cars to stops. Every tick each car that is ready
/// for a decision keeps serving requests in its committed direction until
/// none remain ahead, then turns around. Floor calls taken by one car are
/// claimed for the rest of the pass so no second car is sent to them.

use std::collections::BTreeSet;

use shared_resources::building::Building;
use shared_resources::call::Call;
use shared_resources::command::Command;
use shared_resources::direction::{Direction, DoorStatus};
use shared_resources::elevator::Elevator;
use shared_resources::floor::Floor;
use shared_resources::request::Request;

/// One command for one car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub elevator: usize,
    pub command: Command,
}

/// A floor a car can stop at, and the floor call it answers there, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stop {
    floor: i32,
    call: Option<Call>,
}

/// Runs one resolution pass over every car. A car heading somewhere gets a
/// target floor followed by its direction; a car with nothing to do only
/// gets `Uncommitted`.
pub fn resolve(building: &Building) -> Vec<Dispatch> {
    let mut claimed = BTreeSet::new();
    let mut dispatches = Vec::new();

    for (index, elevator) in building.elevators().iter().enumerate() {
        if !is_due(elevator) {
            continue;
        }
        let (direction, stop) = decide(elevator, building.floors(), &claimed);
        if let Some(stop) = stop {
            if let Some(call) = stop.call {
                claimed.insert(Request::new(stop.floor, call));
            }
            dispatches.push(Dispatch { elevator: index, command: Command::TargetFloor(stop.floor) });
        }
        dispatches.push(Dispatch { elevator: index, command: Command::Direction(direction) });
    }
    dispatches
}

/// A car standing at its target decides once its doors are open; a car
/// travelling decides only with its doors closed.
fn is_due(elevator: &Elevator) -> bool {
    if elevator.current_floor() == elevator.target_floor() {
        elevator.door_status() == DoorStatus::Open
    } else {
        elevator.door_status() == DoorStatus::Closed
    }
}

fn decide(elevator: &Elevator, floors: &[Floor], claimed: &BTreeSet<Request>) -> (Direction, Option<Stop>) {
    match elevator.direction() {
        Direction::Up => keep_or_reverse(elevator, floors, claimed, Direction::Up, Direction::Down),
        Direction::Down => keep_or_reverse(elevator, floors, claimed, Direction::Down, Direction::Up),
        Direction::Uncommitted => {
            let up = next_stop(elevator, floors, claimed, Direction::Up);
            let down = next_stop(elevator, floors, claimed, Direction::Down);
            let current = elevator.current_floor();
            match (up, down) {
                (None, None) => (Direction::Uncommitted, None),
                (Some(up), None) => (Direction::Up, Some(up)),
                (None, Some(down)) => (Direction::Down, Some(down)),
                (Some(up), Some(down)) => {
                    if up.floor - current <= current - down.floor {
                        (Direction::Up, Some(up))
                    } else {
                        (Direction::Down, Some(down))
                    }
                }
            }
        }
    }
}

fn keep_or_reverse(
    elevator: &Elevator,
    floors: &[Floor],
    claimed: &BTreeSet<Request>,
    heading: Direction,
    opposite: Direction,
) -> (Direction, Option<Stop>) {
    if let Some(stop) = next_stop(elevator, floors, claimed, heading) {
        return (heading, Some(stop));
    }
    match next_stop(elevator, floors, claimed, opposite) {
        Some(stop) => (opposite, Some(stop)),
        None => (Direction::Uncommitted, None),
    }
}

/// Nearest work strictly beyond the current floor in `direction`. Falls back
/// to the farthest call for the opposite direction on that side, which is
/// where a car sweeping that way would turn around.
fn next_stop(elevator: &Elevator, floors: &[Floor], claimed: &BTreeSet<Request>, direction: Direction) -> Option<Stop> {
    let along = match Call::for_direction(direction) {
        Some(call) => call,
        None => return None,
    };
    let ahead = floors_ahead(elevator.current_floor(), floors.len() as i32, direction);

    let sweep = ahead.iter().find_map(|&floor| {
        if !serves(elevator, floor) {
            return None;
        }
        if is_open_call(floors, claimed, floor, along) {
            return Some(Stop { floor, call: Some(along) });
        }
        if elevator.button_pressed(floor).unwrap_or(false) {
            return Some(Stop { floor, call: None });
        }
        None
    });
    if sweep.is_some() {
        return sweep;
    }

    let turning = along.opposite();
    ahead
        .iter()
        .rev()
        .find(|&&floor| serves(elevator, floor) && is_open_call(floors, claimed, floor, turning))
        .map(|&floor| Stop { floor, call: Some(turning) })
}

/// Floors strictly past `current` in `direction`, nearest first.
fn floors_ahead(current: i32, num_floors: i32, direction: Direction) -> Vec<i32> {
    match direction {
        Direction::Up => ((current + 1)..num_floors).collect(),
        Direction::Down => (0..current.min(num_floors)).rev().collect(),
        Direction::Uncommitted => Vec::new(),
    }
}

fn serves(elevator: &Elevator, floor: i32) -> bool {
    elevator.floor_serviced(floor).unwrap_or(false)
}

fn is_open_call(floors: &[Floor], claimed: &BTreeSet<Request>, floor: i32, call: Call) -> bool {
    let pressed = floors.get(floor as usize).map_or(false, |f| f.is_pressed(call));
    pressed && !claimed.contains(&Request::new(floor, call))
}
