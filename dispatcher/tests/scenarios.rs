use dispatcher::{resolve, Dispatch};
use shared_resources::building::Building;
use shared_resources::command::Command;
use shared_resources::direction::{Direction, DoorStatus};

fn parked(num_elevators: i32, num_floors: i32, direction: Direction) -> Building {
    let capacities = vec![800; num_elevators as usize];
    let mut building = Building::new(num_elevators, num_floors, 3, &capacities).unwrap();
    for elevator in building.elevators_mut() {
        elevator.set_direction(direction);
        elevator.set_door_status(DoorStatus::Open);
    }
    building
}

#[test]
fn idle_car_without_calls_stays_uncommitted() {
    let building = parked(1, 5, Direction::Uncommitted);
    assert_eq!(
        resolve(&building),
        vec![Dispatch { elevator: 0, command: Command::Direction(Direction::Uncommitted) }]
    );
}

#[test]
fn idle_car_heads_up_to_a_destination_button() {
    let mut building = parked(1, 5, Direction::Uncommitted);
    building.elevator_mut(0).unwrap().set_button_pressed(1, true).unwrap();

    assert_eq!(
        resolve(&building),
        vec![
            Dispatch { elevator: 0, command: Command::TargetFloor(1) },
            Dispatch { elevator: 0, command: Command::Direction(Direction::Up) },
        ]
    );
}

#[test]
fn car_at_the_end_of_its_run_turns_for_a_call_below() {
    let mut building = parked(1, 6, Direction::Up);
    {
        let elevator = building.elevator_mut(0).unwrap();
        elevator.set_current_floor(4).unwrap();
        elevator.set_target_floor(4).unwrap();
    }
    building.floor_mut(1).unwrap().set_button_down_pressed(true);

    assert_eq!(
        resolve(&building),
        vec![
            Dispatch { elevator: 0, command: Command::TargetFloor(1) },
            Dispatch { elevator: 0, command: Command::Direction(Direction::Down) },
        ]
    );
}

#[test]
fn one_floor_call_goes_to_one_car_per_pass() {
    let mut building = parked(3, 6, Direction::Uncommitted);
    building.floor_mut(4).unwrap().set_button_up_pressed(true);

    let targets: Vec<usize> = resolve(&building)
        .into_iter()
        .filter(|d| d.command == Command::TargetFloor(4))
        .map(|d| d.elevator)
        .collect();
    assert_eq!(targets, vec![0]);
}

#[test]
fn cars_spread_over_several_calls() {
    let mut building = parked(2, 8, Direction::Up);
    building.floor_mut(3).unwrap().set_button_up_pressed(true);
    building.floor_mut(6).unwrap().set_button_up_pressed(true);

    let dispatches = resolve(&building);
    assert!(dispatches.contains(&Dispatch { elevator: 0, command: Command::TargetFloor(3) }));
    assert!(dispatches.contains(&Dispatch { elevator: 1, command: Command::TargetFloor(6) }));
}
