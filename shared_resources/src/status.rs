use std::io::{stdout, Stdout, Write};

use crossterm::{cursor, terminal, ExecutableCommand, Result};

use crate::building::Building;

/// Redraws a table of the mirrored building in place, one frame per call.
pub struct StatusDisplay {
    stdout: Stdout,
    height: u16,
    drawn: bool,
}

impl StatusDisplay {
    pub fn new() -> Self {
        StatusDisplay { stdout: stdout(), height: 0, drawn: false }
    }

    pub fn print(&mut self, building: &Building) -> Result<()> {
        if self.drawn {
            self.stdout.execute(cursor::MoveUp(self.height))?;
            self.stdout.execute(terminal::Clear(terminal::ClearType::FromCursorDown))?;
        }
        let mut frame = Vec::new();
        render(&mut frame, building)?;
        self.height = frame.iter().filter(|b| **b == b'\n').count() as u16;
        self.stdout.write_all(&frame)?;
        self.stdout.flush()?;
        self.drawn = true;
        Ok(())
    }
}

impl Default for StatusDisplay {
    fn default() -> Self {
        Self::new()
    }
}

const ELEVATOR_RULE: &str = "+------+------------+----------+-------+--------+-------+--------+";
const FLOOR_RULE: &str = "+-------+------------+------------+";

fn render(out: &mut impl Write, building: &Building) -> std::io::Result<()> {
    writeln!(out, "{}", ELEVATOR_RULE)?;
    writeln!(
        out,
        "| {0:<4} | {1:<10} | {2:<8} | {3:<5} | {4:<6} | {5:<5} | {6:<6} |",
        "CAR", "DIRECTION", "DOORS", "FLOOR", "TARGET", "SPEED", "WEIGHT"
    )?;
    for (n, elevator) in building.elevators().iter().enumerate() {
        writeln!(out, "{}", ELEVATOR_RULE)?;
        writeln!(
            out,
            "| {0:<4} | {1:<10} | {2:<8} | {3:<5} | {4:<6} | {5:<5} | {6:<6} |",
            n,
            elevator.direction().as_str(),
            elevator.door_status().as_str(),
            elevator.current_floor(),
            elevator.target_floor(),
            elevator.speed(),
            elevator.weight()
        )?;
    }
    writeln!(out, "{}", ELEVATOR_RULE)?;

    writeln!(out, "{}", FLOOR_RULE)?;
    writeln!(out, "| {0:<5} | {1:<10} | {2:<10} |", "FLOOR", "HALL UP", "HALL DOWN")?;
    for (f, floor) in building.floors().iter().enumerate().rev() {
        writeln!(out, "{}", FLOOR_RULE)?;
        writeln!(
            out,
            "| {0:<5} | {1:<10} | {2:<10} |",
            f,
            floor.button_up_pressed(),
            floor.button_down_pressed()
        )?;
    }
    writeln!(out, "{}", FLOOR_RULE)?;
    Ok(())
}
