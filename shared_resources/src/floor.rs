use crate::call::Call;

/// Call buttons of one building level. The two buttons are independent.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Floor {
    button_up_pressed: bool,
    button_down_pressed: bool,
}

impl Floor {
    pub fn new() -> Self {
        Floor::default()
    }

    pub fn button_up_pressed(&self) -> bool {
        self.button_up_pressed
    }

    pub fn button_down_pressed(&self) -> bool {
        self.button_down_pressed
    }

    pub fn is_pressed(&self, call: Call) -> bool {
        match call {
            Call::HallUp => self.button_up_pressed,
            Call::HallDown => self.button_down_pressed,
        }
    }

    /// Returns whether the stored state changed.
    pub fn set_button_up_pressed(&mut self, pressed: bool) -> bool {
        let changed = self.button_up_pressed != pressed;
        self.button_up_pressed = pressed;
        changed
    }

    /// Returns whether the stored state changed.
    pub fn set_button_down_pressed(&mut self, pressed: bool) -> bool {
        let changed = self.button_down_pressed != pressed;
        self.button_down_pressed = pressed;
        changed
    }
}
