use super::call::Call;

/// A floor call: which button was pressed at which floor.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request {
    pub floor: i32,
    pub call: Call,
}

impl Request {
    pub fn new(floor: i32, call: Call) -> Self {
        Request { floor, call }
    }
}
