pub mod adapter;
pub mod control_system;

pub use adapter::{run, Bridge, BridgeError, BridgeSettings, BridgeState, BridgeStats, Flow, Heartbeat};
pub use control_system::{ControlSystem, ReplicationError};
