pub mod algorithm;
pub mod dispatcher;
pub mod state;

pub use algorithm::{resolve, Dispatch};
pub use dispatcher::{run, Dispatcher, DispatcherError, DispatcherSettings, DispatcherState, DispatcherStats};
pub use state::{Applied, Mirror, StaticInfo, UpdateError};
