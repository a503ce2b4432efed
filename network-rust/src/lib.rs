pub mod bus;
pub mod mqtt;
pub mod rpc;

#[cfg(any(test, feature = "local"))]
pub mod local;

mod sock;
