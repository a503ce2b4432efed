pub mod building;
pub mod call;
pub mod command;
pub mod config;
pub mod controller;
pub mod direction;
pub mod elevator;
pub mod error;
pub mod fact;
pub mod floor;
pub mod request;
pub mod shutdown;
pub mod status;
pub mod topic;

#[cfg(any(test, feature = "fake"))]
pub mod fake;
