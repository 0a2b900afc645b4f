//! Platform layer for the strategy evaluation engine
//!
//! Everything that touches the operating system lives here: structured
//! process invocation with wall-clock budgets, the OS service-manager
//! boundary, and the controller that swaps strategy payloads in and out of
//! the live service configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod controller;
pub mod error;
pub mod manager;

pub use command::{CommandOutput, CommandSpec, Credentials};
pub use controller::{ControllerState, ServiceController};
pub use error::{Error, Result};
pub use manager::{ServiceManager, SystemServiceManager};
