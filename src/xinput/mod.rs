//! XInput controller support
//!
//! Provides the controller state model, the native gateway abstraction, and
//! the polling hub that refreshes all four controller slots from a dedicated
//! background thread.

pub mod battery;
pub mod controller;
pub mod gateway;
pub mod hub;
pub mod state;

pub use battery::{BatteryDevice, BatteryInfo, BatteryLevel, BatteryType};
pub use controller::{Controller, StateChange};
pub use gateway::{Capabilities, GamepadGateway, GatewayError};
pub use hub::{ControllerHub, MAX_CONTROLLERS};
pub use state::{Button, ControllerState, GamepadSnapshot, StickPos};

#[cfg(windows)]
pub use gateway::XInputGateway;
