//! Native gamepad gateway
//!
//! Thin abstraction over the XInput entry points (get-state, set-vibration,
//! capabilities, battery). The rest of the crate only ever distinguishes
//! success from failure; a disconnected controller is an expected condition,
//! not an exceptional one.

use thiserror::Error;

use super::battery::{BatteryDevice, BatteryInfo};
use super::state::{ControllerState, GamepadSnapshot};

/// Failure of a native gamepad call
///
/// The core never inspects which error occurred beyond logging it; any
/// variant means "treat this device as disconnected for now".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("controller {0} is not connected")]
    NotConnected(u32),
    #[error("xinput is not available on this system")]
    Unavailable,
    #[error("xinput call failed for controller {0}")]
    Api(u32),
}

/// Device type, subtype and feature flags of a controller slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub device_type: u8,
    pub sub_type: u8,
    pub flags: u16,
    /// Which digital/analog controls the device actually reports
    pub gamepad: GamepadSnapshot,
    /// Maximum supported motor speeds (left, right)
    pub vibration: (u16, u16),
}

/// The native query/command surface for one of the four XInput slots
///
/// Implemented by [`XInputGateway`] in production and by scripted fakes in
/// tests, so the polling and mapping logic is exercised without hardware.
pub trait GamepadGateway: Send + Sync {
    /// Fetch the latest snapshot and packet sequence number for a slot.
    fn get_state(&self, index: u32) -> Result<ControllerState, GatewayError>;

    /// Set raw motor speeds. Zero for both stops vibration.
    fn set_vibration(&self, index: u32, left: u16, right: u16) -> Result<(), GatewayError>;

    /// Query device type and feature flags.
    fn get_capabilities(&self, index: u32) -> Result<Capabilities, GatewayError>;

    /// Query battery type and charge level for the gamepad or its headset.
    fn get_battery_info(
        &self,
        index: u32,
        device: BatteryDevice,
    ) -> Result<BatteryInfo, GatewayError>;
}

#[cfg(windows)]
pub use self::native::XInputGateway;

#[cfg(windows)]
mod native {
    use rusty_xinput::{XInputHandle, XInputUsageError};
    use tracing::debug;

    use super::*;
    use crate::xinput::battery::{BatteryLevel, BatteryType};
    use crate::xinput::state::StickPos;

    /// Production gateway backed by the system XInput DLL
    pub struct XInputGateway {
        handle: XInputHandle,
    }

    impl XInputGateway {
        /// Load the system XInput library.
        pub fn new() -> Result<Self, GatewayError> {
            let handle = XInputHandle::load_default().map_err(|e| {
                debug!("Failed to load XInput: {:?}", e);
                GatewayError::Unavailable
            })?;
            Ok(Self { handle })
        }
    }

    fn map_err(index: u32, err: XInputUsageError) -> GatewayError {
        match err {
            XInputUsageError::DeviceNotConnected => GatewayError::NotConnected(index),
            other => {
                debug!("XInput call failed for slot {}: {:?}", index, other);
                GatewayError::Api(index)
            },
        }
    }

    impl GamepadGateway for XInputGateway {
        fn get_state(&self, index: u32) -> Result<ControllerState, GatewayError> {
            // The Ex entry point also reports the Guide button.
            let state = self
                .handle
                .get_state_ex(index)
                .map_err(|e| map_err(index, e))?;

            Ok(ControllerState {
                packet: state.raw.dwPacketNumber,
                pad: GamepadSnapshot {
                    buttons: state.raw.Gamepad.wButtons,
                    left_trigger: state.raw.Gamepad.bLeftTrigger,
                    right_trigger: state.raw.Gamepad.bRightTrigger,
                    left_stick: StickPos {
                        x: state.raw.Gamepad.sThumbLX,
                        y: state.raw.Gamepad.sThumbLY,
                    },
                    right_stick: StickPos {
                        x: state.raw.Gamepad.sThumbRX,
                        y: state.raw.Gamepad.sThumbRY,
                    },
                },
            })
        }

        fn set_vibration(&self, index: u32, left: u16, right: u16) -> Result<(), GatewayError> {
            self.handle
                .set_state(index, left, right)
                .map_err(|e| map_err(index, e))
        }

        fn get_capabilities(&self, index: u32) -> Result<Capabilities, GatewayError> {
            let caps = self
                .handle
                .get_capabilities(index)
                .map_err(|e| map_err(index, e))?;

            Ok(Capabilities {
                device_type: caps.Type,
                sub_type: caps.SubType,
                flags: caps.Flags,
                gamepad: GamepadSnapshot {
                    buttons: caps.Gamepad.wButtons,
                    left_trigger: caps.Gamepad.bLeftTrigger,
                    right_trigger: caps.Gamepad.bRightTrigger,
                    left_stick: StickPos {
                        x: caps.Gamepad.sThumbLX,
                        y: caps.Gamepad.sThumbLY,
                    },
                    right_stick: StickPos {
                        x: caps.Gamepad.sThumbRX,
                        y: caps.Gamepad.sThumbRY,
                    },
                },
                vibration: (
                    caps.Vibration.wLeftMotorSpeed,
                    caps.Vibration.wRightMotorSpeed,
                ),
            })
        }

        fn get_battery_info(
            &self,
            index: u32,
            device: BatteryDevice,
        ) -> Result<BatteryInfo, GatewayError> {
            let raw = match device {
                BatteryDevice::Gamepad => self.handle.get_gamepad_battery_information(index),
                BatteryDevice::Headset => self.handle.get_headset_battery_information(index),
            }
            .map_err(|e| map_err(index, e))?;

            Ok(BatteryInfo {
                ty: BatteryType::from_raw(raw.BatteryType),
                level: BatteryLevel::from_raw(raw.BatteryLevel),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted gateway for exercising the poller and mapper without hardware.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// Fake gateway returning a scripted sequence of states for slot 0 and
    /// "not connected" for every other slot.
    pub struct ScriptedGateway {
        states: Mutex<VecDeque<Result<ControllerState, GatewayError>>>,
        /// Repeated once the script runs out
        last: Mutex<Result<ControllerState, GatewayError>>,
        pub vibrations: Mutex<Vec<(u32, u16, u16)>>,
        pub battery: Mutex<BatteryInfo>,
        pub battery_queries: AtomicUsize,
        pub state_queries: AtomicUsize,
        /// Order in which slots were queried, across all sweeps
        pub queried_slots: Mutex<Vec<u32>>,
    }

    impl ScriptedGateway {
        pub fn new(script: Vec<Result<ControllerState, GatewayError>>) -> Self {
            Self {
                states: Mutex::new(script.into()),
                last: Mutex::new(Err(GatewayError::NotConnected(0))),
                vibrations: Mutex::new(Vec::new()),
                battery: Mutex::new(BatteryInfo::default()),
                battery_queries: AtomicUsize::new(0),
                state_queries: AtomicUsize::new(0),
                queried_slots: Mutex::new(Vec::new()),
            }
        }

        pub fn connected(states: Vec<ControllerState>) -> Self {
            Self::new(states.into_iter().map(Ok).collect())
        }

        pub fn vibration_calls(&self) -> Vec<(u32, u16, u16)> {
            self.vibrations.lock().clone()
        }
    }

    impl GamepadGateway for ScriptedGateway {
        fn get_state(&self, index: u32) -> Result<ControllerState, GatewayError> {
            self.state_queries.fetch_add(1, Ordering::SeqCst);
            self.queried_slots.lock().push(index);
            if index != 0 {
                return Err(GatewayError::NotConnected(index));
            }
            let mut script = self.states.lock();
            match script.pop_front() {
                Some(next) => {
                    *self.last.lock() = next.clone();
                    next
                },
                None => self.last.lock().clone(),
            }
        }

        fn set_vibration(&self, index: u32, left: u16, right: u16) -> Result<(), GatewayError> {
            self.vibrations.lock().push((index, left, right));
            Ok(())
        }

        fn get_capabilities(&self, index: u32) -> Result<Capabilities, GatewayError> {
            if index == 0 {
                Ok(Capabilities::default())
            } else {
                Err(GatewayError::NotConnected(index))
            }
        }

        fn get_battery_info(
            &self,
            index: u32,
            _device: BatteryDevice,
        ) -> Result<BatteryInfo, GatewayError> {
            self.battery_queries.fetch_add(1, Ordering::SeqCst);
            if index == 0 {
                Ok(*self.battery.lock())
            } else {
                Err(GatewayError::NotConnected(index))
            }
        }
    }
}
