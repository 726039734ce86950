//! Per-slot controller device
//!
//! Holds the current and previous sampled states for one XInput slot,
//! detects changes via the packet sequence number, and layers the timed
//! motor-stop mechanism on top of the native vibration call.
//!
//! The polling thread is the only writer of the inner state; the UI thread
//! reads through the public accessors and issues vibration requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::battery::{BatteryDevice, BatteryInfo};
use super::gateway::{Capabilities, GamepadGateway, GatewayError};
use super::state::{Button, ControllerState, GamepadSnapshot, StickPos};

/// Raised when a slot's packet sequence number advanced between two polls
///
/// Snapshots are carried by value; the receiver never observes further
/// mutation by the polling thread.
#[derive(Debug, Clone, Copy)]
pub struct StateChange {
    pub index: u32,
    pub previous: ControllerState,
    pub current: ControllerState,
}

#[derive(Debug, Clone, Copy, Default)]
struct DeviceState {
    connected: bool,
    current: ControllerState,
    previous: ControllerState,
    battery_gamepad: BatteryInfo,
    battery_headset: BatteryInfo,
    /// Deadline of an armed motor-stop timer
    stop_motor_at: Option<Instant>,
}

/// One of the four controller slots
///
/// Created once at hub construction and alive for the process lifetime; a
/// slot is never destroyed, only re-queried. The connectivity flag flips as
/// hardware is plugged and unplugged, and the stale snapshot persists across
/// a disconnect until the next successful poll overwrites it.
pub struct Controller {
    index: u32,
    gateway: Arc<dyn GamepadGateway>,
    events: mpsc::UnboundedSender<StateChange>,
    inner: RwLock<DeviceState>,
}

impl Controller {
    pub(super) fn new(
        index: u32,
        gateway: Arc<dyn GamepadGateway>,
        events: mpsc::UnboundedSender<StateChange>,
    ) -> Self {
        Self {
            index,
            gateway,
            events,
            inner: RwLock::new(DeviceState::default()),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Refresh this slot from the native gateway.
    ///
    /// A failed query marks the slot disconnected and is logged at debug
    /// level only; the caller's sweep continues with the next slot. Returns
    /// `&Self` so a call can be chained with an accessor.
    pub fn update_state(&self) -> &Self {
        let fetched = self.gateway.get_state(self.index);
        let mut st = self.inner.write();

        match fetched {
            Ok(state) => {
                st.connected = true;
                st.current = state;
            },
            Err(e) => {
                st.connected = false;
                debug!("Controller {} query failed: {}", self.index, e);
            },
        }

        // Wired devices cannot change battery state, skip the query.
        if st.connected && !st.battery_gamepad.is_wired() {
            self.refresh_battery(&mut st);
        }

        if st.current.packet != st.previous.packet {
            let change = StateChange {
                index: self.index,
                previous: st.previous,
                current: st.current,
            };
            // Receiver gone means shutdown is in progress; nothing to do.
            let _ = self.events.send(change);
        }

        // Value copy, never a shared reference: delta detection depends on
        // previous and current being distinct storage.
        st.previous = st.current;

        if let Some(deadline) = st.stop_motor_at {
            if Instant::now() >= deadline {
                if let Err(e) = self.gateway.set_vibration(self.index, 0, 0) {
                    warn!("Controller {}: failed to stop vibration: {}", self.index, e);
                }
                st.stop_motor_at = None;
            }
        }

        drop(st);
        self
    }

    fn refresh_battery(&self, st: &mut DeviceState) {
        match self.gateway.get_battery_info(self.index, BatteryDevice::Gamepad) {
            Ok(info) => st.battery_gamepad = info,
            Err(e) => debug!("Controller {} battery query failed: {}", self.index, e),
        }
        match self.gateway.get_battery_info(self.index, BatteryDevice::Headset) {
            Ok(info) => st.battery_headset = info,
            Err(e) => debug!("Controller {} headset battery query failed: {}", self.index, e),
        }
    }

    /// Start the motors at the given strengths, each clamped into [0, 1].
    ///
    /// With a duration the stop timer is armed and the motors are turned off
    /// by the polling thread once the deadline passes; without one any armed
    /// timer is disarmed and the motors run until an explicit zero-strength
    /// call. A new call replaces the previous command and timer entirely.
    pub fn vibrate(&self, left: f64, right: f64, duration: Option<Duration>) {
        let left = motor_strength(left);
        let right = motor_strength(right);

        let mut st = self.inner.write();
        st.stop_motor_at = None;
        if let Err(e) = self.gateway.set_vibration(self.index, left, right) {
            warn!("Controller {}: vibration command failed: {}", self.index, e);
        }
        if let Some(length) = duration {
            st.stop_motor_at = Some(Instant::now() + length);
        }
    }

    /// Query device type and feature flags from the native gateway.
    pub fn capabilities(&self) -> Result<Capabilities, GatewayError> {
        self.gateway.get_capabilities(self.index)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.read().connected
    }

    /// Copy of the most recent snapshot.
    pub fn snapshot(&self) -> GamepadSnapshot {
        self.inner.read().current.pad
    }

    /// Copy of the most recent state including the packet number.
    pub fn state(&self) -> ControllerState {
        self.inner.read().current
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.inner.read().current.pad.pressed(button)
    }

    /// Trigger pressure, 0-255.
    pub fn left_trigger(&self) -> u8 {
        self.inner.read().current.pad.left_trigger
    }

    pub fn right_trigger(&self) -> u8 {
        self.inner.read().current.pad.right_trigger
    }

    pub fn left_stick(&self) -> StickPos {
        self.inner.read().current.pad.left_stick
    }

    pub fn right_stick(&self) -> StickPos {
        self.inner.read().current.pad.right_stick
    }

    pub fn gamepad_battery(&self) -> BatteryInfo {
        self.inner.read().battery_gamepad
    }

    pub fn headset_battery(&self) -> BatteryInfo {
        self.inner.read().battery_headset
    }
}

/// Scale a [0, 1] strength to a raw 16-bit motor value, clamping out-of-range
/// input to the nearest boundary.
fn motor_strength(strength: f64) -> u16 {
    (65535.0 * strength.clamp(0.0, 1.0)) as u16
}
