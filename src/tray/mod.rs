//! System tray UI
//!
//! A native tray icon with a menu for picking the mapped controller slot,
//! testing vibration, pausing the mapping, and quitting. The Win32 message
//! loop runs on its own OS thread; crossbeam channels carry commands to the
//! Tokio runtime and status snapshots back.

pub mod handler;
pub mod icons;
pub mod manager;

pub use handler::{spawn_tray, TrayHandle, TrayStatusPublisher};
pub use manager::TrayManager;

use crate::xinput::{BatteryInfo, MAX_CONTROLLERS};

/// Commands sent from the tray menu to the Tokio runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    /// Map input from the given controller slot
    SelectController(u32),
    /// Buzz the selected controller briefly
    TestVibration,
    /// Pause or resume input mapping
    ToggleMapping,
    /// Shut the application down
    Shutdown,
}

/// Updates sent from the runtime to the tray UI
#[derive(Debug, Clone)]
pub enum TrayUpdate {
    Status(StatusSnapshot),
}

/// Per-slot status shown in the menu
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStatus {
    pub connected: bool,
    pub battery: BatteryInfo,
}

/// Everything the tray menu displays, sampled periodically
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub slots: [SlotStatus; MAX_CONTROLLERS],
    /// Slot currently feeding the mapper
    pub selected: Option<u32>,
    pub mapping_paused: bool,
}

/// Selection and pause state shared between the runtime and the publisher
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionState {
    pub selected: Option<u32>,
    pub mapping_paused: bool,
}
