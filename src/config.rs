//! Runtime configuration
//!
//! Built from CLI flags and environment variables at startup; there is no
//! config file. Values outside the supported ranges are clamped with a
//! warning rather than rejected.

use std::time::Duration;

use tracing::warn;

use crate::xinput::hub::{DEFAULT_RATE_HZ, MAX_RATE_HZ, MIN_RATE_HZ};

/// Polling rate while the mapper is idled via the controller chord, in Hz
pub const IDLE_RATE_HZ: u32 = 1;

/// Resolved application settings
#[derive(Debug, Clone, Copy)]
pub struct AppConfig {
    /// Active polling rate in Hz
    pub poll_hz: u32,
    /// Polling rate while idled in Hz
    pub idle_hz: u32,
    /// Controller slot to map from, if pinned; otherwise the lowest
    /// connected slot is used
    pub controller: Option<u32>,
    /// Cursor pixels per poll cycle of stick deflection
    pub mouse_step: i32,
    /// Settle window after chords, in milliseconds
    pub settle_ms: u64,
    /// Whether to run the tray UI
    pub tray_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_hz: DEFAULT_RATE_HZ,
            idle_hz: IDLE_RATE_HZ,
            controller: None,
            mouse_step: 10,
            settle_ms: 100,
            tray_enabled: true,
        }
    }
}

impl AppConfig {
    /// Clamp every field into its supported range, warning on adjustments.
    pub fn validated(mut self) -> Self {
        if self.poll_hz < MIN_RATE_HZ || self.poll_hz > MAX_RATE_HZ {
            let clamped = self.poll_hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ);
            warn!(
                requested = self.poll_hz,
                clamped, "polling rate out of range, clamping"
            );
            self.poll_hz = clamped;
        }
        if let Some(index) = self.controller {
            if index as usize >= crate::xinput::hub::MAX_CONTROLLERS {
                warn!(index, "controller slot out of range, using automatic selection");
                self.controller = None;
            }
        }
        if self.mouse_step <= 0 {
            warn!(step = self.mouse_step, "mouse step must be positive, using 10");
            self.mouse_step = 10;
        }
        self
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Convert a 1-based CLI slot number to a 0-based index.
///
/// Zero names no slot; it falls back to automatic selection with a warning,
/// the same way [`AppConfig::validated`] treats indexes past the last slot.
pub fn slot_from_cli(slot: Option<u32>) -> Option<u32> {
    match slot {
        Some(0) => {
            warn!("controller slots are numbered 1-4, using automatic selection");
            None
        },
        Some(n) => Some(n - 1),
        None => None,
    }
}
