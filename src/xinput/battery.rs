//! Battery information for controllers and attached headsets

use std::fmt;

/// Which battery of a controller slot to query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryDevice {
    Gamepad,
    Headset,
}

/// Battery type as reported by XInput
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatteryType {
    /// No device in this slot (or battery info unavailable)
    #[default]
    Disconnected,
    /// Wired device; battery state can never change
    Wired,
    Alkaline,
    Nimh,
    Unknown,
}

impl BatteryType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x00 => BatteryType::Disconnected,
            0x01 => BatteryType::Wired,
            0x02 => BatteryType::Alkaline,
            0x03 => BatteryType::Nimh,
            _ => BatteryType::Unknown,
        }
    }
}

impl fmt::Display for BatteryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatteryType::Disconnected => "disconnected",
            BatteryType::Wired => "wired",
            BatteryType::Alkaline => "alkaline",
            BatteryType::Nimh => "NiMH",
            BatteryType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Charge level as reported by XInput (coarse, four steps)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum BatteryLevel {
    #[default]
    Empty,
    Low,
    Medium,
    Full,
}

impl BatteryLevel {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x01 => BatteryLevel::Low,
            0x02 => BatteryLevel::Medium,
            0x03 => BatteryLevel::Full,
            _ => BatteryLevel::Empty,
        }
    }
}

impl fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatteryLevel::Empty => "empty",
            BatteryLevel::Low => "low",
            BatteryLevel::Medium => "medium",
            BatteryLevel::Full => "full",
        };
        f.write_str(s)
    }
}

/// Battery type and charge level of one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatteryInfo {
    pub ty: BatteryType,
    pub level: BatteryLevel,
}

impl BatteryInfo {
    /// Wired devices cannot change battery state, so re-querying them every
    /// poll cycle is wasted work.
    pub fn is_wired(&self) -> bool {
        self.ty == BatteryType::Wired
    }
}

impl fmt::Display for BatteryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            BatteryType::Wired => write!(f, "wired"),
            BatteryType::Disconnected => write!(f, "no battery"),
            ty => write!(f, "{} ({})", ty, self.level),
        }
    }
}
