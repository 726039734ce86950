//! Controller state model
//!
//! Value types for a single sampled gamepad state. Snapshots are plain
//! `Copy` data so every assignment is a deep copy; `previous` and `current`
//! can never alias the same storage.

/// XInput button bit flags (wire layout of `wButtons`)
///
/// rusty_xinput doesn't export individual button constants,
/// so they are defined here from the documented wire values.
pub mod buttons {
    pub const DPAD_UP: u16 = 0x0001;
    pub const DPAD_DOWN: u16 = 0x0002;
    pub const DPAD_LEFT: u16 = 0x0004;
    pub const DPAD_RIGHT: u16 = 0x0008;
    pub const START: u16 = 0x0010;
    pub const BACK: u16 = 0x0020;
    pub const LEFT_THUMB: u16 = 0x0040;
    pub const RIGHT_THUMB: u16 = 0x0080;
    pub const LEFT_SHOULDER: u16 = 0x0100;
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    /// Only reported by the undocumented `XInputGetStateEx` entry point.
    pub const GUIDE: u16 = 0x0400;
    pub const A: u16 = 0x1000;
    pub const B: u16 = 0x2000;
    pub const X: u16 = 0x4000;
    pub const Y: u16 = 0x8000;
}

/// Deadzone radius recommended by the XInput API for the left stick.
pub const LEFT_THUMB_DEADZONE: i16 = 7849;
/// Deadzone radius recommended by the XInput API for the right stick.
pub const RIGHT_THUMB_DEADZONE: i16 = 8689;
/// Trigger pressure below this value is treated as released.
pub const TRIGGER_THRESHOLD: u8 = 30;

/// Digital controls of a standard XInput gamepad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    Start,
    Back,
    LeftThumb,
    RightThumb,
    LeftShoulder,
    RightShoulder,
    Guide,
    A,
    B,
    X,
    Y,
}

impl Button {
    /// The bit this button occupies in the `wButtons` field.
    pub fn mask(self) -> u16 {
        match self {
            Button::DpadUp => buttons::DPAD_UP,
            Button::DpadDown => buttons::DPAD_DOWN,
            Button::DpadLeft => buttons::DPAD_LEFT,
            Button::DpadRight => buttons::DPAD_RIGHT,
            Button::Start => buttons::START,
            Button::Back => buttons::BACK,
            Button::LeftThumb => buttons::LEFT_THUMB,
            Button::RightThumb => buttons::RIGHT_THUMB,
            Button::LeftShoulder => buttons::LEFT_SHOULDER,
            Button::RightShoulder => buttons::RIGHT_SHOULDER,
            Button::Guide => buttons::GUIDE,
            Button::A => buttons::A,
            Button::B => buttons::B,
            Button::X => buttons::X,
            Button::Y => buttons::Y,
        }
    }
}

/// Signed 16-bit stick deflection, centered at (0, 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickPos {
    pub x: i16,
    pub y: i16,
}

/// One sampled gamepad state: buttons, triggers, sticks
///
/// Immutable value type; compared field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GamepadSnapshot {
    /// Bitset over [`buttons`]
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub left_stick: StickPos,
    pub right_stick: StickPos,
}

impl GamepadSnapshot {
    pub fn pressed(&self, button: Button) -> bool {
        self.buttons & button.mask() != 0
    }
}

/// Snapshot plus the packet sequence number assigned by the native gateway
///
/// The packet number increments whenever the physical controller's reported
/// state changes; comparing it against the previous poll is the cheap
/// "anything new?" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerState {
    pub packet: u32,
    pub pad: GamepadSnapshot,
}
