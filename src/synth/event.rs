//! Synthesized input events

use super::keys::VirtualKey;

/// Mouse buttons the mapper can press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
}

/// One synthesized keyboard or mouse event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(VirtualKey),
    KeyUp(VirtualKey),
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    /// Relative cursor movement in pixels; positive y moves down
    MouseMove { dx: i32, dy: i32 },
}
