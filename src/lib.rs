//! MetroPad - gamepad navigation for the Metro shell
//!
//! Polls up to four XInput controllers from a background thread, detects
//! state transitions via packet sequence numbers, and translates button and
//! stick state into synthesized keyboard/mouse input so a gamepad can drive
//! the touch-oriented shell. A small tray UI exposes the controller
//! selector, a vibration test, and quit.

pub mod config;
pub mod mapper;
pub mod synth;
pub mod xinput;

#[cfg(windows)]
pub mod tray;
