//! SendInput-backed dispatcher
//!
//! Builds a Win32 `INPUT` array from a batch of events and submits it with a
//! single `SendInput` call, so the OS receives the whole chord atomically.

use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE,
    MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};

use super::event::{InputEvent, MouseButton};
use super::keys::VirtualKey;
use super::{InputSink, SynthError};

/// Dispatches batches to the OS input queue via `SendInput`
#[derive(Debug, Default, Clone, Copy)]
pub struct SendInputDispatcher;

impl SendInputDispatcher {
    pub fn new() -> Self {
        Self
    }
}

fn keyboard_input(key: VirtualKey, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(key.code()),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn mouse_input(dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn to_native(event: &InputEvent) -> INPUT {
    match *event {
        InputEvent::KeyDown(key) => keyboard_input(key, KEYBD_EVENT_FLAGS(0)),
        InputEvent::KeyUp(key) => keyboard_input(key, KEYEVENTF_KEYUP),
        InputEvent::MouseDown(MouseButton::Left) => mouse_input(0, 0, MOUSEEVENTF_LEFTDOWN),
        InputEvent::MouseUp(MouseButton::Left) => mouse_input(0, 0, MOUSEEVENTF_LEFTUP),
        InputEvent::MouseDown(MouseButton::Right) => mouse_input(0, 0, MOUSEEVENTF_RIGHTDOWN),
        InputEvent::MouseUp(MouseButton::Right) => mouse_input(0, 0, MOUSEEVENTF_RIGHTUP),
        InputEvent::MouseMove { dx, dy } => mouse_input(dx, dy, MOUSEEVENTF_MOVE),
    }
}

impl InputSink for SendInputDispatcher {
    fn send(&mut self, events: &[InputEvent]) -> Result<(), SynthError> {
        if events.is_empty() {
            return Ok(());
        }

        let inputs: Vec<INPUT> = events.iter().map(to_native).collect();
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) } as usize;

        if sent == 0 {
            Err(SynthError::Rejected)
        } else if sent != inputs.len() {
            Err(SynthError::PartialDispatch {
                sent,
                expected: inputs.len(),
            })
        } else {
            Ok(())
        }
    }
}
