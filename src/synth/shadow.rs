//! Shadow state of synthesized keys and buttons
//!
//! The mapper owns this map and updates it from every event it successfully
//! dispatches, instead of re-querying the OS key state. It is the ground
//! truth for edge detection: a key-down is only emitted when the shadow says
//! the key is up, so two downs can never be sent without an intervening up.

use std::collections::HashSet;

use super::event::{InputEvent, MouseButton};
use super::keys::VirtualKey;

/// Which keys/buttons this process currently holds down via synthesis
#[derive(Debug, Clone, Default)]
pub struct KeyShadow {
    keys: HashSet<VirtualKey>,
    buttons: HashSet<MouseButton>,
}

impl KeyShadow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&self, key: VirtualKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn key_up(&self, key: VirtualKey) -> bool {
        !self.key_down(key)
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    /// Fold a dispatched event into the shadow.
    pub fn apply(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::KeyDown(key) => {
                self.keys.insert(key);
            },
            InputEvent::KeyUp(key) => {
                self.keys.remove(&key);
            },
            InputEvent::MouseDown(button) => {
                self.buttons.insert(button);
            },
            InputEvent::MouseUp(button) => {
                self.buttons.remove(&button);
            },
            InputEvent::MouseMove { .. } => {},
        }
    }

    /// Release events for everything currently held, keys before buttons.
    ///
    /// Used on shutdown so no synthesized key is left stuck down.
    pub fn release_all(&self) -> Vec<InputEvent> {
        let mut events: Vec<InputEvent> =
            self.keys.iter().map(|&k| InputEvent::KeyUp(k)).collect();
        events.extend(self.buttons.iter().map(|&b| InputEvent::MouseUp(b)));
        events
    }

    pub fn is_clear(&self) -> bool {
        self.keys.is_empty() && self.buttons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_key_transitions() {
        let mut shadow = KeyShadow::new();
        assert!(shadow.key_up(VirtualKey::Return));

        shadow.apply(&InputEvent::KeyDown(VirtualKey::Return));
        assert!(shadow.key_down(VirtualKey::Return));

        shadow.apply(&InputEvent::KeyUp(VirtualKey::Return));
        assert!(shadow.key_up(VirtualKey::Return));
        assert!(shadow.is_clear());
    }

    #[test]
    fn tracks_mouse_buttons_independently_of_keys() {
        let mut shadow = KeyShadow::new();
        shadow.apply(&InputEvent::MouseDown(MouseButton::Left));
        shadow.apply(&InputEvent::KeyDown(VirtualKey::Tab));

        assert!(shadow.button_down(MouseButton::Left));
        assert!(!shadow.button_down(MouseButton::Right));
        assert!(shadow.key_down(VirtualKey::Tab));

        shadow.apply(&InputEvent::MouseUp(MouseButton::Left));
        assert!(!shadow.button_down(MouseButton::Left));
        assert!(!shadow.is_clear());
    }

    #[test]
    fn mouse_moves_do_not_change_held_state() {
        let mut shadow = KeyShadow::new();
        shadow.apply(&InputEvent::MouseMove { dx: 10, dy: -10 });
        assert!(shadow.is_clear());
    }

    #[test]
    fn release_all_covers_everything_held() {
        let mut shadow = KeyShadow::new();
        shadow.apply(&InputEvent::KeyDown(VirtualKey::RWin));
        shadow.apply(&InputEvent::KeyDown(VirtualKey::Tab));
        shadow.apply(&InputEvent::MouseDown(MouseButton::Right));

        let releases = shadow.release_all();
        assert_eq!(releases.len(), 3);
        assert!(releases.contains(&InputEvent::KeyUp(VirtualKey::RWin)));
        assert!(releases.contains(&InputEvent::KeyUp(VirtualKey::Tab)));
        assert!(releases.contains(&InputEvent::MouseUp(MouseButton::Right)));

        let mut drained = shadow.clone();
        for ev in &releases {
            drained.apply(ev);
        }
        assert!(drained.is_clear());
    }
}
