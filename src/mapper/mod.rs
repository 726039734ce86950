//! Metro input mapper
//!
//! Translates controller state into the minimal set of synthesized key and
//! mouse transitions, edge-triggered against the mapper's own shadow of what
//! it currently holds down. Chords (modifier + key sequences) are delivered
//! as single atomic batches, followed by a non-blocking settle window during
//! which no further mapping pass runs, so chords never overlap.

use std::time::{Duration, Instant};

use crate::synth::{InputEvent, InputSink, KeyShadow, MouseButton, SynthError, VirtualKey};
use crate::xinput::state::RIGHT_THUMB_DEADZONE;
use crate::xinput::{Button, GamepadSnapshot};

/// Polling mode toggled by the Guide+LB+RB chord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Full-rate polling, mapping active
    Active,
    /// Reduced-rate polling (1 Hz), mapping suppressed
    Idle,
}

impl PollMode {
    pub fn toggled(self) -> Self {
        match self {
            PollMode::Active => PollMode::Idle,
            PollMode::Idle => PollMode::Active,
        }
    }
}

/// Tunables for the mapper
#[derive(Debug, Clone, Copy)]
pub struct MapperSettings {
    /// Cursor movement per poll cycle when the stick is deflected
    pub mouse_step: i32,
    /// Settle window after dispatching a chord
    pub settle: Duration,
    /// Per-axis right-stick threshold; deflection must exceed it strictly
    pub stick_deadzone: i16,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            mouse_step: 10,
            settle: Duration::from_millis(100),
            stick_deadzone: RIGHT_THUMB_DEADZONE,
        }
    }
}

/// Outcome of one mapping pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperVerdict {
    /// Controls were evaluated and any due transitions dispatched
    Mapped,
    /// The pass was skipped because a settle window is still open
    HeldOff,
    /// The idle-mode chord fired; the caller should toggle the poll mode
    ToggleIdle,
}

/// Edge-triggered controller-to-keyboard/mouse mapper
pub struct MetroMapper<S: InputSink> {
    sink: S,
    shadow: KeyShadow,
    settings: MapperSettings,
    /// Rising-edge tracking for the Start chord, which has no held key in
    /// the shadow to detect repeats with
    start_held: bool,
    /// End of the current settle window, if one is open
    hold_until: Option<Instant>,
}

impl<S: InputSink> MetroMapper<S> {
    pub fn new(sink: S, settings: MapperSettings) -> Self {
        Self {
            sink,
            shadow: KeyShadow::new(),
            settings,
            start_held: false,
            hold_until: None,
        }
    }

    pub fn shadow(&self) -> &KeyShadow {
        &self.shadow
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run one mapping pass against the latest snapshot.
    pub fn apply(&mut self, pad: &GamepadSnapshot) -> Result<MapperVerdict, SynthError> {
        self.apply_at(pad, Instant::now())
    }

    /// Run one mapping pass with an explicit clock, for testability.
    pub fn apply_at(
        &mut self,
        pad: &GamepadSnapshot,
        now: Instant,
    ) -> Result<MapperVerdict, SynthError> {
        if self.settling(now) {
            return Ok(MapperVerdict::HeldOff);
        }

        // Guide+LB+RB toggles idle polling; the settle window doubles as a
        // bounce guard so holding the chord doesn't toggle every cycle.
        if Self::idle_chord_pressed(pad) {
            self.hold_until = Some(now + self.settings.settle);
            return Ok(MapperVerdict::ToggleIdle);
        }

        // Guide alone calls up the start screen; on its release edge the
        // rest of the pass is skipped, matching one key transition per pass.
        if self.guide(pad)? {
            return Ok(MapperVerdict::Mapped);
        }

        self.dpad_down(pad)?;
        self.dpad_up(pad, now)?;
        self.dpad_left(pad)?;
        self.dpad_right(pad)?;

        self.button_a(pad)?;
        self.button_b(pad, now)?;
        self.button_y(pad, now)?;
        self.button_x(pad)?;

        self.left_shoulder(pad)?;
        self.right_shoulder(pad)?;

        self.right_stick(pad)?;

        self.button_start(pad, now)?;

        Ok(MapperVerdict::Mapped)
    }

    /// Mapping pass for idle mode: only the toggle chord is evaluated,
    /// every ordinary control stays inert.
    pub fn check_idle_chord(&mut self, pad: &GamepadSnapshot) -> MapperVerdict {
        self.check_idle_chord_at(pad, Instant::now())
    }

    pub fn check_idle_chord_at(&mut self, pad: &GamepadSnapshot, now: Instant) -> MapperVerdict {
        if self.settling(now) {
            return MapperVerdict::HeldOff;
        }
        if Self::idle_chord_pressed(pad) {
            self.hold_until = Some(now + self.settings.settle);
            return MapperVerdict::ToggleIdle;
        }
        MapperVerdict::Mapped
    }

    /// True while a settle window is open; expires it otherwise.
    fn settling(&mut self, now: Instant) -> bool {
        if let Some(deadline) = self.hold_until {
            if now < deadline {
                return true;
            }
            self.hold_until = None;
        }
        false
    }

    fn idle_chord_pressed(pad: &GamepadSnapshot) -> bool {
        pad.pressed(Button::Guide)
            && pad.pressed(Button::LeftShoulder)
            && pad.pressed(Button::RightShoulder)
    }

    /// Release everything the shadow says we hold, as one batch.
    ///
    /// Called on shutdown and when mapping is paused, so no synthesized key
    /// is left stuck down.
    pub fn release_all(&mut self) -> Result<(), SynthError> {
        let releases = self.shadow.release_all();
        self.emit(&releases)
    }

    /// Dispatch a batch and, only on success, fold it into the shadow.
    fn emit(&mut self, events: &[InputEvent]) -> Result<(), SynthError> {
        if events.is_empty() {
            return Ok(());
        }
        self.sink.send(events)?;
        for event in events {
            self.shadow.apply(event);
        }
        Ok(())
    }

    /// Guide -> left Windows key (start screen). Returns true on the release
    /// edge, which ends the pass.
    fn guide(&mut self, pad: &GamepadSnapshot) -> Result<bool, SynthError> {
        if pad.pressed(Button::Guide) && self.shadow.key_up(VirtualKey::LWin) {
            self.emit(&[InputEvent::KeyDown(VirtualKey::LWin)])?;
        } else if !pad.pressed(Button::Guide) && self.shadow.key_down(VirtualKey::LWin) {
            self.emit(&[InputEvent::KeyUp(VirtualKey::LWin)])?;
            return Ok(true);
        }
        Ok(false)
    }

    /// D-pad Down -> down arrow, or Tab while the switcher modifier is held.
    fn dpad_down(&mut self, pad: &GamepadSnapshot) -> Result<(), SynthError> {
        if pad.pressed(Button::DpadDown) {
            if self.shadow.key_down(VirtualKey::RWin) {
                if self.shadow.key_up(VirtualKey::Tab) {
                    self.emit(&[InputEvent::KeyDown(VirtualKey::Tab)])?;
                }
            } else if self.shadow.key_up(VirtualKey::Down) {
                self.emit(&[InputEvent::KeyDown(VirtualKey::Down)])?;
            }
        } else if self.shadow.key_down(VirtualKey::RWin) && self.shadow.key_down(VirtualKey::Tab) {
            self.emit(&[InputEvent::KeyUp(VirtualKey::Tab)])?;
        } else if self.shadow.key_down(VirtualKey::Down) {
            self.emit(&[InputEvent::KeyUp(VirtualKey::Down)])?;
        }
        Ok(())
    }

    /// D-pad Up -> up arrow, or Shift+Tab (reverse cycling) while the
    /// switcher modifier is held.
    fn dpad_up(&mut self, pad: &GamepadSnapshot, now: Instant) -> Result<(), SynthError> {
        if pad.pressed(Button::DpadUp) {
            if self.shadow.key_down(VirtualKey::RWin) {
                if self.shadow.key_up(VirtualKey::Tab) {
                    self.emit(&[
                        InputEvent::KeyDown(VirtualKey::Shift),
                        InputEvent::KeyDown(VirtualKey::Tab),
                        InputEvent::KeyUp(VirtualKey::Shift),
                    ])?;
                }
            } else if self.shadow.key_up(VirtualKey::Up) {
                self.emit(&[InputEvent::KeyDown(VirtualKey::Up)])?;
            }
        } else if self.shadow.key_down(VirtualKey::RWin) && self.shadow.key_down(VirtualKey::Tab) {
            self.emit(&[InputEvent::KeyUp(VirtualKey::Tab)])?;
            self.hold_until = Some(now + self.settings.settle);
        } else if self.shadow.key_down(VirtualKey::Up) {
            self.emit(&[InputEvent::KeyUp(VirtualKey::Up)])?;
        }
        Ok(())
    }

    fn dpad_left(&mut self, pad: &GamepadSnapshot) -> Result<(), SynthError> {
        if pad.pressed(Button::DpadLeft) && self.shadow.key_up(VirtualKey::Left) {
            self.emit(&[InputEvent::KeyDown(VirtualKey::Left)])?;
        } else if !pad.pressed(Button::DpadLeft) && self.shadow.key_down(VirtualKey::Left) {
            self.emit(&[InputEvent::KeyUp(VirtualKey::Left)])?;
        }
        Ok(())
    }

    fn dpad_right(&mut self, pad: &GamepadSnapshot) -> Result<(), SynthError> {
        if pad.pressed(Button::DpadRight) && self.shadow.key_up(VirtualKey::Right) {
            self.emit(&[InputEvent::KeyDown(VirtualKey::Right)])?;
        } else if !pad.pressed(Button::DpadRight) && self.shadow.key_down(VirtualKey::Right) {
            self.emit(&[InputEvent::KeyUp(VirtualKey::Right)])?;
        }
        Ok(())
    }

    /// A -> Enter.
    fn button_a(&mut self, pad: &GamepadSnapshot) -> Result<(), SynthError> {
        if pad.pressed(Button::A) && self.shadow.key_up(VirtualKey::Return) {
            self.emit(&[InputEvent::KeyDown(VirtualKey::Return)])?;
        } else if !pad.pressed(Button::A) && self.shadow.key_down(VirtualKey::Return) {
            self.emit(&[InputEvent::KeyUp(VirtualKey::Return)])?;
        }
        Ok(())
    }

    /// B -> hold Win, tap Tab (app switcher); the modifier stays down until
    /// the button is released.
    fn button_b(&mut self, pad: &GamepadSnapshot, now: Instant) -> Result<(), SynthError> {
        if pad.pressed(Button::B) && self.shadow.key_up(VirtualKey::RWin) {
            self.emit(&[
                InputEvent::KeyDown(VirtualKey::RWin),
                InputEvent::KeyDown(VirtualKey::Tab),
                InputEvent::KeyUp(VirtualKey::Tab),
            ])?;
            self.hold_until = Some(now + self.settings.settle);
        } else if !pad.pressed(Button::B) && self.shadow.key_down(VirtualKey::RWin) {
            self.emit(&[InputEvent::KeyUp(VirtualKey::RWin)])?;
        }
        Ok(())
    }

    /// Y -> Ctrl+Tab chord (switch categories).
    ///
    /// Deliberately not edge-triggered: the chord leaves nothing held in the
    /// shadow, so it fires again on every pass while the button reads
    /// pressed. Known repeat-fire quirk, kept as designed.
    fn button_y(&mut self, pad: &GamepadSnapshot, now: Instant) -> Result<(), SynthError> {
        if pad.pressed(Button::Y) {
            self.emit(&[
                InputEvent::KeyDown(VirtualKey::Control),
                InputEvent::KeyDown(VirtualKey::Tab),
                InputEvent::KeyUp(VirtualKey::Tab),
                InputEvent::KeyUp(VirtualKey::Control),
            ])?;
            self.hold_until = Some(now + self.settings.settle);
        }
        Ok(())
    }

    /// X -> context-menu key.
    fn button_x(&mut self, pad: &GamepadSnapshot) -> Result<(), SynthError> {
        if pad.pressed(Button::X) && self.shadow.key_up(VirtualKey::Apps) {
            self.emit(&[InputEvent::KeyDown(VirtualKey::Apps)])?;
        } else if !pad.pressed(Button::X) && self.shadow.key_down(VirtualKey::Apps) {
            self.emit(&[InputEvent::KeyUp(VirtualKey::Apps)])?;
        }
        Ok(())
    }

    fn left_shoulder(&mut self, pad: &GamepadSnapshot) -> Result<(), SynthError> {
        if pad.pressed(Button::LeftShoulder) && !self.shadow.button_down(MouseButton::Left) {
            self.emit(&[InputEvent::MouseDown(MouseButton::Left)])?;
        } else if !pad.pressed(Button::LeftShoulder) && self.shadow.button_down(MouseButton::Left) {
            self.emit(&[InputEvent::MouseUp(MouseButton::Left)])?;
        }
        Ok(())
    }

    fn right_shoulder(&mut self, pad: &GamepadSnapshot) -> Result<(), SynthError> {
        if pad.pressed(Button::RightShoulder) && !self.shadow.button_down(MouseButton::Right) {
            self.emit(&[InputEvent::MouseDown(MouseButton::Right)])?;
        } else if !pad.pressed(Button::RightShoulder)
            && self.shadow.button_down(MouseButton::Right)
        {
            self.emit(&[InputEvent::MouseUp(MouseButton::Right)])?;
        }
        Ok(())
    }

    /// Right stick -> relative cursor movement, fixed step per axis beyond
    /// the deadzone. Stick up moves the cursor up (negative y).
    fn right_stick(&mut self, pad: &GamepadSnapshot) -> Result<(), SynthError> {
        let deadzone = self.settings.stick_deadzone;
        let step = self.settings.mouse_step;
        let stick = pad.right_stick;

        let mut dx = 0;
        let mut dy = 0;
        if stick.x > deadzone {
            dx = step;
        } else if stick.x < -deadzone {
            dx = -step;
        }
        if stick.y > deadzone {
            dy = -step;
        } else if stick.y < -deadzone {
            dy = step;
        }

        if dx != 0 || dy != 0 {
            self.emit(&[InputEvent::MouseMove { dx, dy }])?;
        }
        Ok(())
    }

    /// Start -> Win+C chord (charm bar), on the rising edge only.
    fn button_start(&mut self, pad: &GamepadSnapshot, now: Instant) -> Result<(), SynthError> {
        if pad.pressed(Button::Start) {
            if !self.start_held
                && self.shadow.key_up(VirtualKey::LWin)
                && self.shadow.key_up(VirtualKey::C)
            {
                self.emit(&[
                    InputEvent::KeyDown(VirtualKey::LWin),
                    InputEvent::KeyDown(VirtualKey::C),
                    InputEvent::KeyUp(VirtualKey::C),
                    InputEvent::KeyUp(VirtualKey::LWin),
                ])?;
                self.hold_until = Some(now + self.settings.settle);
            }
            self.start_held = true;
        } else {
            self.start_held = false;
        }
        Ok(())
    }
}
