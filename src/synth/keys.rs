//! Virtual-key codes used by the mapper
//!
//! A small subset of the Win32 virtual-key vocabulary; codes match the
//! `VK_*` constants so they can be passed straight into `SendInput`.

/// Virtual keys the mapper can press and release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum VirtualKey {
    /// Enter
    Return = 0x0D,
    Tab = 0x09,
    Shift = 0x10,
    Control = 0x11,
    Left = 0x25,
    Up = 0x26,
    Right = 0x27,
    Down = 0x28,
    /// Letter C (Win+C opens the charm bar)
    C = 0x43,
    /// Left Windows key, used for the start-screen and chord shortcuts
    LWin = 0x5B,
    /// Right Windows key, held as the app-switcher modifier
    RWin = 0x5C,
    /// Context-menu key
    Apps = 0x5D,
}

impl VirtualKey {
    /// Raw Win32 virtual-key code.
    pub fn code(self) -> u16 {
        self as u16
    }
}
