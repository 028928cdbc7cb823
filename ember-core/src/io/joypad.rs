use bitflags::bitflags;

use crate::{
    dbg,
    mem::{MemR, MemRW, MemW},
};

bitflags! {
    /// Host-facing key state. Active-low internally: a set bit means the
    /// key is released.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Keys: u8 {
        const DOWN   = 0b_1000_0000;
        const UP     = 0b_0100_0000;
        const LEFT   = 0b_0010_0000;
        const RIGHT  = 0b_0001_0000;
        const START  = 0b_0000_1000;
        const SELECT = 0b_0000_0100;
        const B      = 0b_0000_0010;
        const A      = 0b_0000_0001;

        const DEFAULT = 0b_1111_1111;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct JoyP: u8 {
        const SEL_BTNS = 0b_0010_0000;
        const SEL_DIRS = 0b_0001_0000;
        const LINES    = 0b_0000_1111;

        const DEFAULT = 0b_0000_1111;
    }
}

/// The 2x4 joypad matrix behind JOYP.
///
/// The register's two select bits (active-low) choose which half of the
/// matrix drives the low four lines; pressing a key on a selected line
/// pulls it low and requests the JOYPAD interrupt.
pub struct Joypad {
    joyp: JoyP,

    state: Keys,
}

impl Default for Joypad {
    fn default() -> Joypad {
        Joypad {
            joyp: JoyP::DEFAULT,
            state: Keys::DEFAULT,
        }
    }
}

impl Joypad {
    pub fn new() -> Joypad {
        Joypad::default()
    }

    /// Marks `keys` as pressed. Returns true when a selected matrix line
    /// fell, i.e. the JOYPAD interrupt should be requested.
    pub fn press(&mut self, keys: Keys) -> bool {
        let before = self.lines();
        self.state &= !keys;
        before & !self.lines() != 0
    }

    /// Marks `keys` as released.
    pub fn release(&mut self, keys: Keys) {
        self.state |= keys;
    }

    /// The low four lines as currently driven by the selected matrix half.
    fn lines(&self) -> u8 {
        if !self.joyp.contains(JoyP::SEL_BTNS) {
            self.state.bits() & 0x0F
        } else if !self.joyp.contains(JoyP::SEL_DIRS) {
            self.state.bits() >> 4
        } else {
            0x0F
        }
    }
}

impl MemR for Joypad {
    fn read(&self, _addr: u16) -> Result<u8, dbg::TraceEvent> {
        // Unused upper bits and unselected lines read 1
        Ok(0xC0 | (self.joyp & (JoyP::SEL_BTNS | JoyP::SEL_DIRS)).bits() | self.lines())
    }
}

impl MemW for Joypad {
    fn write(&mut self, _addr: u16, val: u8) -> Result<(), dbg::TraceEvent> {
        // Only the select bits are writable
        self.joyp = JoyP::from_bits_truncate(val & 0x30);
        Ok(())
    }
}

impl MemRW for Joypad {}
