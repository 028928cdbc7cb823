use bitflags::bitflags;

use crate::{
    dbg,
    mem::{MemR, MemRW, MemW},
};

/// Interrupt sources, in dispatch priority order (lowest index wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IrqSource {
    VBlank = 0,
    LcdStat,
    Timer,
    Serial,
    Joypad,
    Rtc,
    Net,
}

impl IrqSource {
    pub const COUNT: usize = 7;

    /// All sources, highest priority first.
    pub const ALL: [IrqSource; IrqSource::COUNT] = [
        IrqSource::VBlank,
        IrqSource::LcdStat,
        IrqSource::Timer,
        IrqSource::Serial,
        IrqSource::Joypad,
        IrqSource::Rtc,
        IrqSource::Net,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn mask(self) -> IrqFlags {
        IrqFlags::from_bits_truncate(1 << self as u8)
    }
}

bitflags! {
    /// Request/enable bitfield over the seven interrupt sources.
    ///
    /// Bit positions match `IrqSource` priority indices; this is the layout
    /// of both IF and IE.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct IrqFlags: u8 {
        const VBLANK   = 0b_0000_0001;
        const LCD_STAT = 0b_0000_0010;
        const TIMER    = 0b_0000_0100;
        const SERIAL   = 0b_0000_1000;
        const JOYPAD   = 0b_0001_0000;
        const RTC      = 0b_0010_0000;
        const NET      = 0b_0100_0000;
    }
}

/// Outcome of one dispatch pass over the pending sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    /// The highest-priority enabled-and-requested source was acknowledged.
    Serviced(IrqSource),
    /// Nothing to dispatch: master enable off, or no source both enabled
    /// and requested.
    None,
    /// The handler for the acknowledged source reported failure.
    HandlerFailed(IrqSource),
}

/// IF/IE request and enable state plus the master-enable flag.
///
/// The controller only tracks state; dispatching to handlers is the
/// engine's job, since handlers receive the whole engine.
#[derive(Default)]
pub struct IrqController {
    ifg: IrqFlags,
    ien: IrqFlags,
    ime: bool,
}

impl IrqController {
    pub fn new() -> IrqController {
        IrqController::default()
    }

    /// Marks `src` as requested in IF.
    pub fn request(&mut self, src: IrqSource) {
        self.ifg |= src.mask();
    }

    /// Merges a whole request bitfield into IF.
    pub fn request_all(&mut self, flags: IrqFlags) {
        self.ifg |= flags;
    }

    pub fn set_master_enable(&mut self, enabled: bool) {
        self.ime = enabled;
    }

    pub fn master_enabled(&self) -> bool {
        self.ime
    }

    /// Returns the highest-priority source that is both enabled and
    /// requested, without consuming it. Ignores the master-enable flag.
    pub fn pending(&self) -> Option<IrqSource> {
        let active = self.ifg & self.ien;
        IrqSource::ALL
            .iter()
            .copied()
            .find(|src| active.contains(src.mask()))
    }

    /// Clears the IF bit for `src`.
    pub fn acknowledge(&mut self, src: IrqSource) {
        self.ifg.remove(src.mask());
    }

    pub fn requested(&self, src: IrqSource) -> bool {
        self.ifg.contains(src.mask())
    }
}

impl MemR for IrqController {
    fn read(&self, addr: u16) -> Result<u8, dbg::TraceEvent> {
        Ok(match addr {
            0xFF0F => self.ifg.bits() | 0x80,
            0xFFFF => self.ien.bits(),
            _ => unreachable!(),
        })
    }
}

impl MemW for IrqController {
    fn write(&mut self, addr: u16, val: u8) -> Result<(), dbg::TraceEvent> {
        match addr {
            0xFF0F => self.ifg = IrqFlags::from_bits_truncate(val),
            0xFFFF => self.ien = IrqFlags::from_bits_truncate(val),
            _ => unreachable!(),
        };
        Ok(())
    }
}

impl MemRW for IrqController {}
