use crate::{
    dbg,
    io::{IrqController, IrqSource, Joypad, Ppu, Timer, VdmaRequest, VramDma, VDMA_BLOCK_LEN},
    mem::{MemR, MemRW, MemW, Memory},
};

const WRAM_BANKS: usize = 8;
const WRAM_BANK_SIZE: usize = 0x1000;

/// The 16-bit memory bus.
///
/// Owns every peripheral plus the work RAM banks and HRAM, dispatches
/// byte accesses by address range, and drives the dot-level subsystems in
/// lockstep from [`Bus::tick`]. Phase gating of the video memories is the
/// PPU's business; the bus only routes.
pub struct Bus {
    wram: Vec<Memory>,
    svbk: u8,

    pub hram: Memory,

    pub ppu: Ppu,
    pub vdma: VramDma,
    pub tim: Timer,
    pub joy: Joypad,
    pub itr: IrqController,
}

impl Default for Bus {
    fn default() -> Bus {
        Bus {
            wram: (0..WRAM_BANKS).map(|_| Memory::new(WRAM_BANK_SIZE)).collect(),
            svbk: 0,

            hram: Memory::new(127),

            ppu: Ppu::new(),
            vdma: VramDma::new(),
            tim: Timer::new(),
            joy: Joypad::new(),
            itr: IrqController::new(),
        }
    }
}

impl Bus {
    pub fn new() -> Bus {
        Bus::default()
    }

    /// Advances every dot-level subsystem by a single engine tick.
    ///
    /// Ordering is load-bearing: PPU first, then the byte-paced OAM-DMA,
    /// then one VRAM DMA block if HBLANK was just entered, then the timer,
    /// and finally the PPU's interrupt requests reach the controller.
    pub fn tick(&mut self) -> Result<(), dbg::TraceEvent> {
        self.ppu.tick();

        if let Some((src, dst)) = self.ppu.advance_oam_dma() {
            let b = self.read(src)?;
            self.ppu.oam_write_internal(dst, b)?;
        }

        if self.ppu.take_hblank_entered() && self.vdma.hblank_pending() {
            self.copy_vdma_block()?;
        }

        if self.tim.tick() {
            self.itr.request(IrqSource::Timer);
        }

        let requests = self.ppu.take_irq_requests();
        self.itr.request_all(requests);

        Ok(())
    }

    /// Moves one 16-byte block of the active VRAM DMA transfer.
    fn copy_vdma_block(&mut self) -> Result<(), dbg::TraceEvent> {
        if let Some((src, dst)) = self.vdma.advance_block() {
            for i in 0..VDMA_BLOCK_LEN {
                let b = self.read(src.wrapping_add(i))?;
                self.ppu.vram_write_internal(dst + i, b);
            }
        }
        Ok(())
    }

    /// Runs a general-purpose VRAM DMA to completion, inside the
    /// triggering register write.
    fn run_gdma(&mut self) -> Result<(), dbg::TraceEvent> {
        while self.vdma.general_pending() {
            self.copy_vdma_block()?;
        }
        Ok(())
    }

    /// The work RAM bank currently mapped at the switchable slot.
    fn wram_bank(&self) -> usize {
        usize::from(self.svbk.max(1))
    }
}

impl MemR for Bus {
    fn read(&self, addr: u16) -> Result<u8, dbg::TraceEvent> {
        match addr {
            0x8000..=0x9FFF => self.ppu.read(addr),
            0xC000..=0xCFFF => self.wram[0].read(addr - 0xC000),
            0xD000..=0xDFFF => self.wram[self.wram_bank()].read(addr - 0xD000),
            0xE000..=0xEFFF => self.wram[0].read(addr - 0xE000),
            0xF000..=0xFDFF => self.wram[self.wram_bank()].read(addr - 0xF000),
            0xFE00..=0xFE9F => self.ppu.read(addr),
            0xFF00 => self.joy.read(addr),
            0xFF04..=0xFF07 => self.tim.read(addr),
            0xFF40..=0xFF4C => self.ppu.read(addr),
            0xFF4F => self.ppu.read(addr),
            0xFF51..=0xFF55 => self.vdma.read(addr),
            0xFF68..=0xFF6C => self.ppu.read(addr),
            0xFF70 => Ok(0xF8 | self.svbk),
            0xFF80..=0xFFFE => self.hram.read(addr - 0xFF80),
            0xFF0F | 0xFFFF => self.itr.read(addr),
            _ => Err(dbg::TraceEvent::BusFault(addr)),
        }
    }
}

impl MemW for Bus {
    fn write(&mut self, addr: u16, val: u8) -> Result<(), dbg::TraceEvent> {
        match addr {
            0x8000..=0x9FFF => self.ppu.write(addr, val),
            0xC000..=0xCFFF => self.wram[0].write(addr - 0xC000, val),
            0xD000..=0xDFFF => {
                let bank = self.wram_bank();
                self.wram[bank].write(addr - 0xD000, val)
            }
            0xE000..=0xEFFF => self.wram[0].write(addr - 0xE000, val),
            0xF000..=0xFDFF => {
                let bank = self.wram_bank();
                self.wram[bank].write(addr - 0xF000, val)
            }
            0xFE00..=0xFE9F => self.ppu.write(addr, val),
            0xFF00 => self.joy.write(addr, val),
            0xFF04..=0xFF07 => self.tim.write(addr, val),
            0xFF40..=0xFF4C => self.ppu.write(addr, val),
            0xFF4F => self.ppu.write(addr, val),
            0xFF51..=0xFF54 => self.vdma.write(addr, val),
            0xFF55 => {
                if self.vdma.control_write(val) == VdmaRequest::General {
                    self.run_gdma()?;
                }
                Ok(())
            }
            0xFF68..=0xFF6C => self.ppu.write(addr, val),
            0xFF70 => {
                self.svbk = val & 0x07;
                Ok(())
            }
            0xFF80..=0xFFFE => self.hram.write(addr - 0xFF80, val),
            0xFF0F | 0xFFFF => self.itr.write(addr, val),
            _ => Err(dbg::TraceEvent::BusFault(addr)),
        }
    }
}

impl MemRW for Bus {}
