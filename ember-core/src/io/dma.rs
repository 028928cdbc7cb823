use tracing::trace;

use crate::{
    dbg,
    mem::{MemR, MemRW, MemW},
};

/// Number of bytes moved by a full OAM-DMA transfer.
pub const OAM_DMA_LEN: u16 = 0xA0;

/// Dots between the trigger write and the first byte moving.
const OAM_DMA_START_DELAY: u8 = 2;

/// Bytes per VRAM DMA block.
pub const VDMA_BLOCK_LEN: u16 = 16;

/// A byte-paced copy from an arbitrary bus address to OAM.
///
/// The context holds addresses and progress only; the owner performs the
/// actual bus read and OAM write for each step, so no back-reference into
/// the engine is needed.
pub struct OamDma {
    src: u16,
    ticks: u16,
    delay: u8,
}

impl OamDma {
    /// Creates a transfer sourcing from `high_byte << 8`.
    pub fn new(high_byte: u8) -> OamDma {
        trace!(src = high_byte, "OAM-DMA started");

        OamDma {
            src: u16::from(high_byte) << 8,
            ticks: 0,
            delay: OAM_DMA_START_DELAY,
        }
    }

    /// Advances the transfer by a single dot.
    ///
    /// Returns the source address and OAM offset of the byte to move, or
    /// `None` while the start delay is still running down.
    pub fn advance(&mut self) -> Option<(u16, u16)> {
        if self.delay > 0 {
            self.delay -= 1;
            return None;
        }

        let step = (self.src.wrapping_add(self.ticks), self.ticks);
        self.ticks += 1;
        Some(step)
    }

    /// True once the start delay has elapsed and bytes are moving.
    pub fn in_flight(&self) -> bool {
        self.delay == 0
    }

    /// True when all 160 bytes have been transferred.
    pub fn finished(&self) -> bool {
        self.delay == 0 && self.ticks >= OAM_DMA_LEN
    }
}

/// What a write to the transfer-control register kicked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VdmaRequest {
    /// Copy every block now, inside the triggering write.
    General,
    /// Copy one block per HBLANK entry from now on.
    PerHblank,
    /// An active HBLANK-paced transfer was cancelled instead.
    Cancelled,
}

/// The VRAM DMA engine behind HDMA1-HDMA5.
///
/// Source and destination are latched with their low four bits forced to
/// zero; the destination is an offset into the currently selected VRAM
/// bank. Block stepping is performed by the owner, one `(src, dst)` pair
/// per 16-byte block.
pub struct VramDma {
    src: u16,
    dst: u16,
    blocks: u8,
    active: bool,
    hblank_paced: bool,
}

impl Default for VramDma {
    fn default() -> VramDma {
        VramDma {
            src: 0x0000,
            dst: 0x0000,
            blocks: 0,
            active: false,
            hblank_paced: false,
        }
    }
}

impl VramDma {
    pub fn new() -> VramDma {
        VramDma::default()
    }

    /// Decodes a write to the transfer-control register.
    ///
    /// Bit 7 selects the transfer kind; bits 6..0 hold (length / 16) - 1.
    /// Writing with bit 7 clear while an HBLANK-paced transfer is active
    /// cancels it instead of starting anything.
    pub fn control_write(&mut self, val: u8) -> VdmaRequest {
        if self.active && self.hblank_paced && val & 0x80 == 0 {
            self.active = false;
            trace!(remaining = self.blocks, "HBLANK-DMA cancelled");
            return VdmaRequest::Cancelled;
        }

        self.blocks = (val & 0x7F) + 1;
        self.hblank_paced = val & 0x80 != 0;
        self.active = true;

        trace!(
            blocks = self.blocks,
            paced = self.hblank_paced,
            "VRAM DMA started"
        );

        if self.hblank_paced {
            VdmaRequest::PerHblank
        } else {
            VdmaRequest::General
        }
    }

    /// True when an HBLANK-paced transfer still has blocks to move.
    pub fn hblank_pending(&self) -> bool {
        self.active && self.hblank_paced
    }

    /// True when a general-purpose transfer still has blocks to move.
    pub fn general_pending(&self) -> bool {
        self.active && !self.hblank_paced
    }

    /// Consumes one block, returning its source address and VRAM offset.
    ///
    /// The destination offset wraps within the 8 KiB bank so every write
    /// stays in bounds.
    pub fn advance_block(&mut self) -> Option<(u16, u16)> {
        if !self.active {
            return None;
        }

        let step = (self.src, self.dst & 0x1FF0);
        self.src = self.src.wrapping_add(VDMA_BLOCK_LEN);
        self.dst = self.dst.wrapping_add(VDMA_BLOCK_LEN);
        self.blocks -= 1;

        if self.blocks == 0 {
            self.active = false;
        }
        Some(step)
    }

    /// Remaining block count, for hosts polling transfer progress.
    pub fn remaining_blocks(&self) -> u8 {
        self.blocks
    }
}

impl MemR for VramDma {
    fn read(&self, addr: u16) -> Result<u8, dbg::TraceEvent> {
        Ok(match addr {
            0xFF51 => (self.src >> 8) as u8,
            0xFF52 => self.src as u8,
            0xFF53 => (self.dst >> 8) as u8,
            0xFF54 => self.dst as u8,
            // Remaining blocks - 1; bit 7 set when idle, 0xFF once done
            0xFF55 => {
                let count = self.blocks.wrapping_sub(1) & 0x7F;
                if self.active {
                    count
                } else {
                    0x80 | count
                }
            }
            _ => unreachable!(),
        })
    }
}

impl MemW for VramDma {
    fn write(&mut self, addr: u16, val: u8) -> Result<(), dbg::TraceEvent> {
        match addr {
            0xFF51 => self.src = (u16::from(val) << 8) | (self.src & 0x00F0),
            0xFF52 => self.src = (self.src & 0xFF00) | u16::from(val & 0xF0),
            0xFF53 => self.dst = (u16::from(val & 0x1F) << 8) | (self.dst & 0x00F0),
            0xFF54 => self.dst = (self.dst & 0x1F00) | u16::from(val & 0xF0),
            // The control register needs the bus around it; Bus handles it
            0xFF55 => unreachable!(),
            _ => unreachable!(),
        };
        Ok(())
    }
}

impl MemRW for VramDma {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oam_dma_delays_two_ticks_then_streams() {
        let mut dma = OamDma::new(0xC0);

        assert!(!dma.in_flight());
        assert_eq!(dma.advance(), None);
        assert_eq!(dma.advance(), None);
        assert!(dma.in_flight());

        assert_eq!(dma.advance(), Some((0xC000, 0x00)));
        assert_eq!(dma.advance(), Some((0xC001, 0x01)));

        for _ in 2..0xA0 {
            dma.advance();
        }
        assert!(dma.finished());
    }

    #[test]
    fn vdma_latches_masked_addresses() {
        let mut dma = VramDma::new();

        dma.write(0xFF51, 0xC1).unwrap();
        dma.write(0xFF52, 0x2F).unwrap();
        dma.write(0xFF53, 0xFF).unwrap();
        dma.write(0xFF54, 0x3F).unwrap();

        assert_eq!(dma.read(0xFF51).unwrap(), 0xC1);
        assert_eq!(dma.read(0xFF52).unwrap(), 0x20);
        assert_eq!(dma.read(0xFF53).unwrap(), 0x1F);
        assert_eq!(dma.read(0xFF54).unwrap(), 0x30);
    }

    #[test]
    fn general_transfer_steps_through_blocks() {
        let mut dma = VramDma::new();
        dma.write(0xFF51, 0xC0).unwrap();
        dma.write(0xFF52, 0x00).unwrap();
        dma.write(0xFF53, 0x00).unwrap();
        dma.write(0xFF54, 0x40).unwrap();

        assert_eq!(dma.control_write(0x01), VdmaRequest::General);
        assert_eq!(dma.advance_block(), Some((0xC000, 0x0040)));
        assert_eq!(dma.advance_block(), Some((0xC010, 0x0050)));
        assert_eq!(dma.advance_block(), None);
        assert_eq!(dma.read(0xFF55).unwrap(), 0xFF);
    }

    #[test]
    fn hblank_transfer_cancels_on_clear_bit7_write() {
        let mut dma = VramDma::new();

        assert_eq!(dma.control_write(0x85), VdmaRequest::PerHblank);
        assert!(dma.hblank_pending());
        dma.advance_block();

        assert_eq!(dma.control_write(0x00), VdmaRequest::Cancelled);
        assert!(!dma.hblank_pending());
        assert_eq!(dma.read(0xFF55).unwrap(), 0x80 | 4);
    }
}
