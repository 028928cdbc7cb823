use thiserror::Error;

/// Faults surfaced by the core.
///
/// A `TraceEvent` reports a failed operation to the host; it never unwinds
/// through pending PPU or DMA work. Gated accesses (locked VRAM/OAM/CRAM)
/// are not faults: they yield `0xFF` on read and drop writes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// Absolute address outside every mapped region.
    #[error("bus fault accessing 0x{0:04X}")]
    BusFault(u16),

    /// Access past the end of a raw memory block.
    #[error("memory fault accessing 0x{0:04X}")]
    MemFault(u16),

    /// Palette or color index outside the 8x4 CRAM grid.
    #[error("invalid palette slot {palette}/{color}")]
    InvalidPaletteSlot { palette: u8, color: u8 },

    /// A 5-bit color component larger than 31.
    #[error("color component out of range: {0}")]
    InvalidColorComponent(u8),

    /// An interrupt handler reported failure. Carries the source index in
    /// dispatch priority order; the IF bit has already been cleared.
    #[error("interrupt handler failed for source {0}")]
    HandlerFault(usize),
}
