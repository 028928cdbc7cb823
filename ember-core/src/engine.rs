use tracing::{debug, warn};

use crate::{
    bus::Bus,
    dbg,
    io::{IrqSource, Keys, ServiceOutcome},
    mem::{MemR, MemW},
};

/// Dots per full frame, vertical blank included.
pub const FRAME_DOTS: u64 = 154 * 456;

/// An interrupt handler. Receives the engine, returns false to report
/// failure; the table holds one slot per source, all of the same shape.
pub type IrqHandler = fn(&mut Engine) -> bool;

/// The hardware registers exposed by name on the engine façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Lcdc,
    Stat,
    Scy,
    Scx,
    Ly,
    Lyc,
    Dma,
    Bgp,
    Obp0,
    Obp1,
    Wy,
    Wx,
    Vbk,
    Hdma1,
    Hdma2,
    Hdma3,
    Hdma4,
    Hdma5,
    Bgpi,
    Bgpd,
    Obpi,
    Obpd,
    Opri,
    Grpm,
    If,
    Ie,
}

impl Register {
    /// The register's bus address.
    pub fn addr(self) -> u16 {
        match self {
            Register::Lcdc => 0xFF40,
            Register::Stat => 0xFF41,
            Register::Scy => 0xFF42,
            Register::Scx => 0xFF43,
            Register::Ly => 0xFF44,
            Register::Lyc => 0xFF45,
            Register::Dma => 0xFF46,
            Register::Bgp => 0xFF47,
            Register::Obp0 => 0xFF48,
            Register::Obp1 => 0xFF49,
            Register::Wy => 0xFF4A,
            Register::Wx => 0xFF4B,
            Register::Vbk => 0xFF4F,
            Register::Hdma1 => 0xFF51,
            Register::Hdma2 => 0xFF52,
            Register::Hdma3 => 0xFF53,
            Register::Hdma4 => 0xFF54,
            Register::Hdma5 => 0xFF55,
            Register::Bgpi => 0xFF68,
            Register::Bgpd => 0xFF69,
            Register::Obpi => 0xFF6A,
            Register::Obpd => 0xFF6B,
            Register::Opri => 0xFF6C,
            Register::Grpm => 0xFF4C,
            Register::If => 0xFF0F,
            Register::Ie => 0xFFFF,
        }
    }
}

/// The Ember engine context.
///
/// Owns the bus (and through it every subsystem), the wrapping cycle
/// counter, the interrupt handler table and the frame-rendered callback.
/// The host makes simulated time pass with [`Engine::tick`]; everything
/// else is observation and register traffic.
pub struct Engine {
    bus: Bus,
    cycles: u64,

    handlers: [Option<IrqHandler>; IrqSource::COUNT],
    frame_callback: Option<Box<dyn FnMut(&[u32])>>,
}

impl Default for Engine {
    fn default() -> Engine {
        Engine {
            bus: Bus::new(),
            cycles: 0,

            handlers: [None; IrqSource::COUNT],
            frame_callback: None,
        }
    }
}

impl Engine {
    pub fn new() -> Engine {
        Engine::default()
    }

    /// Restores the power-up state.
    ///
    /// Registers and memories return to their boot values; the interrupt
    /// handler table and frame callback survive, like any other host-side
    /// configuration.
    pub fn reset(&mut self) {
        self.bus = Bus::new();
        self.cycles = 0;
    }

    /// Makes `n` dots of simulated time pass.
    ///
    /// Each dot advances the PPU, the DMA engines, the timer, and then
    /// services at most one pending interrupt. A failing subsystem or
    /// handler stops the loop and surfaces its fault; state advanced so
    /// far is not rewound.
    pub fn tick(&mut self, n: u64) -> Result<(), dbg::TraceEvent> {
        for _ in 0..n {
            self.bus.tick()?;
            self.cycles = self.cycles.wrapping_add(1);

            if self.bus.ppu.take_frame_ready() {
                self.notify_frame();
            }

            if let ServiceOutcome::HandlerFailed(src) = self.service_interrupts() {
                return Err(dbg::TraceEvent::HandlerFault(src.index()));
            }
        }

        // With the display disabled the state machine is frozen, but the
        // host still gets its callback once per call.
        if !self.bus.ppu.display_enabled() {
            self.notify_frame();
        }

        Ok(())
    }

    /// Dispatches the highest-priority enabled-and-requested interrupt.
    ///
    /// The IF bit is cleared before the handler runs, and stays cleared
    /// even when the handler fails. A source without a registered handler
    /// is acknowledged as a no-op.
    pub fn service_interrupts(&mut self) -> ServiceOutcome {
        if !self.bus.itr.master_enabled() {
            return ServiceOutcome::None;
        }
        let Some(src) = self.bus.itr.pending() else {
            return ServiceOutcome::None;
        };

        self.bus.itr.acknowledge(src);
        let handler = self.handlers[src.index()];
        match handler {
            Some(handler) if !handler(self) => ServiceOutcome::HandlerFailed(src),
            _ => ServiceOutcome::Serviced(src),
        }
    }

    fn notify_frame(&mut self) {
        if let Some(cb) = self.frame_callback.as_mut() {
            cb(self.bus.ppu.framebuffer());
        }
    }

    /// Reads a byte off the memory map, with phase gating applied.
    pub fn read_byte(&self, addr: u16) -> Result<u8, dbg::TraceEvent> {
        self.bus.read(addr)
    }

    /// Writes a byte to the memory map, with phase gating applied.
    pub fn write_byte(&mut self, addr: u16, val: u8) -> Result<(), dbg::TraceEvent> {
        self.bus.write(addr, val)
    }

    /// Reads a little-endian word off the memory map.
    pub fn read_word(&self, addr: u16) -> Result<u16, dbg::TraceEvent> {
        let lo = self.read_byte(addr)?;
        let hi = self.read_byte(addr.wrapping_add(1))?;
        Ok(u16::from(lo) | (u16::from(hi) << 8))
    }

    /// Writes a little-endian word to the memory map.
    pub fn write_word(&mut self, addr: u16, val: u16) -> Result<(), dbg::TraceEvent> {
        self.write_byte(addr, val as u8)?;
        self.write_byte(addr.wrapping_add(1), (val >> 8) as u8)
    }

    /// Reads a hardware register by name.
    pub fn register(&self, reg: Register) -> Result<u8, dbg::TraceEvent> {
        self.read_byte(reg.addr())
    }

    /// Writes a hardware register by name.
    pub fn set_register(&mut self, reg: Register, val: u8) -> Result<(), dbg::TraceEvent> {
        self.write_byte(reg.addr(), val)
    }

    /// Installs the frame-rendered callback, invoked at each frame's
    /// VBLANK entry (and once per [`Engine::tick`] call while the display
    /// is disabled). The callback must not re-enter the engine.
    pub fn set_frame_rendered_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&[u32]) + 'static,
    {
        self.frame_callback = Some(Box::new(callback));
    }

    pub fn clear_frame_rendered_callback(&mut self) {
        self.frame_callback = None;
    }

    /// Read-only view of the 160x144 RGBA framebuffer, `buf[y * 160 + x]`.
    pub fn framebuffer(&self) -> &[u32] {
        self.bus.ppu.framebuffer()
    }

    /// Requests an interrupt on the host's behalf.
    pub fn request_interrupt(&mut self, src: IrqSource) {
        self.bus.itr.request(src);
    }

    /// Installs (or removes) the handler for one interrupt source.
    pub fn set_interrupt_handler(&mut self, src: IrqSource, handler: Option<IrqHandler>) {
        self.handlers[src.index()] = handler;
    }

    /// Gates interrupt dispatch as a whole.
    pub fn set_master_enable(&mut self, enabled: bool) {
        self.bus.itr.set_master_enable(enabled);
    }

    pub fn master_enabled(&self) -> bool {
        self.bus.itr.master_enabled()
    }

    /// Starts an OAM-DMA transfer sourcing from `high_byte << 8`, exactly
    /// as a write to the DMA register would.
    pub fn initiate_oam_dma(&mut self, high_byte: u8) {
        self.bus.ppu.start_oam_dma(high_byte);
    }

    /// Starts a VRAM DMA transfer of `blocks` 16-byte blocks using the
    /// latched source and destination. A general-purpose transfer
    /// completes before this returns; an HBLANK-paced one moves a block
    /// per HBLANK entry. A zero-block request is inexpressible in the
    /// control register and is dropped.
    pub fn initiate_hdma(&mut self, blocks: u8, general: bool) -> Result<(), dbg::TraceEvent> {
        if blocks == 0 {
            warn!("ignoring zero-length VRAM DMA request");
            return Ok(());
        }
        debug!(blocks, general, "host-initiated VRAM DMA");

        let len = (blocks - 1) & 0x7F;
        let ctrl = if general { len } else { 0x80 | len };
        self.set_register(Register::Hdma5, ctrl)
    }

    /// Sets a 15-bit background palette color through the typed path.
    pub fn set_background_color(
        &mut self,
        palette: u8,
        color: u8,
        rgb: (u8, u8, u8),
    ) -> Result<(), dbg::TraceEvent> {
        self.bus.ppu.bg_palettes_mut().set_color(palette, color, rgb)
    }

    /// Reads back a background palette color as a 15-bit triple.
    pub fn background_color(&self, palette: u8, color: u8) -> Result<(u8, u8, u8), dbg::TraceEvent> {
        self.bus.ppu.bg_palettes().color(palette, color)
    }

    /// Reads back a background palette color as RGBA32 (components x8).
    pub fn background_color_rgba(&self, palette: u8, color: u8) -> Result<u32, dbg::TraceEvent> {
        self.bus.ppu.bg_palettes().rgba(palette, color)
    }

    /// Sets a 15-bit object palette color through the typed path.
    pub fn set_object_color(
        &mut self,
        palette: u8,
        color: u8,
        rgb: (u8, u8, u8),
    ) -> Result<(), dbg::TraceEvent> {
        self.bus.ppu.obj_palettes_mut().set_color(palette, color, rgb)
    }

    /// Reads back an object palette color as a 15-bit triple.
    pub fn object_color(&self, palette: u8, color: u8) -> Result<(u8, u8, u8), dbg::TraceEvent> {
        self.bus.ppu.obj_palettes().color(palette, color)
    }

    /// Reads back an object palette color as RGBA32 (components x8).
    pub fn object_color_rgba(&self, palette: u8, color: u8) -> Result<u32, dbg::TraceEvent> {
        self.bus.ppu.obj_palettes().rgba(palette, color)
    }

    /// Marks the given keys as pressed on the joypad matrix.
    pub fn press_key(&mut self, keys: Keys) {
        if self.bus.joy.press(keys) {
            self.bus.itr.request(IrqSource::Joypad);
        }
    }

    /// Marks the given keys as released.
    pub fn release_key(&mut self, keys: Keys) {
        self.bus.joy.release(keys);
    }

    /// Dots elapsed since power-up; wraps modularly at 64 bits.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_little_endian() {
        let mut engine = Engine::new();

        engine.write_word(0xC100, 0xBEEF).unwrap();
        assert_eq!(engine.read_byte(0xC100).unwrap(), 0xEF);
        assert_eq!(engine.read_byte(0xC101).unwrap(), 0xBE);
        assert_eq!(engine.read_word(0xC100).unwrap(), 0xBEEF);
    }

    #[test]
    fn named_registers_hit_their_addresses() {
        let mut engine = Engine::new();

        engine.set_register(Register::Scy, 0x42).unwrap();
        assert_eq!(engine.read_byte(0xFF42).unwrap(), 0x42);
        assert_eq!(engine.register(Register::Lcdc).unwrap(), 0x91);
        assert_eq!(engine.register(Register::Bgp).unwrap(), 0xFC);
        assert_eq!(engine.register(Register::Opri).unwrap(), 0xFF);
    }

    #[test]
    fn reset_restores_boot_state_but_keeps_handlers() {
        let mut engine = Engine::new();
        engine.set_interrupt_handler(IrqSource::Timer, Some(|_| true));
        engine.set_register(Register::Scx, 0x13).unwrap();
        engine.tick(1000).unwrap();

        engine.reset();
        assert_eq!(engine.cycles(), 0);
        assert_eq!(engine.register(Register::Scx).unwrap(), 0x00);
        assert!(engine.handlers[IrqSource::Timer.index()].is_some());
    }

    #[test]
    fn cycle_counter_tracks_ticks() {
        let mut engine = Engine::new();
        engine.tick(456).unwrap();
        assert_eq!(engine.cycles(), 456);
    }
}
