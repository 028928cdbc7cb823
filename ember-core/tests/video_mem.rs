//! Phase gating of the video memories, bank selection, and palettes.

use ember_core::dbg::TraceEvent;
use ember_core::io::video::Mode;
use ember_core::{Engine, Register};

fn run_to_mode(engine: &mut Engine, mode: Mode) {
    while engine.bus().ppu.mode() != mode {
        engine.tick(1).unwrap();
    }
}

#[test]
fn vram_reads_gate_by_mode() {
    let mut engine = Engine::new();
    engine.write_byte(0x9000, 0x3C).unwrap();

    run_to_mode(&mut engine, Mode::PixelTransfer);
    assert_eq!(engine.read_byte(0x9000).unwrap(), 0xFF);
    engine.write_byte(0x9000, 0x11).unwrap(); // dropped

    run_to_mode(&mut engine, Mode::HBlank);
    assert_eq!(engine.read_byte(0x9000).unwrap(), 0x3C);

    run_to_mode(&mut engine, Mode::VBlank);
    assert_eq!(engine.read_byte(0x9000).unwrap(), 0x3C);
}

#[test]
fn oam_gates_during_scan_and_transfer() {
    let mut engine = Engine::new();
    engine.write_byte(0xFE04, 0x99).unwrap();

    run_to_mode(&mut engine, Mode::OamScan);
    assert_eq!(engine.read_byte(0xFE04).unwrap(), 0xFF);
    engine.write_byte(0xFE04, 0x11).unwrap(); // dropped

    run_to_mode(&mut engine, Mode::PixelTransfer);
    assert_eq!(engine.read_byte(0xFE04).unwrap(), 0xFF);

    run_to_mode(&mut engine, Mode::HBlank);
    assert_eq!(engine.read_byte(0xFE04).unwrap(), 0x99);
}

#[test]
fn gates_lift_while_the_display_is_off() {
    let mut engine = Engine::new();
    engine.set_register(Register::Lcdc, 0x11).unwrap();

    engine.write_byte(0x8000, 0xAA).unwrap();
    engine.write_byte(0xFE00, 0xBB).unwrap();
    engine.tick(100).unwrap();

    assert_eq!(engine.read_byte(0x8000).unwrap(), 0xAA);
    assert_eq!(engine.read_byte(0xFE00).unwrap(), 0xBB);
}

#[test]
fn vram_banks_are_independent() {
    let mut engine = Engine::new();

    engine.write_byte(0x8000, 0xA0).unwrap();
    engine.set_register(Register::Vbk, 0x01).unwrap();
    assert_eq!(engine.register(Register::Vbk).unwrap(), 0xFF);

    engine.write_byte(0x8000, 0xA1).unwrap();
    assert_eq!(engine.read_byte(0x8000).unwrap(), 0xA1);

    engine.set_register(Register::Vbk, 0x00).unwrap();
    assert_eq!(engine.register(Register::Vbk).unwrap(), 0xFE);
    assert_eq!(engine.read_byte(0x8000).unwrap(), 0xA0);
}

#[test]
fn cram_index_registers_boot_and_read_back_verbatim() {
    let mut engine = Engine::new();

    assert_eq!(engine.register(Register::Bgpi).unwrap(), 0xFC);
    assert_eq!(engine.register(Register::Obpi).unwrap(), 0xFF);

    // No read mask: bit 6 survives a round trip
    engine.set_register(Register::Bgpi, 0xC1).unwrap();
    assert_eq!(engine.register(Register::Bgpi).unwrap(), 0xC1);
    engine.set_register(Register::Bgpd, 0x55).unwrap();
    assert_eq!(engine.register(Register::Bgpi).unwrap(), 0xC2);
}

#[test]
fn cram_data_port_gates_but_still_increments() {
    let mut engine = Engine::new();

    engine.set_register(Register::Bgpi, 0x80).unwrap();
    engine.set_register(Register::Bgpd, 0x12).unwrap();

    run_to_mode(&mut engine, Mode::PixelTransfer);
    assert_eq!(engine.register(Register::Bgpd).unwrap(), 0xFF);
    // The write is dropped, the index still advances
    engine.set_register(Register::Bgpd, 0x34).unwrap();
    assert_eq!(engine.register(Register::Bgpi).unwrap(), 0x82);

    run_to_mode(&mut engine, Mode::HBlank);
    engine.set_register(Register::Bgpi, 0x01).unwrap();
    assert_eq!(engine.register(Register::Bgpd).unwrap(), 0x00);
    engine.set_register(Register::Bgpi, 0x00).unwrap();
    assert_eq!(engine.register(Register::Bgpd).unwrap(), 0x12);
}

#[test]
fn typed_palette_round_trip() {
    let mut engine = Engine::new();

    engine.set_background_color(2, 1, (0x10, 0x08, 0x1F)).unwrap();
    assert_eq!(engine.background_color(2, 1).unwrap(), (0x10, 0x08, 0x1F));
    assert_eq!(
        engine.background_color_rgba(2, 1).unwrap(),
        0x80_40_F8_FF
    );

    engine.set_object_color(7, 3, (0x01, 0x02, 0x03)).unwrap();
    assert_eq!(engine.object_color(7, 3).unwrap(), (0x01, 0x02, 0x03));
}

#[test]
fn invalid_palette_slots_report_faults() {
    let mut engine = Engine::new();

    assert_eq!(
        engine.set_background_color(8, 0, (0, 0, 0)),
        Err(TraceEvent::InvalidPaletteSlot { palette: 8, color: 0 })
    );
    assert_eq!(
        engine.object_color(0, 4),
        Err(TraceEvent::InvalidPaletteSlot { palette: 0, color: 4 })
    );
    assert_eq!(
        engine.set_object_color(0, 0, (0x20, 0, 0)),
        Err(TraceEvent::InvalidColorComponent(0x20))
    );
}

#[test]
fn color_mode_resolves_pixels_through_cram() {
    let mut engine = Engine::new();
    engine.set_register(Register::Grpm, 0x01).unwrap();
    engine.set_background_color(0, 0, (0x1F, 0x00, 0x00)).unwrap();

    engine.tick(154 * 456).unwrap();

    // Background color 0 of palette 0, scaled x8: pure red
    assert!(engine.framebuffer().iter().all(|&px| px == 0xF8_00_00_FF));
}
