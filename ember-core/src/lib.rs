//! Cycle-accurate core of the Ember handheld runtime.
//!
//! A host program creates an [`Engine`], wires up the frame-rendered
//! callback and any interrupt handlers, and then drives simulated time by
//! calling [`Engine::tick`]. One tick is one dot: the quantum of display
//! time. The pixel pipeline, interrupt controller, DMA engines and timed
//! memory bus all advance in lockstep inside the call; no instruction
//! stream is emulated.

pub mod bus;
pub mod dbg;
pub mod io;
pub mod mem;

mod engine;

pub use engine::*;
