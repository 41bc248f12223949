//! Render loop and sprite displays
//!
//! The loop ticks at a fixed period: sample the camera every few ticks,
//! advance the behavior engine, then show the current animation frame.

mod display;
mod driver;

pub use display::{load_sprite_sheet, SpriteDisplay, TerminalDisplay, TraceDisplay};
pub use driver::{LoopTiming, Peripherals, RenderLoop};
