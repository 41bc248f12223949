//! Display backends for sprite frames

use std::io::Write;
use std::path::Path;

use tracing::{debug, trace};

use crate::animation::{SpriteOrigin, SPRITE_SIZE};
use crate::error::{Error, Result};
use crate::sensor::Frame;

/// Shows one sprite per tick; assumed never to fail
pub trait SpriteDisplay: Send {
    fn show(&mut self, origin: SpriteOrigin);
}

/// Load a binary PPM sprite sheet
pub fn load_sprite_sheet(path: &Path) -> Result<Frame> {
    let bytes = std::fs::read(path).map_err(|e| {
        Error::Configuration(format!("cannot read sprite sheet {}: {e}", path.display()))
    })?;
    let sheet = Frame::from_ppm(&bytes).map_err(|e| {
        Error::Configuration(format!("bad sprite sheet {}: {e}", path.display()))
    })?;
    debug!(width = sheet.width(), height = sheet.height(), "sprite sheet loaded");
    Ok(sheet)
}

/// Renders sprites as ANSI truecolor half blocks
///
/// The sprite is mirrored horizontally, matching how the LED matrix is
/// mounted. Only redraws when the sprite origin changes. The screen is
/// blanked when the display is dropped.
pub struct TerminalDisplay<W: Write + Send> {
    sheet: Frame,
    out: W,
    last: Option<SpriteOrigin>,
}

impl<W: Write + Send> TerminalDisplay<W> {
    pub fn new(sheet: Frame, out: W) -> Self {
        Self {
            sheet,
            out,
            last: None,
        }
    }

    /// Blank the screen and forget the last sprite
    pub fn clear(&mut self) {
        self.last = None;
        self.emit("\x1b[0m\x1b[2J\x1b[H");
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
        {
            trace!(?e, "terminal write failed");
        }
    }

    fn texel(&self, origin: SpriteOrigin, col: u32, row: u32) -> [u8; 3] {
        let x = origin.0 + (SPRITE_SIZE - 1 - col);
        let y = origin.1 + row;
        self.sheet.pixel(x, y).unwrap_or([0, 0, 0])
    }

    fn render(&self, origin: SpriteOrigin) -> String {
        let mut buf = String::from("\x1b[H");
        for row in (0..SPRITE_SIZE).step_by(2) {
            for col in 0..SPRITE_SIZE {
                let [tr, tg, tb] = self.texel(origin, col, row);
                let [br, bg, bb] = self.texel(origin, col, row + 1);
                buf.push_str(&format!(
                    "\x1b[38;2;{tr};{tg};{tb}m\x1b[48;2;{br};{bg};{bb}m\u{2580}"
                ));
            }
            buf.push_str("\x1b[0m\n");
        }
        buf
    }
}

impl<W: Write + Send> SpriteDisplay for TerminalDisplay<W> {
    fn show(&mut self, origin: SpriteOrigin) {
        if self.last == Some(origin) {
            return;
        }
        self.last = Some(origin);

        let frame = self.render(origin);
        self.emit(&frame);
    }
}

impl<W: Write + Send> Drop for TerminalDisplay<W> {
    fn drop(&mut self) {
        if self.last.is_some() {
            self.clear();
            debug!("display cleared");
        }
    }
}

/// Logs sprite changes when no sprite sheet is configured
#[derive(Debug, Default)]
pub struct TraceDisplay {
    last: Option<SpriteOrigin>,
}

impl SpriteDisplay for TraceDisplay {
    fn show(&mut self, origin: SpriteOrigin) {
        if self.last != Some(origin) {
            debug!(x = origin.0, y = origin.1, "sprite");
            self.last = Some(origin);
        }
    }
}
