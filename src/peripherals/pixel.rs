use std::fmt;

use super::Peripheral;
use crate::constrain::Word;

pub const WIDTH: usize = 640;
pub const HEIGHT: usize = 480;

/// 640x480 grid of xterm-256 colour ids, all black after reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelDisplay;

#[derive(Clone, PartialEq, Eq)]
pub struct PixelState {
    pixels: Vec<u8>,
}

impl Default for PixelState {
    fn default() -> Self {
        Self {
            pixels: vec![0; WIDTH * HEIGHT],
        }
    }
}

impl fmt::Debug for PixelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelState")
            .field("lit", &self.lit().count())
            .finish()
    }
}

impl PixelState {
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x < WIDTH && y < HEIGHT {
            Some(self.pixels[WIDTH * y + x])
        } else {
            None
        }
    }

    /// Coordinates and colour of every non-black pixel, row by row.
    pub fn lit(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        self.pixels
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != 0)
            .map(|(i, &c)| (i % WIDTH, i / WIDTH, c))
    }
}

impl Peripheral for PixelDisplay {
    type State = PixelState;

    fn name(&self) -> &'static str {
        "pixel display"
    }
}

impl PixelDisplay {
    /// Colours wrap to the 256-entry palette; points off the grid are dropped.
    pub fn plot(&self, state: &mut PixelState, x: Word, y: Word, color: Word) {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return;
        };
        if x < WIDTH && y < HEIGHT {
            state.pixels[WIDTH * y + x] = (color & 0xFF) as u8;
        }
    }
}
