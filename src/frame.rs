// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tiles, and the frame buffer they are assembled into.
//!
//! A frame is a row-major run of packed pixels.  It is cut into
//! contiguous ranges of pixel indices, each rendered on its own, and
//! the results are copied back in at their starting offsets.  Because
//! every tile carries its own offset the order in which they come back
//! does not matter.

use std::collections::BTreeMap;

use errors::RenderError;

/// A half-open range `[start, end)` of pixel indices.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileTask {
    /// First pixel index in the tile.
    pub start: usize,
    /// One past the last pixel index in the tile.
    pub end: usize,
}

impl TileTask {
    /// Number of pixels in the tile.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True for a zero-length range.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The packed pixels of one tile, keyed by where they belong.
#[derive(Clone, Debug, PartialEq)]
pub struct TileResult {
    /// The tile's first pixel index.
    pub start: usize,
    /// Exactly `task.len()` packed pixels.
    pub pixels: Vec<u32>,
}

/// Cuts `[0, len)` into `tiles` contiguous ranges of `len / tiles`
/// pixels each.  The last range absorbs the remainder.  Asking for
/// more tiles than there are pixels gets one tile per pixel, so no
/// tile is ever empty.
pub fn partition(len: usize, tiles: usize) -> Result<Vec<TileTask>, RenderError> {
    if tiles == 0 {
        return Err(RenderError::InvalidTileCount);
    }
    let tiles = tiles.min(len);
    if tiles == 0 {
        return Ok(vec![]);
    }
    let chunk = len / tiles;
    Ok((0..tiles)
        .map(|i| TileTask {
            start: i * chunk,
            end: if i == tiles - 1 { len } else { (i + 1) * chunk },
        })
        .collect())
}

/// A complete, row-major frame of packed pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    /// Wraps an already complete pixel vector.
    pub(crate) fn from_pixels(width: usize, height: usize, pixels: Vec<u32>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        FrameBuffer {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// For post-processing, such as background substitution.
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// The packed pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    /// Three bytes per pixel, red first, for image encoders.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 3);
        for p in &self.pixels {
            bytes.push((p & 0xFF) as u8);
            bytes.push(((p >> 8) & 0xFF) as u8);
            bytes.push(((p >> 16) & 0xFF) as u8);
        }
        bytes
    }
}

/// Collects tile results into a frame.  Knows which tiles it is
/// waiting on, refuses anything else, and will not produce a frame
/// until every one of them has been placed.
#[derive(Debug)]
pub struct FrameAssembler {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
    // start -> end, for every tile not yet placed
    outstanding: BTreeMap<usize, usize>,
}

impl FrameAssembler {
    /// Prepares a `width * height` frame that expects exactly `tasks`.
    pub fn new(width: usize, height: usize, tasks: &[TileTask]) -> Self {
        FrameAssembler {
            width,
            height,
            pixels: vec![0 as u32; width * height],
            outstanding: tasks.iter().map(|t| (t.start, t.end)).collect(),
        }
    }

    /// Copies a tile's pixels into place.
    pub fn place(&mut self, result: TileResult) -> Result<(), RenderError> {
        let end = result.start + result.pixels.len();
        match self.outstanding.get(&result.start) {
            Some(&expected) if expected == end => {}
            _ => {
                return Err(RenderError::UnexpectedTile {
                    start: result.start,
                    end,
                })
            }
        }
        self.outstanding.remove(&result.start);
        self.pixels[result.start..end].copy_from_slice(&result.pixels);
        Ok(())
    }

    /// Tiles still to come.
    pub fn missing(&self) -> usize {
        self.outstanding.len()
    }

    /// The finished frame, or an error if any tile never arrived.
    pub fn finish(self) -> Result<FrameBuffer, RenderError> {
        if !self.outstanding.is_empty() {
            return Err(RenderError::IncompleteFrame {
                missing: self.outstanding.len(),
            });
        }
        Ok(FrameBuffer::from_pixels(self.width, self.height, self.pixels))
    }
}
