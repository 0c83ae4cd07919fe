// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns iteration counts into colours, and colours into the packed
//! 32-bit pixels a drawing surface expects.
//!
//! The palette is three sine waves at 1x, 2x and 4x frequency over
//! [0, pi], one per channel.  Both ends of the range (never escaped,
//! and escaped on the very first step) come out pure black, which is
//! why background substitution exists.  It is kept as a separate pass
//! over the finished frame so the palette itself never changes.

use num::clamp;
use std::f64::consts::PI;

/// An RGB triple.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColorSample {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

/// The packed value of an opaque pure black pixel, the only value
/// `substitute_background` replaces.
pub const BLACK_PACKED: u32 = 0xFF00_0000;

impl ColorSample {
    /// Constructor.
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        ColorSample { r, g, b }
    }

    /// True only for (0, 0, 0).
    pub fn is_black(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }
}

fn channel(intensity: f64, frequency: f64) -> u8 {
    let v = (255.0 * (intensity * PI * frequency).sin()).floor();
    clamp(v, 0.0, 255.0) as u8
}

/// Maps an iteration count to a colour.  The count is normalized
/// against `max_iterations` and clamped to [0, 1]; each channel is
/// floored and then clamped to [0, 255], so the negative lobes of the
/// faster waves come out as zero.
pub fn color_for(iterations: usize, max_iterations: usize) -> ColorSample {
    let intensity = clamp(iterations as f64 / max_iterations as f64, 0.0, 1.0);
    ColorSample {
        r: channel(intensity, 1.0),
        g: channel(intensity, 2.0),
        b: channel(intensity, 4.0),
    }
}

/// Packs a colour as ALPHA(bits 24-31) | BLUE(16-23) | GREEN(8-15) |
/// RED(0-7), with alpha always 255.
#[inline]
pub fn pack(color: ColorSample) -> u32 {
    (255u32 << 24) | (u32::from(color.b) << 16) | (u32::from(color.g) << 8) | u32::from(color.r)
}

/// The inverse of `pack`.  Alpha is dropped.
#[inline]
pub fn unpack(pixel: u32) -> ColorSample {
    ColorSample {
        r: (pixel & 0xFF) as u8,
        g: ((pixel >> 8) & 0xFF) as u8,
        b: ((pixel >> 16) & 0xFF) as u8,
    }
}

/// Replaces every opaque pure-black pixel with `background`.  Returns
/// the number of pixels replaced.  Near-black pixels are left alone.
pub fn substitute_background(pixels: &mut [u32], background: ColorSample) -> usize {
    let background = pack(background);
    let mut replaced = 0;
    for p in pixels.iter_mut().filter(|p| **p == BLACK_PACKED) {
        *p = background;
        replaced += 1;
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_ends_of_the_palette_are_black() {
        for n in &[1, 2, 7, 100, 5000] {
            assert!(color_for(0, *n).is_black());
            assert!(color_for(*n, *n).is_black());
        }
    }

    #[test]
    fn midpoints() {
        // sin(pi/2) = 1, sin(pi) ~ 0, sin(2pi) ~ 0
        assert_eq!(color_for(5, 10), ColorSample::new(255, 0, 0));
        // sin(pi/4), sin(pi/2), sin(pi) ~ 0
        assert_eq!(color_for(1, 4), ColorSample::new(180, 255, 0));
    }

    #[test]
    fn negative_lobes_clamp_to_zero() {
        // green and blue are both on a negative lobe at 3/4.
        let c = color_for(3, 4);
        assert_eq!(c.g, 0);
        assert_eq!(c.b, 0);
        assert_eq!(c.r, 180);
    }

    #[test]
    fn intensity_is_clamped() {
        assert_eq!(color_for(20, 10), color_for(10, 10));
    }

    #[test]
    fn packing_layout() {
        assert_eq!(pack(ColorSample::new(0x11, 0x22, 0x33)), 0xFF33_2211);
        assert_eq!(pack(ColorSample::new(0, 0, 0)), BLACK_PACKED);
        assert_eq!(unpack(0xFF33_2211), ColorSample::new(0x11, 0x22, 0x33));
    }

    #[test]
    fn background_replaces_only_pure_black() {
        let near_black = pack(ColorSample::new(0, 0, 1));
        let red = pack(ColorSample::new(255, 0, 0));
        let mut pixels = vec![BLACK_PACKED, near_black, red, BLACK_PACKED];
        let bg = ColorSample::new(0xFF, 0xFF, 0xFF);
        assert_eq!(substitute_background(&mut pixels, bg), 2);
        assert_eq!(pixels, vec![pack(bg), near_black, red, pack(bg)]);
    }

    #[test]
    fn in_set_pixels_get_the_background() {
        let mut pixels = vec![pack(color_for(64, 64)), pack(color_for(32, 64))];
        let bg = ColorSample::new(10, 20, 30);
        substitute_background(&mut pixels, bg);
        assert_eq!(unpack(pixels[0]), bg);
        assert_eq!(unpack(pixels[1]), ColorSample::new(255, 0, 0));
    }
}
