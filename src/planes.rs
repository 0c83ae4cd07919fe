// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a window onto the complex plane bounded by a pair of real
//! limits and a pair of imaginary limits.
use num;

/// Every complex number in the renderer is a pair of f64s.
pub type Complex = num::Complex<f64>;

/// Describes the x, y of a pixel on the integral plane.  x runs
/// across a row, y runs down the rows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pixel(pub usize, pub usize);

/// Linear interpolation of a normalized value into [min, max].
#[inline]
pub fn lerp(norm: f64, min: f64, max: f64) -> f64 {
    min + (max - min) * norm
}

/// Contains the definitions of two planes: an integral cartesian plane
/// of `width` by `height` pixels, and a window of the complex plane.
/// Maps pixels from one to points in the other, and linear buffer
/// offsets to pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlaneMapper {
    /// Width of the integral plane.
    pub width: usize,
    /// Height of the integral plane.
    pub height: usize,
    /// Real-axis limits, low then high.
    pub x_limits: (f64, f64),
    /// Imaginary-axis limits, low then high.
    pub y_limits: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Does no validation of its own; see
    /// `RenderRequest::new` for that.
    pub fn new(width: usize, height: usize, x_limits: (f64, f64), y_limits: (f64, f64)) -> Self {
        PlaneMapper {
            width,
            height,
            x_limits,
            y_limits,
        }
    }

    /// The total number of points in the integral grid.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// True when the integral plane has no pixels at all.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Given a pixel on the integral cartesian plane, map it to the
    /// corresponding point in the complex window.  Pixel (0,0) lands
    /// exactly on the low corner; the high corner itself is never
    /// reached.
    pub fn pixel_to_point(&self, pixel: Pixel) -> Complex {
        Complex::new(
            lerp(
                (pixel.0 as f64) / (self.width as f64),
                self.x_limits.0,
                self.x_limits.1,
            ),
            lerp(
                (pixel.1 as f64) / (self.height as f64),
                self.y_limits.0,
                self.y_limits.1,
            ),
        )
    }

    /// Row-major: the offset of a pixel in a frame buffer.
    pub fn pixel_to_index(&self, pixel: Pixel) -> usize {
        pixel.1 * self.width + pixel.0
    }

    /// The inverse of `pixel_to_index`.
    pub fn index_to_pixel(&self, index: usize) -> Pixel {
        Pixel(index % self.width, index / self.width)
    }
}
