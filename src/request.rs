// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A RenderRequest fully describes one frame.  It is checked once,
//! when built, and never changes afterwards, so workers can share it
//! by reference without any locking.

use errors::RenderError;
use planes::{Complex, PlaneMapper};

/// The parameters of a single Julia set render.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderRequest {
    plane: PlaneMapper,
    c: Complex,
    max_iterations: usize,
    escape_radius: f64,
}

fn invalid<T>(reason: &str) -> Result<T, RenderError> {
    Err(RenderError::InvalidRequest {
        reason: reason.to_string(),
    })
}

fn check_limits(limits: (f64, f64), axis: &str) -> Result<(), RenderError> {
    if !limits.0.is_finite() || !limits.1.is_finite() {
        return invalid(&format!("{} limits must be finite", axis));
    }
    if limits.0 >= limits.1 {
        return invalid(&format!(
            "{} limits are inverted or empty: {} >= {}",
            axis, limits.0, limits.1
        ));
    }
    Ok(())
}

impl RenderRequest {
    /// Requires the width and height of the image, the fractal
    /// constant, the iteration budget per pixel, the escape radius,
    /// and the real and imaginary limits of the window onto the
    /// complex plane.
    pub fn new(
        width: usize,
        height: usize,
        c: Complex,
        max_iterations: usize,
        escape_radius: f64,
        x_limits: (f64, f64),
        y_limits: (f64, f64),
    ) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return invalid("width and height must both be positive");
        }
        if width.checked_mul(height).is_none() {
            return invalid("width * height overflows the pixel index space");
        }
        if max_iterations == 0 {
            return invalid("max_iterations must be positive");
        }
        if !(escape_radius.is_finite() && escape_radius > 0.0) {
            return invalid("escape_radius must be a positive, finite number");
        }
        if !c.re.is_finite() || !c.im.is_finite() {
            return invalid("the constant c must be finite");
        }
        check_limits(x_limits, "x")?;
        check_limits(y_limits, "y")?;

        Ok(RenderRequest {
            plane: PlaneMapper::new(width, height, x_limits, y_limits),
            c,
            max_iterations,
            escape_radius,
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.plane.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.plane.height
    }

    /// Number of pixels in the frame.
    pub fn len(&self) -> usize {
        self.plane.len()
    }

    /// Never true for a valid request; here to pair with `len`.
    pub fn is_empty(&self) -> bool {
        self.plane.is_empty()
    }

    /// The fixed constant added on every step of the recurrence.
    pub fn c(&self) -> Complex {
        self.c
    }

    /// Iteration budget per pixel.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// An orbit strictly beyond this magnitude has escaped.
    pub fn escape_radius(&self) -> f64 {
        self.escape_radius
    }

    /// Real-axis window.
    pub fn x_limits(&self) -> (f64, f64) {
        self.plane.x_limits
    }

    /// Imaginary-axis window.
    pub fn y_limits(&self) -> (f64, f64) {
        self.plane.y_limits
    }

    /// The pixel/complex mapping for this frame.
    pub fn plane(&self) -> &PlaneMapper {
        &self.plane
    }
}
