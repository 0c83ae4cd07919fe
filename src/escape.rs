// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time evaluator.
//!
//! A Julia set holds the constant `c` fixed and starts the orbit at
//! the pixel's own position on the complex plane, the reverse of the
//! Mandelbrot, which starts every orbit at zero and uses the pixel as
//! `c`.  Each step squares `z` and adds `c`; the number of steps it
//! takes for `|z|` to pass the escape radius is the "velocity" that
//! the palette turns into a colour.

use planes::{Complex, Pixel};
use request::RenderRequest;

/// Returns the iteration at which the orbit of pixel `(x, y)` escaped,
/// or `max_iterations` if it never did.  The escape test is strict:
/// an orbit sitting exactly on the radius has not escaped.
///
/// This is a pure function of its arguments, and is called from every
/// worker at once without synchronization.
pub fn evaluate(x: usize, y: usize, request: &RenderRequest) -> usize {
    let mut z: Complex = request.plane().pixel_to_point(Pixel(x, y));
    let c = request.c();
    let radius = request.escape_radius();
    for i in 0..request.max_iterations() {
        z = z * z + c;
        if z.norm_sqr().sqrt() > radius {
            return i;
        }
    }
    request.max_iterations()
}
