#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Julia set renderer
//!
//! A Julia set is drawn by treating every pixel as a starting point
//! on the complex plane and repeatedly squaring it and adding a fixed
//! constant `c`.  Points whose orbit stays bounded are in the set;
//! for the rest, the number of steps before the orbit passes the
//! escape radius is the "velocity" used to colour the pixel.
//!
//! Every pixel is independent of every other, so the frame is cut
//! into contiguous runs of pixels ("tiles"), each tile is rendered on
//! its own worker thread into its own buffer, and the buffers are
//! copied back into one frame by offset.  The result does not depend
//! on how many tiles there were or in what order they finished.
//!
//! ```
//! use julia::{render_frame, Complex, RenderRequest};
//!
//! let request = RenderRequest::new(
//!     64, 48, Complex::new(-0.8, 0.156), 100, 2.0, (-1.6, 1.6), (-1.2, 1.2),
//! ).unwrap();
//! let frame = render_frame(&request, 4).unwrap();
//! assert_eq!(frame.pixels().len(), 64 * 48);
//! ```

extern crate crossbeam;
extern crate failure;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
extern crate num_cpus;

#[cfg(test)]
extern crate rand;

pub mod dispatch;
pub mod errors;
pub mod escape;
pub mod frame;
pub mod palette;
pub mod planes;
pub mod request;
pub mod session;

pub use dispatch::{probe, render_frame, render_single, render_tile, Dispatcher, Probe};
pub use errors::RenderError;
pub use escape::evaluate;
pub use frame::{partition, FrameAssembler, FrameBuffer, TileResult, TileTask};
pub use palette::{color_for, pack, substitute_background, unpack, ColorSample, BLACK_PACKED};
pub use planes::{Complex, Pixel, PlaneMapper};
pub use request::RenderRequest;
pub use session::RenderSession;
