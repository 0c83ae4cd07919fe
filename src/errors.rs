// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The single error type shared by every fallible operation in the
//! renderer.

use failure::Fail;

/// Everything that can go wrong between building a request and
/// handing back a finished frame.
#[derive(Debug, Fail, PartialEq)]
pub enum RenderError {
    /// The request violates one of its invariants.  This is a caller
    /// error and is reported before any work starts.
    #[fail(display = "Invalid render request: {}", reason)]
    InvalidRequest {
        /// What was wrong with it.
        reason: String,
    },

    /// A frame cannot be split into zero tiles.
    #[fail(display = "Tile count must be at least 1")]
    InvalidTileCount,

    /// A tile failed on its first worker and again on the retry.
    #[fail(display = "Tile [{}, {}) failed twice", start, end)]
    TileFailed {
        /// First pixel index of the tile.
        start: usize,
        /// One past the last pixel index of the tile.
        end: usize,
    },

    /// The assembler was asked for a frame while tiles were still
    /// outstanding.
    #[fail(display = "Frame is missing {} tile(s)", missing)]
    IncompleteFrame {
        /// Number of tiles that never reported.
        missing: usize,
    },

    /// A result arrived for a tile that the frame never dispatched, or
    /// that has already been placed.
    #[fail(display = "Unexpected tile [{}, {})", start, end)]
    UnexpectedTile {
        /// First pixel index of the tile.
        start: usize,
        /// One past the last pixel index of the tile.
        end: usize,
    },

    /// A newer request was submitted while this one was in flight; its
    /// pixels were thrown away.
    #[fail(display = "Render {} was superseded by a newer request", generation)]
    Superseded {
        /// The generation that was discarded.
        generation: u64,
    },

    /// The render was told to stop before every tile had run.
    #[fail(display = "Render abandoned before all tiles ran")]
    Abandoned,

    /// A single-pixel query named a pixel outside the image.
    #[fail(
        display = "Pixel {},{} is outside the {}x{} image",
        x, y, width, height
    )]
    OutOfBounds {
        /// Column asked for.
        x: usize,
        /// Row asked for.
        y: usize,
        /// Image width.
        width: usize,
        /// Image height.
        height: usize,
    },

    /// A worker thread died outside of tile rendering.
    #[fail(display = "A worker thread panicked")]
    WorkerPanicked,
}
