// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A RenderSession serializes the notion of "the current frame" for a
//! caller that may ask for a new render before the last one finished,
//! such as a UI that re-renders on every pan.  Each submission takes
//! the next generation number.  Once a newer render is submitted the
//! older one starts no more tiles: tiles already in flight finish, the
//! rest of its queue is dropped, and whatever it produced is thrown
//! away whole, so two requests are never mixed into one buffer.

use std::sync::atomic::{AtomicU64, Ordering};

use dispatch::{render_tile, Dispatcher};
use errors::RenderError;
use frame::{FrameBuffer, TileResult, TileTask};
use request::RenderRequest;

/// Shared between every thread that submits renders.
#[derive(Debug)]
pub struct RenderSession {
    dispatcher: Dispatcher,
    tiles: usize,
    generation: AtomicU64,
}

impl RenderSession {
    /// A session that renders every frame as `tiles` tiles on
    /// `dispatcher`.
    pub fn new(dispatcher: Dispatcher, tiles: usize) -> Self {
        RenderSession {
            dispatcher,
            tiles,
            generation: AtomicU64::new(0),
        }
    }

    /// The most recently submitted generation; 0 before the first.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Renders `request` as the newest generation.  Fails with
    /// `Superseded` if another render was submitted before this one
    /// finished, whatever else went wrong with it.
    pub fn render(&self, request: &RenderRequest) -> Result<FrameBuffer, RenderError> {
        self.render_with(request, render_tile)
    }

    /// As `render`, with a caller-supplied tile renderer.
    pub fn render_with<F>(&self, request: &RenderRequest, tile_fn: F) -> Result<FrameBuffer, RenderError>
    where
        F: Fn(&TileTask, &RenderRequest) -> TileResult + Sync,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let stale = || self.generation.load(Ordering::SeqCst) != generation;
        let result = self
            .dispatcher
            .render_until(request, self.tiles, tile_fn, stale);
        let current = self.generation.load(Ordering::SeqCst);
        if current != generation {
            info!(
                "Discarding render {}; render {} is newer",
                generation, current
            );
            return Err(RenderError::Superseded { generation });
        }
        result
    }
}
