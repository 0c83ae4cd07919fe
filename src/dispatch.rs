// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The parallel tile dispatcher.
//!
//! A frame is partitioned into tiles, the tiles are pushed down a
//! channel, and a fixed pool of scoped worker threads pulls them off
//! one at a time.  Every worker owns the tile it is working on and
//! the buffer it fills; the buffer goes back up a second channel by
//! value, and the dispatcher copies it into place.  The request is
//! only ever read, so all the workers share one reference to it.
//!
//! A tile whose renderer panics is reported as failed rather than
//! taking the whole frame down.  Failed tiles get exactly one more
//! chance, each on a freshly spawned worker.
//!
//! A render can also be abandoned part way through.  Workers ask
//! before every tile whether the frame is still wanted; once it is
//! not, tiles already being rendered finish and the rest of the queue
//! is dropped.

extern crate crossbeam;

use crossbeam::channel;
use itertools::iproduct;
use num_cpus;
use std::panic::{self, AssertUnwindSafe};

use errors::RenderError;
use escape::evaluate;
use frame::{partition, FrameAssembler, FrameBuffer, TileResult, TileTask};
use palette::{color_for, pack, ColorSample};
use request::RenderRequest;

#[inline]
fn color_at(x: usize, y: usize, request: &RenderRequest) -> ColorSample {
    color_for(evaluate(x, y, request), request.max_iterations())
}

/// Renders every pixel in one tile into a newly allocated buffer of
/// packed pixels.
pub fn render_tile(task: &TileTask, request: &RenderRequest) -> TileResult {
    let plane = request.plane();
    let pixels = (task.start..task.end)
        .map(|i| {
            let p = plane.index_to_pixel(i);
            pack(color_at(p.0, p.1, request))
        })
        .collect();
    TileResult {
        start: task.start,
        pixels,
    }
}

/// The answer to a single-pixel query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Probe {
    /// Column of the pixel.
    pub x: usize,
    /// Row of the pixel.
    pub y: usize,
    /// Its colour, before any background substitution.
    pub color: ColorSample,
}

/// Evaluates one pixel on the calling thread.  For interactive
/// queries; there is no tiling and no worker involved.  The pixel must
/// lie inside the image.
pub fn probe(x: usize, y: usize, request: &RenderRequest) -> Result<Probe, RenderError> {
    if x >= request.width() || y >= request.height() {
        return Err(RenderError::OutOfBounds {
            x,
            y,
            width: request.width(),
            height: request.height(),
        });
    }
    Ok(Probe {
        x,
        y,
        color: color_at(x, y, request),
    })
}

/// The main function for single-threaded renders.  Walks the frame in
/// row-major order, one pixel at a time.
pub fn render_single(request: &RenderRequest) -> FrameBuffer {
    let pixels = iproduct!(0..request.height(), 0..request.width())
        .map(|(y, x)| pack(color_at(x, y, request)))
        .collect();
    FrameBuffer::from_pixels(request.width(), request.height(), pixels)
}

enum Outcome {
    Rendered(TileResult),
    Failed(TileTask),
}

struct Pass {
    failed: Vec<TileTask>,
    abandoned: bool,
}

/// A fixed-size pool of workers.  The pool is just a count: threads are
/// scoped to a single frame, spawned when it starts and joined before
/// it is returned.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dispatcher {
    workers: usize,
}

impl Default for Dispatcher {
    /// One worker per CPU.
    fn default() -> Self {
        Dispatcher::new(num_cpus::get())
    }
}

impl Dispatcher {
    /// A pool of `workers` threads; at least one.
    pub fn new(workers: usize) -> Self {
        Dispatcher {
            workers: workers.max(1),
        }
    }

    /// Pool size.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Renders a whole frame cut into `tile_count` tiles.
    pub fn render(
        &self,
        request: &RenderRequest,
        tile_count: usize,
    ) -> Result<FrameBuffer, RenderError> {
        self.render_with(request, tile_count, render_tile)
    }

    /// Renders a whole frame, using `tile_fn` to render each tile.  The
    /// frame comes back only when every tile has been placed; if any
    /// tile fails twice the render fails.
    pub fn render_with<F>(
        &self,
        request: &RenderRequest,
        tile_count: usize,
        tile_fn: F,
    ) -> Result<FrameBuffer, RenderError>
    where
        F: Fn(&TileTask, &RenderRequest) -> TileResult + Sync,
    {
        self.render_until(request, tile_count, tile_fn, || false)
    }

    /// As `render_with`, but `stop` is asked before every tile is
    /// started.  Once it answers true no further tiles are started, the
    /// failed-tile retry is skipped, and the render ends with
    /// `Abandoned`.
    pub fn render_until<F, S>(
        &self,
        request: &RenderRequest,
        tile_count: usize,
        tile_fn: F,
        stop: S,
    ) -> Result<FrameBuffer, RenderError>
    where
        F: Fn(&TileTask, &RenderRequest) -> TileResult + Sync,
        S: Fn() -> bool + Sync,
    {
        let tasks = partition(request.len(), tile_count)?;
        info!(
            "Rendering {}x{} frame in {} tiles on {} workers",
            request.width(),
            request.height(),
            tasks.len(),
            self.workers.min(tasks.len())
        );

        let mut assembler = FrameAssembler::new(request.width(), request.height(), &tasks);
        let pass = run_pass(self.workers, &tasks, request, &tile_fn, &stop, &mut assembler)?;
        if pass.abandoned {
            debug!("Render abandoned with {} tile(s) outstanding", assembler.missing());
            return Err(RenderError::Abandoned);
        }
        if !pass.failed.is_empty() {
            let failed = pass.failed;
            warn!("Retrying {} failed tile(s) on fresh workers", failed.len());
            let retry = run_pass(failed.len(), &failed, request, &tile_fn, &stop, &mut assembler)?;
            if retry.abandoned {
                return Err(RenderError::Abandoned);
            }
            if let Some(task) = retry.failed.first() {
                return Err(RenderError::TileFailed {
                    start: task.start,
                    end: task.end,
                });
            }
        }

        let frame = assembler.finish()?;
        debug!("Frame of {} pixels complete", frame.pixels().len());
        Ok(frame)
    }
}

/// Renders a frame with one worker per tile.
pub fn render_frame(request: &RenderRequest, tile_count: usize) -> Result<FrameBuffer, RenderError> {
    Dispatcher::new(tile_count).render(request, tile_count)
}

/// Spawns up to `workers` threads, feeds them `tasks`, and places every
/// result as it arrives.  Collects the tiles whose renderer panicked,
/// and whether `stop` cut the pass short.
fn run_pass<F, S>(
    workers: usize,
    tasks: &[TileTask],
    request: &RenderRequest,
    tile_fn: &F,
    stop: &S,
    assembler: &mut FrameAssembler,
) -> Result<Pass, RenderError>
where
    F: Fn(&TileTask, &RenderRequest) -> TileResult + Sync,
    S: Fn() -> bool + Sync,
{
    let (task_tx, task_rx) = channel::unbounded::<TileTask>();
    for task in tasks {
        task_tx
            .send(*task)
            .map_err(|_| RenderError::WorkerPanicked)?;
    }
    drop(task_tx);

    crossbeam::scope(|spawner| -> Result<Pass, RenderError> {
        let (result_tx, result_rx) = channel::unbounded::<Outcome>();
        for _ in 0..workers.min(tasks.len()) {
            let tasks = task_rx.clone();
            let results = result_tx.clone();
            spawner.spawn(move |_| {
                for task in tasks.iter() {
                    if stop() {
                        break;
                    }
                    let outcome =
                        match panic::catch_unwind(AssertUnwindSafe(|| tile_fn(&task, request))) {
                            Ok(result) => Outcome::Rendered(result),
                            Err(_) => {
                                warn!("Tile [{}, {}) failed", task.start, task.end);
                                Outcome::Failed(task)
                            }
                        };
                    if results.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut failed = vec![];
        for outcome in result_rx.iter() {
            match outcome {
                Outcome::Rendered(result) => assembler.place(result)?,
                Outcome::Failed(task) => failed.push(task),
            }
        }
        Ok(Pass {
            failed,
            abandoned: stop(),
        })
    })
    .map_err(|_| RenderError::WorkerPanicked)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use palette::unpack;
    use planes::Complex;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn julia(width: usize, height: usize) -> RenderRequest {
        RenderRequest::new(
            width,
            height,
            Complex::new(-0.8, 0.156),
            80,
            2.0,
            (-1.6, 1.6),
            (-1.2, 1.2),
        )
        .unwrap()
    }

    #[test]
    fn render_tile_keeps_its_offset() {
        let r = julia(8, 4);
        let t = render_tile(&TileTask { start: 5, end: 13 }, &r);
        assert_eq!(t.start, 5);
        assert_eq!(t.pixels.len(), 8);
        assert!(t.pixels.iter().all(|p| p >> 24 == 0xFF));
    }

    #[test]
    fn tiled_frames_match_the_single_threaded_frame() {
        for &(w, h) in &[(1, 1), (7, 3), (40, 30), (33, 17)] {
            let r = julia(w, h);
            let single = render_single(&r);
            for tiles in &[1, 2, 3, 5, 8, 64] {
                assert_eq!(render_frame(&r, *tiles).unwrap(), single);
            }
        }
    }

    #[test]
    fn more_tiles_than_pixels() {
        let r = julia(7, 3);
        assert_eq!(render_frame(&r, 10_000).unwrap(), render_single(&r));
    }

    #[test]
    fn small_pools_drain_every_tile() {
        let r = julia(40, 30);
        let single = render_single(&r);
        assert_eq!(Dispatcher::new(2).render(&r, 17).unwrap(), single);
        assert_eq!(Dispatcher::new(1).render(&r, 5).unwrap(), single);
    }

    #[test]
    fn frames_match_probes() {
        let r = julia(20, 10);
        let frame = render_frame(&r, 4).unwrap();
        for y in 0..10 {
            for x in 0..20 {
                let p = probe(x, y, &r).unwrap();
                assert_eq!((p.x, p.y), (x, y));
                assert_eq!(unpack(frame.pixel(x, y)), p.color);
            }
        }
    }

    #[test]
    fn pixels_outside_the_image_are_refused() {
        let r = julia(20, 10);
        assert!(probe(19, 9, &r).is_ok());
        assert_eq!(
            probe(20, 0, &r),
            Err(RenderError::OutOfBounds {
                x: 20,
                y: 0,
                width: 20,
                height: 10
            })
        );
        assert!(probe(0, 10, &r).is_err());
    }

    #[test]
    fn pools_have_at_least_one_worker() {
        assert_eq!(Dispatcher::new(0).workers(), 1);
        assert_eq!(Dispatcher::new(6).workers(), 6);
        assert_eq!(Dispatcher::default().workers(), num_cpus::get());
    }

    #[test]
    fn stopping_drops_the_queue() {
        let r = julia(16, 16);
        let calls = AtomicUsize::new(0);
        let result = Dispatcher::new(1).render_until(
            &r,
            8,
            |task, request| {
                calls.fetch_add(1, Ordering::SeqCst);
                render_tile(task, request)
            },
            || calls.load(Ordering::SeqCst) >= 3,
        );
        assert_eq!(result, Err(RenderError::Abandoned));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn stopping_skips_the_retry() {
        let r = julia(16, 16);
        let calls = AtomicUsize::new(0);
        let result = Dispatcher::new(1).render_until(
            &r,
            1,
            |_, _| -> TileResult {
                calls.fetch_add(1, Ordering::SeqCst);
                panic!("worker died")
            },
            || calls.load(Ordering::SeqCst) >= 1,
        );
        assert_eq!(result, Err(RenderError::Abandoned));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reverse_completion_order_does_not_matter() {
        let r = julia(30, 20);
        let tiles = 6;
        let frame = Dispatcher::new(tiles)
            .render_with(&r, tiles, |task, request| {
                // later tiles finish first
                let wait = (r.len() - task.start) as u64 / 20;
                thread::sleep(Duration::from_millis(wait));
                render_tile(task, request)
            })
            .unwrap();
        assert_eq!(frame, render_single(&r));
    }

    #[test]
    fn random_completion_order_does_not_matter() {
        let r = julia(30, 20);
        let tasks = partition(r.len(), 8).unwrap();
        let mut delays: Vec<u64> = (0..tasks.len() as u64).map(|d| d * 5).collect();
        delays.shuffle(&mut StdRng::seed_from_u64(7));
        let delays: HashMap<usize, u64> = tasks.iter().map(|t| t.start).zip(delays).collect();

        let frame = Dispatcher::new(8)
            .render_with(&r, 8, |task, request| {
                thread::sleep(Duration::from_millis(delays[&task.start]));
                render_tile(task, request)
            })
            .unwrap();
        assert_eq!(frame, render_single(&r));
    }

    #[test]
    fn a_failed_tile_is_retried_once() {
        let r = julia(16, 16);
        let crashed = AtomicBool::new(false);
        let calls = AtomicUsize::new(0);
        let frame = Dispatcher::new(4)
            .render_with(&r, 4, |task, request| {
                calls.fetch_add(1, Ordering::SeqCst);
                if task.start == 64 && !crashed.swap(true, Ordering::SeqCst) {
                    panic!("worker died");
                }
                render_tile(task, request)
            })
            .unwrap();
        assert_eq!(frame, render_single(&r));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn a_tile_that_fails_twice_fails_the_frame() {
        let r = julia(16, 16);
        let result = Dispatcher::new(4).render_with(&r, 4, |task, request| {
            if task.start == 128 {
                panic!("worker died");
            }
            render_tile(task, request)
        });
        assert_eq!(result, Err(RenderError::TileFailed { start: 128, end: 192 }));
    }

    #[test]
    fn short_tiles_are_refused() {
        let r = julia(16, 16);
        let result = Dispatcher::new(2).render_with(&r, 2, |task, request| {
            let mut t = render_tile(task, request);
            t.pixels.pop();
            t
        });
        assert!(match result {
            Err(RenderError::UnexpectedTile { .. }) => true,
            _ => false,
        });
    }

    #[test]
    fn zero_tiles_is_refused() {
        assert_eq!(
            render_frame(&julia(4, 4), 0),
            Err(RenderError::InvalidTileCount)
        );
    }

    #[test]
    fn two_pixel_frame() {
        let r = RenderRequest::new(
            2,
            1,
            Complex::new(0.0, 0.0),
            10,
            2.0,
            (-1.0, 1.0),
            (-1.0, 1.0),
        )
        .unwrap();
        let frame = render_frame(&r, 2).unwrap();
        assert_eq!(frame.pixels().len(), 2);
        // escapes on step 1 of 10
        assert_eq!(frame.pixel(0, 0), pack(color_for(1, 10)));
        assert_eq!(unpack(frame.pixel(0, 0)), ColorSample::new(78, 149, 242));
        // never escapes: pure black, awaiting the background
        assert!(unpack(frame.pixel(1, 0)).is_black());
        assert_eq!(frame, render_single(&r));
    }
}
