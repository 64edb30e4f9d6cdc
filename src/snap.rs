//! Eased transition from converged positions to the centers of the tiles' cells.

use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::{
    geometry::Point,
    grid::{CellIndex, GridFrame},
    observer::{Observer, SnapEvent},
    scheduler::TickSource,
    tile::Tile,
};

/// Cubic ease-in/ease-out on `[0, 1]`.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapOutcome {
    pub frames: u64,
    /// False when the tick source ran dry first; tiles are still left on target.
    pub completed: bool,
}

pub struct SnapAnimator {
    starts: Vec<Point>,
    targets: Vec<Point>,
    duration: Duration,
}

impl SnapAnimator {
    /// Targets the centers of the tiles' current cells.
    pub fn new(tiles: &[Tile], frame: &GridFrame, duration: Duration) -> Self {
        let cells: Vec<CellIndex> = tiles.iter().map(Tile::cell).collect();
        Self::from_cells(tiles, &cells, frame, duration)
    }

    /// Starts from the tiles' positions now and targets the centers of `cells`,
    /// one per tile, even when a cell lies off the grid.
    pub fn from_cells(
        tiles: &[Tile],
        cells: &[CellIndex],
        frame: &GridFrame,
        duration: Duration,
    ) -> Self {
        let targets = tiles
            .iter()
            .zip(cells)
            .map(|(tile, &cell)| {
                if !frame.contains(cell) {
                    warn!(tile = tile.index, i = cell.i, j = cell.j, "snapping to a cell outside the grid");
                }
                frame.center(cell)
            })
            .collect();
        Self {
            starts: tiles.iter().map(Tile::position).collect(),
            targets,
            duration,
        }
    }

    pub fn targets(&self) -> &[Point] {
        &self.targets
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Linear fraction of the duration, clamped to `[0, 1]`.
    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Moves tiles to the eased fraction `progress` and returns it. At 1 the
    /// tiles sit exactly on target. Cells are left alone.
    pub fn apply(&self, tiles: &mut [Tile], progress: f64) -> f64 {
        let eased = if progress >= 1.0 {
            1.0
        } else {
            ease_cubic_in_out(progress.max(0.0))
        };
        for ((tile, start), target) in tiles.iter_mut().zip(&self.starts).zip(&self.targets) {
            if eased >= 1.0 {
                tile.x = target.x;
                tile.y = target.y;
            } else {
                tile.x = start.x + (target.x - start.x) * eased;
                tile.y = start.y + (target.y - start.y) * eased;
            }
        }
        eased
    }

    pub fn run<S, O>(&self, tiles: &mut [Tile], source: &mut S, observer: &mut O) -> SnapOutcome
    where
        S: TickSource + ?Sized,
        O: Observer + ?Sized,
    {
        let mut frames = 0;
        loop {
            let Some(elapsed) = source.next_frame() else {
                self.apply(tiles, 1.0);
                return SnapOutcome {
                    frames,
                    completed: false,
                };
            };
            let progress = self.progress(elapsed);
            let eased = self.apply(tiles, progress);
            frames += 1;
            observer.on_snap_frame(&SnapEvent {
                progress,
                eased,
                elapsed,
                tiles: &*tiles,
            });
            if progress >= 1.0 {
                return SnapOutcome {
                    frames,
                    completed: true,
                };
            }
        }
    }
}
