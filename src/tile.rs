use serde::{Deserialize, Serialize};

use crate::{
    geometry::Point,
    grid::{CellIndex, GridFrame},
};

/// Position of the owning feature in the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionId(pub usize);

impl RegionId {
    pub fn raw(self) -> usize {
        self.0
    }
}

/// Velocity contribution collected from one force during a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Impulse {
    pub x: f64,
    pub y: f64,
}

impl Impulse {
    pub fn add(&mut self, x: f64, y: f64) {
        self.x += x;
        self.y += y;
    }
}

/// One placed unit of a region. The origin is fixed at creation; the cell is
/// always derived from the position by the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub index: usize,
    pub region: RegionId,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    origin: Point,
    cell: CellIndex,
}

impl Tile {
    pub fn new(index: usize, region: RegionId, origin: Point, frame: &GridFrame) -> Self {
        Self {
            index,
            region,
            x: origin.x,
            y: origin.y,
            vx: 0.0,
            vy: 0.0,
            origin,
            cell: frame.locate(origin.x, origin.y),
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn cell(&self) -> CellIndex {
        self.cell
    }

    pub(crate) fn refresh_cell(&mut self, frame: &GridFrame) {
        self.cell = frame.locate(self.x, self.y);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileFrame {
    pub index: usize,
    pub region: RegionId,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub i: i64,
    pub j: i64,
}

impl From<&Tile> for TileFrame {
    fn from(tile: &Tile) -> Self {
        Self {
            index: tile.index,
            region: tile.region,
            x: tile.x,
            y: tile.y,
            vx: tile.vx,
            vy: tile.vy,
            i: tile.cell.i,
            j: tile.cell.j,
        }
    }
}
