//! Uniform grid sized so that the total cell area matches the total region area.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{GridMapError, Result},
    geometry::{BBox, Point},
};

/// Discrete cell coordinates. Signed, since a tile may drift off the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellIndex {
    pub i: i64,
    pub j: i64,
}

impl CellIndex {
    pub const fn new(i: i64, j: i64) -> Self {
        Self { i, j }
    }
}

/// Continuous-to-discrete mapping shared by the grid and the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridFrame {
    pub origin: Point,
    pub cell_size: f64,
    pub nx: usize,
    pub ny: usize,
}

impl GridFrame {
    pub fn locate(&self, x: f64, y: f64) -> CellIndex {
        CellIndex {
            i: ((x - self.origin.x) / self.cell_size).floor() as i64,
            j: ((y - self.origin.y) / self.cell_size).floor() as i64,
        }
    }

    pub fn contains(&self, cell: CellIndex) -> bool {
        cell.i >= 0 && cell.j >= 0 && (cell.i as usize) < self.nx && (cell.j as usize) < self.ny
    }

    /// Center of any cell index, including ones outside the grid.
    pub fn center(&self, cell: CellIndex) -> Point {
        Point::new(
            self.origin.x + (cell.i as f64 + 0.5) * self.cell_size,
            self.origin.y + (cell.j as f64 + 0.5) * self.cell_size,
        )
    }

    pub fn cell_count(&self) -> usize {
        self.nx * self.ny
    }

    /// Row-major position of a cell in the dense cell array.
    pub fn cell_id(&self, cell: CellIndex) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.j as usize * self.nx + cell.i as usize)
        } else {
            None
        }
    }

    pub fn cell_index(&self, id: usize) -> Option<CellIndex> {
        if id < self.cell_count() {
            Some(CellIndex::new((id % self.nx) as i64, (id / self.nx) as i64))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridCell {
    pub index: CellIndex,
    pub center: Point,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridSummary {
    pub cell_size: f64,
    pub nx: usize,
    pub ny: usize,
    pub padding_x: f64,
    pub padding_y: f64,
    pub source: BBox,
    pub extent: BBox,
}

#[derive(Debug, Clone)]
pub struct Grid {
    frame: GridFrame,
    padding_x: f64,
    padding_y: f64,
    source: BBox,
    extent: BBox,
    cells: Vec<GridCell>,
}

impl Grid {
    /// Cell side such that `total_weight` cells cover `total_area`.
    pub fn cell_size_for(total_area: f64, total_weight: f64) -> Result<f64> {
        if total_weight == 0.0 {
            return Err(GridMapError::ZeroWeight);
        }
        if total_area == 0.0 {
            return Err(GridMapError::ZeroArea);
        }
        let cell_size = (total_area / total_weight).sqrt();
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GridMapError::NonFiniteCellSize {
                area: total_area,
                weight: total_weight,
            });
        }
        Ok(cell_size)
    }

    pub fn build(total_area: f64, total_weight: f64, source: BBox) -> Result<Self> {
        if source.is_empty() {
            return Err(GridMapError::EmptyLayer);
        }
        let cell_size = Self::cell_size_for(total_area, total_weight)?;

        let nx = axis_cells(source.width(), cell_size);
        let ny = axis_cells(source.height(), cell_size);
        let padding_x = (nx as f64 * cell_size - source.width()) / 2.0;
        let padding_y = (ny as f64 * cell_size - source.height()) / 2.0;
        let extent = BBox::new(
            source.min_x - padding_x,
            source.min_y - padding_y,
            source.max_x + padding_x,
            source.max_y + padding_y,
        );
        let frame = GridFrame {
            origin: Point::new(extent.min_x, extent.min_y),
            cell_size,
            nx,
            ny,
        };
        info!(
            cell_size,
            nx,
            ny,
            cells = frame.cell_count(),
            padding_x,
            padding_y,
            "grid sized"
        );

        let cells = (0..frame.cell_count())
            .filter_map(|id| frame.cell_index(id))
            .map(|index| GridCell {
                index,
                center: frame.center(index),
            })
            .collect();

        Ok(Self {
            frame,
            padding_x,
            padding_y,
            source,
            extent,
            cells,
        })
    }

    pub fn frame(&self) -> GridFrame {
        self.frame
    }

    pub fn cell_size(&self) -> f64 {
        self.frame.cell_size
    }

    pub fn nx(&self) -> usize {
        self.frame.nx
    }

    pub fn ny(&self) -> usize {
        self.frame.ny
    }

    pub fn padding(&self) -> (f64, f64) {
        (self.padding_x, self.padding_y)
    }

    pub fn source(&self) -> BBox {
        self.source
    }

    pub fn extent(&self) -> BBox {
        self.extent
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn cell(&self, index: CellIndex) -> Option<&GridCell> {
        self.frame.cell_id(index).and_then(|id| self.cells.get(id))
    }

    pub fn locate(&self, point: Point) -> CellIndex {
        self.frame.locate(point.x, point.y)
    }

    pub fn summary(&self) -> GridSummary {
        GridSummary {
            cell_size: self.frame.cell_size,
            nx: self.frame.nx,
            ny: self.frame.ny,
            padding_x: self.padding_x,
            padding_y: self.padding_y,
            source: self.source,
            extent: self.extent,
        }
    }
}

/// Minimal fit doubled for slack; never less than one spare cell per side.
fn axis_cells(extent: f64, cell_size: f64) -> usize {
    let fit = (extent / cell_size).ceil().max(0.0) as usize;
    (fit * 2).max(fit + 2)
}
