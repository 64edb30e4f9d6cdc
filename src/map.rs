//! The grid map: weighted regions, their grid, the tiles and the simulation
//! that places them.

use std::{collections::HashMap, time::Duration};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    config::GridMapConfig,
    error::{GridMapError, Result},
    geometry::{BBox, FeatureCollection, Point},
    grid::{CellIndex, Grid, GridSummary},
    observer::Observer,
    scheduler::TickSource,
    seed::SeedPlacer,
    simulation::{RunOutcome, Simulation, SimulationBuilder, SimulationState},
    snap::{SnapAnimator, SnapOutcome},
    tile::{RegionId, Tile, TileFrame},
};

#[derive(Debug, Clone, Serialize)]
pub struct Region {
    pub id: RegionId,
    /// Position of the feature in the input layer.
    pub feature: usize,
    pub name: Option<String>,
    pub weight: f64,
    pub area: f64,
    pub centroid: Option<Point>,
    pub bbox: BBox,
    pub tile_count: usize,
    pub dropped_seeds: usize,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub area: f64,
    pub weight: f64,
    pub tiles: usize,
    pub dropped_seeds: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutOutcome {
    pub run: RunOutcome,
    pub snap: Option<SnapOutcome>,
}

/// Serializable picture of the whole map at one moment.
#[derive(Debug, Clone, Serialize)]
pub struct MapFrame {
    pub name: String,
    pub state: SimulationState,
    pub tick: u64,
    pub alpha: f64,
    pub snapped: bool,
    pub grid: GridSummary,
    pub totals: Totals,
    pub regions: Vec<Region>,
    pub tiles: Vec<TileFrame>,
}

pub struct GridMap {
    config: GridMapConfig,
    regions: Vec<Region>,
    grid: Grid,
    tiles: Vec<Tile>,
    totals: Totals,
    simulation: Option<Simulation>,
    /// Each tile's cell as of the tick the simulation converged.
    converged_cells: Option<Vec<CellIndex>>,
    snapped: bool,
}

impl GridMap {
    pub fn build(layer: &FeatureCollection, config: GridMapConfig) -> Result<Self> {
        config.validate()?;
        let property = config.weight_property.as_str();

        let mut regions = Vec::new();
        let mut source = BBox::empty();
        for (feature_index, feature) in layer.features.iter().enumerate() {
            let Some(geometry) = feature.geometry.as_ref() else {
                warn!(feature = feature_index, "feature without geometry skipped");
                continue;
            };
            let weight = feature
                .property(property)
                .and_then(Value::as_f64)
                .ok_or_else(|| GridMapError::MissingWeight {
                    feature: feature_index,
                    property: property.to_string(),
                })?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(GridMapError::InvalidWeight {
                    feature: feature_index,
                    value: weight,
                });
            }

            let bbox = geometry.bbox();
            source = source.union(bbox);
            let properties = feature.properties.clone().unwrap_or_default();
            regions.push(Region {
                id: RegionId(regions.len()),
                feature: feature_index,
                name: properties
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                weight,
                area: geometry.area(),
                centroid: geometry.centroid(),
                bbox,
                tile_count: 0,
                dropped_seeds: 0,
                properties,
            });
        }
        if regions.is_empty() {
            return Err(GridMapError::EmptyLayer);
        }

        let total_area: f64 = regions.iter().map(|region| region.area).sum();
        let total_weight: f64 = regions.iter().map(|region| region.weight).sum();
        info!(
            regions = regions.len(),
            total_area, total_weight, "layer loaded"
        );
        let grid = Grid::build(total_area, total_weight, source)?;
        let frame = grid.frame();

        let placer = SeedPlacer::new(&frame, config.seed_radius);
        let mut tiles = Vec::new();
        for region in &mut regions {
            let Some(centroid) = region.centroid else {
                warn!(region = region.id.raw(), "region has no vertices, no tiles seeded");
                continue;
            };
            let placement = placer.place(centroid, region.weight);
            region.tile_count = placement.accepted.len();
            region.dropped_seeds = placement.dropped;
            if placement.dropped > 0 {
                warn!(
                    region = region.id.raw(),
                    name = region.name.as_deref().unwrap_or(""),
                    dropped = placement.dropped,
                    "region under-represented"
                );
            }
            for (origin, _) in placement.accepted {
                tiles.push(Tile::new(tiles.len(), region.id, origin, &frame));
            }
        }

        let totals = Totals {
            area: total_area,
            weight: total_weight,
            tiles: tiles.len(),
            dropped_seeds: regions.iter().map(|region| region.dropped_seeds).sum(),
        };
        info!(
            tiles = totals.tiles,
            dropped = totals.dropped_seeds,
            "tiles seeded"
        );

        Ok(Self {
            config,
            regions,
            grid,
            tiles,
            totals,
            simulation: None,
            converged_cells: None,
            snapped: false,
        })
    }

    pub fn config(&self) -> &GridMapConfig {
        &self.config
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn state(&self) -> SimulationState {
        self.simulation
            .as_ref()
            .map_or(SimulationState::Init, Simulation::state)
    }

    pub fn is_snapped(&self) -> bool {
        self.snapped
    }

    fn parts(&mut self) -> (&mut Simulation, &mut [Tile]) {
        let Self {
            config,
            grid,
            tiles,
            simulation,
            ..
        } = self;
        let simulation = simulation.get_or_insert_with(|| {
            SimulationBuilder::new(config.simulation.clone(), grid.frame())
                .with_default_forces(tiles.as_slice(), &config.forces)
                .build()
        });
        (simulation, tiles.as_mut_slice())
    }

    /// Advances `iterations` ticks without notifications.
    pub fn tick(&mut self, iterations: u32) {
        let (simulation, tiles) = self.parts();
        simulation.tick(tiles, iterations);
    }

    pub fn run<S, O>(&mut self, source: &mut S, observer: &mut O) -> RunOutcome
    where
        S: TickSource + ?Sized,
        O: Observer + ?Sized,
    {
        let (simulation, tiles) = self.parts();
        let outcome = simulation.run(tiles, source, observer);
        self.converged_cells = outcome
            .converged
            .then(|| self.tiles.iter().map(Tile::cell).collect());
        info!(
            steps = outcome.steps,
            converged = outcome.converged,
            alpha = outcome.alpha,
            "relaxation finished"
        );
        outcome
    }

    /// Eases every tile onto the center of the cell it held at convergence.
    /// Only valid once, after a converged run.
    pub fn snap<S, O>(&mut self, source: &mut S, observer: &mut O) -> Result<SnapOutcome>
    where
        S: TickSource + ?Sized,
        O: Observer + ?Sized,
    {
        if self.snapped {
            return Err(GridMapError::AlreadySnapped);
        }
        let Some(cells) = self
            .converged_cells
            .as_deref()
            .filter(|_| self.state() == SimulationState::Converged)
        else {
            return Err(GridMapError::NotConverged);
        };
        let animator = SnapAnimator::from_cells(
            &self.tiles,
            cells,
            &self.grid.frame(),
            Duration::from_millis(self.config.snap.duration_ms),
        );
        let outcome = animator.run(&mut self.tiles, source, observer);
        self.snapped = true;
        info!(frames = outcome.frames, "tiles snapped");
        Ok(outcome)
    }

    /// Relaxes, then snaps when the run converged.
    pub fn layout<R, S, O>(
        &mut self,
        relax: &mut R,
        snap_source: &mut S,
        observer: &mut O,
    ) -> Result<LayoutOutcome>
    where
        R: TickSource + ?Sized,
        S: TickSource + ?Sized,
        O: Observer + ?Sized,
    {
        let run = self.run(relax, &mut *observer);
        let snap = if run.converged {
            Some(self.snap(snap_source, observer)?)
        } else {
            warn!(steps = run.steps, alpha = run.alpha, "not converged, snap skipped");
            None
        };
        Ok(LayoutOutcome { run, snap })
    }

    pub fn frame(&self, name: &str) -> MapFrame {
        let (tick, alpha) = self
            .simulation
            .as_ref()
            .map_or((0, 1.0), |sim| (sim.ticks_elapsed(), sim.alpha()));
        MapFrame {
            name: name.to_string(),
            state: self.state(),
            tick,
            alpha,
            snapped: self.snapped,
            grid: self.grid.summary(),
            totals: self.totals,
            regions: self.regions.clone(),
            tiles: self.tiles.iter().map(TileFrame::from).collect(),
        }
    }

    /// Signed mean offset of the tiles from the centers of their cells.
    pub fn mean_deviation(&self) -> Option<Point> {
        if self.tiles.is_empty() {
            return None;
        }
        let frame = self.grid.frame();
        let (dx, dy) = self.tiles.iter().fold((0.0, 0.0), |(dx, dy), tile| {
            let center = frame.center(tile.cell());
            (dx + tile.x - center.x, dy + tile.y - center.y)
        });
        let count = self.tiles.len() as f64;
        Some(Point::new(dx / count, dy / count))
    }

    /// Cells currently holding more than one tile.
    pub fn crowded_cells(&self) -> Vec<(CellIndex, usize)> {
        let mut counts: HashMap<CellIndex, usize> = HashMap::new();
        for tile in &self.tiles {
            *counts.entry(tile.cell()).or_default() += 1;
        }
        let mut crowded: Vec<_> = counts.into_iter().filter(|&(_, count)| count > 1).collect();
        crowded.sort_unstable();
        crowded
    }
}
