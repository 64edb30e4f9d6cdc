//! Force modules applied once per simulation tick.
//!
//! A force reads the tiles as they were at the start of the tick and writes
//! velocity contributions into its own impulse buffer. The simulation sums the
//! buffers before integrating, so registration order never changes what a
//! force sees.

mod cluster;
mod collide;
mod position;
mod tile_repel;

pub use cluster::ClusterForce;
pub use collide::CollideForce;
pub use position::{Axis, PositionForce};
pub use tile_repel::TileRepelForce;

use crate::{
    config::ForcesConfig,
    grid::GridFrame,
    rng::ForceRng,
    tile::{Impulse, Tile},
};

pub struct ForceContext<'a> {
    pub alpha: f64,
    pub frame: &'a GridFrame,
}

pub trait Force: Send {
    fn name(&self) -> &str;
    fn apply(
        &mut self,
        ctx: &ForceContext<'_>,
        tiles: &[Tile],
        impulses: &mut [Impulse],
        rng: &mut ForceRng<'_>,
    );
}

/// Registration order: x, y, cluster (when enabled), collide, tile repel
/// (when enabled).
pub fn default_forces(
    tiles: &[Tile],
    frame: &GridFrame,
    config: &ForcesConfig,
) -> Vec<Box<dyn Force>> {
    let mut forces: Vec<Box<dyn Force>> = vec![
        Box::new(PositionForce::new(Axis::X, config.position.strength, tiles)),
        Box::new(PositionForce::new(Axis::Y, config.position.strength, tiles)),
    ];
    if config.cluster.enabled {
        forces.push(Box::new(ClusterForce::new(config.cluster.strength)));
    }
    forces.push(Box::new(
        CollideForce::new(
            tiles.len(),
            frame.cell_size * config.collide.radius_factor,
        )
        .with_strength(config.collide.strength)
        .with_iterations(config.collide.iterations),
    ));
    if config.tile_repel.enabled {
        forces.push(Box::new(TileRepelForce::new(config.tile_repel.strength)));
    }
    forces
}
