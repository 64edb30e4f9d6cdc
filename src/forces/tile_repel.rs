use std::collections::BTreeMap;

use crate::{
    grid::CellIndex,
    rng::ForceRng,
    tile::{Impulse, Tile},
};

use super::{Force, ForceContext};

const BUCKET_JITTER: f64 = 1e-4;
const COINCIDENT_DISTANCE: f64 = 1e-6;
const COINCIDENT_JUMP: f64 = 1e-2;
const REPEL_SCALE: f64 = 10.0;

/// Inverse-square push between tiles that currently share a grid cell.
pub struct TileRepelForce {
    strength: f64,
    buckets: BTreeMap<CellIndex, Vec<usize>>,
}

impl TileRepelForce {
    pub fn new(strength: f64) -> Self {
        Self {
            strength,
            buckets: BTreeMap::new(),
        }
    }
}

impl Force for TileRepelForce {
    fn name(&self) -> &str {
        "tile_repel"
    }

    fn apply(
        &mut self,
        ctx: &ForceContext<'_>,
        tiles: &[Tile],
        impulses: &mut [Impulse],
        rng: &mut ForceRng<'_>,
    ) {
        for bucket in self.buckets.values_mut() {
            bucket.clear();
        }
        for (index, tile) in tiles.iter().enumerate().take(impulses.len()) {
            let cell = ctx.frame.locate(
                tile.x + rng.jitter(BUCKET_JITTER),
                tile.y + rng.jitter(BUCKET_JITTER),
            );
            self.buckets.entry(cell).or_default().push(index);
        }

        let magnitude = self.strength * ctx.alpha * REPEL_SCALE;
        for members in self.buckets.values().filter(|members| members.len() > 1) {
            for (offset, &a) in members.iter().enumerate() {
                for &b in &members[offset + 1..] {
                    let mut dx = tiles[a].x - tiles[b].x;
                    let mut dy = tiles[a].y - tiles[b].y;
                    let mut dist = dx.hypot(dy);
                    if dist < COINCIDENT_DISTANCE {
                        dx = rng.jitter(COINCIDENT_JUMP);
                        dy = rng.jitter(COINCIDENT_JUMP);
                        dist = dx.hypot(dy);
                    }
                    if dist == 0.0 {
                        continue;
                    }
                    let force = magnitude / (dist * dist);
                    let (ux, uy) = (dx / dist * force, dy / dist * force);
                    impulses[a].add(ux, uy);
                    impulses[b].add(-ux, -uy);
                }
            }
        }
        self.buckets.retain(|_, members| !members.is_empty());
    }
}
