use crate::{
    geometry::Point,
    rng::ForceRng,
    spatial::QuadTree,
    tile::{Impulse, Tile},
};

use super::{Force, ForceContext};

const COINCIDENT_JITTER: f64 = 1e-6;

/// Pushes overlapping tiles apart, looking one step ahead at `position +
/// velocity`. Not scaled by alpha.
pub struct CollideForce {
    radii: Vec<f64>,
    strength: f64,
    iterations: u32,
    tree: QuadTree,
    tentative: Vec<Point>,
}

impl CollideForce {
    pub fn new(tile_count: usize, radius: f64) -> Self {
        Self {
            radii: vec![radius; tile_count],
            strength: 1.0,
            iterations: 1,
            tree: QuadTree::new(),
            tentative: Vec::with_capacity(tile_count),
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }
}

impl Force for CollideForce {
    fn name(&self) -> &str {
        "collide"
    }

    fn apply(
        &mut self,
        _ctx: &ForceContext<'_>,
        tiles: &[Tile],
        impulses: &mut [Impulse],
        rng: &mut ForceRng<'_>,
    ) {
        let count = tiles.len().min(impulses.len()).min(self.radii.len());
        let strength = self.strength;

        for _ in 0..self.iterations {
            self.tentative.clear();
            self.tentative.extend(tiles[..count].iter().zip(impulses.iter()).map(
                |(tile, impulse)| Point::new(tile.x + tile.vx + impulse.x, tile.y + tile.vy + impulse.y),
            ));
            self.tree.rebuild(&self.tentative, &self.radii[..count]);

            let radii = &self.radii;
            for i in 0..count {
                let ri = radii[i];
                let ri2 = ri * ri;
                let xi = tiles[i].x + tiles[i].vx + impulses[i].x;
                let yi = tiles[i].y + tiles[i].vy + impulses[i].y;

                self.tree.visit_within(xi, yi, ri, |j| {
                    if j <= i {
                        return;
                    }
                    let rj = radii[j];
                    let r = ri + rj;
                    let mut x = xi - (tiles[j].x + tiles[j].vx + impulses[j].x);
                    let mut y = yi - (tiles[j].y + tiles[j].vy + impulses[j].y);
                    let mut l = x * x + y * y;
                    if l >= r * r {
                        return;
                    }
                    if x == 0.0 {
                        x = rng.jitter(COINCIDENT_JITTER);
                        l += x * x;
                    }
                    if y == 0.0 {
                        y = rng.jitter(COINCIDENT_JITTER);
                        l += y * y;
                    }
                    let len = l.sqrt();
                    let scale = (r - len) / len * strength;
                    let (x, y) = (x * scale, y * scale);
                    let rj2 = rj * rj;
                    let share = rj2 / (ri2 + rj2);

                    impulses[i].add(x * share, y * share);
                    impulses[j].add(-x * (1.0 - share), -y * (1.0 - share));
                });
            }
        }
    }
}
