use std::collections::BTreeMap;

use crate::{
    rng::ForceRng,
    tile::{Impulse, RegionId, Tile},
};

use super::{Force, ForceContext};

/// Draws the tiles of each region toward that region's live centroid.
pub struct ClusterForce {
    strength: f64,
    sums: BTreeMap<RegionId, (f64, f64, usize)>,
}

impl ClusterForce {
    pub fn new(strength: f64) -> Self {
        Self {
            strength,
            sums: BTreeMap::new(),
        }
    }
}

impl Force for ClusterForce {
    fn name(&self) -> &str {
        "cluster"
    }

    fn apply(
        &mut self,
        ctx: &ForceContext<'_>,
        tiles: &[Tile],
        impulses: &mut [Impulse],
        _rng: &mut ForceRng<'_>,
    ) {
        self.sums.clear();
        for tile in tiles {
            let entry = self.sums.entry(tile.region).or_insert((0.0, 0.0, 0));
            entry.0 += tile.x;
            entry.1 += tile.y;
            entry.2 += 1;
        }

        let pull = self.strength * ctx.alpha;
        for (tile, impulse) in tiles.iter().zip(impulses.iter_mut()) {
            if let Some(&(sum_x, sum_y, count)) = self.sums.get(&tile.region) {
                let cx = sum_x / count as f64;
                let cy = sum_y / count as f64;
                impulse.add((cx - tile.x) * pull, (cy - tile.y) * pull);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{forces::test_support, rng::RngStreams};

    #[test]
    fn members_pull_toward_their_own_centroid() {
        let mut tiles = test_support::tiles_at(&[(0.0, 0.0), (4.0, 0.0), (9.0, 9.0)]);
        tiles[2].region = RegionId(1);
        let frame = test_support::frame();
        let ctx = ForceContext {
            alpha: 0.5,
            frame: &frame,
        };
        let mut impulses = vec![Impulse::default(); 3];
        let mut force = ClusterForce::new(0.08);
        force.apply(&ctx, &tiles, &mut impulses, &mut RngStreams::new(1).stream("cluster"));

        assert!((impulses[0].x - 2.0 * 0.08 * 0.5).abs() < 1e-12);
        assert!((impulses[1].x + 2.0 * 0.08 * 0.5).abs() < 1e-12);
        assert_eq!(impulses[0].y, 0.0);
        // A lone tile is its own centroid.
        assert_eq!(impulses[2], Impulse::default());
    }
}
