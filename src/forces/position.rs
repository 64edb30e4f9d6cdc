use crate::{
    rng::ForceRng,
    tile::{Impulse, Tile},
};

use super::{Force, ForceContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Pulls each tile back toward its seed coordinate along one axis.
pub struct PositionForce {
    axis: Axis,
    targets: Vec<f64>,
    strengths: Vec<f64>,
}

impl PositionForce {
    /// Targets are captured from the tiles' origins now; a non-finite target
    /// gets zero strength.
    pub fn new(axis: Axis, strength: f64, tiles: &[Tile]) -> Self {
        let targets: Vec<f64> = tiles
            .iter()
            .map(|tile| match axis {
                Axis::X => tile.origin().x,
                Axis::Y => tile.origin().y,
            })
            .collect();
        let strengths = targets
            .iter()
            .map(|target| if target.is_finite() { strength } else { 0.0 })
            .collect();
        Self {
            axis,
            targets,
            strengths,
        }
    }
}

impl Force for PositionForce {
    fn name(&self) -> &str {
        match self.axis {
            Axis::X => "x",
            Axis::Y => "y",
        }
    }

    fn apply(
        &mut self,
        ctx: &ForceContext<'_>,
        tiles: &[Tile],
        impulses: &mut [Impulse],
        _rng: &mut ForceRng<'_>,
    ) {
        let tracked = tiles.iter().zip(impulses.iter_mut());
        for ((tile, impulse), (&target, &strength)) in
            tracked.zip(self.targets.iter().zip(&self.strengths))
        {
            if strength == 0.0 {
                continue;
            }
            match self.axis {
                Axis::X => impulse.x += (target - tile.x) * strength * ctx.alpha,
                Axis::Y => impulse.y += (target - tile.y) * strength * ctx.alpha,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{forces::test_support, geometry::Point, rng::RngStreams, tile::RegionId};

    #[test]
    fn pulls_toward_seed_scaled_by_alpha() {
        let mut tiles = test_support::tiles_at(&[(2.0, 3.0), (5.0, 5.0)]);
        tiles[0].x = 4.0;
        tiles[1].y = 1.0;
        let frame = test_support::frame();
        let ctx = ForceContext {
            alpha: 0.5,
            frame: &frame,
        };
        let mut streams = RngStreams::new(1);

        let mut impulses = vec![Impulse::default(); 2];
        let mut force_x = PositionForce::new(Axis::X, 0.1, &tiles);
        force_x.apply(&ctx, &tiles, &mut impulses, &mut streams.stream("x"));
        assert!((impulses[0].x - (2.0 - 4.0) * 0.1 * 0.5).abs() < 1e-12);
        assert_eq!(impulses[1].x, 0.0);
        assert_eq!(impulses[0].y, 0.0);

        let mut force_y = PositionForce::new(Axis::Y, 0.1, &tiles);
        force_y.apply(&ctx, &tiles, &mut impulses, &mut streams.stream("y"));
        assert!((impulses[1].y - (5.0 - 1.0) * 0.1 * 0.5).abs() < 1e-12);
        assert_eq!(force_y.name(), "y");
    }

    #[test]
    fn non_finite_target_disables_pull() {
        let frame = test_support::frame();
        let tiles = vec![Tile::new(0, RegionId(0), Point::new(f64::NAN, 1.0), &frame)];
        let ctx = ForceContext {
            alpha: 1.0,
            frame: &frame,
        };
        let mut impulses = vec![Impulse::default()];
        let mut force = PositionForce::new(Axis::X, 0.1, &tiles);
        force.apply(&ctx, &tiles, &mut impulses, &mut RngStreams::new(1).stream("x"));
        assert_eq!(impulses[0], Impulse::default());
    }
}
