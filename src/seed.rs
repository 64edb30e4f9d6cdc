//! Deterministic seeding: `n` points evenly spaced on a circle per region.

use std::f64::consts::PI;

use tracing::warn;

use crate::{
    geometry::Point,
    grid::{CellIndex, GridFrame},
};

pub const DEFAULT_SEED_RADIUS: f64 = 5000.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedPlacement {
    pub accepted: Vec<(Point, CellIndex)>,
    pub dropped: usize,
}

/// Points at angles `2πk/weight` around `center`. A fractional weight yields
/// `ceil(weight)` points.
pub fn points_around(center: Point, weight: f64, radius: f64) -> Vec<Point> {
    if !(weight.is_finite() && weight > 0.0) {
        return Vec::new();
    }
    let count = weight.ceil() as usize;
    (0..count)
        .map(|k| {
            let angle = 2.0 * PI * k as f64 / weight;
            Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

pub struct SeedPlacer<'a> {
    radius: f64,
    frame: &'a GridFrame,
}

impl<'a> SeedPlacer<'a> {
    pub fn new(frame: &'a GridFrame, radius: f64) -> Self {
        Self { radius, frame }
    }

    /// Seeds that floor outside the grid are dropped, leaving the region short.
    pub fn place(&self, center: Point, weight: f64) -> SeedPlacement {
        let mut placement = SeedPlacement::default();
        for point in points_around(center, weight, self.radius) {
            let cell = self.frame.locate(point.x, point.y);
            if self.frame.contains(cell) {
                placement.accepted.push((point, cell));
            } else {
                warn!(x = point.x, y = point.y, i = cell.i, j = cell.j, "seed outside grid dropped");
                placement.dropped += 1;
            }
        }
        placement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> GridFrame {
        GridFrame {
            origin: Point::new(-10.0, -10.0),
            cell_size: 2.0,
            nx: 10,
            ny: 10,
        }
    }

    #[test]
    fn points_are_evenly_spaced_on_the_circle() {
        let center = Point::new(1.0, 2.0);
        let points = points_around(center, 4.0, 3.0);
        assert_eq!(points.len(), 4);
        for point in &points {
            assert!((point.distance(center) - 3.0).abs() < 1e-12);
        }
        assert!((points[0].x - 4.0).abs() < 1e-12);
        assert!((points[1].y - 5.0).abs() < 1e-12);
        assert!((points[2].x + 2.0).abs() < 1e-12);
    }

    #[test]
    fn fractional_weight_rounds_count_up() {
        let points = points_around(Point::new(0.0, 0.0), 2.5, 1.0);
        assert_eq!(points.len(), 3);
        assert!(points_around(Point::new(0.0, 0.0), 0.0, 1.0).is_empty());
        assert!(points_around(Point::new(0.0, 0.0), f64::NAN, 1.0).is_empty());
    }

    #[test]
    fn seeds_outside_grid_are_dropped() {
        let frame = frame();
        let placer = SeedPlacer::new(&frame, 4.0);
        let inside = placer.place(Point::new(0.0, 0.0), 6.0);
        assert_eq!(inside.accepted.len(), 6);
        assert_eq!(inside.dropped, 0);

        let edge = placer.place(Point::new(8.0, 0.0), 4.0);
        assert_eq!(edge.accepted.len() + edge.dropped, 4);
        assert_eq!(edge.dropped, 1);
        for (point, cell) in &edge.accepted {
            assert_eq!(*cell, frame.locate(point.x, point.y));
            assert!(frame.contains(*cell));
        }
    }
}
