//! Planar geometry for the input layer.
//!
//! Coordinates are assumed to be projected already; every computation here is
//! Euclidean. The types deserialize straight from GeoJSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl TryFrom<Vec<f64>> for Point {
    type Error = String;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        match value.as_slice() {
            [x, y, ..] => Ok(Self::new(*x, *y)),
            _ => Err(format!(
                "position needs at least two ordinates, got {}",
                value.len()
            )),
        }
    }
}

impl From<Point> for [f64; 2] {
    fn from(value: Point) -> Self {
        [value.x, value.y]
    }
}

/// Axis-aligned bounding box. A fresh box is empty and absorbs points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub const fn empty() -> Self {
        Self::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn extend(&mut self, point: Point) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    pub fn union(self, other: BBox) -> BBox {
        BBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains_box(&self, other: &BBox) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }
}

impl Default for BBox {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Point,
    },
    MultiPoint {
        coordinates: Vec<Point>,
    },
    LineString {
        coordinates: Vec<Point>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Point>>,
    },
    Polygon {
        coordinates: Vec<Vec<Point>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Point>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
            Geometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    /// Planar area with holes subtracted. Geometries without an area count as
    /// zero and log a warning.
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Polygon { coordinates } => polygon_area(coordinates),
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().map(|polygon| polygon_area(polygon)).sum()
            }
            Geometry::GeometryCollection { geometries } => {
                geometries.iter().map(Geometry::area).sum()
            }
            other => {
                warn!(
                    geometry = other.type_name(),
                    "geometry type has no area or is not supported"
                );
                0.0
            }
        }
    }

    pub fn bbox(&self) -> BBox {
        let mut bbox = BBox::empty();
        self.visit_coords(false, &mut |point| bbox.extend(point));
        bbox
    }

    /// Mean of all vertices, ignoring the closing vertex of polygon rings.
    pub fn centroid(&self) -> Option<Point> {
        let (mut sum_x, mut sum_y, mut count) = (0.0, 0.0, 0_usize);
        self.visit_coords(true, &mut |point| {
            sum_x += point.x;
            sum_y += point.y;
            count += 1;
        });
        if count == 0 {
            return None;
        }
        Some(Point::new(sum_x / count as f64, sum_y / count as f64))
    }

    fn visit_coords<F: FnMut(Point)>(&self, skip_ring_closure: bool, visit: &mut F) {
        let ring = |ring: &Vec<Point>, visit: &mut F| {
            let end = if skip_ring_closure {
                ring.len().saturating_sub(1)
            } else {
                ring.len()
            };
            ring[..end].iter().copied().for_each(|point| visit(point));
        };
        match self {
            Geometry::Point { coordinates } => visit(*coordinates),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                coordinates.iter().copied().for_each(|point| visit(point));
            }
            Geometry::MultiLineString { coordinates } => {
                for line in coordinates {
                    line.iter().copied().for_each(|point| visit(point));
                }
            }
            Geometry::Polygon { coordinates } => {
                for r in coordinates {
                    ring(r, &mut *visit);
                }
            }
            Geometry::MultiPolygon { coordinates } => {
                for polygon in coordinates {
                    for r in polygon {
                        ring(r, &mut *visit);
                    }
                }
            }
            Geometry::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.visit_coords(skip_ring_closure, visit);
                }
            }
        }
    }
}

/// Shoelace area of a closed ring (last vertex repeats the first).
pub fn ring_area(ring: &[Point]) -> f64 {
    let twice: f64 = ring
        .windows(2)
        .map(|pair| pair[0].x * pair[1].y - pair[1].x * pair[0].y)
        .sum();
    twice.abs() / 2.0
}

/// Outer ring area minus the area of every hole.
pub fn polygon_area(rings: &[Vec<Point>]) -> f64 {
    let Some((outer, holes)) = rings.split_first() else {
        return 0.0;
    };
    ring_area(outer) - holes.iter().map(|hole| ring_area(hole)).sum::<f64>()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl Feature {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.as_ref().and_then(|props| props.get(name))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn bbox(&self) -> BBox {
        self.features
            .iter()
            .filter_map(|feature| feature.geometry.as_ref())
            .fold(BBox::empty(), |acc, geometry| acc.union(geometry.bbox()))
    }
}
