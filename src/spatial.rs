//! Array-backed quadtree over tile positions, rebuilt every collision pass.
//!
//! Nodes live in one `Vec` and refer to their four children by the index of
//! the first one (siblings are contiguous). Each node records the largest
//! radius among the items below it, so a query can skip any branch whose box
//! is out of reach of the query radius plus that maximum.

use crate::geometry::{BBox, Point};

const LEAF_CAPACITY: usize = 4;
const MAX_DEPTH: u32 = 32;
const NO_CHILDREN: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    first_child: u32,
    start: u32,
    end: u32,
    max_radius: f64,
}

impl Node {
    const EMPTY: Node = Node {
        x0: 0.0,
        y0: 0.0,
        x1: 0.0,
        y1: 0.0,
        first_child: NO_CHILDREN,
        start: 0,
        end: 0,
        max_radius: 0.0,
    };
}

#[derive(Debug, Default)]
pub struct QuadTree {
    nodes: Vec<Node>,
    items: Vec<u32>,
}

impl QuadTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Replaces the contents with `points`, item `k` carrying `radii[k]`.
    pub fn rebuild(&mut self, points: &[Point], radii: &[f64]) {
        self.nodes.clear();
        self.items.clear();
        let count = points.len().min(radii.len());
        if count == 0 {
            return;
        }
        self.items.extend(0..count as u32);

        let mut bounds = BBox::empty();
        for point in &points[..count] {
            bounds.extend(*point);
        }
        let (x0, y0) = if bounds.is_empty() {
            (0.0, 0.0)
        } else {
            (bounds.min_x, bounds.min_y)
        };
        let side = bounds.width().max(bounds.height());
        let side = if side.is_finite() && side > 0.0 {
            side
        } else {
            1.0
        };

        self.nodes.push(Node::EMPTY);
        self.build(
            0,
            [x0, y0, x0 + side, y0 + side],
            0,
            count,
            0,
            points,
            radii,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &mut self,
        node: usize,
        bounds: [f64; 4],
        start: usize,
        end: usize,
        depth: u32,
        points: &[Point],
        radii: &[f64],
    ) {
        let [x0, y0, x1, y1] = bounds;
        let mut max_radius: f64 = 0.0;

        if end - start <= LEAF_CAPACITY || depth >= MAX_DEPTH {
            for &item in &self.items[start..end] {
                max_radius = max_radius.max(radii[item as usize]);
            }
            self.nodes[node] = Node {
                x0,
                y0,
                x1,
                y1,
                first_child: NO_CHILDREN,
                start: start as u32,
                end: end as u32,
                max_radius,
            };
            return;
        }

        let (mx, my) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        self.items[start..end].sort_by_key(|&item| quadrant(points[item as usize], mx, my));

        let first_child = self.nodes.len();
        self.nodes.extend([Node::EMPTY; 4]);
        let mut cursor = start;
        for q in 0..4 {
            let split = cursor
                + self.items[cursor..end]
                    .iter()
                    .take_while(|&&item| quadrant(points[item as usize], mx, my) == q)
                    .count();
            let child_bounds = match q {
                0 => [x0, y0, mx, my],
                1 => [mx, y0, x1, my],
                2 => [x0, my, mx, y1],
                _ => [mx, my, x1, y1],
            };
            self.build(
                first_child + q,
                child_bounds,
                cursor,
                split,
                depth + 1,
                points,
                radii,
            );
            max_radius = max_radius.max(self.nodes[first_child + q].max_radius);
            cursor = split;
        }

        self.nodes[node] = Node {
            x0,
            y0,
            x1,
            y1,
            first_child: first_child as u32,
            start: start as u32,
            end: end as u32,
            max_radius,
        };
    }

    /// Calls `visit` for every item whose node lies within `radius` plus the
    /// node's largest item radius of `(x, y)` on both axes. Callers still do
    /// the exact distance test.
    pub fn visit_within<F: FnMut(usize)>(&self, x: f64, y: f64, radius: f64, mut visit: F) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0_u32];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            let reach = radius + node.max_radius;
            if node.x0 > x + reach || node.x1 < x - reach || node.y0 > y + reach || node.y1 < y - reach
            {
                continue;
            }
            if node.first_child == NO_CHILDREN {
                for &item in &self.items[node.start as usize..node.end as usize] {
                    visit(item as usize);
                }
            } else {
                stack.extend((0..4).rev().map(|q| node.first_child + q));
            }
        }
    }
}

fn quadrant(point: Point, mx: f64, my: f64) -> usize {
    usize::from(point.x >= mx) | (usize::from(point.y >= my) << 1)
}
