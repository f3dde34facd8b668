//! Oriented-rectangle / axis-aligned-square intersection test.
//!
//! The tile sweep (`crate::grid::DiscretisedIntersection::tiles_swept`) is the
//! only place in this crate that needs general polygon-polygon intersection.
//! Rather than pull in a general polygon library, both shapes involved are
//! always rectangles (a grid tile and a vehicle's swept footprint), so a
//! separating-axis test over the four candidate axes is exact and cheap.

use crate::geom::Point;

/// A convex quadrilateral given by its four corners, in order (either winding
/// direction is fine for the separating-axis test below).
#[derive(Debug, Clone, Copy)]
pub struct OrientedRect {
    pub corners: [Point; 4],
}

impl OrientedRect {
    /// Builds the rectangle centred at `centre`, rotated by `heading`
    /// (radians), with the given full length (along the heading) and full
    /// width (perpendicular to it).
    pub fn from_pose(centre: Point, heading: f64, length: f64, width: f64) -> Self {
        let forward = Point::new(heading.cos(), heading.sin()) * (length / 2.0);
        let side = forward.perp().normalized() * (width / 2.0);
        OrientedRect {
            corners: [
                centre + forward + side,
                centre - forward + side,
                centre - forward - side,
                centre + forward - side,
            ],
        }
    }

    /// The axis-aligned unit square `[ox, ox+1] x [oy, oy+1]`, i.e. one grid
    /// tile in tile-index space.
    pub fn unit_tile(ox: i64, oy: i64) -> Self {
        let (x, y) = (ox as f64, oy as f64);
        OrientedRect {
            corners: [
                Point::new(x, y),
                Point::new(x + 1.0, y),
                Point::new(x + 1.0, y + 1.0),
                Point::new(x, y + 1.0),
            ],
        }
    }

    fn edges(&self) -> [Point; 4] {
        [
            self.corners[1] - self.corners[0],
            self.corners[2] - self.corners[1],
            self.corners[3] - self.corners[2],
            self.corners[0] - self.corners[3],
        ]
    }

    fn project(&self, axis: Point) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for corner in self.corners {
            let p = corner.dot(&axis);
            min = min.min(p);
            max = max.max(p);
        }
        (min, max)
    }

    /// True iff the two rectangles overlap with strictly positive area
    /// (touching edges/corners alone do not count as an intersection).
    pub fn intersects(&self, other: &OrientedRect) -> bool {
        for edge in self.edges().into_iter().chain(other.edges()) {
            let axis = edge.perp().normalized();
            if axis.norm() == 0.0 {
                continue;
            }
            let (min_a, max_a) = self.project(axis);
            let (min_b, max_b) = other.project(axis);
            if max_a <= min_b || max_b <= min_a {
                return false;
            }
        }
        true
    }
}
