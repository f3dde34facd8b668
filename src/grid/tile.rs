//! The discretised intersection grid and the tile-sweep predicate.

use crate::geom::sat::OrientedRect;
use crate::geom::{Point, Pose};
use crate::trajectory::{Trajectory, TrajectoryId};
use std::collections::{HashMap, HashSet};

/// Integer (column, row) address of one grid cell. Both axes range over
/// `[0, granularity)`.
pub type TileId = (i64, i64);

/// A safety margin added to a vehicle's physical footprint before sweeping
/// it across the grid: `(lateral, longitudinal)` metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyBuffer {
    pub lateral: f64,
    pub longitudinal: f64,
}

impl SafetyBuffer {
    pub fn new(lateral: f64, longitudinal: f64) -> Self {
        SafetyBuffer {
            lateral,
            longitudinal,
        }
    }
}

/// An axis-aligned square intersection footprint, partitioned into an
/// `granularity x granularity` grid of square tiles, together with the
/// trajectories that cross it.
///
/// Immutable once constructed; shared read-only between an
/// [`crate::intersection_manager::IntersectionManager`] and the `InternalVehicle`
/// stand-ins it simulates during the feasibility search.
#[derive(Debug, Clone)]
pub struct DiscretisedIntersection {
    centre: Point,
    size: (f64, f64),
    granularity: i64,
    trajectories: HashMap<TrajectoryId, Trajectory>,
}

impl DiscretisedIntersection {
    pub fn new(
        centre: Point,
        size: (f64, f64),
        granularity: i64,
        trajectories: HashMap<TrajectoryId, Trajectory>,
    ) -> Self {
        DiscretisedIntersection {
            centre,
            size,
            granularity,
            trajectories,
        }
    }

    pub fn granularity(&self) -> i64 {
        self.granularity
    }

    pub fn centre(&self) -> Point {
        self.centre
    }

    pub fn size(&self) -> (f64, f64) {
        self.size
    }

    pub fn trajectory(&self, id: &str) -> Option<&Trajectory> {
        self.trajectories.get(id)
    }

    pub fn trajectories(&self) -> &HashMap<TrajectoryId, Trajectory> {
        &self.trajectories
    }

    /// True iff tile `(i, j)` lies on the boundary row/column of the grid.
    /// Boundary tiles use `EDGE_TILE_TIME_BUFFER` instead of `TIME_BUFFER`
    /// in the feasibility search (the occlusion near the edge of the
    /// discretised region is less certain than in the interior).
    pub fn is_boundary_tile(&self, tile: TileId) -> bool {
        let (i, j) = tile;
        i == 0 || j == 0 || i == self.granularity - 1 || j == self.granularity - 1
    }

    /// Returns the set of tile indices whose tile polygon intersects the
    /// oriented rectangle of footprint `(length + buffer.longitudinal) x
    /// (width + buffer.lateral)`, centred at `pose.position` and rotated by
    /// `pose.heading`.
    pub fn tiles_swept(
        &self,
        pose: Pose,
        length: f64,
        width: f64,
        buffer: SafetyBuffer,
    ) -> HashSet<TileId> {
        let footprint = OrientedRect::from_pose(
            pose.position,
            pose.heading,
            length + buffer.longitudinal,
            width + buffer.lateral,
        );

        // Transform corners into tile-index space: p -> ((p - centre + size/2) / size) * N.
        let (w, h) = self.size;
        let n = self.granularity as f64;
        let transformed: Vec<Point> = footprint
            .corners
            .iter()
            .map(|c| {
                let shifted = *c - self.centre + Point::new(w / 2.0, h / 2.0);
                Point::new(shifted.x / w * n, shifted.y / h * n)
            })
            .collect();
        let footprint_in_tile_space = OrientedRect {
            corners: [
                transformed[0],
                transformed[1],
                transformed[2],
                transformed[3],
            ],
        };

        let min_x = transformed.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = transformed
            .iter()
            .map(|p| p.x)
            .fold(f64::NEG_INFINITY, f64::max);
        let min_y = transformed.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = transformed
            .iter()
            .map(|p| p.y)
            .fold(f64::NEG_INFINITY, f64::max);

        let i_lo = min_x.floor().max(0.0) as i64;
        let i_hi = (max_x.floor() as i64).min(self.granularity - 1);
        let j_lo = min_y.floor().max(0.0) as i64;
        let j_hi = (max_y.floor() as i64).min(self.granularity - 1);

        let mut tiles = HashSet::new();
        for i in i_lo..=i_hi {
            for j in j_lo..=j_hi {
                let tile = OrientedRect::unit_tile(i, j);
                if tile.intersects(&footprint_in_tile_space) {
                    tiles.insert((i, j));
                }
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::InternalVehicle;

    fn straight_through_centre() -> (DiscretisedIntersection, Trajectory) {
        let trajectory =
            Trajectory::new(10.0, vec![Point::new(-30.0, 0.0), Point::new(30.0, 0.0)]).unwrap();
        let mut trajectories = HashMap::new();
        trajectories.insert("WE".to_string(), trajectory.clone());
        let intersection =
            DiscretisedIntersection::new(Point::new(0.0, 0.0), (60.0, 60.0), 20, trajectories);
        (intersection, trajectory)
    }

    #[test]
    fn sweep_empty_outside_footprint() {
        let (intersection, trajectory) = straight_through_centre();
        let pose = trajectory.point_at(-100.0).unwrap_or(trajectory.starting_pose());
        // Pose far outside the 60x60 footprint.
        let pose = Pose::new(Point::new(1000.0, 1000.0), pose.heading);
        let tiles = intersection.tiles_swept(pose, 5.0, 2.0, SafetyBuffer::new(0.5, 1.0));
        assert!(tiles.is_empty());
    }

    #[test]
    fn straight_trajectory_through_centre_stays_in_one_row() {
        // Scenario F: the vehicle sweeps a constant set of tile *rows* (j
        // indices) as it travels straight through the centre.
        let (intersection, trajectory) = straight_through_centre();
        let mut vehicle = InternalVehicle::new(5.0, 0.0, 5.0, 2.0, trajectory);
        let buffer = SafetyBuffer::new(2.0, 2.0);
        let mut rows: Option<HashSet<i64>> = None;
        let mut steps = 0;
        while vehicle.is_in_intersection() && steps < 10_000 {
            let tiles = intersection.tiles_swept(vehicle.pose(), 5.0, 2.0, buffer);
            let these_rows: HashSet<i64> = tiles.iter().map(|(_, j)| *j).collect();
            match &rows {
                None => rows = Some(these_rows),
                Some(r) => assert_eq!(*r, these_rows, "tile rows should be stable on a straight path"),
            }
            vehicle.update(0.25).unwrap();
            steps += 1;
        }
        assert!(rows.is_some());
    }

    #[test]
    fn translation_invariance() {
        let (intersection, trajectory) = straight_through_centre();
        let pose = trajectory.point_at(0.0).unwrap();
        let buffer = SafetyBuffer::new(0.5, 1.0);
        let tiles_a = intersection.tiles_swept(pose, 5.0, 2.0, buffer);

        let shift = Point::new(100.0, 50.0);
        let shifted_intersection =
            DiscretisedIntersection::new(intersection.centre() + shift, intersection.size(), 20, {
                let mut m = HashMap::new();
                m.insert("WE".to_string(), trajectory.clone());
                m
            });
        let shifted_pose = Pose::new(pose.position + shift, pose.heading);
        let tiles_b = shifted_intersection.tiles_swept(shifted_pose, 5.0, 2.0, buffer);
        assert_eq!(tiles_a, tiles_b);
    }

    #[test]
    fn boundary_tiles_are_the_outer_ring() {
        let (intersection, _) = straight_through_centre();
        assert!(intersection.is_boundary_tile((0, 5)));
        assert!(intersection.is_boundary_tile((19, 5)));
        assert!(intersection.is_boundary_tile((5, 0)));
        assert!(intersection.is_boundary_tile((5, 19)));
        assert!(!intersection.is_boundary_tile((5, 5)));
    }
}
