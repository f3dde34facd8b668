//! # Trajectory
//!
//! A parametric curve through an intersection. Vehicles (real and the
//! [`crate::vehicle::InternalVehicle`] stand-in used by the feasibility
//! search) walk a `Trajectory` by arclength.

use crate::geom::{Point, Pose};
use std::fmt;

pub type TrajectoryId = String;

/// Errors produced by [`Trajectory`] construction and queries.
#[derive(Debug, Clone, PartialEq)]
pub enum TrajectoryError {
    /// A polyline with fewer than two points cannot define a heading.
    DegeneratePolyline,
    /// `point_at` was called with a negative arclength.
    InvalidArgument(f64),
}

impl fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryError::DegeneratePolyline => {
                write!(f, "trajectory polyline must have at least 2 points")
            }
            TrajectoryError::InvalidArgument(d) => {
                write!(f, "point_at called with negative arclength {}", d)
            }
        }
    }
}

impl std::error::Error for TrajectoryError {}

/// A piecewise-linear route through an intersection.
///
/// Immutable once constructed. `point_at(0)` is the entry point of the
/// intersection, `point_at(length)` the exit point; `point_at(d)` for
/// `d >= length` saturates at the exit point with the final segment's
/// heading.
#[derive(Debug, Clone)]
pub struct Trajectory {
    speed_limit: f64,
    polyline: Vec<Point>,
    cumulative: Vec<f64>,
    length: f64,
}

impl Trajectory {
    /// Builds a trajectory from an ordered polyline. Fails if the polyline
    /// has fewer than two points, or any two consecutive points coincide
    /// (a zero-length segment has no heading).
    pub fn new(speed_limit: f64, polyline: Vec<Point>) -> Result<Self, TrajectoryError> {
        if polyline.len() < 2 {
            return Err(TrajectoryError::DegeneratePolyline);
        }
        let mut cumulative = Vec::with_capacity(polyline.len());
        cumulative.push(0.0);
        for pair in polyline.windows(2) {
            let seg_len = pair[0].distance_to(&pair[1]);
            if seg_len == 0.0 {
                return Err(TrajectoryError::DegeneratePolyline);
            }
            cumulative.push(cumulative.last().unwrap() + seg_len);
        }
        let length = *cumulative.last().unwrap();
        Ok(Trajectory {
            speed_limit,
            polyline,
            cumulative,
            length,
        })
    }

    pub fn speed_limit(&self) -> f64 {
        self.speed_limit
    }

    /// Total arclength of the trajectory, cached at construction time.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Maps arclength `d` to a `Pose`. Saturates at the exit point for
    /// `d >= length`. Fails with [`TrajectoryError::InvalidArgument`] for
    /// `d < 0`.
    pub fn point_at(&self, d: f64) -> Result<Pose, TrajectoryError> {
        if d < 0.0 {
            return Err(TrajectoryError::InvalidArgument(d));
        }
        let d = d.min(self.length);
        // Find the segment whose cumulative range contains d. The polyline
        // is short (a handful of nodes per turn), so a linear scan is fine.
        let mut seg = self.cumulative.len().saturating_sub(2);
        for i in 0..self.cumulative.len() - 1 {
            if d <= self.cumulative[i + 1] || i == self.cumulative.len() - 2 {
                seg = i;
                break;
            }
        }
        let seg_start = self.cumulative[seg];
        let seg_len = self.cumulative[seg + 1] - seg_start;
        let t = if seg_len > 0.0 {
            (d - seg_start) / seg_len
        } else {
            0.0
        };
        let a = self.polyline[seg];
        let b = self.polyline[seg + 1];
        let position = a + (b - a) * t;
        let heading = (b - a).y.atan2((b - a).x);
        Ok(Pose::new(position, heading))
    }

    pub fn starting_pose(&self) -> Pose {
        self.point_at(0.0).expect("0.0 is always a valid arclength")
    }
}
