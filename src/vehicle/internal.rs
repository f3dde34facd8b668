//! Ephemeral kinematic stand-in used by the intersection manager's
//! feasibility search. Never seen by a real vehicle agent.

use crate::geom::Pose;
use crate::trajectory::{Trajectory, TrajectoryError};
use std::fmt;

/// Errors raised while advancing an [`InternalVehicle`].
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleError {
    /// `update` was called with a non-positive timestep.
    InvalidTimestep(f64),
    Trajectory(TrajectoryError),
}

impl fmt::Display for VehicleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleError::InvalidTimestep(dt) => write!(f, "invalid timestep {}", dt),
            VehicleError::Trajectory(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for VehicleError {}

impl From<TrajectoryError> for VehicleError {
    fn from(e: TrajectoryError) -> Self {
        VehicleError::Trajectory(e)
    }
}

/// A vehicle stand-in that walks a [`Trajectory`] under a constant
/// acceleration, capped at `speed_limit`. The intersection manager spawns
/// one of these per acceleration profile it tries during the feasibility
/// search (see `IntersectionManager::find_feasible_profile`); it never
/// represents a real agent in the simulation.
#[derive(Debug, Clone)]
pub struct InternalVehicle {
    velocity: f64,
    acceleration: f64,
    length: f64,
    width: f64,
    trajectory: Trajectory,
    distance_moved: f64,
}

impl InternalVehicle {
    pub fn new(
        velocity: f64,
        acceleration: f64,
        length: f64,
        width: f64,
        trajectory: Trajectory,
    ) -> Self {
        InternalVehicle {
            velocity,
            acceleration,
            length,
            width,
            trajectory,
            distance_moved: 0.0,
        }
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn distance_moved(&self) -> f64 {
        self.distance_moved
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Current pose, derived from `distance_moved` against the trajectory.
    pub fn pose(&self) -> Pose {
        self.trajectory
            .point_at(self.distance_moved)
            .unwrap_or_else(|_| self.trajectory.starting_pose())
    }

    pub fn is_in_intersection(&self) -> bool {
        self.distance_moved < self.trajectory.length()
    }

    /// Advances the vehicle by `dt` seconds: moves `velocity · dt` along the
    /// trajectory, then updates `velocity` by `acceleration · dt`. The IM's
    /// profile search is responsible for zeroing `acceleration` once
    /// `velocity` reaches the governing speed limit — this stand-in applies
    /// whatever acceleration it was given, unclamped.
    pub fn update(&mut self, dt: f64) -> Result<f64, VehicleError> {
        if dt <= 0.0 {
            return Err(VehicleError::InvalidTimestep(dt));
        }
        let distance = self.velocity * dt;
        self.distance_moved += distance;
        self.velocity += self.acceleration * dt;
        Ok(distance)
    }

    /// Zeroes the acceleration once `velocity` reaches the lesser of the
    /// vehicle's own cap and the trajectory's speed limit, per §4.3's
    /// external capping rule.
    pub fn cap_acceleration_at_speed_limit(&mut self, vehicle_max_velocity: f64) {
        let governing_limit = vehicle_max_velocity.min(self.trajectory.speed_limit());
        if self.velocity >= governing_limit {
            self.acceleration = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;

    fn trajectory(speed_limit: f64) -> Trajectory {
        Trajectory::new(speed_limit, vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]).unwrap()
    }

    #[test]
    fn constant_velocity_moves_linearly() {
        let mut v = InternalVehicle::new(10.0, 0.0, 5.0, 2.0, trajectory(20.0));
        v.update(1.0).unwrap();
        assert!((v.distance_moved() - 10.0).abs() < 1e-9);
        assert_eq!(v.velocity(), 10.0);
    }

    #[test]
    fn acceleration_increases_velocity_and_distance() {
        let mut v = InternalVehicle::new(0.0, 2.0, 5.0, 2.0, trajectory(20.0));
        v.update(1.0).unwrap();
        assert!((v.velocity() - 2.0).abs() < 1e-9);
        assert!((v.distance_moved() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cap_acceleration_zeroes_it_once_speed_limit_reached() {
        let mut v = InternalVehicle::new(9.0, 5.0, 5.0, 2.0, trajectory(10.0));
        v.update(1.0).unwrap();
        assert_eq!(v.velocity(), 14.0);
        v.cap_acceleration_at_speed_limit(20.0);
        assert_eq!(v.acceleration, 0.0);
        let before = v.velocity();
        v.update(1.0).unwrap();
        assert_eq!(v.velocity(), before);
    }

    #[test]
    fn cap_acceleration_uses_lesser_of_vehicle_and_trajectory_limit() {
        let mut v = InternalVehicle::new(5.0, 1.0, 5.0, 2.0, trajectory(20.0));
        v.cap_acceleration_at_speed_limit(5.0);
        assert_eq!(v.acceleration, 0.0);
    }

    #[test]
    fn rejects_non_positive_timestep() {
        let mut v = InternalVehicle::new(1.0, 0.0, 5.0, 2.0, trajectory(20.0));
        assert_eq!(v.update(0.0), Err(VehicleError::InvalidTimestep(0.0)));
        assert_eq!(v.update(-1.0), Err(VehicleError::InvalidTimestep(-1.0)));
    }

    #[test]
    fn leaves_intersection_past_trajectory_length() {
        let mut v = InternalVehicle::new(50.0, 0.0, 5.0, 2.0, trajectory(50.0));
        assert!(v.is_in_intersection());
        v.update(10.0).unwrap();
        assert!(!v.is_in_intersection());
    }
}
