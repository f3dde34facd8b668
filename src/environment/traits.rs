//! External-collaborator interfaces (§6). These traits describe the
//! microscopic traffic simulator this crate's agents run inside; this crate
//! ships only the trait definitions plus a minimal in-memory reference
//! implementation used by its own tests (see `tests/common`), not a
//! simulator.

use crate::geom::Point;
use crate::trajectory::Trajectory;
use std::collections::HashMap;

pub type IntersectionId = String;
pub type VehicleId = String;
pub type TrajectoryRouteId = String;

/// A traffic-light phase assignment, relevant only to the traffic-light
/// baseline (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalPhase {
    Green,
    Yellow,
    Red,
}

/// Whether a vehicle's speed is tracked exactly by its agent or governed by
/// the environment's own car-following/collision-avoidance model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Manual,
    WithSafetyPrecautions,
}

/// Read-only queries about the intersections present in the environment.
pub trait IntersectionHandler {
    fn ids(&self) -> Vec<IntersectionId>;
    fn width(&self, id: &str) -> f64;
    fn height(&self, id: &str) -> f64;
    fn position(&self, id: &str) -> Point;
    fn trajectories(&self, id: &str) -> HashMap<TrajectoryRouteId, Trajectory>;
    /// Only relevant to the traffic-light baseline.
    fn set_traffic_light_phase(&mut self, id: &str, route: &str, phase: SignalPhase);
    /// Only relevant to the traffic-light baseline.
    fn traffic_light_phase(&self, id: &str, route: &str) -> SignalPhase;
}

/// Read-mostly queries and the two permitted mutations
/// (`set_desired_speed`, `set_control_mode`) on a single vehicle.
pub trait VehicleHandler {
    fn approaching(&self, vehicle_id: &str) -> Option<IntersectionId>;
    fn departing(&self, vehicle_id: &str) -> Option<IntersectionId>;
    fn in_intersection(&self, vehicle_id: &str) -> bool;
    fn trajectory(&self, vehicle_id: &str) -> TrajectoryRouteId;
    fn length(&self, vehicle_id: &str) -> f64;
    fn width(&self, vehicle_id: &str) -> f64;
    fn driving_distance(&self, vehicle_id: &str) -> f64;
    fn speed(&self, vehicle_id: &str) -> f64;
    fn position(&self, vehicle_id: &str) -> Point;
    fn direction(&self, vehicle_id: &str) -> f64;
    fn speed_limit(&self, vehicle_id: &str) -> f64;
    fn acceleration(&self, vehicle_id: &str) -> f64;
    fn max_acceleration(&self, vehicle_id: &str) -> f64;
    fn max_deceleration(&self, vehicle_id: &str) -> f64;
    /// `to = -1.0` relinquishes speed control back to the environment.
    fn set_desired_speed(&mut self, vehicle_id: &str, to: f64);
    fn set_control_mode(&mut self, vehicle_id: &str, mode: ControlMode);
}

/// The simulation clock and vehicle population delta, shared by every agent.
pub trait Environment {
    fn current_time(&self) -> f64;
    fn step(&mut self);
    fn added_vehicles(&self) -> Vec<VehicleId>;
    fn removed_vehicles(&self) -> Vec<VehicleId>;
    fn clear(&mut self);
}
