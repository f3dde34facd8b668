//! Minimal in-memory implementation of the `environment` traits, used only
//! by this crate's own integration tests — not a simulator.

use aim_reservation_core::environment::{
    ControlMode, Environment, IntersectionHandler, SignalPhase, VehicleHandler,
};
use aim_reservation_core::geom::Point;
use aim_reservation_core::trajectory::Trajectory;
use std::collections::HashMap;

pub struct FakeVehicle {
    pub trajectory_id: String,
    pub intersection_id: String,
    /// Negative before the intersection entry, `0..length` while inside,
    /// `>= length` once departed.
    pub position_along_route: f64,
    pub speed: f64,
    pub desired_speed: f64,
    pub length: f64,
    pub width: f64,
    pub max_acceleration: f64,
    pub max_deceleration: f64,
    pub control_mode: ControlMode,
    /// How far ahead of the entry point a vehicle starts treating the
    /// intersection manager as reachable.
    pub awareness_range: f64,
}

pub struct FakeIntersection {
    pub width: f64,
    pub height: f64,
    pub position: Point,
    pub trajectories: HashMap<String, Trajectory>,
    pub phases: HashMap<String, SignalPhase>,
}

pub struct FakeEnvironment {
    pub current_time: f64,
    pub vehicles: HashMap<String, FakeVehicle>,
    pub intersections: HashMap<String, FakeIntersection>,
    added: Vec<String>,
    removed: Vec<String>,
}

impl FakeEnvironment {
    pub fn new() -> Self {
        FakeEnvironment {
            current_time: 0.0,
            vehicles: HashMap::new(),
            intersections: HashMap::new(),
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn add_vehicle(&mut self, id: impl Into<String>, vehicle: FakeVehicle) {
        let id = id.into();
        self.added.push(id.clone());
        self.vehicles.insert(id, vehicle);
    }

    pub fn add_intersection(&mut self, id: impl Into<String>, intersection: FakeIntersection) {
        self.intersections.insert(id.into(), intersection);
    }

    fn trajectory_of(&self, vehicle_id: &str) -> &Trajectory {
        let vehicle = &self.vehicles[vehicle_id];
        &self.intersections[&vehicle.intersection_id].trajectories[&vehicle.trajectory_id]
    }

    /// Advances every vehicle's `position_along_route` by `speed * dt`,
    /// using `desired_speed` when the agent has claimed speed control.
    pub fn advance(&mut self, dt: f64) {
        let ids: Vec<String> = self.vehicles.keys().cloned().collect();
        for id in ids {
            let speed = {
                let vehicle = &self.vehicles[&id];
                if vehicle.desired_speed >= 0.0 {
                    vehicle.desired_speed
                } else {
                    vehicle.speed
                }
            };
            let vehicle = self.vehicles.get_mut(&id).unwrap();
            vehicle.speed = speed;
            vehicle.position_along_route += speed * dt;

            let length = self.intersections[&vehicle.intersection_id].trajectories[&vehicle.trajectory_id].length();
            if vehicle.position_along_route >= length + 1.0 {
                self.removed.push(id);
            }
        }
        self.current_time += dt;
    }
}

impl Environment for FakeEnvironment {
    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn step(&mut self) {
        self.advance(0.05);
    }

    fn added_vehicles(&self) -> Vec<String> {
        self.added.clone()
    }

    fn removed_vehicles(&self) -> Vec<String> {
        self.removed.clone()
    }

    fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
    }
}

impl IntersectionHandler for FakeEnvironment {
    fn ids(&self) -> Vec<String> {
        self.intersections.keys().cloned().collect()
    }

    fn width(&self, id: &str) -> f64 {
        self.intersections[id].width
    }

    fn height(&self, id: &str) -> f64 {
        self.intersections[id].height
    }

    fn position(&self, id: &str) -> Point {
        self.intersections[id].position
    }

    fn trajectories(&self, id: &str) -> HashMap<String, Trajectory> {
        self.intersections[id].trajectories.clone()
    }

    fn set_traffic_light_phase(&mut self, id: &str, route: &str, phase: SignalPhase) {
        self.intersections
            .get_mut(id)
            .unwrap()
            .phases
            .insert(route.to_string(), phase);
    }

    fn traffic_light_phase(&self, id: &str, route: &str) -> SignalPhase {
        self.intersections[id]
            .phases
            .get(route)
            .copied()
            .unwrap_or(SignalPhase::Green)
    }
}

impl VehicleHandler for FakeEnvironment {
    fn approaching(&self, vehicle_id: &str) -> Option<String> {
        let vehicle = &self.vehicles[vehicle_id];
        let length = self.trajectory_of(vehicle_id).length();
        if vehicle.position_along_route < 0.0 && -vehicle.position_along_route <= vehicle.awareness_range {
            Some(vehicle.intersection_id.clone())
        } else if vehicle.position_along_route >= 0.0 && vehicle.position_along_route < length {
            None
        } else {
            None
        }
    }

    fn departing(&self, vehicle_id: &str) -> Option<String> {
        let vehicle = &self.vehicles[vehicle_id];
        let length = self.trajectory_of(vehicle_id).length();
        if vehicle.position_along_route >= length {
            Some(vehicle.intersection_id.clone())
        } else {
            None
        }
    }

    fn in_intersection(&self, vehicle_id: &str) -> bool {
        let vehicle = &self.vehicles[vehicle_id];
        let length = self.trajectory_of(vehicle_id).length();
        vehicle.position_along_route >= 0.0 && vehicle.position_along_route < length
    }

    fn trajectory(&self, vehicle_id: &str) -> String {
        self.vehicles[vehicle_id].trajectory_id.clone()
    }

    fn length(&self, vehicle_id: &str) -> f64 {
        self.vehicles[vehicle_id].length
    }

    fn width(&self, vehicle_id: &str) -> f64 {
        self.vehicles[vehicle_id].width
    }

    fn driving_distance(&self, vehicle_id: &str) -> f64 {
        (-self.vehicles[vehicle_id].position_along_route).max(0.0)
    }

    fn speed(&self, vehicle_id: &str) -> f64 {
        self.vehicles[vehicle_id].speed
    }

    fn position(&self, vehicle_id: &str) -> Point {
        let vehicle = &self.vehicles[vehicle_id];
        self.trajectory_of(vehicle_id)
            .point_at(vehicle.position_along_route.max(0.0))
            .map(|pose| pose.position)
            .unwrap_or(Point::new(0.0, 0.0))
    }

    fn direction(&self, vehicle_id: &str) -> f64 {
        let vehicle = &self.vehicles[vehicle_id];
        self.trajectory_of(vehicle_id)
            .point_at(vehicle.position_along_route.max(0.0))
            .map(|pose| pose.heading)
            .unwrap_or(0.0)
    }

    fn speed_limit(&self, vehicle_id: &str) -> f64 {
        self.trajectory_of(vehicle_id).speed_limit()
    }

    fn acceleration(&self, _vehicle_id: &str) -> f64 {
        0.0
    }

    fn max_acceleration(&self, vehicle_id: &str) -> f64 {
        self.vehicles[vehicle_id].max_acceleration
    }

    fn max_deceleration(&self, vehicle_id: &str) -> f64 {
        self.vehicles[vehicle_id].max_deceleration
    }

    fn set_desired_speed(&mut self, vehicle_id: &str, to: f64) {
        self.vehicles.get_mut(vehicle_id).unwrap().desired_speed = to;
    }

    fn set_control_mode(&mut self, vehicle_id: &str, mode: ControlMode) {
        self.vehicles.get_mut(vehicle_id).unwrap().control_mode = mode;
    }
}
