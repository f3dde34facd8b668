//! The `TrafficLightVehicle` baseline (§4.10): no reservation, just obeys a
//! per-route signal phase and otherwise drives at the trajectory speed limit.

use crate::environment::{ControlMode, IntersectionHandler, SignalPhase, VehicleHandler};

pub struct TrafficLightVehicle {
    id: String,
}

impl TrafficLightVehicle {
    pub fn new(id: impl Into<String>) -> Self {
        TrafficLightVehicle { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn distance_to_stop(speed: f64, max_deceleration: f64) -> f64 {
        speed * speed / (2.0 * max_deceleration)
    }

    pub fn step(&mut self, handler: &mut impl VehicleHandler, intersections: &impl IntersectionHandler) {
        if handler.in_intersection(&self.id) {
            handler.set_desired_speed(&self.id, handler.speed_limit(&self.id));
            if handler.departing(&self.id).is_some() {
                handler.set_desired_speed(&self.id, -1.0);
                handler.set_control_mode(&self.id, ControlMode::WithSafetyPrecautions);
            }
            return;
        }

        let Some(intersection_id) = handler.approaching(&self.id) else {
            return;
        };
        let route = handler.trajectory(&self.id);
        let phase = intersections.traffic_light_phase(&intersection_id, &route);

        match phase {
            SignalPhase::Green | SignalPhase::Yellow => {
                handler.set_desired_speed(&self.id, handler.speed_limit(&self.id));
            }
            SignalPhase::Red => {
                let speed = handler.speed(&self.id);
                let stop_distance = Self::distance_to_stop(speed, handler.max_deceleration(&self.id));
                if handler.driving_distance(&self.id) <= stop_distance + 1.0 {
                    handler.set_desired_speed(&self.id, 0.0);
                } else {
                    handler.set_desired_speed(&self.id, handler.speed_limit(&self.id));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::trajectory::Trajectory;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct MockVehicleHandler {
        approaching: Option<String>,
        departing: Option<String>,
        in_intersection: bool,
        trajectory: String,
        driving_distance: f64,
        speed: f64,
        speed_limit: f64,
        max_deceleration: f64,
        desired_speed: RefCell<Option<f64>>,
    }

    impl VehicleHandler for MockVehicleHandler {
        fn approaching(&self, _v: &str) -> Option<String> {
            self.approaching.clone()
        }
        fn departing(&self, _v: &str) -> Option<String> {
            self.departing.clone()
        }
        fn in_intersection(&self, _v: &str) -> bool {
            self.in_intersection
        }
        fn trajectory(&self, _v: &str) -> String {
            self.trajectory.clone()
        }
        fn length(&self, _v: &str) -> f64 {
            5.0
        }
        fn width(&self, _v: &str) -> f64 {
            2.0
        }
        fn driving_distance(&self, _v: &str) -> f64 {
            self.driving_distance
        }
        fn speed(&self, _v: &str) -> f64 {
            self.speed
        }
        fn position(&self, _v: &str) -> Point {
            Point::new(0.0, 0.0)
        }
        fn direction(&self, _v: &str) -> f64 {
            0.0
        }
        fn speed_limit(&self, _v: &str) -> f64 {
            self.speed_limit
        }
        fn acceleration(&self, _v: &str) -> f64 {
            0.0
        }
        fn max_acceleration(&self, _v: &str) -> f64 {
            3.0
        }
        fn max_deceleration(&self, _v: &str) -> f64 {
            self.max_deceleration
        }
        fn set_desired_speed(&mut self, _v: &str, to: f64) {
            *self.desired_speed.borrow_mut() = Some(to);
        }
        fn set_control_mode(&mut self, _v: &str, _mode: ControlMode) {}
    }

    struct MockIntersectionHandler {
        phase: SignalPhase,
    }

    impl IntersectionHandler for MockIntersectionHandler {
        fn ids(&self) -> Vec<String> {
            vec!["I1".to_string()]
        }
        fn width(&self, _id: &str) -> f64 {
            20.0
        }
        fn height(&self, _id: &str) -> f64 {
            20.0
        }
        fn position(&self, _id: &str) -> Point {
            Point::new(0.0, 0.0)
        }
        fn trajectories(&self, _id: &str) -> HashMap<String, Trajectory> {
            HashMap::new()
        }
        fn set_traffic_light_phase(&mut self, _id: &str, _route: &str, _phase: SignalPhase) {}
        fn traffic_light_phase(&self, _id: &str, _route: &str) -> SignalPhase {
            self.phase
        }
    }

    #[test]
    fn stops_at_entry_while_red_and_close() {
        let mut vehicle = TrafficLightVehicle::new("Bob");
        let mut handler = MockVehicleHandler {
            approaching: Some("I1".to_string()),
            departing: None,
            in_intersection: false,
            trajectory: "WE".to_string(),
            driving_distance: 5.0,
            speed: 10.0,
            speed_limit: 15.0,
            max_deceleration: 4.0,
            desired_speed: RefCell::new(None),
        };
        let intersections = MockIntersectionHandler { phase: SignalPhase::Red };

        vehicle.step(&mut handler, &intersections);
        assert_eq!(*handler.desired_speed.borrow(), Some(0.0));
    }

    #[test]
    fn drives_at_speed_limit_while_far_from_red_entry() {
        let mut vehicle = TrafficLightVehicle::new("Bob");
        let mut handler = MockVehicleHandler {
            approaching: Some("I1".to_string()),
            departing: None,
            in_intersection: false,
            trajectory: "WE".to_string(),
            driving_distance: 200.0,
            speed: 10.0,
            speed_limit: 15.0,
            max_deceleration: 4.0,
            desired_speed: RefCell::new(None),
        };
        let intersections = MockIntersectionHandler { phase: SignalPhase::Red };

        vehicle.step(&mut handler, &intersections);
        assert_eq!(*handler.desired_speed.borrow(), Some(15.0));
    }

    #[test]
    fn drives_at_speed_limit_while_green() {
        let mut vehicle = TrafficLightVehicle::new("Bob");
        let mut handler = MockVehicleHandler {
            approaching: Some("I1".to_string()),
            departing: None,
            in_intersection: false,
            trajectory: "WE".to_string(),
            driving_distance: 5.0,
            speed: 10.0,
            speed_limit: 15.0,
            max_deceleration: 4.0,
            desired_speed: RefCell::new(None),
        };
        let intersections = MockIntersectionHandler { phase: SignalPhase::Green };

        vehicle.step(&mut handler, &intersections);
        assert_eq!(*handler.desired_speed.borrow(), Some(15.0));
    }

    #[test]
    fn releases_speed_control_on_departure() {
        let mut vehicle = TrafficLightVehicle::new("Bob");
        let mut handler = MockVehicleHandler {
            approaching: None,
            departing: Some("I1".to_string()),
            in_intersection: true,
            trajectory: "WE".to_string(),
            driving_distance: 5.0,
            speed: 10.0,
            speed_limit: 15.0,
            max_deceleration: 4.0,
            desired_speed: RefCell::new(None),
        };
        let intersections = MockIntersectionHandler { phase: SignalPhase::Green };

        vehicle.step(&mut handler, &intersections);
        assert_eq!(*handler.desired_speed.borrow(), Some(-1.0));
    }
}
