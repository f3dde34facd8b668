//! The `SpaceTimeVehicle` decentralised alternative (§4.9): vehicles
//! broadcast their intended space–time footprint directly to each other
//! instead of negotiating with an intersection manager.

use crate::environment::{IntersectionHandler, VehicleHandler};
use crate::grid::{DiscretisedIntersection, SafetyBuffer, TileId};
use crate::messaging::MessagingUnit;
use crate::protocol::{StipCrossing, StipMessage};
use crate::vehicle::InternalVehicle;
use crate::verbose::{self, VerboseLevel};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StipState {
    Exit,
    Approach,
    Enter,
}

/// Tunables for a [`SpaceTimeVehicle`]'s own tile-sweep simulation, built
/// with the same `new()` → `with_*` → `build()` convention as
/// [`crate::intersection_manager::IntersectionManagerConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StipVehicleConfig {
    pub delta: f64,
    pub recalculate_threshold: f64,
    pub safety_buffer: (f64, f64),
    pub granularity: i64,
}

impl StipVehicleConfig {
    pub fn new(granularity: i64) -> StipVehicleConfigBuilder {
        StipVehicleConfigBuilder {
            config: StipVehicleConfig {
                delta: 0.05,
                recalculate_threshold: 1.0,
                safety_buffer: (0.5, 1.0),
                granularity,
            },
        }
    }
}

pub struct StipVehicleConfigBuilder {
    config: StipVehicleConfig,
}

impl StipVehicleConfigBuilder {
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.config.delta = delta;
        self
    }

    pub fn with_recalculate_threshold(mut self, threshold: f64) -> Self {
        self.config.recalculate_threshold = threshold;
        self
    }

    pub fn with_safety_buffer(mut self, safety_buffer: (f64, f64)) -> Self {
        self.config.safety_buffer = safety_buffer;
        self
    }

    pub fn build(self) -> StipVehicleConfig {
        self.config
    }
}

pub struct SpaceTimeVehicle {
    id: String,
    config: StipVehicleConfig,
    state: StipState,
    cells: HashSet<TileId>,
    arrival_time: f64,
    exit_time: f64,
    last_sent_distance: f64,
    target_speed: Option<f64>,
    peers: HashMap<String, StipCrossing>,
}

impl SpaceTimeVehicle {
    pub fn new(id: impl Into<String>, config: StipVehicleConfig) -> Self {
        SpaceTimeVehicle {
            id: id.into(),
            config,
            state: StipState::Exit,
            cells: HashSet::new(),
            arrival_time: 0.0,
            exit_time: 0.0,
            last_sent_distance: 0.0,
            target_speed: None,
            peers: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> StipState {
        self.state
    }

    /// Builds the intersection's tile grid from the environment's metadata
    /// and caches the tile set this vehicle will sweep travelling its own
    /// trajectory at the governing speed limit.
    fn recompute_cells(
        &mut self,
        handler: &impl VehicleHandler,
        intersections: &impl IntersectionHandler,
        intersection_id: &str,
        current_time: f64,
    ) {
        let trajectories = intersections.trajectories(intersection_id);
        let lane = handler.trajectory(&self.id);
        let Some(trajectory) = trajectories.get(&lane).cloned() else {
            return;
        };
        let grid = DiscretisedIntersection::new(
            intersections.position(intersection_id),
            (intersections.width(intersection_id), intersections.height(intersection_id)),
            self.config.granularity,
            trajectories,
        );

        let speed_limit = trajectory.speed_limit().min(handler.speed_limit(&self.id)).max(1e-3);
        let length = handler.length(&self.id);
        let width = handler.width(&self.id);
        let buffer = SafetyBuffer::new(self.config.safety_buffer.0, self.config.safety_buffer.1);
        let mut vehicle = InternalVehicle::new(speed_limit, 0.0, length, width, trajectory.clone());

        let step_cap = (trajectory.length() / (speed_limit * self.config.delta)).ceil() as u64 + 1;
        let mut cells = HashSet::new();
        let mut steps = 0u64;
        while vehicle.is_in_intersection() {
            if steps > step_cap {
                break;
            }
            cells.extend(grid.tiles_swept(vehicle.pose(), length, width, buffer));
            if vehicle.update(self.config.delta).is_err() {
                break;
            }
            steps += 1;
        }

        let distance = handler.driving_distance(&self.id);
        self.arrival_time = current_time + distance / speed_limit;
        self.exit_time = self.arrival_time + trajectory.length() / speed_limit;
        self.cells = cells;
    }

    fn consider_peer(&mut self, handler: &impl VehicleHandler, peer: &StipCrossing, current_time: f64) {
        let space_overlap = self.cells.intersection(&peer.trajectory_cells).next().is_some();
        let time_overlap = self.exit_time.min(peer.exit_time) > self.arrival_time.max(peer.arrival_time);
        if !(space_overlap && time_overlap) {
            return;
        }

        let self_has_priority = (self.last_sent_distance, self.id.as_str()) < (peer.distance, peer.id.as_str());
        if self_has_priority {
            return;
        }

        let time_to_clear = peer.exit_time - current_time;
        if time_to_clear <= 0.0 {
            return;
        }
        let speed_to_miss = (handler.driving_distance(&self.id) / time_to_clear).max(0.0);
        let current_target = self.target_speed.unwrap_or_else(|| handler.speed_limit(&self.id));
        if speed_to_miss < current_target {
            verbose::verbose_log(VerboseLevel::Additional, verbose::EVENT_STIP_SPEED_THROTTLE, &self.id);
            self.target_speed = Some(speed_to_miss);
        }
    }

    fn apply_transitions(
        &mut self,
        handler: &mut impl VehicleHandler,
        intersections: &impl IntersectionHandler,
        messaging: &impl MessagingUnit<StipMessage>,
        current_time: f64,
    ) {
        match self.state {
            StipState::Exit => {
                if let Some(intersection_id) = handler.approaching(&self.id) {
                    self.recompute_cells(handler, intersections, &intersection_id, current_time);
                    self.state = StipState::Approach;
                }
            }
            StipState::Approach => {
                let speed_limit = handler.speed_limit(&self.id).max(1e-3);
                let estimate = current_time + handler.driving_distance(&self.id) / speed_limit;
                if (estimate - self.arrival_time).abs() > self.config.recalculate_threshold {
                    if let Some(intersection_id) = handler.approaching(&self.id) {
                        self.recompute_cells(handler, intersections, &intersection_id, current_time);
                    }
                }
                if handler.in_intersection(&self.id) {
                    self.state = StipState::Enter;
                }
            }
            StipState::Enter => {
                if handler.departing(&self.id).is_some() {
                    verbose::verbose_log(VerboseLevel::Additional, verbose::EVENT_STIP_EXIT, &self.id);
                    messaging.broadcast(StipMessage::Exit { id: self.id.clone() });
                    self.state = StipState::Exit;
                    self.cells.clear();
                    self.peers.clear();
                    self.target_speed = None;
                    handler.set_desired_speed(&self.id, -1.0);
                }
            }
        }
    }

    fn broadcast(&mut self, handler: &impl VehicleHandler, messaging: &impl MessagingUnit<StipMessage>, current_time: f64) {
        match self.state {
            StipState::Approach => {
                let distance = handler.driving_distance(&self.id);
                self.last_sent_distance = distance;
                let crossing = StipCrossing {
                    id: self.id.clone(),
                    arrival_time: self.arrival_time,
                    exit_time: self.exit_time,
                    trajectory_cells: self.cells.clone(),
                    lane: handler.trajectory(&self.id),
                    distance,
                };
                verbose::verbose_log(VerboseLevel::Additional, verbose::EVENT_STIP_ENTER, &self.id);
                messaging.broadcast(StipMessage::Enter(crossing));
            }
            StipState::Enter => {
                self.last_sent_distance = 0.0;
                let crossing = StipCrossing {
                    id: self.id.clone(),
                    arrival_time: current_time,
                    exit_time: self.exit_time,
                    trajectory_cells: self.cells.clone(),
                    lane: handler.trajectory(&self.id),
                    distance: 0.0,
                };
                verbose::verbose_log(VerboseLevel::Additional, verbose::EVENT_STIP_CROSS, &self.id);
                messaging.broadcast(StipMessage::Cross(crossing));
            }
            StipState::Exit => {}
        }
    }

    pub fn step(
        &mut self,
        handler: &mut impl VehicleHandler,
        intersections: &impl IntersectionHandler,
        messaging: &impl MessagingUnit<StipMessage>,
        current_time: f64,
    ) {
        for envelope in messaging.receive() {
            match envelope.contents {
                StipMessage::Enter(crossing) | StipMessage::Cross(crossing) => {
                    self.peers.insert(crossing.id.clone(), crossing);
                }
                StipMessage::Exit { id } => {
                    self.peers.remove(&id);
                }
            }
        }

        self.apply_transitions(handler, intersections, messaging, current_time);

        if self.state == StipState::Approach {
            self.target_speed = None;
            let peers: Vec<StipCrossing> = self.peers.values().cloned().collect();
            for peer in &peers {
                if peer.id != self.id {
                    self.consider_peer(handler, peer, current_time);
                }
            }
        }

        self.broadcast(handler, messaging, current_time);

        match self.target_speed {
            Some(target) => handler.set_desired_speed(&self.id, target),
            None if self.state == StipState::Approach => {
                handler.set_desired_speed(&self.id, handler.speed_limit(&self.id));
            }
            None => {}
        }
    }
}
