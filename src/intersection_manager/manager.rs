//! The query-based intersection manager: runs the accept/reject algorithm
//! of §4.7 against its [`ReservationTable`] and [`DiscretisedIntersection`].

use crate::grid::{DiscretisedIntersection, SafetyBuffer, TileId};
use crate::intersection_manager::config::IntersectionManagerConfig;
use crate::protocol::{ChangeRequest, Confirm, IMMessage, Request, VehicleMessage};
use crate::reservation::{to_key, EntryDirection, ReservationTable, TimeKey};
use crate::trajectory::Trajectory;
use crate::vehicle::InternalVehicle;
use crate::verbose::{self, LocalLogger, VerboseLevel};
use std::collections::HashSet;
use std::f64::consts::PI;
use std::fmt;

/// Errors raised directly by [`IntersectionManager`] (distinct from
/// [`crate::reservation::ReservationError`], which covers the table itself).
#[derive(Debug, Clone, PartialEq)]
pub enum IntersectionManagerError {
    /// A Request/Change-Request named a lane with no matching trajectory.
    UnknownTrajectory(String),
}

impl fmt::Display for IntersectionManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntersectionManagerError::UnknownTrajectory(lane) => {
                write!(f, "no trajectory registered for lane {}", lane)
            }
        }
    }
}

impl std::error::Error for IntersectionManagerError {}

/// How `discretise_time` snaps a continuous time to the Δ grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscretiseMode {
    Nearest,
    Floor,
    Ceiling,
}

impl Default for DiscretiseMode {
    fn default() -> Self {
        DiscretiseMode::Nearest
    }
}

fn discretise_time(t: f64, delta: f64, mode: DiscretiseMode) -> f64 {
    match mode {
        DiscretiseMode::Nearest => (t / delta).round() * delta,
        DiscretiseMode::Floor => (t / delta).floor() * delta,
        DiscretiseMode::Ceiling => (t / delta).ceil() * delta,
    }
}

/// One acceleration profile tried by the feasibility search: either
/// accelerate at the vehicle's max, or hold constant speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccelerationMode {
    Accelerate,
    ConstantSpeed,
}

struct FeasibleCrossing {
    tile_times: Vec<(TimeKey, HashSet<TileId>)>,
    mode: AccelerationMode,
}

/// Outcome of one acceleration-mode pass of the profile search.
enum SearchOutcome {
    Feasible(FeasibleCrossing),
    /// This mode hit a conflict but the vehicle was fast enough to be
    /// excused from the accelerate-first pass; try the next mode.
    TryNextMode,
    /// A conflict that is not excusable in this mode: reject outright
    /// without trying further modes.
    Reject,
}

pub struct IntersectionManager {
    config: IntersectionManagerConfig,
    intersection: DiscretisedIntersection,
    table: ReservationTable,
    next_reservation_id: u64,
    /// Per-instance logger, for callers that want a logger value instead of
    /// the crate-wide global (see `verbose::verbose_log`). Silent by
    /// default; raise its level with `set_logger_level`.
    logger: LocalLogger,
}

impl IntersectionManager {
    pub fn new(config: IntersectionManagerConfig, intersection: DiscretisedIntersection) -> Self {
        IntersectionManager {
            config,
            intersection,
            table: ReservationTable::new(),
            next_reservation_id: 0,
            logger: LocalLogger::with_session(VerboseLevel::None, "intersection_manager"),
        }
    }

    pub fn table(&self) -> &ReservationTable {
        &self.table
    }

    pub fn config(&self) -> &IntersectionManagerConfig {
        &self.config
    }

    pub fn set_logger_level(&mut self, level: VerboseLevel) {
        self.logger.set_level(level);
    }

    fn fresh_reservation_id(&mut self) -> String {
        self.next_reservation_id += 1;
        format!("res-{}", self.next_reservation_id)
    }

    /// Dispatches one incoming message and produces the reply to send back
    /// to `sender`, if any. Unknown message kinds and protocol violations
    /// are logged and the message is dropped, per §7/§10.2 — this method
    /// never returns an `Err` to its caller.
    pub fn handle(&mut self, sender: &str, message: VehicleMessage, now: f64) -> Option<IMMessage> {
        match message {
            VehicleMessage::Done { vehicle_id, .. } => {
                self.handle_done(&vehicle_id);
                None
            }
            VehicleMessage::Cancel { vehicle_id, .. } => {
                // Documented for protocol symmetry; never emitted by the
                // reference vehicle agents. Treated identically to Done.
                self.handle_done(&vehicle_id);
                None
            }
            VehicleMessage::Request(request) => {
                if request.vehicle_id != sender {
                    verbose::verbose_log(
                        VerboseLevel::Main,
                        verbose::EVENT_PROTOCOL_ERROR,
                        "request vehicle_id does not match sender address",
                    );
                    return None;
                }
                self.handle_request(sender, request, now)
            }
            VehicleMessage::ChangeRequest(change) => {
                if change.request.vehicle_id != sender {
                    verbose::verbose_log(
                        VerboseLevel::Main,
                        verbose::EVENT_PROTOCOL_ERROR,
                        "change-request vehicle_id does not match sender address",
                    );
                    return None;
                }
                // Clear the existing reservation before evaluating the new
                // one, so a vehicle's own prior slots never self-collide
                // with its replacement request (Scenario D).
                let _ = self.table.release(sender);
                self.handle_request(sender, change.request, now)
            }
        }
    }

    fn handle_done(&mut self, vehicle_id: &str) {
        if self.table.release(vehicle_id).is_err() {
            verbose::verbose_log(
                VerboseLevel::Main,
                verbose::EVENT_PROTOCOL_ERROR,
                "done/cancel from a vehicle holding no reservation",
            );
        } else {
            verbose::verbose_log(VerboseLevel::Additional, verbose::EVENT_RESERVATION_DONE, vehicle_id);
        }
    }

    fn handle_request(&mut self, sender: &str, request: Request, now: f64) -> Option<IMMessage> {
        let now = discretise_time(now, self.config.delta, DiscretiseMode::Nearest);

        if let Some(timeout) = self.table.timeout(sender) {
            if timeout > now {
                return Some(IMMessage::Reject { timeout });
            }
        }

        let cooldown = 0.5_f64.min((request.arrival_time - now) / 2.0);
        self.table.set_timeout(sender, now + cooldown);

        let trajectory = match self.intersection.trajectory(&request.arrival_lane) {
            Some(t) => t.clone(),
            None => {
                verbose::verbose_log(
                    VerboseLevel::Main,
                    verbose::EVENT_PROTOCOL_ERROR,
                    "request names a lane with no registered trajectory",
                );
                return None;
            }
        };
        // Bucket by the side the vehicle enters *from*, not its direction of
        // travel — a vehicle heading East on a "WE" lane enters from the
        // West, matching the `arrival_lane[0]` convention the entry-octant
        // scheme replaces.
        let entry_direction = EntryDirection::from_heading(trajectory.starting_pose().heading + PI);

        if request.distance > self.table.nearest_stalled(entry_direction) {
            let timeout = self.table.timeout(sender).unwrap_or(now);
            verbose::verbose_log(
                VerboseLevel::Additional,
                verbose::EVENT_STALL_PRIORITY_REJECT,
                sender,
            );
            return Some(IMMessage::Reject { timeout });
        }

        for mode in [AccelerationMode::Accelerate, AccelerationMode::ConstantSpeed] {
            match self.search_feasible_crossing(&request, &trajectory, mode) {
                SearchOutcome::Feasible(crossing) => {
                    let reservation_id = self.fresh_reservation_id();
                    self.table.commit(sender, reservation_id.clone(), crossing.tile_times);
                    self.table.reset_nearest_stalled(entry_direction);
                    verbose::verbose_log(VerboseLevel::Additional, verbose::EVENT_RESERVATION_CONFIRM, sender);
                    self.logger.log(verbose::EVENT_RESERVATION_CONFIRM, sender);
                    return Some(IMMessage::Confirm(Confirm {
                        reservation_id,
                        arrival_time: request.arrival_time,
                        arrival_velocity: request.arrival_velocity,
                        early_error: request.arrival_time - self.config.time_buffer,
                        late_error: request.arrival_time + self.config.time_buffer,
                        accelerate: crossing.mode == AccelerationMode::Accelerate,
                    }));
                }
                SearchOutcome::TryNextMode => {
                    verbose::verbose_log(
                        VerboseLevel::Detailed,
                        verbose::EVENT_PROFILE_SEARCH_FALLBACK,
                        sender,
                    );
                    continue;
                }
                SearchOutcome::Reject => break,
            }
        }

        self.table.set_nearest_stalled(entry_direction, request.distance);
        let timeout = self.table.timeout(sender).unwrap_or(now);
        verbose::verbose_log(VerboseLevel::Additional, verbose::EVENT_RESERVATION_REJECT, sender);
        self.logger.log(verbose::EVENT_RESERVATION_REJECT, sender);
        Some(IMMessage::Reject { timeout })
    }

    /// Runs one pass of the two-pass profile search (§4.7 step 5) for a
    /// single acceleration mode.
    fn search_feasible_crossing(
        &self,
        request: &Request,
        trajectory: &Trajectory,
        mode: AccelerationMode,
    ) -> SearchOutcome {
        let acceleration = match mode {
            AccelerationMode::Accelerate => request.max_acceleration,
            AccelerationMode::ConstantSpeed => 0.0,
        };
        let arrival_time = discretise_time(request.arrival_time, self.config.delta, DiscretiseMode::Nearest);
        let mut vehicle = InternalVehicle::new(
            request.arrival_velocity,
            acceleration,
            request.length,
            request.width,
            trajectory.clone(),
        );
        let buffer = SafetyBuffer::new(self.config.safety_buffer.0, self.config.safety_buffer.1);
        let governing_velocity = request.max_velocity.min(trajectory.speed_limit());

        let floor_velocity = request.arrival_velocity.max(1e-3);
        let step_cap = (trajectory.length() / (floor_velocity * self.config.delta)).ceil() as u64 + 1;

        let mut candidate = Vec::new();
        let mut t = arrival_time;
        let mut steps = 0u64;
        while vehicle.is_in_intersection() {
            if steps > step_cap {
                // Pathological profile (e.g. near-zero velocity): treat as a
                // rejection of this mode rather than looping forever.
                return SearchOutcome::Reject;
            }
            let pose = vehicle.pose();
            let tiles = self.intersection.tiles_swept(pose, request.length, request.width, buffer);
            verbose::verbose_log(VerboseLevel::Detailed, verbose::EVENT_TILE_SWEEP, &request.vehicle_id);

            let key = to_key(t, self.config.delta);
            for tile in &tiles {
                let local_buffer = if self.intersection.is_boundary_tile(*tile) {
                    self.config.edge_tile_time_buffer
                } else {
                    self.config.time_buffer
                };
                let window = (local_buffer / self.config.delta).ceil() as i64;
                let conflict = (-window..=window).any(|offset| self.table.is_occupied(*tile, key + offset).is_some());
                if conflict {
                    if mode == AccelerationMode::Accelerate
                        && request.arrival_velocity > self.config.must_accelerate_threshold
                    {
                        return SearchOutcome::TryNextMode;
                    }
                    return SearchOutcome::Reject;
                }
            }
            candidate.push((key, tiles));

            vehicle.cap_acceleration_at_speed_limit(governing_velocity);
            if vehicle.update(self.config.delta).is_err() {
                break;
            }
            t += self.config.delta;
            steps += 1;
        }

        SearchOutcome::Feasible(FeasibleCrossing {
            tile_times: candidate,
            mode,
        })
    }
}
