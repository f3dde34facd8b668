//! The `ReservationVehicle` state machine (§4.8): requests, holds, and
//! changes a space–time reservation from an `IntersectionManager`.

use crate::environment::{ControlMode, VehicleHandler};
use crate::messaging::MessagingUnit;
use crate::protocol::{
    ChangeRequest, Confirm, IMMessage, ReservationId, ReservationProtocolMessage, Request, VehicleMessage,
};
use crate::verbose::{self, VerboseLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    Default,
    ApproachingNoRes,
    Waiting,
    ApproachingWithRes,
    InIntersection,
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveReservation {
    reservation_id: ReservationId,
    arrival_time: f64,
    arrival_velocity: f64,
    early_error: f64,
    late_error: f64,
    accelerate: bool,
}

impl From<Confirm> for ActiveReservation {
    fn from(c: Confirm) -> Self {
        ActiveReservation {
            reservation_id: c.reservation_id,
            arrival_time: c.arrival_time,
            arrival_velocity: c.arrival_velocity,
            early_error: c.early_error,
            late_error: c.late_error,
            accelerate: c.accelerate,
        }
    }
}

/// A vehicle agent that coordinates passage through an intersection by
/// request/reply with an `IntersectionManager`. Assumes the IM for
/// intersection id `i` is reachable at messaging address `i`.
pub struct ReservationVehicle {
    id: String,
    state: VehicleState,
    reservation: Option<ActiveReservation>,
    timeout: f64,
    target_speed: Option<f64>,
    approaching_im: Option<String>,
    was_just_waiting: bool,
    awaiting_reply: bool,
}

impl ReservationVehicle {
    pub fn new(id: impl Into<String>) -> Self {
        ReservationVehicle {
            id: id.into(),
            state: VehicleState::Default,
            reservation: None,
            timeout: 0.0,
            target_speed: None,
            approaching_im: None,
            was_just_waiting: false,
            awaiting_reply: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    fn distance_to_stop(speed: f64, max_deceleration: f64) -> f64 {
        speed * speed / (2.0 * max_deceleration)
    }

    fn approximate_arrival_time(&self, handler: &impl VehicleHandler, current_time: f64) -> f64 {
        let distance = handler.driving_distance(&self.id);
        if self.state == VehicleState::Waiting || self.target_speed == Some(0.0) {
            (2.0 * distance / handler.max_acceleration(&self.id)).sqrt()
        } else {
            let speed = self.target_speed.unwrap_or_else(|| handler.speed(&self.id));
            current_time + distance / speed
        }
    }

    fn approximate_arrival_velocity(&self, handler: &impl VehicleHandler) -> f64 {
        let distance = handler.driving_distance(&self.id);
        if self.state == VehicleState::Waiting {
            (2.0 * distance * handler.max_acceleration(&self.id)).sqrt()
        } else {
            let mut v = handler.speed(&self.id).min(handler.speed_limit(&self.id));
            if let Some(target) = self.target_speed {
                v = v.min(target);
            }
            v
        }
    }

    fn build_request(&self, handler: &impl VehicleHandler, current_time: f64) -> Request {
        Request {
            vehicle_id: self.id.clone(),
            arrival_time: self.approximate_arrival_time(handler, current_time),
            arrival_lane: handler.trajectory(&self.id),
            arrival_velocity: self.approximate_arrival_velocity(handler),
            max_acceleration: handler.max_acceleration(&self.id),
            max_velocity: handler.speed_limit(&self.id),
            length: handler.length(&self.id),
            width: handler.width(&self.id),
            distance: handler.driving_distance(&self.id),
            emergency: false,
        }
    }

    /// Runs one simulation tick: drains incoming IM replies, applies state
    /// transitions, then sends whatever the new state requires.
    pub fn step(
        &mut self,
        handler: &mut impl VehicleHandler,
        messaging: &impl MessagingUnit<ReservationProtocolMessage>,
        current_time: f64,
    ) {
        let mut confirmed = false;
        let mut rejected = false;
        for envelope in messaging.receive() {
            if let ReservationProtocolMessage::Im(message) = envelope.contents {
                match message {
                    IMMessage::Confirm(confirm) => {
                        self.reservation = Some(confirm.into());
                        confirmed = true;
                    }
                    IMMessage::Reject { timeout } => {
                        self.timeout = timeout;
                        self.awaiting_reply = false;
                        rejected = true;
                    }
                    IMMessage::Acknowledge { .. } => {}
                    IMMessage::EmergencyStop => {
                        handler.set_desired_speed(&self.id, 0.0);
                    }
                }
            }
        }

        if confirmed {
            self.on_confirm(handler);
        }
        if rejected && self.state != VehicleState::Waiting {
            let current_speed = handler.speed(&self.id);
            let lowered = (0.8 * current_speed).max(2.0);
            self.target_speed = Some(lowered);
            handler.set_desired_speed(&self.id, lowered);
        }

        self.apply_transitions(handler, messaging, current_time);
        self.act(handler, messaging, current_time);
    }

    fn on_confirm(&mut self, handler: &mut impl VehicleHandler) {
        if self.state == VehicleState::Waiting {
            if let Some(reservation) = &self.reservation {
                self.target_speed = Some(reservation.arrival_velocity);
                handler.set_desired_speed(&self.id, reservation.arrival_velocity);
            }
        }
        self.was_just_waiting = self.state == VehicleState::Waiting;
        self.state = VehicleState::ApproachingWithRes;
    }

    fn apply_transitions(
        &mut self,
        handler: &mut impl VehicleHandler,
        messaging: &impl MessagingUnit<ReservationProtocolMessage>,
        current_time: f64,
    ) {
        match self.state {
            VehicleState::Default => {
                if let Some(intersection_id) = handler.approaching(&self.id) {
                    self.approaching_im = Some(intersection_id);
                    self.state = VehicleState::ApproachingNoRes;
                }
            }
            VehicleState::ApproachingNoRes => {
                let speed = handler.speed(&self.id);
                let stop_distance = Self::distance_to_stop(speed, handler.max_deceleration(&self.id));
                if handler.driving_distance(&self.id) <= stop_distance + 1.0 {
                    self.state = VehicleState::Waiting;
                }
            }
            VehicleState::Waiting => {}
            VehicleState::ApproachingWithRes => {
                if handler.in_intersection(&self.id) {
                    self.was_just_waiting = false;
                    self.state = VehicleState::InIntersection;
                    handler.set_control_mode(&self.id, ControlMode::Manual);
                    return;
                }
                if self.must_change_reservation(handler, current_time) {
                    let speed = handler.speed(&self.id);
                    let stop_distance = Self::distance_to_stop(speed, handler.max_deceleration(&self.id));
                    let braking_room = handler.driving_distance(&self.id) > stop_distance;
                    if braking_room && !self.was_just_waiting {
                        if let (Some(reservation), Some(intersection_id)) = (&self.reservation, &self.approaching_im) {
                            let request = self.build_request(handler, current_time);
                            let change = ChangeRequest {
                                reservation_id: reservation.reservation_id.clone(),
                                request,
                            };
                            verbose::verbose_log(
                                VerboseLevel::Additional,
                                verbose::EVENT_RESERVATION_CHANGE_REQUEST,
                                &self.id,
                            );
                            let _ = messaging.send(
                                intersection_id,
                                ReservationProtocolMessage::Vehicle(VehicleMessage::ChangeRequest(change)),
                            );
                        }
                        self.reservation = None;
                        self.awaiting_reply = true;
                        self.state = if handler.driving_distance(&self.id) <= stop_distance + 1.0 {
                            VehicleState::Waiting
                        } else {
                            VehicleState::ApproachingNoRes
                        };
                    }
                }
            }
            VehicleState::InIntersection => {
                if handler.departing(&self.id).is_some() {
                    if let (Some(reservation), Some(intersection_id)) = (&self.reservation, &self.approaching_im) {
                        verbose::verbose_log(VerboseLevel::Additional, verbose::EVENT_RESERVATION_DONE, &self.id);
                        let _ = messaging.send(
                            intersection_id,
                            ReservationProtocolMessage::Vehicle(VehicleMessage::Done {
                                vehicle_id: self.id.clone(),
                                reservation_id: reservation.reservation_id.clone(),
                            }),
                        );
                    }
                    self.state = VehicleState::Default;
                    self.reservation = None;
                    self.target_speed = None;
                    self.approaching_im = None;
                    self.awaiting_reply = false;
                    handler.set_desired_speed(&self.id, -1.0);
                    handler.set_control_mode(&self.id, ControlMode::WithSafetyPrecautions);
                }
            }
        }
    }

    /// A held reservation is no longer honoured once the vehicle's
    /// recomputed arrival time falls outside the window the IM confirmed.
    fn must_change_reservation(&self, handler: &impl VehicleHandler, current_time: f64) -> bool {
        let reservation = match &self.reservation {
            Some(r) => r,
            None => return false,
        };
        let expected = self.approximate_arrival_time(handler, current_time);
        expected < reservation.early_error || expected > reservation.late_error
    }

    fn act(
        &mut self,
        handler: &mut impl VehicleHandler,
        messaging: &impl MessagingUnit<ReservationProtocolMessage>,
        current_time: f64,
    ) {
        let Some(intersection_id) = self.approaching_im.clone() else {
            return;
        };

        match self.state {
            VehicleState::ApproachingNoRes | VehicleState::Waiting => {
                if current_time >= self.timeout && !self.awaiting_reply {
                    let request = self.build_request(handler, current_time);
                    verbose::verbose_log(VerboseLevel::Additional, verbose::EVENT_RESERVATION_REQUEST, &self.id);
                    let _ = messaging.send(
                        &intersection_id,
                        ReservationProtocolMessage::Vehicle(VehicleMessage::Request(request)),
                    );
                    self.awaiting_reply = true;
                }
            }
            // ApproachingWithRes's Change-Request send happens in
            // apply_transitions, gated on the exact same pre-transition
            // state the decision to change is made from (see there).
            VehicleState::ApproachingWithRes => {}
            VehicleState::InIntersection => {
                if let Some(reservation) = &self.reservation {
                    if reservation.accelerate {
                        handler.set_desired_speed(&self.id, handler.speed_limit(&self.id));
                    }
                }
            }
            VehicleState::Default => {}
        }
    }

    /// Sends Done and tears down the reservation unconditionally; used when
    /// the agent itself is being destroyed mid-crossing.
    pub fn destroy(&mut self, messaging: &impl MessagingUnit<ReservationProtocolMessage>) {
        if let (Some(reservation), Some(intersection_id)) = (&self.reservation, &self.approaching_im) {
            let _ = messaging.send(
                intersection_id,
                ReservationProtocolMessage::Vehicle(VehicleMessage::Done {
                    vehicle_id: self.id.clone(),
                    reservation_id: reservation.reservation_id.clone(),
                }),
            );
        }
        messaging.destroy();
    }
}
