//! Wire-level message payloads exchanged over a [`crate::messaging::MessagingUnit`].
//!
//! Both protocols in this crate (the centralised request/reply protocol
//! between a `ReservationVehicle` and an `IntersectionManager`, and the
//! decentralised broadcast protocol between `SpaceTimeVehicle`s) are tagged
//! unions rather than untyped key/value payloads: a field that's missing or
//! mistyped is a compile error, not a runtime lookup failure.

use crate::grid::TileId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub type ReservationId = String;

/// Message kinds a vehicle agent sends to an intersection manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VehicleMessage {
    Request(Request),
    ChangeRequest(ChangeRequest),
    Cancel { vehicle_id: String, reservation_id: ReservationId },
    Done { vehicle_id: String, reservation_id: ReservationId },
}

/// A fresh request for passage, from a vehicle holding no reservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub vehicle_id: String,
    pub arrival_time: f64,
    pub arrival_lane: String,
    pub arrival_velocity: f64,
    pub max_acceleration: f64,
    pub max_velocity: f64,
    pub length: f64,
    pub width: f64,
    pub distance: f64,
    /// Carried end-to-end but not yet used to grant priority; see
    /// `EmergencyStop` and the receiver-side halt behaviour it documents.
    pub emergency: bool,
}

/// A request to replace an existing reservation with a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub reservation_id: ReservationId,
    #[serde(flatten)]
    pub request: Request,
}

/// Message kinds an intersection manager sends back to a vehicle agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IMMessage {
    Confirm(Confirm),
    Reject { timeout: f64 },
    Acknowledge { reservation_id: ReservationId },
    /// Documented in the wire contract, never emitted by the reference
    /// `IntersectionManager`; a receiver must treat it as a terminal
    /// command to halt immediately.
    EmergencyStop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirm {
    pub reservation_id: ReservationId,
    pub arrival_time: f64,
    pub arrival_velocity: f64,
    pub early_error: f64,
    pub late_error: f64,
    pub accelerate: bool,
}

/// Either direction of traffic on the reservation protocol's shared channel:
/// a vehicle's request/cancel/done, or an intersection manager's reply. Both
/// ends of a `MessagingUnit<ReservationProtocolMessage>` pair speak this one
/// type, matching how a single radio carries both directions of a
/// conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReservationProtocolMessage {
    Vehicle(VehicleMessage),
    Im(IMMessage),
}

/// Broadcast messages exchanged directly between `SpaceTimeVehicle`s under
/// the decentralised STIP protocol (§4.9). There is no intersection manager
/// in this protocol; every vehicle reasons about conflicts from the
/// messages its peers broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StipMessage {
    Enter(StipCrossing),
    Cross(StipCrossing),
    Exit { id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StipCrossing {
    pub id: String,
    pub arrival_time: f64,
    pub exit_time: f64,
    pub trajectory_cells: HashSet<TileId>,
    pub lane: String,
    pub distance: f64,
}
