//! The intersection manager's reservation table: the single source of truth
//! for which vehicle owns which (tile, discretised-time) slot.

use crate::grid::TileId;
use crate::reservation::entry_direction::EntryDirection;
use std::collections::{HashMap, HashSet};
use std::fmt;

pub type VehicleId = String;
pub type TimeKey = i64;

/// Errors raised by [`ReservationTable`] operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ReservationError {
    /// A Done/Cancel arrived from a vehicle holding no current reservation.
    /// Per the protocol's failure model this is logged and ignored by the
    /// caller, never propagated as a hard error.
    UnknownOwner(VehicleId),
}

impl fmt::Display for ReservationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationError::UnknownOwner(id) => {
                write!(f, "{} is not the owner of any current reservation", id)
            }
        }
    }
}

impl std::error::Error for ReservationError {}

/// One accepted reservation: every (tile, time) slot a vehicle currently
/// holds. `tile_times` groups tiles by the discretised time they're swept
/// at, since the feasibility search produces one tile set per simulated Δ
/// step. `reservation_id` is the session token echoed back in `Confirm` and
/// `Acknowledge` so the vehicle can reference this specific grant in a later
/// Change-Request/Cancel/Done.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub owner: VehicleId,
    pub reservation_id: crate::protocol::ReservationId,
    pub tile_times: Vec<(TimeKey, HashSet<TileId>)>,
}

/// Snaps a continuous time to the Δ-spaced discretisation grid, storing the
/// grid index as an integer key so hash lookups never suffer float drift.
pub fn to_key(t: f64, delta: f64) -> TimeKey {
    (t / delta).round() as TimeKey
}

pub fn from_key(k: TimeKey, delta: f64) -> f64 {
    k as f64 * delta
}

/// IM-owned mutable state. Invariants (checked by the test suite, held by
/// construction elsewhere in this module):
/// - I1: `occupancy[(tile, t)] == v` iff `(t, S) ∈ by_vehicle[v].tile_times ∧ tile ∈ S`.
/// - I2: every time key is on the Δ grid (enforced by construction via `to_key`).
/// - I3: at most one owner per (tile, t) (enforced by `commit` refusing overwrites).
/// - I4: timeouts never decrease for the same vehicle absent an intervening confirm/reset.
#[derive(Debug, Default)]
pub struct ReservationTable {
    occupancy: HashMap<(TileId, TimeKey), VehicleId>,
    by_vehicle: HashMap<VehicleId, Reservation>,
    timeouts: HashMap<VehicleId, f64>,
    nearest_stalled: HashMap<EntryDirection, f64>,
}

impl ReservationTable {
    pub fn new() -> Self {
        ReservationTable::default()
    }

    pub fn occupancy_len(&self) -> usize {
        self.occupancy.len()
    }

    pub fn reservation_of(&self, vehicle_id: &str) -> Option<&Reservation> {
        self.by_vehicle.get(vehicle_id)
    }

    pub fn is_occupied(&self, tile: TileId, t: TimeKey) -> Option<&VehicleId> {
        self.occupancy.get(&(tile, t))
    }

    pub fn timeout(&self, vehicle_id: &str) -> Option<f64> {
        self.timeouts.get(vehicle_id).copied()
    }

    /// Installs a new timeout, per I4 only ever moving it forward for a
    /// vehicle that has not been reset by an intervening confirm.
    pub fn set_timeout(&mut self, vehicle_id: impl Into<VehicleId>, timeout: f64) {
        let vehicle_id = vehicle_id.into();
        let entry = self.timeouts.entry(vehicle_id).or_insert(timeout);
        if timeout > *entry {
            *entry = timeout;
        }
    }

    pub fn nearest_stalled(&self, direction: EntryDirection) -> f64 {
        self.nearest_stalled
            .get(&direction)
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    pub fn set_nearest_stalled(&mut self, direction: EntryDirection, distance: f64) {
        self.nearest_stalled.insert(direction, distance);
    }

    pub fn reset_nearest_stalled(&mut self, direction: EntryDirection) {
        self.nearest_stalled.insert(direction, f64::INFINITY);
    }

    /// Releases every tile a vehicle holds (Done, and Cancel treated
    /// identically per §9's open-question record), returning the released
    /// reservation so the caller can echo its id in an Acknowledge. Fails if
    /// the vehicle is not a current reservation owner; the caller logs and
    /// ignores rather than propagating the error.
    pub fn release(&mut self, vehicle_id: &str) -> Result<Reservation, ReservationError> {
        let reservation = self
            .by_vehicle
            .remove(vehicle_id)
            .ok_or_else(|| ReservationError::UnknownOwner(vehicle_id.to_string()))?;
        for (t, tiles) in &reservation.tile_times {
            for tile in tiles {
                self.occupancy.remove(&(*tile, *t));
            }
        }
        Ok(reservation)
    }

    /// Commits a feasible crossing: the feasibility search is responsible
    /// for having verified no conflicting occupant beforehand, so this is a
    /// plain insert rather than a re-check.
    pub fn commit(
        &mut self,
        vehicle_id: impl Into<VehicleId>,
        reservation_id: impl Into<crate::protocol::ReservationId>,
        tile_times: Vec<(TimeKey, HashSet<TileId>)>,
    ) {
        let vehicle_id = vehicle_id.into();
        for (t, tiles) in &tile_times {
            for tile in tiles {
                self.occupancy.insert((*tile, *t), vehicle_id.clone());
            }
        }
        self.by_vehicle.insert(
            vehicle_id.clone(),
            Reservation {
                owner: vehicle_id,
                reservation_id: reservation_id.into(),
                tile_times,
            },
        );
    }
}
