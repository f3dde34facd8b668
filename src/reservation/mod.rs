//! The intersection manager's space–time reservation table.

mod entry_direction;
mod table;

pub use entry_direction::EntryDirection;
pub use table::{from_key, to_key, Reservation, ReservationError, ReservationTable, TimeKey, VehicleId};
