//! Vehicle kinematic stand-ins used by the feasibility search.

mod internal;

pub use internal::{InternalVehicle, VehicleError};
