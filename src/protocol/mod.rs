//! Tagged-union message protocol (see `crate::messaging` for transport).

mod messages;

pub use messages::{
    ChangeRequest, Confirm, IMMessage, Request, ReservationId, ReservationProtocolMessage, StipCrossing,
    StipMessage, VehicleMessage,
};
