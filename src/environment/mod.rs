//! Traits describing the external microscopic-simulator collaborator.

mod traits;

pub use traits::{
    ControlMode, Environment, IntersectionHandler, IntersectionId, SignalPhase, TrajectoryRouteId,
    VehicleHandler, VehicleId,
};
